//! Pure Rust async clients for the Quake II out-of-band `status` query and remote console (rcon).
pub mod address;
pub mod config;
pub mod error;
pub mod info;
pub mod packet;
mod parse;
pub mod query;
pub mod rcon;
pub mod reply;

pub use address::ServerAddress;
pub use config::Config;
pub use error::{ErrorKind, QueryError};
pub use info::{Dialect, PlayerRecord, ServerState};
pub use query::{query, StatusQuery};
pub use rcon::RconClient;
pub use reply::StatusTableRow;
