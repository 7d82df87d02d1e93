use std::io;

use thiserror::Error;
use tokio::time::error::Elapsed;

/// Broad category of a [QueryError], for callers deciding how to present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No (or no complete) reply within the timeout window.
    Timeout,
    /// The server replied with something we could not make sense of.
    Protocol,
    /// The RCON password was rejected. Terminal for the session.
    Authentication,
    /// The caller supplied something unusable.
    InvalidArgument,
    /// Socket-level failure.
    Transport,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("timed out waiting for the server")]
    Timeout(#[from] Elapsed),

    #[error("failed to bind a local port: {0}")]
    FailedPortBind(#[source] io::Error),
    #[error("could not reach host: {0}")]
    UnreachableHost(#[source] io::Error),
    #[error("failed to send packet: {0}")]
    SendError(#[source] io::Error),
    #[error("failed to receive packet: {0}")]
    ReceiveError(#[source] io::Error),

    #[error("packet too short ({0} bytes)")]
    ShortPacket(usize),
    #[error("unknown packet header {0:#010x}")]
    UnknownPacketHeader(i32),
    #[error("unexpected response header {0:?}")]
    UnexpectedResponse(String),
    #[error("malformed status line {line:?}: {reason}")]
    MalformedStatusLine { line: String, reason: String },
    #[error("map failed to change (wanted {expected:?}, server is on {actual:?})")]
    MapChangeFailed { expected: String, actual: String },

    #[error("bad rcon password supplied")]
    BadPassword,

    #[error("no command supplied")]
    EmptyCommand,
    #[error("invalid server address {0:?}")]
    InvalidAddress(String),

    #[error("rcon session is closed")]
    SessionClosed,
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Timeout(_) => ErrorKind::Timeout,
            QueryError::FailedPortBind(_)
            | QueryError::UnreachableHost(_)
            | QueryError::SendError(_)
            | QueryError::ReceiveError(_)
            | QueryError::SessionClosed => ErrorKind::Transport,
            QueryError::ShortPacket(_)
            | QueryError::UnknownPacketHeader(_)
            | QueryError::UnexpectedResponse(_)
            | QueryError::MalformedStatusLine { .. }
            | QueryError::MapChangeFailed { .. } => ErrorKind::Protocol,
            QueryError::BadPassword => ErrorKind::Authentication,
            QueryError::EmptyCommand | QueryError::InvalidAddress(_) => ErrorKind::InvalidArgument,
        }
    }
}
