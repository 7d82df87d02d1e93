//! Remote console over the connectionless channel.
//!
//! Every command is a single out-of-band datagram carrying the password, and
//! the reply comes back as one or more out-of-band datagrams with no length or
//! sequence information. A reply is considered complete once the server goes
//! quiet for the command's timeout; if nothing arrives at all we give up after
//! twice that. Datagrams are concatenated in arrival order, which holds on a
//! LAN and for a single server socket but is not guaranteed by UDP.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::net::UdpSocket;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{timeout, timeout_at, Instant};

use crate::address::ServerAddress;
use crate::config::Config;
use crate::error::QueryError;
use crate::info::RESPONSE_HEADER;
use crate::packet::{RequestPacket, ResponsePacket, MAX_PACKET_SIZE};
use crate::query::open_socket;
use crate::reply::{self, StatusTableRow};

/// Replies a server gives instead of running the command.
pub const BAD_PASSWORD_REPLIES: [&str; 3] = [
    "Bad rconpassword.",
    "Invalid password.",
    "print\nBad rcon_password.\n",
];

/// Commands that get the long timeout. Matched against the whole command,
/// then against its first word.
pub const LONG_COMMANDS: [&str; 3] = ["map", "fdir", "dir maps/"];

pub fn is_long_command(command: &str) -> bool {
    let command: &str = command.trim();
    let first: &str = command.split_whitespace().next().unwrap_or("");
    LONG_COMMANDS.iter().any(|long| *long == command || *long == first)
}

enum Session {
    /// Socket is connected but the password has not been tried yet.
    Connected(UdpSocket),
    Authenticated(UdpSocket),
    Closed,
}

impl Session {
    fn socket(&self) -> Result<&UdpSocket, QueryError> {
        match self {
            Session::Connected(sock) | Session::Authenticated(sock) => Ok(sock),
            Session::Closed => Err(QueryError::SessionClosed),
        }
    }
}

/// Holds the session lock for one command. Unless the reply is collected
/// completely, dropping it closes the session: a cancelled or aborted
/// command may still have datagrams in flight that would otherwise be read
/// as the start of the next reply.
struct InFlight<'a> {
    session: MutexGuard<'a, Session>,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished && !matches!(*self.session, Session::Closed) {
            debug!("rcon command did not complete, closing session");
            *self.session = Session::Closed;
        }
    }
}

/// An rcon session with one server.
///
/// Commands are serialized: concurrent callers wait on the session lock, so
/// at most one reply is being reassembled at a time.
pub struct RconClient {
    address: ServerAddress,
    password: String,
    config: Config,
    session: Mutex<Session>,
}

impl RconClient {
    /// Open a session using the default [Config].
    pub async fn connect(address: ServerAddress, password: &str) -> Result<Self, QueryError> {
        Self::connect_with(address, password, &Config::default()).await
    }

    /// Open a session and check the password with a `status` probe.
    ///
    /// Fails with [QueryError::BadPassword] if the server rejects it. The
    /// socket is released whenever this returns an error.
    pub async fn connect_with(
        address: ServerAddress,
        password: &str,
        config: &Config,
    ) -> Result<Self, QueryError> {
        // connecting a UDP socket includes the name lookup, which can be as
        // slow as the long commands
        let sock: UdpSocket = open_socket(&address, config.rcon_long_timeout).await?;

        let client = RconClient {
            address,
            password: password.trim().to_owned(),
            config: config.clone(),
            session: Mutex::new(Session::Connected(sock)),
        };

        let probe = client.send("status").await;
        match probe {
            Ok(reply) if BAD_PASSWORD_REPLIES.contains(&reply.as_str()) => {
                warn!("{} rejected the rcon password", client.address);
                client.close().await;
                Err(QueryError::BadPassword)
            }
            Ok(_) => {
                let mut session = client.session.lock().await;
                if let Session::Connected(sock) = std::mem::replace(&mut *session, Session::Closed) {
                    *session = Session::Authenticated(sock);
                }
                drop(session);
                debug!("rcon session with {} authenticated", client.address);
                Ok(client)
            }
            Err(e) => {
                client.close().await;
                Err(e)
            }
        }
    }

    /// The server this session talks to.
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    /// Timeouts the session was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// How long [RconClient::send] waits on `command`.
    pub fn command_timeout(&self, command: &str) -> Duration {
        if is_long_command(command) {
            self.config.rcon_long_timeout
        } else {
            self.config.rcon_timeout
        }
    }

    /// Send a command and return the raw reassembled reply.
    ///
    /// Any failure after the lock is taken, and dropping the returned future
    /// before it resolves, closes the session; later commands then fail
    /// with [QueryError::SessionClosed].
    pub async fn send(&self, command: &str) -> Result<String, QueryError> {
        if command.is_empty() {
            return Err(QueryError::EmptyCommand);
        }
        let timeout_dur: Duration = self.command_timeout(command);

        let mut in_flight = InFlight {
            session: self.session.lock().await,
            finished: false,
        };
        let sock: &UdpSocket = in_flight.session.socket()?;

        debug!("rcon {} -> {:?}", self.address, command);
        let packet: RequestPacket = RequestPacket::rcon(&self.password, command);
        timeout(timeout_dur, sock.send(&packet.pack()))
            .await?
            .map_err(QueryError::SendError)?;

        let response: String = recv_all(sock, timeout_dur).await?;
        in_flight.finished = true;
        Ok(response)
    }

    /// Send a command and return its console output with the `print`
    /// header removed.
    pub async fn execute(&self, command: &str) -> Result<String, QueryError> {
        let response: String = self.send(command).await?;
        if !response.starts_with(RESPONSE_HEADER) {
            return Err(QueryError::UnexpectedResponse(
                response.lines().next().unwrap_or_default().to_owned(),
            ));
        }
        Ok(response.chars().skip(RESPONSE_HEADER.len() + 1).collect())
    }

    /// Current map and connected clients, from `status`.
    pub async fn status(&self) -> Result<(String, Vec<StatusTableRow>), QueryError> {
        let output: String = self.execute("status").await?;
        reply::parse_status(&output)
    }

    /// Every map in the server's `maps/` directory.
    pub async fn map_list(&self) -> Result<Vec<String>, QueryError> {
        let output: String = self.execute("dir maps/").await?;
        Ok(reply::parse_map_list(&output))
    }

    /// Change map and confirm it took via `status`. Not retried.
    pub async fn change_map(&self, name: &str) -> Result<(), QueryError> {
        self.execute(&format!("map {}", name)).await?;
        let (current_map, _) = self.status().await?;
        if current_map != name {
            return Err(QueryError::MapChangeFailed {
                expected: name.to_owned(),
                actual: current_map,
            });
        }
        Ok(())
    }

    /// Every serverinfo setting, from `serverinfo`.
    pub async fn server_info(&self) -> Result<BTreeMap<String, String>, QueryError> {
        let output: String = self.execute("serverinfo").await?;
        Ok(reply::parse_server_info(&output))
    }

    /// Drop the socket. Later commands fail with [QueryError::SessionClosed].
    pub async fn close(&self) {
        let mut session = self.session.lock().await;
        if !matches!(*session, Session::Closed) {
            debug!("closing rcon session with {}", self.address);
        }
        *session = Session::Closed;
    }

    /// Whether the session has been closed, explicitly or by a failed command.
    pub async fn is_closed(&self) -> bool {
        matches!(*self.session.lock().await, Session::Closed)
    }
}

/// Collect reply datagrams until the server has been quiet for `timeout_dur`
/// after sending something, or for twice that without sending anything.
async fn recv_all(sock: &UdpSocket, timeout_dur: Duration) -> Result<String, QueryError> {
    let mut response: String = String::new();
    let mut buf: [u8; MAX_PACKET_SIZE] = [0u8; MAX_PACKET_SIZE];
    let mut last_data: Instant = Instant::now();

    loop {
        let window: Duration = if response.is_empty() {
            timeout_dur * 2
        } else {
            timeout_dur
        };

        match timeout_at(last_data + window, sock.recv(&mut buf)).await {
            Ok(Ok(len)) => {
                let packet: ResponsePacket = ResponsePacket::unpack(&buf[..len])?;
                trace!("rcon datagram: {:?}", packet.body());
                if !packet.body().is_empty() {
                    response.push_str(&packet.text());
                    last_data = Instant::now();
                }
            }
            Ok(Err(e)) => return Err(QueryError::ReceiveError(e)),
            Err(elapsed) if response.is_empty() => return Err(QueryError::Timeout(elapsed)),
            Err(_) => break,
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_command_table() {
        assert!(is_long_command("map q2dm1"));
        assert!(is_long_command("fdir *.bsp"));
        assert!(is_long_command("dir maps/"));
        assert!(!is_long_command("dir"));
        assert!(!is_long_command("status"));
        assert!(!is_long_command("mapname"));
    }
}
