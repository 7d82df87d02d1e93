use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, trace};
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::address::{local_bind_addr, ServerAddress};
use crate::error::QueryError;
use crate::info::{Dialect, ServerState};
use crate::packet::{RequestPacket, ResponsePacket, MAX_PACKET_SIZE};

/// Default wait for the status reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Connectionless `status` client for one player line [Dialect].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusQuery {
    dialect: Dialect,
}

impl StatusQuery {
    pub fn new(dialect: Dialect) -> Self {
        StatusQuery { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Query `address` with a single `status` round trip.
    ///
    /// `timeout_dur` defaults to [DEFAULT_TIMEOUT] and bounds the connect,
    /// the send and the receive separately. There is no retry: a lost
    /// datagram surfaces as [QueryError::Timeout]. The socket is opened for
    /// this call and dropped on every exit path.
    pub async fn query(
        &self,
        address: &ServerAddress,
        timeout_dur: Option<Duration>,
    ) -> Result<ServerState, QueryError> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(DEFAULT_TIMEOUT);

        let sock: UdpSocket = open_socket(address, timeout_dur).await?;

        debug!("querying {} status", address);
        let packet: ResponsePacket = send_recv(&sock, RequestPacket::status(), timeout_dur).await?;
        ServerState::parse(&packet, self.dialect)
    }
}

/// Query `address` as a Quake II server.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), q2query::error::QueryError> {
/// let address: q2query::ServerAddress = "quake2://127.0.0.1:27910".parse()?;
/// let state = q2query::query(&address, None).await?;
/// println!("{:?} on {:?}", state.hostname, state.map);
/// # Ok(())
/// # }
/// ```
pub async fn query(
    address: &ServerAddress,
    timeout_dur: Option<Duration>,
) -> Result<ServerState, QueryError> {
    StatusQuery::default().query(address, timeout_dur).await
}

/// Resolve `address`, bind a local socket of the same address family and
/// connect it. `timeout_dur` bounds the name lookup.
pub(crate) async fn open_socket(
    address: &ServerAddress,
    timeout_dur: Duration,
) -> Result<UdpSocket, QueryError> {
    let peer: SocketAddr = timeout(timeout_dur, lookup_host((address.host(), address.port())))
        .await?
        .map_err(QueryError::UnreachableHost)?
        .next()
        .ok_or_else(|| {
            QueryError::UnreachableHost(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} did not resolve", address),
            ))
        })?;

    // just arbitrarily bind any port, doesn't matter really
    let sock: UdpSocket = UdpSocket::bind(local_bind_addr(&peer))
        .await
        .map_err(QueryError::FailedPortBind)?;
    sock.connect(peer)
        .await
        .map_err(QueryError::UnreachableHost)?;

    Ok(sock)
}

async fn send_recv(
    sock: &UdpSocket,
    packet: RequestPacket,
    timeout_dur: Duration,
) -> Result<ResponsePacket, QueryError> {
    // sending
    timeout(timeout_dur, sock.send(&packet.pack()))
        .await?
        .map_err(QueryError::SendError)?;

    // receiving packet
    let mut resp_buf: [u8; MAX_PACKET_SIZE] = [0u8; MAX_PACKET_SIZE];
    let len: usize = timeout(timeout_dur, sock.recv(&mut resp_buf))
        .await?
        .map_err(QueryError::ReceiveError)?;
    trace!("status reply: {:?}", &resp_buf[..len]);

    ResponsePacket::unpack(&resp_buf[..len])
}
