use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::str::FromStr;

use crate::error::QueryError;

/// Port a Quake II dedicated server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 27910;

const URL_SCHEME: &str = "quake2://";

/// Where a server lives. Fixed for the lifetime of any client built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, QueryError> {
        let host: String = host.into().trim().to_owned();
        if host.is_empty() || port == 0 {
            return Err(QueryError::InvalidAddress(format!("{}:{}", host, port)));
        }
        Ok(ServerAddress { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Wildcard local address in the same family as `peer`, for binding a
/// socket that can reach it.
pub fn local_bind_addr(peer: &SocketAddr) -> SocketAddr {
    match peer {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

/// Accepts `host`, `host:port` and the `quake2://host:port` form server
/// browsers hand out. IPv6 literals take a port only in brackets
/// (`[::1]:27910`); a bare `::1` gets the default port.
impl FromStr for ServerAddress {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed: &str = s.trim();
        let trimmed: &str = trimmed.strip_prefix(URL_SCHEME).unwrap_or(trimmed);
        let trimmed: &str = trimmed.trim_end_matches('/');

        let parse_port = |port: &str| -> Result<u16, QueryError> {
            port.parse()
                .map_err(|_| QueryError::InvalidAddress(s.to_owned()))
        };

        if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| QueryError::InvalidAddress(s.to_owned()))?;
            return match tail {
                "" => ServerAddress::new(host, DEFAULT_PORT),
                _ => match tail.strip_prefix(':') {
                    Some(port) => ServerAddress::new(host, parse_port(port)?),
                    None => Err(QueryError::InvalidAddress(s.to_owned())),
                },
            };
        }
        if trimmed.matches(':').count() > 1 {
            return ServerAddress::new(trimmed, DEFAULT_PORT);
        }

        match trimmed.rsplit_once(':') {
            Some((host, port)) => ServerAddress::new(host, parse_port(port)?),
            None => ServerAddress::new(trimmed, DEFAULT_PORT),
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_form() {
        let addr: ServerAddress = "quake2://38.7.201.149:27910".parse().unwrap();
        assert_eq!(addr.host(), "38.7.201.149");
        assert_eq!(addr.port(), 27910);
    }

    #[test]
    fn bare_host_gets_default_port() {
        let addr: ServerAddress = "q2.example.net".parse().unwrap();
        assert_eq!(addr.to_string(), "q2.example.net:27910");
    }

    #[test]
    fn parses_ipv6_literals() {
        let addr: ServerAddress = "[::1]:27911".parse().unwrap();
        assert_eq!(addr.host(), "::1");
        assert_eq!(addr.port(), 27911);
        assert_eq!(addr.to_string(), "[::1]:27911");

        let addr: ServerAddress = "quake2://[2001:db8::7]".parse().unwrap();
        assert_eq!(addr.host(), "2001:db8::7");
        assert_eq!(addr.port(), DEFAULT_PORT);

        let addr: ServerAddress = "fe80::1".parse().unwrap();
        assert_eq!(addr.host(), "fe80::1");
        assert_eq!(addr.port(), DEFAULT_PORT);

        assert!("[::1".parse::<ServerAddress>().is_err());
        assert!("[::1]x".parse::<ServerAddress>().is_err());
    }

    #[test]
    fn bind_family_follows_peer() {
        let v4: SocketAddr = "10.0.0.1:27910".parse().unwrap();
        let v6: SocketAddr = "[::1]:27910".parse().unwrap();
        assert!(local_bind_addr(&v4).is_ipv4());
        assert!(local_bind_addr(&v6).is_ipv6());
        assert_eq!(local_bind_addr(&v6).port(), 0);
    }

    #[test]
    fn rejects_bad_ports() {
        assert!(matches!(
            "host:abc".parse::<ServerAddress>(),
            Err(QueryError::InvalidAddress(_))
        ));
        assert!("host:0".parse::<ServerAddress>().is_err());
        assert!("host:70000".parse::<ServerAddress>().is_err());
        assert!(":27910".parse::<ServerAddress>().is_err());
    }
}
