use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Where a host listens and a window connects.
///
/// Textual forms:
/// - `tcp:127.0.0.1:9588` or `tcp://localhost:0`
/// - `unix:/tmp/imgbridge.sock` or any other string, taken as a socket path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl Endpoint {
    /// Loopback TCP endpoint on `port` (0 picks a free port at bind time).
    pub fn loopback(port: u16) -> Self {
        Self::Tcp(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    /// TCP port, if this is a TCP endpoint.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Tcp(addr) => Some(addr.port()),
            Self::Unix(_) => None,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::loopback(0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(invalid(input, "endpoint must not be empty"));
        }

        if let Some(rest) = trimmed
            .strip_prefix("tcp://")
            .or_else(|| trimmed.strip_prefix("tcp:"))
        {
            let addr = rest
                .to_socket_addrs()
                .map_err(|err| invalid(input, &err.to_string()))?
                .next()
                .ok_or_else(|| invalid(input, "address did not resolve"))?;
            return Ok(Self::Tcp(addr));
        }

        let path = trimmed
            .strip_prefix("unix://")
            .or_else(|| trimmed.strip_prefix("unix:"))
            .unwrap_or(trimmed);
        if path.is_empty() {
            return Err(invalid(input, "socket path must not be empty"));
        }
        Ok(Self::Unix(PathBuf::from(path)))
    }
}

fn invalid(input: &str, reason: &str) -> TransportError {
    TransportError::InvalidEndpoint {
        input: input.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_forms() {
        let ep: Endpoint = "tcp:127.0.0.1:9588".parse().unwrap();
        assert_eq!(ep, Endpoint::loopback(9588));

        let ep: Endpoint = "tcp://127.0.0.1:0".parse().unwrap();
        assert_eq!(ep.port(), Some(0));
    }

    #[test]
    fn bare_string_is_a_socket_path() {
        let ep: Endpoint = "/tmp/bridge.sock".parse().unwrap();
        assert_eq!(ep, Endpoint::Unix(PathBuf::from("/tmp/bridge.sock")));

        let ep: Endpoint = "unix:/tmp/other.sock".parse().unwrap();
        assert_eq!(ep, Endpoint::Unix(PathBuf::from("/tmp/other.sock")));
        assert_eq!(ep.port(), None);
    }

    #[test]
    fn display_round_trips() {
        for text in ["tcp:127.0.0.1:4000", "unix:/tmp/x.sock"] {
            let ep: Endpoint = text.parse().unwrap();
            assert_eq!(ep.to_string(), text);
        }
    }

    #[test]
    fn rejects_empty_and_bad_tcp() {
        assert!(matches!(
            "".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            "tcp:not-an-address".parse::<Endpoint>(),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!("unix:".parse::<Endpoint>().is_err());
    }
}
