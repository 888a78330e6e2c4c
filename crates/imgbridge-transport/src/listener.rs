use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::tcp::TcpSocket;
use crate::traits::IpcStream;
#[cfg(unix)]
use crate::uds::UnixDomainSocket;

/// A bound listener for either endpoint kind.
pub enum IpcListener {
    Tcp(TcpSocket),
    #[cfg(unix)]
    Unix(UnixDomainSocket),
}

impl IpcListener {
    /// Bind to `endpoint`.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        match endpoint {
            Endpoint::Tcp(addr) => TcpSocket::bind(*addr).map(Self::Tcp),
            #[cfg(unix)]
            Endpoint::Unix(path) => UnixDomainSocket::bind(path).map(Self::Unix),
            #[cfg(not(unix))]
            Endpoint::Unix(path) => Err(crate::error::TransportError::Bind {
                endpoint: path.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "unix domain sockets are not available on this platform",
                ),
            }),
        }
    }

    /// The endpoint peers should connect to.
    ///
    /// For TCP this carries the port chosen at bind time.
    pub fn local_endpoint(&self) -> Endpoint {
        match self {
            Self::Tcp(socket) => Endpoint::Tcp(socket.local_addr()),
            #[cfg(unix)]
            Self::Unix(socket) => Endpoint::Unix(socket.path().to_path_buf()),
        }
    }

    /// Accept one connection, giving up after `timeout`.
    #[cfg(unix)]
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<IpcStream>> {
        match self {
            Self::Tcp(socket) => socket.accept_timeout(timeout),
            Self::Unix(socket) => socket.accept_timeout(timeout),
        }
    }

    /// Accept one connection, blocking without limit.
    pub fn accept(&self) -> Result<IpcStream> {
        match self {
            Self::Tcp(socket) => socket.accept(),
            #[cfg(unix)]
            Self::Unix(socket) => socket.accept(),
        }
    }
}

impl std::fmt::Debug for IpcListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcListener")
            .field("endpoint", &self.local_endpoint())
            .finish()
    }
}

/// Connect to a listening endpoint.
pub fn connect(endpoint: &Endpoint) -> Result<IpcStream> {
    match endpoint {
        Endpoint::Tcp(addr) => TcpSocket::connect(*addr),
        #[cfg(unix)]
        Endpoint::Unix(path) => UnixDomainSocket::connect(path),
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(crate::error::TransportError::Connect {
            endpoint: path.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "unix domain sockets are not available on this platform",
            ),
        }),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    #[test]
    fn tcp_listener_reports_resolved_port() {
        let listener = IpcListener::bind(&Endpoint::loopback(0)).unwrap();
        let endpoint = listener.local_endpoint();
        assert!(matches!(endpoint.port(), Some(port) if port != 0));
    }

    #[test]
    fn connect_through_either_endpoint_kind() {
        let dir = std::env::temp_dir().join(format!("imgb-listener-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let endpoints = [
            Endpoint::loopback(0),
            Endpoint::Unix(dir.join("listener.sock")),
        ];

        for endpoint in endpoints {
            let listener = IpcListener::bind(&endpoint).unwrap();
            let target = listener.local_endpoint();

            let client = std::thread::spawn(move || {
                let mut stream = connect(&target).unwrap();
                stream.write_all(b"hi").unwrap();
            });

            let mut server = listener
                .accept_timeout(Duration::from_secs(5))
                .unwrap()
                .expect("client should connect");
            let mut buf = [0u8; 2];
            server.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hi");
            client.join().unwrap();
        }

        let _ = std::fs::remove_dir_all(&dir);
    }
}
