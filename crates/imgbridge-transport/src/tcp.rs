use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::IpcStream;

/// TCP listener bound to a local address.
///
/// Binding to port 0 lets the OS pick a free port; [`TcpSocket::local_addr`]
/// reports the one actually chosen so it can be handed to the peer.
pub struct TcpSocket {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpSocket {
    /// Bind and listen on `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| TransportError::Bind {
            endpoint: addr.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| TransportError::Bind {
            endpoint: addr.to_string(),
            source: e,
        })?;

        info!(%local_addr, "listening on tcp socket");

        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Accept an incoming connection, blocking without limit.
    pub fn accept(&self) -> Result<IpcStream> {
        let (stream, peer) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(%peer, "accepted connection");
        Ok(IpcStream::from_tcp(stream))
    }

    /// Accept an incoming connection, giving up after `timeout`.
    ///
    /// The listener is non-blocking while this runs; a peer that resets
    /// before the accept sends the call back to waiting.
    #[cfg(unix)]
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<IpcStream>> {
        use std::os::fd::AsRawFd;

        self.listener
            .set_nonblocking(true)
            .map_err(TransportError::Accept)?;
        let accepted = crate::poll::accept_until(self.listener.as_raw_fd(), timeout, || {
            self.listener.accept()
        });
        self.listener
            .set_nonblocking(false)
            .map_err(TransportError::Accept)?;

        match accepted.map_err(TransportError::Accept)? {
            Some((stream, peer)) => {
                stream.set_nonblocking(false).map_err(TransportError::Accept)?;
                debug!(%peer, "accepted connection");
                Ok(Some(IpcStream::from_tcp(stream)))
            }
            None => {
                debug!(local_addr = %self.local_addr, ?timeout, "no connection before accept timeout");
                Ok(None)
            }
        }
    }

    /// Connect to a listening TCP socket.
    pub fn connect(addr: SocketAddr) -> Result<IpcStream> {
        let stream = TcpStream::connect(addr).map_err(|e| TransportError::Connect {
            endpoint: addr.to_string(),
            source: e,
        })?;
        debug!(%addr, "connected to tcp socket");
        Ok(IpcStream::from_tcp(stream))
    }

    /// The address actually bound, with the resolved port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
