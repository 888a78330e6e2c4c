use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::Result;

/// Non-consuming readiness queries on a connected stream.
///
/// The dispatch loop uses these to decide whether an envelope is waiting
/// without committing to a blocking read.
pub trait Readiness {
    /// Bytes that can be read right now without blocking.
    fn bytes_available(&self) -> std::io::Result<usize>;

    /// Block up to `timeout` until the stream is readable (data or hang-up).
    fn wait_readable(&self, timeout: Duration) -> std::io::Result<bool>;

    /// Block up to `timeout` until the send buffer has room (or the peer hung up).
    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool>;
}

/// A connected stream, readable and writable.
///
/// This is the I/O type returned by listeners and [`crate::connect`].
/// It wraps either a TCP stream or, on Unix, a Unix domain socket stream.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            IpcStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl IpcStream {
    /// Create an IpcStream from a TCP stream.
    ///
    /// Nagle is disabled: envelopes are written as several small blocks.
    pub(crate) fn from_tcp(stream: TcpStream) -> Self {
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(error = %err, "failed to disable nagle on tcp stream");
        }
        Self {
            inner: IpcStreamInner::Tcp(stream),
        }
    }

    /// Create an IpcStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            IpcStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            IpcStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => "unix-domain-socket",
        }
    }

    #[cfg(unix)]
    pub(crate) fn raw_fd(&self) -> std::os::fd::RawFd {
        use std::os::fd::AsRawFd;

        match &self.inner {
            IpcStreamInner::Tcp(stream) => stream.as_raw_fd(),
            IpcStreamInner::Unix(stream) => stream.as_raw_fd(),
        }
    }
}

#[cfg(unix)]
impl Readiness for IpcStream {
    fn bytes_available(&self) -> std::io::Result<usize> {
        crate::poll::bytes_available(self.raw_fd())
    }

    fn wait_readable(&self, timeout: Duration) -> std::io::Result<bool> {
        crate::poll::wait_readable(self.raw_fd(), timeout)
    }

    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool> {
        crate::poll::wait_writable(self.raw_fd(), timeout)
    }
}

#[cfg(unix)]
impl Readiness for TcpStream {
    fn bytes_available(&self) -> std::io::Result<usize> {
        use std::os::fd::AsRawFd;
        crate::poll::bytes_available(self.as_raw_fd())
    }

    fn wait_readable(&self, timeout: Duration) -> std::io::Result<bool> {
        use std::os::fd::AsRawFd;
        crate::poll::wait_readable(self.as_raw_fd(), timeout)
    }

    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool> {
        use std::os::fd::AsRawFd;
        crate::poll::wait_writable(self.as_raw_fd(), timeout)
    }
}

#[cfg(unix)]
impl Readiness for std::os::unix::net::UnixStream {
    fn bytes_available(&self) -> std::io::Result<usize> {
        use std::os::fd::AsRawFd;
        crate::poll::bytes_available(self.as_raw_fd())
    }

    fn wait_readable(&self, timeout: Duration) -> std::io::Result<bool> {
        use std::os::fd::AsRawFd;
        crate::poll::wait_readable(self.as_raw_fd(), timeout)
    }

    fn wait_writable(&self, timeout: Duration) -> std::io::Result<bool> {
        use std::os::fd::AsRawFd;
        crate::poll::wait_writable(self.as_raw_fd(), timeout)
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
