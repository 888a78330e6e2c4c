//! Stream transport for imgbridge.
//!
//! Provides the single persistent connection between the host process and
//! the window process:
//! - TCP on loopback (any platform)
//! - Unix domain sockets (Linux/macOS)
//!
//! This is the lowest layer. Everything else builds on top of the
//! [`IpcStream`] type and the [`Readiness`] checks provided here.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod poll;
#[cfg(unix)]
pub mod uds;

pub use endpoint::Endpoint;
pub use error::{Result, TransportError};
pub use listener::{connect, IpcListener};
pub use tcp::TcpSocket;
pub use traits::{IpcStream, Readiness};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
