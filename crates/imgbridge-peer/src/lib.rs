//! Host and window endpoints for imgbridge.
//!
//! Each side drives its connection from its own thread: [`Link::dispatch`]
//! reads whatever envelopes are ready into per-type [`InboundQueues`], and
//! [`Link::fetch`] pairs a request with its response by type alone.
//! [`Bridge`] is the data-owning host; [`Window`] is the presenting side.

pub mod error;
pub mod link;
pub mod queue;

#[cfg(unix)]
pub mod bridge;
#[cfg(unix)]
pub mod connector;
#[cfg(unix)]
pub mod listener;
#[cfg(unix)]
pub mod window;

pub use error::{PeerError, Result};
pub use link::{Link, LinkConfig, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_TIMEOUT};
pub use queue::InboundQueues;

#[cfg(unix)]
pub use bridge::{Bridge, HostConfig, DEVELOPMENT_PORT};
#[cfg(unix)]
pub use connector::{connect, connect_with_config, connect_with_retry};
#[cfg(unix)]
pub use listener::WindowListener;
#[cfg(unix)]
pub use window::{Window, WindowConfig, WindowHandler};
