use std::thread;
use std::time::{Duration, Instant};

use imgbridge_transport::{Endpoint, TransportError};
use tracing::debug;

use crate::error::Result;
use crate::link::{Link, LinkConfig};

/// Pause between connection attempts while the host is not yet listening.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Connect to a listening host.
pub fn connect(endpoint: &Endpoint) -> Result<Link> {
    connect_with_config(endpoint, LinkConfig::default())
}

/// Connect with explicit link configuration.
pub fn connect_with_config(endpoint: &Endpoint, config: LinkConfig) -> Result<Link> {
    let stream = imgbridge_transport::connect(endpoint)?;
    Link::from_stream(stream, config)
}

/// Connect, retrying refused attempts until `timeout` has elapsed.
///
/// The host may still be binding when the window starts; every other error
/// is returned immediately.
pub fn connect_with_retry(endpoint: &Endpoint, timeout: Duration, config: LinkConfig) -> Result<Link> {
    let deadline = Instant::now() + timeout;
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match imgbridge_transport::connect(endpoint) {
            Ok(stream) => {
                debug!(%endpoint, attempts, "connected to host");
                return Link::from_stream(stream, config);
            }
            Err(err) if is_retryable(&err) && Instant::now() < deadline => {
                thread::sleep(RETRY_INTERVAL);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_retryable(err: &TransportError) -> bool {
    match err {
        TransportError::Connect { source, .. } => matches!(
            source.kind(),
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
        ),
        _ => false,
    }
}
