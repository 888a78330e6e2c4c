use std::time::Duration;

use imgbridge_transport::{Endpoint, IpcListener};
use tracing::{debug, info};

use crate::error::Result;
use crate::link::{Link, LinkConfig};

/// Listens for the single window connection.
pub struct WindowListener {
    listener: IpcListener,
    link_config: LinkConfig,
}

impl WindowListener {
    /// Bind to `endpoint`. A TCP port of 0 picks a free port.
    pub fn bind(endpoint: &Endpoint) -> Result<Self> {
        Self::bind_with_config(endpoint, LinkConfig::default())
    }

    /// Bind with explicit link configuration for the accepted connection.
    pub fn bind_with_config(endpoint: &Endpoint, link_config: LinkConfig) -> Result<Self> {
        let listener = IpcListener::bind(endpoint)?;
        info!(endpoint = %listener.local_endpoint(), "waiting for window connection");
        Ok(Self {
            listener,
            link_config,
        })
    }

    /// The endpoint the window should connect to.
    pub fn endpoint(&self) -> Endpoint {
        self.listener.local_endpoint()
    }

    /// Accept the window, giving up after `timeout`.
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<Link>> {
        match self.listener.accept_timeout(timeout)? {
            Some(stream) => Link::from_stream(stream, self.link_config.clone()).map(Some),
            None => {
                debug!(?timeout, "no window connected before timeout");
                Ok(None)
            }
        }
    }

    /// Accept the window, blocking without limit.
    pub fn accept(&self) -> Result<Link> {
        let stream = self.listener.accept()?;
        Link::from_stream(stream, self.link_config.clone())
    }
}

impl std::fmt::Debug for WindowListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowListener")
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::thread;

    use imgbridge_schema::{Message, MessageType};

    use super::*;
    use crate::connector::connect;

    fn make_sock_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "imgb-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("bridge.sock")
    }

    #[test]
    fn accepts_over_tcp_with_ephemeral_port() {
        let listener = WindowListener::bind(&Endpoint::loopback(0)).expect("listener should bind");
        let endpoint = listener.endpoint();
        assert_ne!(endpoint.port(), Some(0));

        let client = thread::spawn(move || {
            let mut link = connect(&endpoint).expect("client should connect");
            link.send(&Message::RequestObservedSymbols)
                .expect("client should send");
            link
        });

        let mut link = listener
            .accept_timeout(Duration::from_secs(5))
            .expect("accept should succeed")
            .expect("window should connect");
        let received = link
            .fetch_within(MessageType::RequestObservedSymbols, Duration::from_secs(2))
            .expect("fetch should succeed");
        assert_eq!(received, Some(Message::RequestObservedSymbols));
        client.join().expect("client thread should finish");
    }

    #[test]
    fn accepts_over_unix_socket() {
        let sock_path = make_sock_path("accept");
        let listener = WindowListener::bind(&Endpoint::Unix(sock_path.clone()))
            .expect("listener should bind");

        let endpoint = listener.endpoint();
        let client = thread::spawn(move || connect(&endpoint).expect("client should connect"));

        let link = listener.accept().expect("listener should accept");
        assert!(link.queues().is_empty());
        client.join().expect("client thread should finish");

        drop(listener);
        if let Some(parent) = sock_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn accept_timeout_without_window() {
        let listener = WindowListener::bind(&Endpoint::loopback(0)).expect("listener should bind");
        let accepted = listener
            .accept_timeout(Duration::from_millis(20))
            .expect("accept should not fail");
        assert!(accepted.is_none());
    }
}
