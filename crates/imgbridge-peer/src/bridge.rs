//! Host side of the connection.
//!
//! The host owns the data. It listens for one window, tells it which
//! symbols exist, asks which ones it is showing and answers its plot
//! requests. Every call is driven from the host's own thread.

use std::process::Child;
use std::time::Duration;

use imgbridge_schema::{compose_plot_buffer, BufferDescriptor, Message, MessageType};
use imgbridge_transport::Endpoint;
use imgbridge_wire::Composer;
use tracing::{debug, error, info, trace, warn};

use crate::error::{PeerError, Result};
use crate::link::{Link, LinkConfig};
use crate::listener::WindowListener;

/// Port used by [`HostConfig::development`].
pub const DEVELOPMENT_PORT: u16 = 9588;

/// Default wait for the window to connect.
pub const DEFAULT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Development wait for the window to connect, long enough to start it by hand.
pub const DEVELOPMENT_ACCEPT_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Host listener configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Where to listen. A TCP port of 0 picks a free port.
    pub endpoint: Endpoint,
    /// How long [`Bridge::wait_for_window`] waits.
    pub accept_timeout: Duration,
    /// Configuration for the accepted connection.
    pub link: LinkConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::loopback(0),
            accept_timeout: DEFAULT_ACCEPT_TIMEOUT,
            link: LinkConfig::default(),
        }
    }
}

impl HostConfig {
    /// Fixed port and a long accept window, for running the window by hand.
    pub fn development() -> Self {
        Self {
            endpoint: Endpoint::loopback(DEVELOPMENT_PORT),
            accept_timeout: DEVELOPMENT_ACCEPT_TIMEOUT,
            link: LinkConfig::default(),
        }
    }
}

/// The host endpoint.
///
/// Lifecycle: listening after [`bind`](Self::bind), connected once
/// [`wait_for_window`](Self::wait_for_window) succeeds, closed after a
/// disconnect. While no window is connected, sends and fetches do nothing.
pub struct Bridge {
    config: HostConfig,
    endpoint: Endpoint,
    listener: Option<WindowListener>,
    link: Option<Link>,
    window_process: Option<Child>,
}

impl Bridge {
    /// Start listening.
    pub fn bind(config: HostConfig) -> Result<Self> {
        let listener = WindowListener::bind_with_config(&config.endpoint, config.link.clone())?;
        let endpoint = listener.endpoint();
        Ok(Self {
            config,
            endpoint,
            listener: Some(listener),
            link: None,
            window_process: None,
        })
    }

    /// The endpoint the window must connect to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Tie a spawned window process to this bridge.
    ///
    /// The process is killed when the bridge is dropped, and
    /// [`is_window_ready`](Self::is_window_ready) reports false once it exits.
    pub fn attach_process(&mut self, child: Child) {
        info!(pid = child.id(), "window process started");
        self.window_process = Some(child);
    }

    /// Wait up to the accept timeout for the window to connect.
    ///
    /// Returns `Ok(false)` on timeout; the bridge keeps listening and the
    /// call may be repeated. Once connected the listener is closed.
    pub fn wait_for_window(&mut self) -> Result<bool> {
        if self.link.is_some() {
            return Ok(true);
        }
        let Some(listener) = self.listener.as_ref() else {
            return Ok(false);
        };

        match listener.accept_timeout(self.config.accept_timeout)? {
            Some(link) => {
                info!(endpoint = %self.endpoint, "window connected");
                self.link = Some(link);
                self.listener = None;
                Ok(true)
            }
            None => {
                error!(timeout = ?self.config.accept_timeout, "no window connected");
                Ok(false)
            }
        }
    }

    /// True while a window is connected and, if attached, its process runs.
    pub fn is_window_ready(&mut self) -> bool {
        if self.link.is_none() {
            return false;
        }
        match self.window_process.as_mut().map(Child::try_wait) {
            None | Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!(%status, "window process has exited");
                false
            }
            Some(Err(err)) => {
                warn!(error = %err, "could not query window process");
                false
            }
        }
    }

    /// Ask the window which symbols it is showing, selected one first.
    ///
    /// Returns an empty list when no window is connected or no answer
    /// arrives within the fetch timeout.
    pub fn observed_symbols(&mut self) -> Result<Vec<String>> {
        let Some(link) = self.link.as_mut() else {
            debug!("no window connected; no observed symbols");
            return Ok(Vec::new());
        };

        let sent = link.send(&Message::RequestObservedSymbols);
        self.check(sent)?;
        info!("sent request to provide observed symbols");

        let Some(link) = self.link.as_mut() else {
            return Ok(Vec::new());
        };
        let fetched = link.fetch(MessageType::ObservedSymbolsResponse);
        match self.check(fetched)? {
            Some(Message::ObservedSymbolsResponse { names }) => {
                info!(symbols = %names.join(", "), "received observed symbols");
                Ok(names)
            }
            _ => {
                debug!("window did not report observed symbols in time");
                Ok(Vec::new())
            }
        }
    }

    /// Publish the symbols that can currently be plotted.
    pub fn set_available_symbols<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };

        let mut composer = Composer::new();
        composer
            .push(MessageType::SetAvailableSymbols.as_raw())
            .push_text_seq(names);
        let sent = link.send_composed(&composer);
        self.check(sent)?;

        let joined = names.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");
        info!(symbols = %joined, "sent available symbols");
        Ok(())
    }

    /// Send one buffer's metadata and pixels.
    ///
    /// `pixels` must hold at least [`BufferDescriptor::expected_len`] bytes.
    /// It is written straight from the caller's memory.
    pub fn plot_buffer(&mut self, descriptor: &BufferDescriptor, pixels: &[u8]) -> Result<()> {
        let expected = descriptor.expected_len();
        if pixels.len() < expected {
            return Err(PeerError::ShortBuffer {
                name: descriptor.name.clone(),
                expected,
                actual: pixels.len(),
            });
        }

        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };

        let mut composer = Composer::new();
        compose_plot_buffer(&mut composer, descriptor, pixels);
        let sent = link.send_composed(&composer);
        self.check(sent)?;

        info!(
            name = %descriptor.display_name,
            kind = %descriptor.type_label(),
            bytes = pixels.len(),
            "sent symbol data"
        );
        Ok(())
    }

    /// Read pending envelopes and hand every queued plot request to `on_request`.
    ///
    /// Waits up to the poll timeout for input. Returns the number of
    /// requests handled.
    pub fn run_event_loop<F>(&mut self, mut on_request: F) -> Result<usize>
    where
        F: FnMut(&str),
    {
        let Some(link) = self.link.as_mut() else {
            return Ok(0);
        };
        let polled = link.poll();
        self.check(polled)?;

        let Some(link) = self.link.as_mut() else {
            return Ok(0);
        };
        for ty in [
            MessageType::RequestObservedSymbols,
            MessageType::SetAvailableSymbols,
            MessageType::PlotBufferContents,
        ] {
            link.discard(ty);
        }

        let mut handled = 0;
        while let Some(message) = link.try_pop(MessageType::PlotBufferRequest) {
            if let Message::PlotBufferRequest { name } = message {
                info!(%name, "received request to provide symbol data");
                on_request(&name);
                handled += 1;
            }
        }
        Ok(handled)
    }

    /// Forward a log line produced outside this crate.
    ///
    /// Levels are `trace`, `debug`, `info`, `warning`, `error` and
    /// `critical`; anything else logs at info. Needs no connection, so
    /// embedders can log before the bridge is bound.
    pub fn log_message(level: &str, text: &str) {
        match level {
            "trace" => trace!(target: "imgbridge::external", "{text}"),
            "debug" => debug!(target: "imgbridge::external", "{text}"),
            "warning" => warn!(target: "imgbridge::external", "{text}"),
            "error" => error!(target: "imgbridge::external", "{text}"),
            "critical" => error!(target: "imgbridge::external", critical = true, "{text}"),
            _ => info!(target: "imgbridge::external", "{text}"),
        }
    }

    /// The live connection, if a window is connected.
    pub fn link_mut(&mut self) -> Result<&mut Link> {
        self.link.as_mut().ok_or(PeerError::NotConnected)
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Close the connection after a disconnect so later calls become no-ops.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_disconnect() {
                warn!(error = %err, "window disconnected");
                self.link = None;
            }
        }
        result
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(mut child) = self.window_process.take() {
            if let Err(err) = child.kill() {
                debug!(error = %err, "window process already gone");
            }
            let _ = child.wait();
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.link.is_some())
            .field("window_pid", &self.window_process.as_ref().map(Child::id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Instant;

    use imgbridge_schema::{BufferType, PlotBuffer};

    use super::*;
    use crate::window::{Window, WindowConfig, WindowHandler};

    fn quick_host() -> HostConfig {
        HostConfig {
            accept_timeout: Duration::from_secs(5),
            link: LinkConfig {
                poll_timeout: Duration::from_millis(20),
                ..LinkConfig::default()
            },
            ..HostConfig::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        observed: Vec<String>,
        observed_requests: usize,
        available: Vec<Vec<String>>,
        buffers: Vec<PlotBuffer>,
    }

    impl WindowHandler for Recorder {
        fn observed_symbols(&mut self) -> Vec<String> {
            self.observed_requests += 1;
            self.observed.clone()
        }

        fn available_symbols(&mut self, names: Vec<String>) {
            self.available.push(names);
        }

        fn plot_buffer(&mut self, buffer: PlotBuffer) {
            self.buffers.push(buffer);
        }
    }

    #[test]
    fn development_config_uses_fixed_port() {
        let config = HostConfig::development();
        assert_eq!(config.endpoint.port(), Some(DEVELOPMENT_PORT));
        assert_eq!(config.accept_timeout, Duration::from_secs(600));
        assert_eq!(HostConfig::default().accept_timeout, Duration::from_secs(10));
    }

    #[test]
    fn without_window_everything_is_a_no_op() {
        let mut bridge = Bridge::bind(HostConfig {
            accept_timeout: Duration::from_millis(20),
            ..HostConfig::default()
        })
        .expect("bridge should bind");

        assert!(!bridge.wait_for_window().expect("wait should not fail"));
        assert!(!bridge.is_window_ready());
        assert!(bridge.observed_symbols().expect("no-op").is_empty());
        bridge.set_available_symbols(&["a"]).expect("no-op");
        assert_eq!(bridge.run_event_loop(|_| panic!("no requests")).expect("no-op"), 0);
        assert!(matches!(bridge.link_mut(), Err(PeerError::NotConnected)));
    }

    #[test]
    fn short_buffer_is_rejected_before_sending() {
        let mut bridge = Bridge::bind(quick_host()).expect("bridge should bind");
        let descriptor = BufferDescriptor::packed("img", 4, 4, 1, BufferType::Float32);
        let err = bridge.plot_buffer(&descriptor, &[0u8; 8]).unwrap_err();
        assert!(matches!(
            err,
            PeerError::ShortBuffer {
                expected: 64,
                actual: 8,
                ..
            }
        ));
    }

    #[test]
    fn full_conversation_with_window() {
        let mut bridge = Bridge::bind(quick_host()).expect("bridge should bind");
        let endpoint = bridge.endpoint().clone();

        let window = thread::spawn(move || {
            let mut window = Window::connect(WindowConfig {
                endpoint,
                connect_timeout: Duration::from_secs(5),
                link: LinkConfig {
                    poll_timeout: Duration::from_millis(20),
                    ..LinkConfig::default()
                },
            })
            .expect("window should connect");

            let mut recorder = Recorder {
                observed: vec!["img".to_string(), "other".to_string()],
                ..Recorder::default()
            };
            let mut requested = false;
            let deadline = Instant::now() + Duration::from_secs(10);
            while recorder.buffers.is_empty() && Instant::now() < deadline {
                window.poll(&mut recorder).expect("poll should succeed");
                if !requested && recorder.observed_requests > 0 {
                    window.request_plot_buffer("img").expect("request should send");
                    requested = true;
                }
            }
            recorder
        });

        assert!(bridge.wait_for_window().expect("wait should succeed"));
        assert!(bridge.is_window_ready());

        bridge.set_available_symbols(&["img", "other"]).expect("send should succeed");
        assert_eq!(
            bridge.observed_symbols().expect("fetch should succeed"),
            vec!["img", "other"]
        );

        let descriptor = BufferDescriptor::packed("img", 2, 2, 3, BufferType::UnsignedByte);
        let pixels: Vec<u8> = (0..12).collect();
        let mut requests = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(10);
        while requests.is_empty() && Instant::now() < deadline {
            bridge
                .run_event_loop(|name| requests.push(name.to_string()))
                .expect("event loop should succeed");
        }
        assert_eq!(requests, vec!["img"]);
        bridge.plot_buffer(&descriptor, &pixels).expect("plot should send");

        let recorder = window.join().expect("window thread should finish");
        assert_eq!(recorder.available, vec![vec!["img", "other"]]);
        assert_eq!(recorder.buffers.len(), 1);
        assert_eq!(recorder.buffers[0].descriptor, descriptor);
        assert_eq!(recorder.buffers[0].pixels.as_ref(), pixels.as_slice());
    }

    #[test]
    fn disconnect_closes_the_bridge() {
        let mut bridge = Bridge::bind(quick_host()).expect("bridge should bind");
        let endpoint = bridge.endpoint().clone();
        let client = thread::spawn(move || {
            crate::connector::connect(&endpoint).expect("client should connect")
        });

        assert!(bridge.wait_for_window().expect("wait should succeed"));
        drop(client.join().expect("client thread should finish"));

        let err = bridge.run_event_loop(|_| {}).unwrap_err();
        assert!(err.is_disconnect());
        assert!(!bridge.is_window_ready());
        assert_eq!(bridge.run_event_loop(|_| {}).expect("no-op"), 0);
    }

    #[test]
    fn exited_window_process_is_not_ready() {
        let mut bridge = Bridge::bind(quick_host()).expect("bridge should bind");
        let endpoint = bridge.endpoint().clone();
        let client = thread::spawn(move || {
            crate::connector::connect(&endpoint).expect("client should connect")
        });
        assert!(bridge.wait_for_window().expect("wait should succeed"));
        let _window = client.join().expect("client thread should finish");

        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("true should spawn");
        let _ = child.wait();
        bridge.attach_process(child);
        assert!(!bridge.is_window_ready());
    }

    #[test]
    fn log_message_accepts_any_level() {
        for level in ["trace", "debug", "info", "warning", "error", "critical", "bogus"] {
            Bridge::log_message(level, "hello");
        }
    }
}
