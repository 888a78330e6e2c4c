use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use imgbridge_schema::{Message, MessageType, SchemaError};
use imgbridge_transport::{IpcStream, Readiness};
use imgbridge_wire::{Composer, Decoder, WireConfig, WireError};
use tracing::{debug, warn};

use crate::error::{PeerError, Result};
use crate::queue::InboundQueues;

/// Default time a poll waits for the first byte of an envelope.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Default time a fetch waits for its response.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Behavior knobs for a [`Link`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Wait used by [`Link::poll`].
    pub poll_timeout: Duration,
    /// Wait used by [`Link::fetch`].
    pub fetch_timeout: Duration,
    /// Optional read timeout applied once an envelope has started.
    ///
    /// `None` blocks until the field completes or the peer hangs up. When
    /// set, a timeout mid-envelope leaves the stream unusable.
    pub field_timeout: Option<Duration>,
    /// Field codec limits.
    pub wire: WireConfig,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            field_timeout: None,
            wire: WireConfig::default(),
        }
    }
}

/// One end of the connection, with its inbound queues.
///
/// All reads happen inside [`dispatch`](Self::dispatch) on the caller's
/// thread. Requests and responses carry no correlation id: a fetch simply
/// takes the oldest queued message of the expected type.
pub struct Link<S = IpcStream> {
    decoder: Decoder<S>,
    queues: InboundQueues,
    config: LinkConfig,
}

#[cfg(unix)]
impl Link<IpcStream> {
    /// Wrap a connected transport stream, applying `field_timeout`.
    pub fn from_stream(stream: IpcStream, config: LinkConfig) -> Result<Self> {
        stream.set_read_timeout(config.field_timeout)?;
        debug!(transport = stream.transport_name(), "link established");
        Ok(Self::new(stream, config))
    }
}

impl<S> Link<S>
where
    S: Read + Write + Readiness,
{
    pub fn new(stream: S, config: LinkConfig) -> Self {
        Self {
            decoder: Decoder::with_config(stream, config.wire.clone()),
            queues: InboundQueues::new(),
            config,
        }
    }

    /// Compose and write one message.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let mut composer = Composer::new();
        message.compose(&mut composer);
        self.send_composed(&composer)
    }

    /// Write an already composed envelope.
    ///
    /// A full send buffer on a non-blocking stream parks the caller in
    /// `poll` until the peer drains it; a hang-up wakes it and surfaces as
    /// a disconnect on the next write.
    pub fn send_composed(&mut self, composer: &Composer<'_>) -> Result<()> {
        let interval = self.config.poll_timeout;
        composer
            .send_with(self.decoder.get_mut(), |stream| {
                while !stream.wait_writable(interval)? {}
                Ok(())
            })
            .map_err(disconnect_or_wire)
    }

    /// Read every envelope that is ready, waiting up to `wait` for the first.
    ///
    /// Returns the number of envelopes consumed, including dropped ones.
    /// `Ok(0)` means nothing arrived in time. Once an envelope has started,
    /// the call blocks until it is complete.
    pub fn dispatch(&mut self, wait: Duration) -> Result<usize> {
        let mut available = self.stream().bytes_available()?;
        if available == 0 {
            if !self.stream().wait_readable(wait)? {
                return Ok(0);
            }
            available = self.stream().bytes_available()?;
            if available == 0 {
                return Err(PeerError::Disconnected("connection closed by peer".into()));
            }
        }

        let mut consumed = 0;
        while available > 0 {
            self.receive_one()?;
            consumed += 1;
            available = self.stream().bytes_available()?;
        }
        Ok(consumed)
    }

    /// [`dispatch`](Self::dispatch) with the configured poll timeout.
    pub fn poll(&mut self) -> Result<usize> {
        self.dispatch(self.config.poll_timeout)
    }

    /// Take the oldest queued message of `ty` without touching the stream.
    pub fn try_pop(&mut self, ty: MessageType) -> Option<Message> {
        self.queues.pop(ty)
    }

    /// Take a message of `ty`, reading from the stream if none is queued.
    ///
    /// Waits at most the configured fetch timeout for data to arrive.
    pub fn fetch(&mut self, ty: MessageType) -> Result<Option<Message>> {
        self.fetch_within(ty, self.config.fetch_timeout)
    }

    /// Like [`fetch`](Self::fetch) with an explicit wait.
    ///
    /// Whatever arrives is queued; if none of it has type `ty` the result is
    /// `None` and the other messages stay queued.
    pub fn fetch_within(&mut self, ty: MessageType, wait: Duration) -> Result<Option<Message>> {
        if let Some(message) = self.queues.pop(ty) {
            return Ok(Some(message));
        }
        self.dispatch(wait)?;
        Ok(self.queues.pop(ty))
    }

    /// Drop queued messages this side does not handle.
    pub fn discard(&mut self, ty: MessageType) -> usize {
        let dropped = self.queues.discard(ty);
        if dropped > 0 {
            warn!(%ty, dropped, "discarding messages not handled on this side");
        }
        dropped
    }

    pub fn queues(&self) -> &InboundQueues {
        &self.queues
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &S {
        self.decoder.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.decoder.into_inner()
    }

    #[cfg(test)]
    pub(crate) fn queues_mut(&mut self) -> &mut InboundQueues {
        &mut self.queues
    }

    fn stream(&self) -> &S {
        self.decoder.get_ref()
    }

    fn receive_one(&mut self) -> Result<()> {
        match Message::decode(&mut self.decoder) {
            Ok(message) => {
                self.queues.insert(message);
                Ok(())
            }
            Err(SchemaError::UnknownDiscriminant(raw)) => {
                warn!(discriminant = raw, "dropping envelope with unknown type");
                Ok(())
            }
            Err(SchemaError::UnknownBufferType(code)) => {
                warn!(code, "dropping plot buffer with unknown element type");
                Ok(())
            }
            Err(SchemaError::Wire(err)) => Err(disconnect_or_wire(err)),
        }
    }
}

impl<S> std::fmt::Debug for Link<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link")
            .field("queued", &self.queues.total_len())
            .field("config", &self.config)
            .finish()
    }
}

fn disconnect_or_wire(err: WireError) -> PeerError {
    match err {
        WireError::ConnectionClosed => {
            PeerError::Disconnected("connection closed by peer".into())
        }
        WireError::Io(io)
            if matches!(
                io.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ) =>
        {
            PeerError::Disconnected(io.to_string())
        }
        other => PeerError::Wire(other),
    }
}
