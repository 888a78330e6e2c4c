//! Window side of the connection.

use std::time::Duration;

use imgbridge_schema::{Message, MessageType, PlotBuffer};
use imgbridge_transport::Endpoint;
use tracing::info;

use crate::connector::connect_with_retry;
use crate::error::Result;
use crate::link::{Link, LinkConfig};

/// Default time the window keeps retrying while the host starts listening.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub endpoint: Endpoint,
    pub connect_timeout: Duration,
    pub link: LinkConfig,
}

impl WindowConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            link: LinkConfig::default(),
        }
    }
}

/// Presentation callbacks driven by [`Window::poll`].
pub trait WindowHandler {
    /// Symbols currently on display, the selected one first.
    fn observed_symbols(&mut self) -> Vec<String>;

    /// The host published a new set of plottable symbols.
    fn available_symbols(&mut self, names: Vec<String>);

    /// A buffer arrived.
    fn plot_buffer(&mut self, buffer: PlotBuffer);
}

/// The window endpoint.
#[derive(Debug)]
pub struct Window {
    link: Link,
}

impl Window {
    /// Connect to the host, retrying until `connect_timeout` elapses.
    pub fn connect(config: WindowConfig) -> Result<Self> {
        let link = connect_with_retry(&config.endpoint, config.connect_timeout, config.link)?;
        info!(endpoint = %config.endpoint, "connected to host");
        Ok(Self { link })
    }

    /// Wrap an already connected link.
    pub fn from_link(link: Link) -> Self {
        Self { link }
    }

    /// Read pending envelopes and route them to `handler`.
    ///
    /// Symbol updates are applied before observed-symbol requests are
    /// answered, so an answer always reflects the latest update. Returns the
    /// number of messages handled. A disconnect is returned as an error.
    pub fn poll<H: WindowHandler>(&mut self, handler: &mut H) -> Result<usize> {
        self.link.poll()?;
        self.link.discard(MessageType::ObservedSymbolsResponse);
        self.link.discard(MessageType::PlotBufferRequest);

        let mut handled = 0;
        while let Some(Message::SetAvailableSymbols { names }) =
            self.link.try_pop(MessageType::SetAvailableSymbols)
        {
            info!(symbols = %names.join(", "), "received available symbols");
            handler.available_symbols(names);
            handled += 1;
        }

        while let Some(Message::RequestObservedSymbols) =
            self.link.try_pop(MessageType::RequestObservedSymbols)
        {
            info!("received request to provide observed symbols");
            let names = handler.observed_symbols();
            let joined = names.join(", ");
            self.link.send(&Message::ObservedSymbolsResponse { names })?;
            info!(symbols = %joined, "sent observed symbols");
            handled += 1;
        }

        while let Some(Message::PlotBufferContents(buffer)) =
            self.link.try_pop(MessageType::PlotBufferContents)
        {
            info!(
                name = %buffer.descriptor.display_name,
                kind = %buffer.descriptor.type_label(),
                bytes = buffer.pixels.len(),
                "received symbol data"
            );
            handler.plot_buffer(buffer);
            handled += 1;
        }

        Ok(handled)
    }

    /// Ask the host to send the buffer called `name`.
    pub fn request_plot_buffer(&mut self, name: &str) -> Result<()> {
        self.link.send(&Message::PlotBufferRequest {
            name: name.to_string(),
        })?;
        info!(%name, "sent request to provide symbol data");
        Ok(())
    }

    pub fn link(&self) -> &Link {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut Link {
        &mut self.link
    }
}
