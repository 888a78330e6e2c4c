/// Errors that can occur in host or window operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] imgbridge_transport::TransportError),

    /// A field could not be written or read.
    #[error("wire error: {0}")]
    Wire(#[from] imgbridge_wire::WireError),

    /// An envelope did not match the schema.
    #[error("schema error: {0}")]
    Schema(#[from] imgbridge_schema::SchemaError),

    /// The other process closed the connection.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// No window has connected yet.
    #[error("no peer connected")]
    NotConnected,

    /// Pixel data is shorter than its descriptor claims.
    #[error("buffer {name} holds {actual} bytes, descriptor needs {expected}")]
    ShortBuffer {
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl PeerError {
    /// True when the connection is gone and further calls will fail too.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, PeerError::Disconnected(_))
    }
}

impl From<std::io::Error> for PeerError {
    fn from(err: std::io::Error) -> Self {
        PeerError::Wire(imgbridge_wire::WireError::Io(err))
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
