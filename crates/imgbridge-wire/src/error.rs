/// Errors that can occur while composing or decoding fields.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A length or count prefix exceeds the configured maximum.
    #[error("field too large ({size} bytes, max {max})")]
    FieldTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing fields.
    #[error("wire I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete field was transferred.
    #[error("connection closed (incomplete field)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
