/// Errors that can occur while decoding an envelope against the schema.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A field could not be read.
    #[error(transparent)]
    Wire(#[from] imgbridge_wire::WireError),

    /// The envelope discriminant is not part of the schema.
    ///
    /// Nothing past the discriminant has been read.
    #[error("unknown message discriminant {0}")]
    UnknownDiscriminant(i32),

    /// A plot buffer carried an element type code outside the known set.
    ///
    /// The whole envelope has been consumed; the stream is still aligned.
    #[error("unknown buffer type code {0}")]
    UnknownBufferType(i32),
}

pub type Result<T> = std::result::Result<T, SchemaError>;
