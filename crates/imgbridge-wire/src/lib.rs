//! Field codec for imgbridge envelopes.
//!
//! Envelopes are sequences of fields with no framing of their own:
//! - fixed-width primitives in native byte order
//! - text and raw buffers as `[len: usize][bytes]`, no terminator
//! - text sequences as `[count: usize][count × text]`
//!
//! [`Composer`] builds one envelope and writes it out; [`Decoder`] reads
//! fields back, blocking until each one is complete.

pub mod composer;
pub mod decoder;
pub mod error;
pub mod primitive;

pub use composer::Composer;
pub use decoder::Decoder;
pub use error::{Result, WireError};
pub use primitive::{Primitive, WireConfig, DEFAULT_MAX_FIELD_LEN, LEN_SIZE};
