//! Envelope schema shared by both ends of an imgbridge connection.
//!
//! Defines the discriminant set, the per-type queueing policy, buffer
//! metadata and how each message maps onto wire fields.

pub mod buffer;
pub mod error;
pub mod message;
pub mod message_type;

pub use buffer::{BufferDescriptor, BufferType, PlotBuffer};
pub use error::{Result, SchemaError};
pub use message::{compose_plot_buffer, decode_payload, read_discriminant, Message};
pub use message_type::{
    MessageType, QueuePolicy, DISCRIMINANT_SIZE, LATEST_STATE_CAPACITY, REPEATABLE_CAPACITY,
};
