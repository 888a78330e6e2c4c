//! Binary IPC bridge between a data-owning host and an image window.
//!
//! One persistent stream carries typed envelopes in both directions. The
//! host publishes symbols and pixel buffers; the window reports what it
//! shows and asks for buffers.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP and Unix domain socket streams, endpoints, readiness
//! - [`wire`]: field codec: [`wire::Composer`] and [`wire::Decoder`]
//! - [`schema`]: message types, buffer metadata, envelope layout
//! - [`peer`]: inbound queues, dispatch and fetch, host and window endpoints
//!   (behind `peer` feature)

/// Re-export transport types.
pub mod transport {
    pub use imgbridge_transport::*;
}

/// Re-export wire codec types.
pub mod wire {
    pub use imgbridge_wire::*;
}

/// Re-export schema types.
pub mod schema {
    pub use imgbridge_schema::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use imgbridge_peer::*;
}

#[cfg(test)]
mod tests {
    use crate::schema::{Message, MessageType};
    use crate::wire::{Composer, Decoder};

    #[test]
    fn facade_round_trips_an_envelope() {
        let message = Message::PlotBufferRequest {
            name: "frame0".to_string(),
        };
        let mut composer = Composer::new();
        message.compose(&mut composer);

        let mut out = Vec::new();
        composer.send(&mut out).expect("compose should write");

        let mut decoder = Decoder::new(std::io::Cursor::new(out));
        let decoded = Message::decode(&mut decoder).expect("decode should succeed");
        assert_eq!(decoded.message_type(), MessageType::PlotBufferRequest);
        assert_eq!(decoded, message);
    }
}
