//! Application messages and their envelope layout.
//!
//! An envelope is the `i32` discriminant followed by the payload fields of
//! that message type, in declaration order. Envelopes are written back to
//! back on the stream with nothing in between.

use std::io::Read;

use imgbridge_wire::{Composer, Decoder};

use crate::buffer::{BufferDescriptor, BufferType, PlotBuffer};
use crate::error::{Result, SchemaError};
use crate::message_type::MessageType;

/// A decoded envelope.
///
/// Equality is field-wise; it is what the inbound queues use to drop
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    RequestObservedSymbols,
    ObservedSymbolsResponse { names: Vec<String> },
    SetAvailableSymbols { names: Vec<String> },
    PlotBufferContents(PlotBuffer),
    PlotBufferRequest { name: String },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::RequestObservedSymbols => MessageType::RequestObservedSymbols,
            Message::ObservedSymbolsResponse { .. } => MessageType::ObservedSymbolsResponse,
            Message::SetAvailableSymbols { .. } => MessageType::SetAvailableSymbols,
            Message::PlotBufferContents(_) => MessageType::PlotBufferContents,
            Message::PlotBufferRequest { .. } => MessageType::PlotBufferRequest,
        }
    }

    /// Append this message's full envelope to `composer`.
    ///
    /// Pixel data is referenced, not copied.
    pub fn compose<'a>(&'a self, composer: &mut Composer<'a>) {
        match self {
            Message::PlotBufferContents(buffer) => {
                compose_plot_buffer(composer, &buffer.descriptor, &buffer.pixels[..]);
            }
            Message::RequestObservedSymbols => {
                composer.push(self.message_type().as_raw());
            }
            Message::ObservedSymbolsResponse { names } | Message::SetAvailableSymbols { names } => {
                composer.push(self.message_type().as_raw()).push_text_seq(names.as_slice());
            }
            Message::PlotBufferRequest { name } => {
                composer.push(self.message_type().as_raw()).push_text(name);
            }
        }
    }

    /// Read one complete envelope.
    pub fn decode<R: Read>(decoder: &mut Decoder<R>) -> Result<Message> {
        let ty = read_discriminant(decoder)?;
        decode_payload(ty, decoder)
    }
}

/// Append a `PlotBufferContents` envelope without building a [`Message`].
///
/// `pixels` is borrowed until the composer is sent.
pub fn compose_plot_buffer<'a>(
    composer: &mut Composer<'a>,
    descriptor: &BufferDescriptor,
    pixels: &'a [u8],
) {
    composer
        .push(MessageType::PlotBufferContents.as_raw())
        .push_text(&descriptor.name)
        .push_text(&descriptor.display_name)
        .push_text(&descriptor.pixel_layout)
        .push(descriptor.transpose)
        .push(descriptor.width)
        .push(descriptor.height)
        .push(descriptor.channels)
        .push(descriptor.stride)
        .push(descriptor.buffer_type.as_raw())
        .push_buffer(pixels);
}

/// Read the envelope discriminant.
///
/// On [`SchemaError::UnknownDiscriminant`] nothing else has been consumed.
pub fn read_discriminant<R: Read>(decoder: &mut Decoder<R>) -> Result<MessageType> {
    let raw: i32 = decoder.read()?;
    MessageType::from_raw(raw).ok_or(SchemaError::UnknownDiscriminant(raw))
}

/// Read the payload for a discriminant that has already been consumed.
pub fn decode_payload<R: Read>(ty: MessageType, decoder: &mut Decoder<R>) -> Result<Message> {
    let message = match ty {
        MessageType::RequestObservedSymbols => Message::RequestObservedSymbols,
        MessageType::ObservedSymbolsResponse => Message::ObservedSymbolsResponse {
            names: decoder.read_text_seq()?,
        },
        MessageType::SetAvailableSymbols => Message::SetAvailableSymbols {
            names: decoder.read_text_seq()?,
        },
        MessageType::PlotBufferRequest => Message::PlotBufferRequest {
            name: decoder.read_text()?,
        },
        MessageType::PlotBufferContents => Message::PlotBufferContents(decode_plot_buffer(decoder)?),
    };
    Ok(message)
}

fn decode_plot_buffer<R: Read>(decoder: &mut Decoder<R>) -> Result<PlotBuffer> {
    let name = decoder.read_text()?;
    let display_name = decoder.read_text()?;
    let pixel_layout = decoder.read_text()?;
    let transpose: bool = decoder.read()?;
    let width: i32 = decoder.read()?;
    let height: i32 = decoder.read()?;
    let channels: i32 = decoder.read()?;
    let stride: i32 = decoder.read()?;
    let raw_type: i32 = decoder.read()?;
    let pixels = decoder.read_buffer()?;

    // Validated last so an unknown code never leaves pixels on the stream.
    let buffer_type = BufferType::try_from(raw_type)?;

    Ok(PlotBuffer {
        descriptor: BufferDescriptor {
            name,
            display_name,
            pixel_layout,
            transpose,
            width,
            height,
            channels,
            stride,
            buffer_type,
        },
        pixels,
    })
}
