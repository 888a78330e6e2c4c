use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::warn;

use crate::error::{Result, WireError};
use crate::primitive::{Primitive, WireConfig};

/// Largest fixed-width value the decoder reads through its stack buffer.
const MAX_PRIMITIVE_SIZE: usize = 16;

/// Reads fields one at a time from any `Read` stream.
///
/// Every read blocks until the exact number of bytes for the field has
/// arrived, however many short reads that takes. There is no envelope
/// framing: the caller must read the fields its schema dictates, in order.
pub struct Decoder<R> {
    inner: R,
    config: WireConfig,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    /// Create a decoder with explicit configuration.
    pub fn with_config(inner: R, config: WireConfig) -> Self {
        Self { inner, config }
    }

    /// Read one fixed-width value.
    pub fn read<P: Primitive>(&mut self) -> Result<P> {
        let mut raw = [0u8; MAX_PRIMITIVE_SIZE];
        let raw = &mut raw[..P::SIZE];
        self.read_exact(raw)?;
        Ok(P::from_wire(raw))
    }

    /// Read a native-width length or count prefix, enforcing the limit.
    pub fn read_len(&mut self) -> Result<usize> {
        let len: usize = self.read()?;
        if len > self.config.max_field_len {
            return Err(WireError::FieldTooLarge {
                size: len,
                max: self.config.max_field_len,
            });
        }
        Ok(len)
    }

    /// Read a length-prefixed text field.
    ///
    /// Invalid UTF-8 is replaced rather than rejected: the bytes have already
    /// been consumed, and failing here would leave the remaining fields of
    /// the envelope unread.
    pub fn read_text(&mut self) -> Result<String> {
        let raw = self.read_raw()?;
        match String::from_utf8(raw) {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(len = err.as_bytes().len(), "text field is not valid utf-8");
                Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
            }
        }
    }

    /// Read a length-prefixed raw byte buffer.
    pub fn read_buffer(&mut self) -> Result<Bytes> {
        let len = self.read_len()?;
        let mut buf = BytesMut::zeroed(len);
        self.read_exact(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Read a count-prefixed sequence of text fields, in order.
    pub fn read_text_seq(&mut self) -> Result<Vec<String>> {
        let count = self.read_len()?;
        // Every element carries at least its own length prefix; do not trust
        // the count for preallocation beyond a modest bound.
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_text()?);
        }
        Ok(items)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the decoder and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current decoder configuration.
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    fn read_raw(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        let mut raw = vec![0u8; len];
        self.read_exact(&mut raw)?;
        Ok(raw)
    }

    fn read_exact(&mut self, dst: &mut [u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < dst.len() {
            match self.inner.read(&mut dst[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::composer::Composer;
    use crate::primitive::LEN_SIZE;

    fn wire<'a>(build: impl FnOnce(&mut Composer<'a>)) -> Vec<u8> {
        let mut composer = Composer::new();
        build(&mut composer);
        let mut out = Vec::new();
        composer.send(&mut out).unwrap();
        out
    }

    #[test]
    fn primitives_round_trip_at_the_edges() {
        let bytes = wire(|c| {
            c.push(i32::MIN)
                .push(i32::MAX)
                .push(0u8)
                .push(u8::MAX)
                .push(usize::MAX)
                .push(true)
                .push(false);
        });

        let mut decoder = Decoder::new(Cursor::new(bytes));
        assert_eq!(decoder.read::<i32>().unwrap(), i32::MIN);
        assert_eq!(decoder.read::<i32>().unwrap(), i32::MAX);
        assert_eq!(decoder.read::<u8>().unwrap(), 0);
        assert_eq!(decoder.read::<u8>().unwrap(), u8::MAX);
        assert_eq!(decoder.read::<usize>().unwrap(), usize::MAX);
        assert!(decoder.read::<bool>().unwrap());
        assert!(!decoder.read::<bool>().unwrap());
    }

    #[test]
    fn variable_fields_round_trip() {
        let pixels: Vec<u8> = (0..=255).collect();
        let bytes = wire(|c| {
            c.push_text("héllo")
                .push_buffer(&pixels)
                .push_text_seq(&["a", "b", "c"]);
        });

        let mut decoder = Decoder::new(Cursor::new(bytes));
        assert_eq!(decoder.read_text().unwrap(), "héllo");
        assert_eq!(decoder.read_buffer().unwrap().as_ref(), pixels.as_slice());
        assert_eq!(decoder.read_text_seq().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_fields_round_trip() {
        let bytes = wire(|c| {
            c.push_text("").push_buffer(&[]).push_text_seq::<String>(&[]);
        });

        let mut decoder = Decoder::new(Cursor::new(bytes));
        assert_eq!(decoder.read_text().unwrap(), "");
        assert!(decoder.read_buffer().unwrap().is_empty());
        assert!(decoder.read_text_seq().unwrap().is_empty());
    }

    #[test]
    fn sequence_may_contain_empty_text() {
        let bytes = wire(|c| {
            c.push_text_seq(&["", "x", ""]);
        });
        let mut decoder = Decoder::new(Cursor::new(bytes));
        assert_eq!(decoder.read_text_seq().unwrap(), vec!["", "x", ""]);
    }

    #[test]
    fn partial_reads_are_completed() {
        let bytes = wire(|c| {
            c.push(42i32).push_text("slow");
        });

        let mut decoder = Decoder::new(ByteByByteReader { bytes, pos: 0 });
        assert_eq!(decoder.read::<i32>().unwrap(), 42);
        assert_eq!(decoder.read_text().unwrap(), "slow");
    }

    #[test]
    fn interrupted_read_retries() {
        let bytes = wire(|c| {
            c.push(8i32);
        });
        let mut decoder = Decoder::new(InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(bytes),
        });
        assert_eq!(decoder.read::<i32>().unwrap(), 8);
    }

    #[test]
    fn closed_before_field_completes() {
        let mut bytes = wire(|c| {
            c.push_text("truncated");
        });
        bytes.truncate(LEN_SIZE + 3);

        let mut decoder = Decoder::new(Cursor::new(bytes));
        let err = decoder.read_text().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn closed_on_empty_stream() {
        let mut decoder = Decoder::new(Cursor::new(Vec::<u8>::new()));
        let err = decoder.read::<i32>().unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn oversized_length_is_refused() {
        let bytes = wire(|c| {
            c.push(1024usize);
        });
        let cfg = WireConfig { max_field_len: 16 };
        let mut decoder = Decoder::with_config(Cursor::new(bytes), cfg);
        let err = decoder.read_buffer().unwrap_err();
        assert!(matches!(err, WireError::FieldTooLarge { size: 1024, max: 16 }));
    }

    #[test]
    fn invalid_utf8_is_replaced_and_stream_stays_aligned() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&2usize.to_ne_bytes());
        bytes.extend_from_slice(&[0xFF, 0xFE]);
        bytes.extend_from_slice(&7i32.to_ne_bytes());

        let mut decoder = Decoder::new(Cursor::new(bytes));
        let text = decoder.read_text().unwrap();
        assert_eq!(text.chars().count(), 2);
        assert_eq!(decoder.read::<i32>().unwrap(), 7);
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut decoder = Decoder::new(WouldBlockReader);
        let err = decoder.read::<u8>().unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut decoder = Decoder::new(Cursor::new(Vec::<u8>::new()));
        let _ = decoder.get_ref();
        let _ = decoder.get_mut();
        assert_eq!(
            decoder.config().max_field_len,
            crate::primitive::DEFAULT_MAX_FIELD_LEN
        );
        let _inner = decoder.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn decodes_across_a_socket_pair() {
        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let writer = std::thread::spawn(move || {
            let big = vec![0xABu8; 256 * 1024];
            let mut composer = Composer::new();
            composer.push_text("big").push_buffer(&big);
            composer.send(&mut left).unwrap();
        });

        let mut decoder = Decoder::new(right);
        assert_eq!(decoder.read_text().unwrap(), "big");
        let buffer = decoder.read_buffer().unwrap();
        assert_eq!(buffer.len(), 256 * 1024);
        assert!(buffer.iter().all(|b| *b == 0xAB));

        writer.join().unwrap();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct WouldBlockReader;

    impl Read for WouldBlockReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
