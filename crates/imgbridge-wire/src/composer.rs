use std::io::{self, ErrorKind, Write};

use bytes::{Bytes, BytesMut};

use crate::error::{Result, WireError};
use crate::primitive::Primitive;

const INITIAL_SCRATCH_CAPACITY: usize = 256;

/// One contiguous run of envelope bytes.
enum Block<'a> {
    /// Bytes encoded by the composer itself.
    Owned(Bytes),
    /// Caller memory sent in place.
    Borrowed(&'a [u8]),
}

impl Block<'_> {
    fn as_slice(&self) -> &[u8] {
        match self {
            Block::Owned(bytes) => bytes.as_ref(),
            Block::Borrowed(slice) => slice,
        }
    }
}

/// Accumulates the field blocks of one outbound envelope.
///
/// Fields are sent in push order. Raw buffers are borrowed, not copied, so
/// the lifetime `'a` keeps the caller's memory alive until [`Composer::send`]
/// has returned.
///
/// ```
/// use imgbridge_wire::Composer;
///
/// let pixels = [0u8; 16];
/// let mut composer = Composer::new();
/// composer.push(3i32).push_text("frame0").push_buffer(&pixels);
///
/// let mut wire = Vec::new();
/// composer.send(&mut wire).unwrap();
/// assert_eq!(wire.len(), composer.encoded_len());
/// ```
pub struct Composer<'a> {
    scratch: BytesMut,
    blocks: Vec<Block<'a>>,
}

impl<'a> Composer<'a> {
    /// Create an empty composer.
    pub fn new() -> Self {
        Self {
            scratch: BytesMut::with_capacity(INITIAL_SCRATCH_CAPACITY),
            blocks: Vec::new(),
        }
    }

    /// Push one fixed-width value.
    pub fn push<P: Primitive>(&mut self, value: P) -> &mut Self {
        value.put(&mut self.scratch);
        let encoded = self.scratch.split().freeze();
        self.blocks.push(Block::Owned(encoded));
        self
    }

    /// Push a text field: native-width length, then the raw bytes.
    pub fn push_text(&mut self, value: &str) -> &mut Self {
        self.push(value.len());
        self.scratch.extend_from_slice(value.as_bytes());
        let encoded = self.scratch.split().freeze();
        self.blocks.push(Block::Owned(encoded));
        self
    }

    /// Push a raw byte buffer: native-width length, then the bytes in place.
    pub fn push_buffer(&mut self, buffer: &'a [u8]) -> &mut Self {
        self.push(buffer.len());
        self.blocks.push(Block::Borrowed(buffer));
        self
    }

    /// Push a sequence of text: element count, then each element as text.
    pub fn push_text_seq<S: AsRef<str>>(&mut self, items: &[S]) -> &mut Self {
        self.push(items.len());
        for item in items {
            self.push_text(item.as_ref());
        }
        self
    }

    /// Write every pending block to `dst`, then flush.
    ///
    /// Partial and interrupted writes are retried until each block is fully
    /// written. A would-block condition is returned as [`WireError::Io`]; use
    /// [`Composer::send_with`] to wait for room instead. Success means the
    /// bytes reached the local send buffer, not that the peer has read them.
    /// Pending blocks are kept; call [`Composer::clear`] to reuse the composer
    /// for another envelope.
    pub fn send<W: Write>(&self, dst: &mut W) -> Result<()> {
        self.send_with(dst, |_| Err(io::Error::from(ErrorKind::WouldBlock)))
    }

    /// Like [`Composer::send`], but calls `wait_writable` whenever `dst`
    /// reports would-block and retries once it returns.
    ///
    /// An error from `wait_writable` aborts the send.
    pub fn send_with<W, F>(&self, dst: &mut W, mut wait_writable: F) -> Result<()>
    where
        W: Write,
        F: FnMut(&mut W) -> io::Result<()>,
    {
        for block in &self.blocks {
            let bytes = block.as_slice();
            let mut offset = 0usize;
            while offset < bytes.len() {
                match dst.write(&bytes[offset..]) {
                    Ok(0) => return Err(WireError::ConnectionClosed),
                    Ok(n) => offset += n,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) if err.kind() == ErrorKind::WouldBlock => {
                        wait_writable(dst).map_err(WireError::Io)?
                    }
                    Err(err) => return Err(WireError::Io(err)),
                }
            }
        }

        loop {
            match dst.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    wait_writable(dst).map_err(WireError::Io)?
                }
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Discard all pending blocks.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.scratch.clear();
    }

    /// Total bytes the pending blocks will put on the wire.
    pub fn encoded_len(&self) -> usize {
        self.blocks.iter().map(|b| b.as_slice().len()).sum()
    }

    /// Number of pending blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// True when nothing has been pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for Composer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Composer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("blocks", &self.blocks.len())
            .field("encoded_len", &self.encoded_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::primitive::LEN_SIZE;

    fn sent(composer: &Composer<'_>) -> Vec<u8> {
        let mut wire = Vec::new();
        composer.send(&mut wire).unwrap();
        wire
    }

    #[test]
    fn text_is_length_prefixed_without_terminator() {
        let mut composer = Composer::new();
        composer.push_text("abc");

        let wire = sent(&composer);
        assert_eq!(wire.len(), LEN_SIZE + 3);
        assert_eq!(&wire[..LEN_SIZE], &3usize.to_ne_bytes());
        assert_eq!(&wire[LEN_SIZE..], b"abc");
    }

    #[test]
    fn buffer_is_borrowed_and_length_prefixed() {
        let pixels = vec![9u8; 32];
        let mut composer = Composer::new();
        composer.push_buffer(&pixels);

        assert_eq!(composer.block_count(), 2);
        let wire = sent(&composer);
        assert_eq!(&wire[..LEN_SIZE], &32usize.to_ne_bytes());
        assert_eq!(&wire[LEN_SIZE..], pixels.as_slice());
    }

    #[test]
    fn sequence_writes_count_then_elements() {
        let mut composer = Composer::new();
        composer.push_text_seq(&["a", "bc"]);

        let mut expected = Vec::new();
        expected.extend_from_slice(&2usize.to_ne_bytes());
        expected.extend_from_slice(&1usize.to_ne_bytes());
        expected.extend_from_slice(b"a");
        expected.extend_from_slice(&2usize.to_ne_bytes());
        expected.extend_from_slice(b"bc");
        assert_eq!(sent(&composer), expected);
    }

    #[test]
    fn empty_fields_still_carry_prefixes() {
        let mut composer = Composer::new();
        composer
            .push_text("")
            .push_buffer(&[])
            .push_text_seq::<&str>(&[]);

        assert_eq!(sent(&composer).len(), 3 * LEN_SIZE);
    }

    #[test]
    fn blocks_are_sent_in_push_order() {
        let mut composer = Composer::new();
        composer.push(1u8).push(2i32).push(true);

        let mut expected = vec![1u8];
        expected.extend_from_slice(&2i32.to_ne_bytes());
        expected.push(1);
        assert_eq!(sent(&composer), expected);
    }

    #[test]
    fn clear_discards_pending_blocks() {
        let mut composer = Composer::new();
        composer.push_text("stale");
        composer.clear();
        assert!(composer.is_empty());

        composer.push(5u8);
        assert_eq!(sent(&composer), vec![5]);
    }

    #[test]
    fn send_can_repeat() {
        let mut composer = Composer::new();
        composer.push(7u8);

        let mut wire = Cursor::new(Vec::new());
        composer.send(&mut wire).unwrap();
        composer.send(&mut wire).unwrap();
        assert_eq!(wire.into_inner(), vec![7, 7]);
    }

    #[test]
    fn partial_writes_are_completed() {
        let mut composer = Composer::new();
        composer.push_text("partial writes");

        let mut sink = OneByteWriter::default();
        composer.send(&mut sink).unwrap();
        assert_eq!(sink.data.len(), composer.encoded_len());
    }

    #[test]
    fn flush_runs_after_blocks() {
        let mut sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);

        let mut composer = Composer::new();
        composer.push(1u8);
        composer.send(&mut sink).unwrap();

        assert!(flag.load(Ordering::SeqCst));
        assert_eq!(sink.data, vec![1]);
    }

    #[test]
    fn interrupted_writes_are_retried() {
        let mut composer = Composer::new();
        composer.push_text("retry");

        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::Interrupted],
            flush_failures: vec![ErrorKind::Interrupted],
            data: Vec::new(),
        };
        composer.send(&mut sink).unwrap();
        assert_eq!(sink.data.len(), composer.encoded_len());
    }

    #[test]
    fn plain_send_surfaces_would_block() {
        let mut composer = Composer::new();
        composer.push(1u8);

        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::WouldBlock],
            flush_failures: Vec::new(),
            data: Vec::new(),
        };
        let err = composer.send(&mut sink).unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::WouldBlock));
        assert!(sink.data.is_empty());
    }

    #[test]
    fn send_with_waits_once_per_would_block() {
        let mut composer = Composer::new();
        composer.push_text("retry");

        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::WouldBlock, ErrorKind::Interrupted, ErrorKind::WouldBlock],
            flush_failures: vec![ErrorKind::WouldBlock],
            data: Vec::new(),
        };
        let mut waits = 0;
        composer
            .send_with(&mut sink, |_| {
                waits += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(waits, 3);
        assert_eq!(sink.data.len(), composer.encoded_len());
    }

    #[test]
    fn failed_wait_aborts_send() {
        let mut composer = Composer::new();
        composer.push(1u8);

        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::WouldBlock],
            flush_failures: Vec::new(),
            data: Vec::new(),
        };
        let err = composer
            .send_with(&mut sink, |_| Err(io::Error::from(ErrorKind::TimedOut)))
            .unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::TimedOut));
    }

    #[test]
    fn zero_write_means_connection_closed() {
        let mut composer = Composer::new();
        composer.push(1u8);
        let err = composer.send(&mut ZeroWriter).unwrap_err();
        assert!(matches!(err, WireError::ConnectionClosed));
    }

    #[test]
    fn hard_write_error_propagates() {
        let mut composer = Composer::new();
        composer.push(1u8);
        let mut sink = FlakyWriter {
            failures: vec![ErrorKind::BrokenPipe],
            flush_failures: Vec::new(),
            data: Vec::new(),
        };
        let err = composer.send(&mut sink).unwrap_err();
        assert!(matches!(err, WireError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[derive(Default)]
    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        flush_failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failures.is_empty() {
                return Err(std::io::Error::from(self.failures.remove(0)));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_failures.is_empty() {
                return Err(std::io::Error::from(self.flush_failures.remove(0)));
            }
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
