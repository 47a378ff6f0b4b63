use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::{ChannelError, Result};

/// Reassembles zero-terminated messages from any `Read` stream.
///
/// Reads are issued in fixed-size chunks. A message ends at the first
/// `0x00` byte, or at a chunk that comes back shorter than the chunk size
/// without one (the terminator is then supplied locally). Bytes that
/// follow a terminator in the same chunk belong to the next message and
/// are kept for the next [`read_message`](Self::read_message) call, so
/// messages written back-to-back are never merged.
#[derive(Debug)]
pub struct MessageReader {
    chunk: Vec<u8>,
    pending: BytesMut,
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

/// Outcome of copying one segment of input into the caller's buffer.
enum Absorb {
    /// The terminator sits at `end`; everything after it is the next message.
    Complete { end: usize },
    /// No terminator yet.
    Partial,
    /// Copying would not fit; `end` is the terminator, if the segment had one.
    Overflow { needed: usize, end: Option<usize> },
}

impl MessageReader {
    /// Create a reader with an explicit chunk size (minimum 1).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk: vec![0u8; chunk_size.max(1)],
            pending: BytesMut::new(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk.len()
    }

    /// Bytes already read from the stream that belong to later messages.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// Forget buffered bytes, e.g. when the stream is replaced.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Read one message into `out` (blocking).
    ///
    /// Returns the number of bytes written. The written bytes always end
    /// in exactly one terminator; if the peer omitted it, one is supplied.
    /// A message that does not fit in `out` (terminator included) is
    /// rejected with [`ChannelError::Overflow`] and never truncated.
    pub fn read_message<R: Read>(&mut self, src: &mut R, out: &mut [u8]) -> Result<usize> {
        let max_len = out.len();
        let mut accumulated = 0usize;

        if !self.pending.is_empty() {
            let buffered = self.pending.split();
            match absorb(&buffered, out, &mut accumulated) {
                Absorb::Complete { end } => {
                    self.pending.extend_from_slice(&buffered[end + 1..]);
                    return Ok(accumulated);
                }
                Absorb::Partial => {}
                Absorb::Overflow { needed, end } => {
                    match end {
                        Some(end) => self.pending.extend_from_slice(&buffered[end + 1..]),
                        None => self.discard_remainder(src),
                    }
                    return Err(ChannelError::Overflow {
                        needed,
                        max: max_len,
                    });
                }
            }
        }

        loop {
            let read = match src.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Err(ChannelError::RecvTimeout),
                Err(err) => return Err(ChannelError::Io(err)),
            };

            if read == 0 {
                if accumulated == 0 {
                    return Err(ChannelError::Disconnected);
                }
                // Peer closed mid-message; take what we have.
                break;
            }

            let short = read < self.chunk.len();
            match absorb(&self.chunk[..read], out, &mut accumulated) {
                Absorb::Complete { end } => {
                    self.pending.extend_from_slice(&self.chunk[end + 1..read]);
                    return Ok(accumulated);
                }
                Absorb::Partial if short => break,
                Absorb::Partial => {}
                Absorb::Overflow { needed, end } => {
                    match end {
                        Some(end) => self.pending.extend_from_slice(&self.chunk[end + 1..read]),
                        None if !short => self.discard_remainder(src),
                        None => {}
                    }
                    return Err(ChannelError::Overflow {
                        needed,
                        max: max_len,
                    });
                }
            }
        }

        // Room for the terminator was reserved when the last segment was copied.
        out[accumulated] = 0;
        accumulated += 1;
        Ok(accumulated)
    }

    /// Drop the rest of a rejected message so the next read starts clean.
    fn discard_remainder<R: Read>(&mut self, src: &mut R) {
        let chunk_size = self.chunk.len();
        loop {
            match src.read(&mut self.chunk) {
                Ok(0) => return,
                Ok(n) => {
                    if let Some(end) = self.chunk[..n].iter().position(|&b| b == 0) {
                        self.pending.extend_from_slice(&self.chunk[end + 1..n]);
                        return;
                    }
                    if n < chunk_size {
                        return;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => return,
            }
        }
    }
}

/// Copy `segment` up to and including its first terminator.
///
/// Without a terminator, room for one is reserved in the size check.
fn absorb(segment: &[u8], out: &mut [u8], accumulated: &mut usize) -> Absorb {
    let end = segment.iter().position(|&b| b == 0);
    let take = end.map_or(segment.len(), |end| end + 1);
    let needed = *accumulated + take + usize::from(end.is_none());
    if needed > out.len() {
        return Absorb::Overflow { needed, end };
    }

    out[*accumulated..*accumulated + take].copy_from_slice(&segment[..take]);
    *accumulated += take;
    match end {
        Some(end) => Absorb::Complete { end },
        None => Absorb::Partial,
    }
}

/// Strip the wire terminator from bytes produced by [`MessageReader::read_message`].
pub fn message_payload(received: &[u8]) -> &[u8] {
    match received.split_last() {
        Some((0, payload)) => payload,
        _ => received,
    }
}

pub(crate) fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use proptest::prelude::*;

    use super::*;
    use crate::writer::MessageWriter;

    fn wire(payload: &[u8]) -> Vec<u8> {
        let mut wire = Vec::new();
        MessageWriter::new().send(&mut wire, payload).unwrap();
        wire
    }

    #[test]
    fn read_single_message() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 64];
        let n = reader
            .read_message(&mut Cursor::new(wire(b"hello")), &mut out)
            .unwrap();
        assert_eq!(n, 6);
        assert_eq!(message_payload(&out[..n]), b"hello");
    }

    #[test]
    fn exact_multiple_of_chunk_does_not_hang() {
        // "123" + terminator is exactly one 4-byte chunk; the reader must
        // stop on the terminator instead of waiting for a short read.
        let mut src = FailAfterData {
            data: Cursor::new(wire(b"123")),
        };
        let mut reader = MessageReader::new(4);
        let mut out = [0u8; 16];
        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"123");

        let mut src = FailAfterData {
            data: Cursor::new(wire(b"1234567")),
        };
        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"1234567");
    }

    #[test]
    fn spans_several_chunks() {
        let mut reader = MessageReader::new(4);
        let mut out = [0u8; 16];
        let n = reader
            .read_message(&mut Cursor::new(wire(b"1234")), &mut out)
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(message_payload(&out[..n]), b"1234");
    }

    #[test]
    fn overflow_is_rejected_not_truncated() {
        let payload = b"abcdefghijklmnop";
        let mut reader = MessageReader::default();
        let mut out = [0u8; 16];
        let err = reader
            .read_message(&mut Cursor::new(wire(payload)), &mut out)
            .unwrap_err();
        assert!(matches!(err, ChannelError::Overflow { needed: 17, max: 16 }));
    }

    #[test]
    fn payload_filling_buffer_exactly_fits() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 16];
        let n = reader
            .read_message(&mut Cursor::new(wire(b"abcdefghijklmno")), &mut out)
            .unwrap();
        assert_eq!(n, 16);
    }

    #[test]
    fn overflow_discards_rest_of_message() {
        // 11 bytes + terminator: three full chunks of 4.
        let mut stream = wire(b"aaaaaaaaaaa");
        stream.extend_from_slice(&wire(b"ok"));
        let mut src = Cursor::new(stream);
        let mut reader = MessageReader::new(4);
        let mut out = [0u8; 8];

        let err = reader.read_message(&mut src, &mut out).unwrap_err();
        assert!(matches!(err, ChannelError::Overflow { .. }));
        assert_eq!(src.position(), 12);

        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"ok");
    }

    #[test]
    fn missing_terminator_on_short_read_is_supplied() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 8];
        let n = reader
            .read_message(&mut Cursor::new(b"abc".to_vec()), &mut out)
            .unwrap();
        assert_eq!(&out[..n], b"abc\0");
    }

    #[test]
    fn missing_terminator_needs_room() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 3];
        let err = reader
            .read_message(&mut Cursor::new(b"abc".to_vec()), &mut out)
            .unwrap_err();
        assert!(matches!(err, ChannelError::Overflow { needed: 4, max: 3 }));
    }

    #[test]
    fn eof_before_any_byte_is_disconnect() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 8];
        let err = reader
            .read_message(&mut Cursor::new(Vec::new()), &mut out)
            .unwrap_err();
        assert!(matches!(err, ChannelError::Disconnected));
    }

    #[test]
    fn eof_after_full_chunk_ends_message() {
        let mut reader = MessageReader::new(4);
        let mut out = [0u8; 8];
        let n = reader
            .read_message(&mut Cursor::new(b"abcd".to_vec()), &mut out)
            .unwrap();
        assert_eq!(&out[..n], b"abcd\0");
    }

    #[test]
    fn timeout_maps_to_recv_timeout() {
        let mut reader = MessageReader::default();
        let mut out = [0u8; 8];
        let err = reader.read_message(&mut TimedOutReader, &mut out).unwrap_err();
        assert!(matches!(err, ChannelError::RecvTimeout));
        assert_eq!(err.status(), crate::Status::MessageRecvTimeout);
    }

    #[test]
    fn interrupted_read_retries() {
        let mut src = InterruptedThenData {
            interrupted: false,
            data: Cursor::new(wire(b"ok")),
        };
        let mut reader = MessageReader::default();
        let mut out = [0u8; 8];
        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"ok");
    }

    #[test]
    fn payload_helper_strips_one_terminator_only() {
        assert_eq!(message_payload(b"ab\0"), b"ab");
        assert_eq!(message_payload(b"ab"), b"ab");
        assert_eq!(message_payload(b""), b"");
    }

    #[test]
    fn back_to_back_messages_in_one_read_stay_separate() {
        let mut stream = Vec::new();
        for payload in [&b"m0"[..], b"m1", b"", b"m3"] {
            stream.extend_from_slice(&wire(payload));
        }
        let mut src = FailAfterData {
            data: Cursor::new(stream),
        };
        let mut reader = MessageReader::default();
        let mut out = [0u8; 16];

        for expected in [&b"m0"[..], b"m1", b"", b"m3"] {
            let n = reader.read_message(&mut src, &mut out).unwrap();
            assert_eq!(message_payload(&out[..n]), expected);
        }
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn message_split_across_reads_is_reassembled() {
        let mut src = Segments(vec![b"ab\0cd".to_vec(), b"e\0".to_vec()].into());
        let mut reader = MessageReader::default();
        let mut out = [0u8; 16];

        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"ab");
        assert_eq!(reader.buffered(), 2);

        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"cde");
    }

    #[test]
    fn overflow_keeps_the_message_behind_it() {
        let mut stream = wire(b"too long");
        stream.extend_from_slice(&wire(b"ok"));
        let mut src = Cursor::new(stream);
        let mut reader = MessageReader::default();
        let mut out = [0u8; 4];

        let err = reader.read_message(&mut src, &mut out).unwrap_err();
        assert!(matches!(err, ChannelError::Overflow { needed: 9, max: 4 }));

        let n = reader.read_message(&mut src, &mut out).unwrap();
        assert_eq!(message_payload(&out[..n]), b"ok");
    }

    #[test]
    fn clear_drops_buffered_bytes() {
        let mut stream = wire(b"one");
        stream.extend_from_slice(&wire(b"two"));
        let mut reader = MessageReader::default();
        let mut out = [0u8; 8];

        reader
            .read_message(&mut Cursor::new(stream), &mut out)
            .unwrap();
        assert_eq!(reader.buffered(), 4);
        reader.clear();
        assert_eq!(reader.buffered(), 0);
    }

    proptest! {
        #[test]
        fn concatenated_stream_splits_into_each_message(
            payloads in proptest::collection::vec(
                proptest::collection::vec(1u8..=255, 0..40),
                1..20,
            ),
            chunk_size in 1usize..64,
        ) {
            let mut stream = Vec::new();
            for payload in &payloads {
                stream.extend_from_slice(&wire(payload));
            }
            let mut src = Cursor::new(stream);
            let mut reader = MessageReader::new(chunk_size);
            let mut out = vec![0u8; 64];
            for payload in &payloads {
                let n = reader.read_message(&mut src, &mut out).unwrap();
                prop_assert_eq!(message_payload(&out[..n]), payload.as_slice());
            }
        }
    }

    proptest! {
        #[test]
        fn roundtrip_zero_free_payloads(
            payload in proptest::collection::vec(1u8..=255, 0..300),
            chunk_size in 1usize..64,
        ) {
            let max_len = payload.len() + 1;
            let mut out = vec![0u8; max_len];
            let mut reader = MessageReader::new(chunk_size);
            let n = reader
                .read_message(&mut Cursor::new(wire(&payload)), &mut out)
                .unwrap();
            prop_assert_eq!(message_payload(&out[..n]), payload.as_slice());
        }
    }

    /// Serves its data, then fails every further read so a reader that
    /// asks for more than the message would surface as an error.
    struct FailAfterData {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailAfterData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                return Err(std::io::Error::other("read past end of message"));
            }
            Ok(n)
        }
    }

    /// Returns one queued segment per read, as a socket would.
    struct Segments(std::collections::VecDeque<Vec<u8>>);

    impl Read for Segments {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let Some(segment) = self.0.pop_front() else {
                return Ok(0);
            };
            buf[..segment.len()].copy_from_slice(&segment);
            Ok(segment.len())
        }
    }

    struct TimedOutReader;

    impl Read for TimedOutReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        data: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.read(buf)
        }
    }
}
