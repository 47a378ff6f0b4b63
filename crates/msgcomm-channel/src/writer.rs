use std::io::{ErrorKind, Read, Write};

use bytes::{BufMut, BytesMut};

use crate::config::{ACK_BYTE, REJECT_BYTE};
use crate::error::{ChannelError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Writes zero-terminated messages to any `Write` stream.
///
/// Each message goes out as one buffer: payload followed by a single `0x00`.
#[derive(Debug)]
pub struct MessageWriter {
    buf: BytesMut,
}

impl Default for MessageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Encode and write one message (blocking).
    ///
    /// Returns the number of bytes put on the wire (payload + 1).
    pub fn send<W: Write>(&mut self, dst: &mut W, payload: &[u8]) -> std::io::Result<usize> {
        self.buf.clear();
        self.buf.reserve(payload.len() + 1);
        self.buf.put_slice(payload);
        self.buf.put_u8(0);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match dst.write(&self.buf[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        loop {
            match dst.flush() {
                Ok(()) => return Ok(offset),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// Write one message with a throwaway [`MessageWriter`].
pub fn write_message<W: Write>(dst: &mut W, payload: &[u8]) -> std::io::Result<usize> {
    MessageWriter::new().send(dst, payload)
}

/// Write the one-byte acknowledgement.
pub fn write_ack<W: Write>(dst: &mut W) -> std::io::Result<()> {
    write_reply(dst, ACK_BYTE)
}

/// Tell the sender its message was refused.
pub fn write_reject<W: Write>(dst: &mut W) -> std::io::Result<()> {
    write_reply(dst, REJECT_BYTE)
}

fn write_reply<W: Write>(dst: &mut W, byte: u8) -> std::io::Result<()> {
    loop {
        match dst.write(&[byte]) {
            Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero)),
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Read and check the one-byte acknowledgement.
pub fn read_ack<R: Read>(src: &mut R) -> Result<()> {
    let mut ack = [0u8; 1];
    loop {
        match src.read(&mut ack) {
            Ok(0) => return Err(ChannelError::AckFailed("peer closed".to_string())),
            Ok(_) if ack[0] == ACK_BYTE => return Ok(()),
            Ok(_) if ack[0] == REJECT_BYTE => return Err(ChannelError::Rejected),
            Ok(_) => {
                return Err(ChannelError::AckFailed(format!(
                    "unexpected byte 0x{:02x}",
                    ack[0]
                )))
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(ChannelError::AckFailed(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn appends_single_terminator() {
        let mut wire = Vec::new();
        let written = MessageWriter::new().send(&mut wire, b"hello").unwrap();
        assert_eq!(written, 6);
        assert_eq!(wire, b"hello\0");
    }

    #[test]
    fn empty_payload_is_just_terminator() {
        let mut wire = Vec::new();
        MessageWriter::new().send(&mut wire, b"").unwrap();
        assert_eq!(wire, b"\0");
    }

    #[test]
    fn standalone_helper_matches_writer() {
        let mut wire = Vec::new();
        assert_eq!(write_message(&mut wire, b"abc").unwrap(), 4);
        assert_eq!(wire, b"abc\0");
    }

    #[test]
    fn buffer_reused_between_messages() {
        let mut writer = MessageWriter::new();
        let mut wire = Vec::new();
        writer.send(&mut wire, b"one").unwrap();
        writer.send(&mut wire, b"two").unwrap();
        assert_eq!(wire, b"one\0two\0");
    }

    #[test]
    fn handles_interrupted_write_and_flush() {
        let mut sink = InterruptedWriteThenFlush {
            wrote_once: false,
            flush_interrupted: false,
            data: Vec::new(),
        };
        MessageWriter::new().send(&mut sink, b"retry").unwrap();
        assert_eq!(sink.data, b"retry\0");
    }

    #[test]
    fn partial_writes_are_completed() {
        let mut sink = OneByteWriter { data: Vec::new() };
        MessageWriter::new().send(&mut sink, b"slow").unwrap();
        assert_eq!(sink.data, b"slow\0");
    }

    #[test]
    fn write_zero_is_an_error() {
        let err = MessageWriter::new().send(&mut ZeroWriter, b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }

    #[test]
    fn ack_roundtrip_and_mismatch() {
        let mut wire = Vec::new();
        write_ack(&mut wire).unwrap();
        assert!(read_ack(&mut Cursor::new(wire)).is_ok());

        let err = read_ack(&mut Cursor::new(vec![b'x'])).unwrap_err();
        assert!(matches!(err, ChannelError::AckFailed(_)));

        let err = read_ack(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, ChannelError::AckFailed(_)));
    }

    #[test]
    fn reject_reply_is_distinct_from_ack() {
        let mut wire = Vec::new();
        write_reject(&mut wire).unwrap();
        assert_eq!(wire, [REJECT_BYTE]);

        let err = read_ack(&mut Cursor::new(wire)).unwrap_err();
        assert!(matches!(err, ChannelError::Rejected));
        assert_eq!(err.status(), crate::Status::AckRecvFail);
    }

    struct InterruptedWriteThenFlush {
        wrote_once: bool,
        flush_interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedWriteThenFlush {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.wrote_once {
                self.wrote_once = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if !self.flush_interrupted {
                self.flush_interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            Ok(())
        }
    }

    struct OneByteWriter {
        data: Vec<u8>,
    }

    impl Write for OneByteWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
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
