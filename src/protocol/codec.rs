//! Newline-delimited frame codec
//!
//! ```text
//! +------------------------+------+
//! |  N bytes (UTF-8 JSON)  | '\n' |
//! +------------------------+------+
//! ```

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Longest accepted frame, terminator excluded
pub const MAX_FRAME_LENGTH: usize = 64 * 1024;

const TERMINATOR: u8 = b'\n';

/// Codec splitting a byte stream into text frames
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Bytes of the buffer already searched for a terminator
    scanned: usize,
}

impl FrameCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(position) = src[self.scanned..]
                .iter()
                .position(|byte| *byte == TERMINATOR)
            else {
                if src.len() > MAX_FRAME_LENGTH {
                    return Err(CodecError::FrameTooLarge(src.len()));
                }
                self.scanned = src.len();
                return Ok(None);
            };

            let length = self.scanned + position;
            self.scanned = 0;
            if length > MAX_FRAME_LENGTH {
                return Err(CodecError::FrameTooLarge(length));
            }

            let frame = src.split_to(length + 1);
            let text = &frame[..length];
            if text.is_empty() {
                continue;
            }
            return Ok(Some(String::from_utf8_lossy(text).into_owned()));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let frame = self.decode(src)?;
        if frame.is_none() {
            // An unterminated tail is not a frame
            src.clear();
            self.scanned = 0;
        }
        Ok(frame)
    }
}

impl<T: AsRef<str>> Encoder<T> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.as_ref();
        if text.len() > MAX_FRAME_LENGTH {
            return Err(CodecError::FrameTooLarge(text.len()));
        }

        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(TERMINATOR);
        Ok(())
    }
}

/// Errors that can occur during codec operations
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_LENGTH})")]
    FrameTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_frame() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"{\"cmd\":\"ping\"}\n"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, r#"{"cmd":"ping"}"#);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_partial_input() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"{\"cmd\":"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"\"refresh\"}\n{\"cmd\"");
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, r#"{"cmd":"refresh"}"#);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"{\"cmd\"");
    }

    #[test]
    fn test_decode_multiple_frames_in_one_read() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"a\nb\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("a"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("b"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_empty_lines_are_skipped() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"\n\n{}\n"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"ab\xFFc\n"[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, "ab\u{FFFD}c");
    }

    #[test]
    fn test_oversized_frame_is_an_error() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&vec![b'x'; MAX_FRAME_LENGTH + 1]);

        let result = codec.decode(&mut buf);
        assert!(matches!(result, Err(CodecError::FrameTooLarge(_))));
    }

    #[test]
    fn test_unterminated_tail_is_dropped_at_eof() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::from(&b"done\npartial"[..]);

        assert_eq!(codec.decode_eof(&mut buf).unwrap().as_deref(), Some("done"));
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_appends_terminator() {
        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();

        codec.encode(r#"{"type":"pong","ts":1}"#, &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"type\":\"pong\",\"ts\":1}\n");
    }
}
