//! Newline-delimited JSON framing
//!
//! One payload per line. Writers append `\n`; readers accept `\n` or
//! `\r\n` and skip blank lines.

use crate::TransportError;
use conduit_protocol::Payload;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Serialize a payload as one `\n`-terminated line.
///
/// Fails with [`TransportError::FrameTooLarge`] when the serialized JSON is
/// longer than `limit` bytes.
pub fn encode_frame(payload: &Payload, limit: usize) -> Result<String, TransportError> {
    let mut line = serde_json::to_string(payload)?;
    if line.len() > limit {
        return Err(TransportError::FrameTooLarge {
            len: line.len(),
            limit,
        });
    }
    line.push('\n');
    Ok(line)
}

pub fn decode_frame(line: &str) -> Result<Value, TransportError> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    Ok(serde_json::from_str(line)?)
}

/// What [`FrameReader::next_frame`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, terminator removed.
    Line(String),
    /// A line longer than the limit. Its bytes were discarded.
    Oversized(usize),
}

impl Frame {
    pub fn is_blank(&self) -> bool {
        matches!(self, Frame::Line(line) if line.trim().is_empty())
    }
}

/// Reads lines without ever buffering more than `limit` bytes of one line.
///
/// [`next_frame`](Self::next_frame) is cancel safe: a partially read line
/// is kept and completed by the next call.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    limit: usize,
    buf: Vec<u8>,
    seen: usize,
    oversized: bool,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, limit: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            limit,
            buf: Vec::new(),
            seen: 0,
            oversized: false,
        }
    }

    /// Next line, or `None` at end of stream. A final line without a
    /// terminator still counts.
    pub async fn next_frame(&mut self) -> std::io::Result<Option<Frame>> {
        loop {
            let (used, done) = {
                let available = self.reader.fill_buf().await?;
                if available.is_empty() {
                    if self.seen == 0 {
                        return Ok(None);
                    }
                    (0, true)
                } else {
                    let (chunk, found) = match available.iter().position(|b| *b == b'\n') {
                        Some(end) => (&available[..end], true),
                        None => (available, false),
                    };

                    self.seen += chunk.len();
                    if !self.oversized {
                        if self.seen > self.limit {
                            self.oversized = true;
                            self.buf.clear();
                        } else {
                            self.buf.extend_from_slice(chunk);
                        }
                    }
                    (chunk.len() + usize::from(found), found)
                }
            };

            self.reader.consume(used);
            if done {
                return Ok(Some(self.take_frame()));
            }
        }
    }

    fn take_frame(&mut self) -> Frame {
        let seen = std::mem::take(&mut self.seen);
        if std::mem::take(&mut self.oversized) {
            return Frame::Oversized(seen);
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Frame::Line(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_protocol::{Message, RequestId};
    use serde_json::json;

    #[test]
    fn test_encode_frame_is_one_line() {
        let payload = Payload::from(Message::success(RequestId::from(1u64), json!("a\nb")));
        let line = encode_frame(&payload, 1024).unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_encode_frame_enforces_limit() {
        let payload = Payload::from(Message::success(RequestId::from(1u64), json!("x".repeat(64))));
        let err = encode_frame(&payload, 16).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { limit: 16, .. }));
    }

    #[test]
    fn test_decode_frame_trims_terminator() {
        assert_eq!(decode_frame("[1,2]\r\n").unwrap(), json!([1, 2]));
        assert!(matches!(decode_frame("{oops"), Err(TransportError::Codec(_))));
    }

    #[tokio::test]
    async fn test_reader_splits_lines() {
        let input: &[u8] = b"{\"a\":1}\r\n\n[2]\n3";
        let mut reader = FrameReader::new(input, 64);

        assert_eq!(
            reader.next_frame().await.unwrap(),
            Some(Frame::Line("{\"a\":1}".into()))
        );
        let blank = reader.next_frame().await.unwrap().unwrap();
        assert!(blank.is_blank());
        assert_eq!(reader.next_frame().await.unwrap(), Some(Frame::Line("[2]".into())));
        assert_eq!(reader.next_frame().await.unwrap(), Some(Frame::Line("3".into())));
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reader_discards_oversized_line_and_continues() {
        let mut input = vec![b'x'; 100];
        input.extend_from_slice(b"\n\"ok\"\n");
        let mut reader = FrameReader::new(input.as_slice(), 10);

        assert_eq!(reader.next_frame().await.unwrap(), Some(Frame::Oversized(100)));
        assert_eq!(
            reader.next_frame().await.unwrap(),
            Some(Frame::Line("\"ok\"".into()))
        );
    }
}
