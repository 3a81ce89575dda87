//! Request frame reading.

use std::io::{self, Read};

use serde::de::IgnoredAny;

const CHUNK_SIZE: usize = 4096;

/// Reads one request frame from the stream.
///
/// A frame ends at end of stream, or as soon as the buffered bytes settle:
/// they form a complete JSON value, or no further input could make them one.
/// Newlines inside a request are ordinary JSON whitespace. Reading stops once
/// more than `limit` bytes are buffered so the size check can reject the frame
/// without the daemon holding more than one chunk beyond the limit.
///
/// Returns `Ok(None)` when the peer closes or goes quiet before sending
/// anything. A read deadline that expires after some bytes arrived yields the
/// partial frame.
pub(super) fn read_frame(reader: &mut impl Read, limit: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) if is_deadline(&error) => 0,
            Err(error) => return Err(error),
        };
        if read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        let received = chunk.get(..read).unwrap_or_default();
        let at_boundary = received.contains(&b'\n');
        buffer.extend_from_slice(received);

        if buffer.len() > limit {
            return Ok(Some(buffer));
        }
        let may_be_complete = at_boundary || buffer.trim_ascii_end().last() == Some(&b'}');
        if may_be_complete && is_settled(&buffer) {
            return Ok(Some(buffer));
        }
    }
}

fn is_deadline(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Whether more input can no longer change how the buffer parses.
///
/// Only checked at a closing brace or a line break, so a large request is not
/// re-parsed on every chunk.
fn is_settled(buffer: &[u8]) -> bool {
    match serde_json::from_slice::<IgnoredAny>(buffer) {
        Ok(_) => true,
        Err(error) => !error.is_eof(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields its chunks one read at a time, then reports a read deadline.
    struct Trickle {
        chunks: Vec<Vec<u8>>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.chunks.is_empty() {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            let chunk = self.chunks.remove(0);
            let len = chunk.len().min(buf.len());
            buf.get_mut(..len)
                .expect("length checked")
                .copy_from_slice(chunk.get(..len).expect("length checked"));
            Ok(len)
        }
    }

    #[test]
    fn newline_after_a_complete_request_ends_the_frame() {
        let mut input = Trickle {
            chunks: vec![b"{\"command\":\"a\"}\n".to_vec(), b"ignored".to_vec()],
        };
        let frame = read_frame(&mut input, 1024).expect("read").expect("frame");
        assert_eq!(frame, b"{\"command\":\"a\"}\n");
    }

    #[test]
    fn newlines_inside_a_request_do_not_end_the_frame() {
        let mut input = Trickle {
            chunks: vec![
                b"{\n".to_vec(),
                b"  \"command\": \"__ping__\"\n".to_vec(),
                b"}".to_vec(),
            ],
        };
        let frame = read_frame(&mut input, 1024).expect("read").expect("frame");
        assert_eq!(frame, b"{\n  \"command\": \"__ping__\"\n}");
    }

    #[test]
    fn unparseable_lines_end_the_frame_without_waiting() {
        let mut input = Trickle {
            chunks: vec![b"not json\n".to_vec(), b"more".to_vec()],
        };
        let frame = read_frame(&mut input, 1024).expect("read").expect("frame");
        assert_eq!(frame, b"not json\n");
    }

    #[test]
    fn complete_json_terminates_without_newline() {
        let mut input = Trickle {
            chunks: vec![b"{\"command\":".to_vec(), b"\"__ping__\"}".to_vec()],
        };
        let frame = read_frame(&mut input, 1024).expect("read").expect("frame");
        assert_eq!(frame, b"{\"command\":\"__ping__\"}");
    }

    #[test]
    fn silence_yields_no_frame() {
        let mut input = Trickle { chunks: Vec::new() };
        assert_eq!(read_frame(&mut input, 1024).expect("read"), None);

        let mut closed = Cursor::new(Vec::new());
        assert_eq!(read_frame(&mut closed, 1024).expect("read"), None);
    }

    #[test]
    fn deadline_after_partial_data_returns_it() {
        let mut input = Trickle {
            chunks: vec![b"{\"command\":".to_vec()],
        };
        let frame = read_frame(&mut input, 1024).expect("read").expect("frame");
        assert_eq!(frame, b"{\"command\":");
    }

    #[test]
    fn reading_stops_past_the_limit() {
        let mut input = Cursor::new(vec![b'x'; 100_000]);
        let frame = read_frame(&mut input, 10).expect("read").expect("frame");
        assert!(frame.len() > 10);
        assert!(frame.len() <= CHUNK_SIZE);
    }
}
