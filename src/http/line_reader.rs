//! Line-oriented reads over a byte stream.
//!
//! Lines come back with their terminator (`\r\n` or a bare `\n`) already
//! stripped, so the blank line separating headers from body is the empty
//! string. Partial reads are buffered: a line split across any number of
//! underlying reads is returned whole.

use crate::http::BUFFER_SIZE;
use bytes::{Bytes, BytesMut};
use std::cmp::min;
use std::io::{self, BufRead, BufReader, Read};

/// Longest line accepted, terminator included.
pub const MAX_LINE_LEN: usize = 8 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Text(String),
    /// The peer closed the stream before a complete line arrived.
    EndOfStream,
}

pub struct LineReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> LineReader<R> {
    pub fn new(readable: R) -> Self {
        Self {
            inner: BufReader::with_capacity(BUFFER_SIZE, readable),
        }
    }

    /// Reads the next line. OS errors, read timeouts included, come back as
    /// `Err`; a closed stream is `Ok(Line::EndOfStream)`.
    pub fn read_line(&mut self) -> io::Result<Line> {
        let mut raw = Vec::new();
        let n = self
            .inner
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut raw)?;

        if n == 0 {
            return Ok(Line::EndOfStream);
        }

        if raw.last() != Some(&b'\n') {
            if raw.len() >= MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {} bytes", MAX_LINE_LEN),
                ));
            }
            return Ok(Line::EndOfStream);
        }

        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }

        Ok(Line::Text(String::from_utf8_lossy(&raw).into_owned()))
    }

    /// Reads exactly `len` opaque bytes. A stream that ends early is an
    /// `UnexpectedEof` error.
    pub fn read_body(&mut self, len: usize) -> io::Result<Bytes> {
        let mut body = BytesMut::with_capacity(min(len, BUFFER_SIZE * 64));
        let mut remaining = len;
        let mut buf = [0u8; BUFFER_SIZE];

        while remaining > 0 {
            let want = min(BUFFER_SIZE, remaining);
            let bytes_read = self.inner.read(&mut buf[..want])?;
            if bytes_read == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("body ended after {} of {} bytes", len - remaining, len),
                ));
            }
            body.extend_from_slice(&buf[..bytes_read]);
            remaining -= bytes_read;
        }

        Ok(body.freeze())
    }
}
