use super::RawLine;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Longest line accepted, terminator excluded. A sample line is a few dozen
/// bytes; anything past this is a device sending noise without newlines.
pub const MAX_LINE_BYTES: usize = 1024;

/// Newline splitter over any async byte stream.
///
/// Bytes of an unfinished line stay in `pending` across calls, so dropping a
/// `next_line` future (timeout, cancellation) loses nothing. A line longer
/// than the limit is reported once as `InvalidData` and its remaining bytes
/// are dropped up to the next newline.
pub struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    max_len: usize,
    discarding: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_len(inner, MAX_LINE_BYTES)
    }

    pub fn with_max_len(inner: R, max_len: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            max_len,
            discarding: false,
        }
    }

    /// Next complete line without its `\n`, or `None` at end of stream.
    /// A final line without a terminator is still returned.
    pub async fn next_line(&mut self) -> io::Result<Option<RawLine>> {
        loop {
            // `fill_buf` is cancel safe; bytes are only consumed below,
            // synchronously, once they have been copied into `pending`.
            let available = self.reader.fill_buf().await?;

            if available.is_empty() {
                if self.discarding || self.pending.is_empty() {
                    self.discarding = false;
                    self.pending.clear();
                    return Ok(None);
                }
                return Ok(Some(RawLine::new(std::mem::take(&mut self.pending))));
            }

            let newline = available.iter().position(|&b| b == b'\n');
            let used = newline.map_or(available.len(), |i| i + 1);
            let body = newline.map_or(available, |i| &available[..i]);

            if !self.discarding {
                self.pending.extend_from_slice(body);
            }
            self.reader.consume(used);

            if self.discarding {
                if newline.is_some() {
                    self.discarding = false;
                }
                continue;
            }

            if self.pending.len() > self.max_len {
                let length = self.pending.len();
                self.pending.clear();
                self.discarding = newline.is_none();
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {} bytes ({} so far)", self.max_len, length),
                ));
            }

            if newline.is_some() {
                return Ok(Some(RawLine::new(std::mem::take(&mut self.pending))));
            }
        }
    }
}
