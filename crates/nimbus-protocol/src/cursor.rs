//! Byte cursor over received stream data.
//!
//! The transport appends raw socket reads with [`ReadBuffer::extend`];
//! the decoder consumes lines and exact byte counts from the front.
//! Nothing here blocks: every read either succeeds against buffered
//! bytes or returns `None`.

/// Growable octet buffer with a consume position.
#[derive(Debug, Default)]
pub struct ReadBuffer {
    data: Vec<u8>,
    pos: usize,
}

impl ReadBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends bytes received from the transport.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.compact();
        self.data.extend_from_slice(bytes);
    }

    /// Number of unconsumed bytes.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when no unconsumed bytes remain.
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Next unconsumed byte, without consuming it.
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// True when a line-feed is buffered, i.e. a header line can be
    /// tokenized without waiting for more data.
    pub fn has_line(&self) -> bool {
        self.find_lf().is_some()
    }

    /// Consumes through the next line-feed and returns everything
    /// before it (a trailing carriage-return is kept, so callers can
    /// verify the full CRLF terminator). Returns `None` without
    /// consuming anything when no line-feed is buffered.
    pub fn read_line(&mut self) -> Option<Vec<u8>> {
        let lf = self.find_lf()?;
        let line = self.data[self.pos..lf].to_vec();
        self.pos = lf + 1;
        Some(line)
    }

    /// Consumes and returns exactly `n` bytes, or `None` (consuming
    /// nothing) when fewer are buffered.
    pub fn read_exact(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.available() < n {
            return None;
        }
        let out = self.data[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Some(out)
    }

    /// Discards up to `n` bytes, returning how many were discarded.
    pub fn skip(&mut self, n: usize) -> usize {
        let n = n.min(self.available());
        self.pos += n;
        n
    }

    fn find_lf(&self) -> Option<usize> {
        self.data[self.pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| self.pos + i)
    }

    fn compact(&mut self) {
        if self.pos > 0 {
            self.data.drain(..self.pos);
            self.pos = 0;
        }
    }
}

impl From<&[u8]> for ReadBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
            pos: 0,
        }
    }
}
