use bytes::BytesMut;

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Per-connection byte accumulator.
///
/// Bytes are appended as they arrive and only leave through [`consume`] or
/// [`split_to`]. The accumulator remembers how far it already scanned for a
/// head terminator, so repeatedly polling a slowly growing head stays linear.
///
/// [`consume`]: Accumulator::consume
/// [`split_to`]: Accumulator::split_to
#[derive(Debug, Default)]
pub struct Accumulator {
    buf: BytesMut,
    scanned: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            scanned: 0,
        }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Offset of the `\r\n\r\n` that ends a header block, if buffered.
    pub fn find_head_terminator(&mut self) -> Option<usize> {
        // A terminator may straddle the previous scan position.
        let start = self.scanned.saturating_sub(HEAD_TERMINATOR.len() - 1);
        let found = self.buf[start..]
            .windows(HEAD_TERMINATOR.len())
            .position(|w| w == HEAD_TERMINATOR)
            .map(|pos| start + pos);

        self.scanned = match found {
            Some(pos) => pos,
            None => self.buf.len(),
        };
        found
    }

    /// Drops blank lines a client may send ahead of a request line.
    pub fn skip_leading_crlf(&mut self) {
        let mut skip = 0;
        while self.buf[skip..].starts_with(b"\r\n") {
            skip += 2;
        }
        if skip > 0 {
            self.consume(skip);
        }
    }

    /// Discards the first `n` bytes.
    pub fn consume(&mut self, n: usize) {
        let _ = self.split_to(n);
    }

    /// Removes and returns the first `n` bytes without copying.
    pub fn split_to(&mut self, n: usize) -> BytesMut {
        let n = n.min(self.buf.len());
        self.scanned = self.scanned.saturating_sub(n);
        self.buf.split_to(n)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Releases all buffered bytes.
    pub fn clear(&mut self) {
        self.buf = BytesMut::new();
        self.scanned = 0;
    }
}
