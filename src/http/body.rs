use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::http::buffer::Accumulator;
use crate::http::request::Headers;
use crate::http::HTTP_HEAD_MAX_SIZE;

/// Longest chunk-size line accepted, extensions included.
const MAX_CHUNK_LINE: usize = 1024;

/// How the body of a request is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No `Content-Length` and no `Transfer-Encoding`.
    Empty,
    Length(usize),
    Chunked,
}

/// Determines body framing from the request headers.
pub fn body_framing(headers: &Headers) -> Result<BodyFraming, ProtocolError> {
    let mut length: Option<usize> = None;
    for value in headers.get_all("Content-Length").flat_map(|v| v.split(',')) {
        let value = value.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProtocolError::MalformedRequest("invalid Content-Length"));
        }
        // All digits, so a parse failure is overflow: larger than any limit.
        let parsed = value.parse::<usize>().unwrap_or(usize::MAX);
        match length {
            Some(prev) if prev != parsed => {
                return Err(ProtocolError::MalformedRequest("conflicting Content-Length"));
            }
            _ => length = Some(parsed),
        }
    }

    let mut codings = headers
        .get_all("Transfer-Encoding")
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .peekable();

    if codings.peek().is_none() {
        return Ok(length.map_or(BodyFraming::Empty, BodyFraming::Length));
    }
    if length.is_some() {
        return Err(ProtocolError::MalformedRequest(
            "Content-Length with Transfer-Encoding",
        ));
    }
    if codings.all(|c| c.eq_ignore_ascii_case("chunked")) {
        Ok(BodyFraming::Chunked)
    } else {
        Err(ProtocolError::MalformedRequest("unsupported Transfer-Encoding"))
    }
}

#[derive(Debug)]
enum Progress {
    Length { remaining: usize },
    ChunkSize,
    ChunkData { remaining: usize },
    ChunkEnd,
    Trailers { seen: usize },
    Done,
}

/// Collects a request body across any number of reads.
///
/// The collector never holds more than `limit` body bytes. A declared length
/// above the limit fails before a single body byte is read.
#[derive(Debug)]
pub struct BodyCollector {
    limit: usize,
    progress: Progress,
    body: BytesMut,
}

impl BodyCollector {
    pub fn new(framing: BodyFraming, limit: usize) -> Result<Self, ProtocolError> {
        let progress = match framing {
            BodyFraming::Empty | BodyFraming::Length(0) => Progress::Done,
            BodyFraming::Length(len) if len > limit => {
                return Err(ProtocolError::BodyTooLarge { limit });
            }
            BodyFraming::Length(len) => Progress::Length { remaining: len },
            BodyFraming::Chunked => Progress::ChunkSize,
        };

        Ok(Self {
            limit,
            progress,
            body: BytesMut::new(),
        })
    }

    /// Moves body bytes out of `buf`. Returns `true` once the body is complete.
    ///
    /// Bytes following the body stay in `buf` for the next request.
    pub fn feed(&mut self, buf: &mut Accumulator) -> Result<bool, ProtocolError> {
        loop {
            match self.progress {
                Progress::Done => return Ok(true),

                Progress::Length { remaining } => {
                    let n = remaining.min(buf.len());
                    if n == 0 {
                        return Ok(false);
                    }
                    self.body.unsplit(buf.split_to(n));
                    self.progress = match remaining - n {
                        0 => Progress::Done,
                        remaining => Progress::Length { remaining },
                    };
                }

                Progress::ChunkSize => {
                    // A trailing `\r` may still turn into the terminator.
                    let Some(line_end) = find_crlf(buf.as_slice()) else {
                        if buf.len() > MAX_CHUNK_LINE + 1 {
                            return Err(ProtocolError::MalformedRequest("chunk size line too long"));
                        }
                        return Ok(false);
                    };
                    if line_end > MAX_CHUNK_LINE {
                        return Err(ProtocolError::MalformedRequest("chunk size line too long"));
                    }
                    let size = parse_chunk_size(&buf.as_slice()[..line_end])?;
                    buf.consume(line_end + 2);

                    if size == 0 {
                        self.progress = Progress::Trailers { seen: 0 };
                    } else if size > self.limit - self.body.len() {
                        return Err(ProtocolError::BodyTooLarge { limit: self.limit });
                    } else {
                        self.progress = Progress::ChunkData { remaining: size };
                    }
                }

                Progress::ChunkData { remaining } => {
                    let n = remaining.min(buf.len());
                    if n == 0 {
                        return Ok(false);
                    }
                    self.body.unsplit(buf.split_to(n));
                    self.progress = match remaining - n {
                        0 => Progress::ChunkEnd,
                        remaining => Progress::ChunkData { remaining },
                    };
                }

                Progress::ChunkEnd => {
                    if buf.len() < 2 {
                        return Ok(false);
                    }
                    if !buf.as_slice().starts_with(b"\r\n") {
                        return Err(ProtocolError::MalformedRequest("missing CRLF after chunk"));
                    }
                    buf.consume(2);
                    self.progress = Progress::ChunkSize;
                }

                // Trailer fields are read and discarded. Together with the
                // closing empty line they count against HTTP_HEAD_MAX_SIZE.
                Progress::Trailers { seen } => {
                    let too_large = ProtocolError::HeadTooLarge {
                        limit: HTTP_HEAD_MAX_SIZE,
                    };
                    let Some(line_end) = find_crlf(buf.as_slice()) else {
                        if seen + buf.len() + 1 > HTTP_HEAD_MAX_SIZE {
                            return Err(too_large);
                        }
                        return Ok(false);
                    };
                    let seen = seen + line_end + 2;
                    if seen > HTTP_HEAD_MAX_SIZE {
                        return Err(too_large);
                    }
                    buf.consume(line_end + 2);
                    self.progress = if line_end == 0 {
                        Progress::Done
                    } else {
                        Progress::Trailers { seen }
                    };
                }
            }
        }
    }

    pub fn into_body(self) -> Bytes {
        self.body.freeze()
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Parses `HEX [; ext]`.
fn parse_chunk_size(line: &[u8]) -> Result<usize, ProtocolError> {
    let digits = match line.iter().position(|&b| b == b';') {
        Some(semi) => &line[..semi],
        None => line,
    };
    let digits = std::str::from_utf8(digits)
        .map_err(|_| ProtocolError::MalformedRequest("invalid chunk size"))?
        .trim_matches([' ', '\t']);

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProtocolError::MalformedRequest("invalid chunk size"));
    }
    usize::from_str_radix(digits, 16)
        .map_err(|_| ProtocolError::MalformedRequest("chunk size overflow"))
}
