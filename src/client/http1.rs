//! HTTP/1.1 framing for measurement exchanges
//!
//! Only what a single `Connection: close` exchange needs: serialising the
//! request head, parsing the response status line and headers, and walking
//! a chunked body to its terminating chunk.

use crate::error::{AppError, Result};

/// Upper bound on the response head
pub const MAX_HEAD_BYTES: usize = 64 * 1024;
/// Upper bound on a chunk-size or trailer line
const MAX_CHUNK_LINE: usize = 4 * 1024;

/// Serialise a request head. `content_length` adds the upload headers.
pub fn request_head(method: &str, target: &str, host: &str, content_length: Option<u64>) -> String {
    let mut head = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}/{}\r\nAccept: */*\r\nConnection: close\r\n",
        method,
        target,
        host,
        crate::PKG_NAME,
        crate::VERSION
    );

    if let Some(length) = content_length {
        head.push_str("Content-Type: text/plain;charset=UTF-8\r\n");
        head.push_str(&format!("Content-Length: {}\r\n", length));
    }

    head.push_str("\r\n");
    head
}

/// Index just past the blank line ending the head, if buffered yet
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

/// Status line and headers of a response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: u16,
    /// Header names are lower-cased
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// First value of a header, case-insensitive
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Result<Option<u64>> {
        match self.header("content-length") {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| AppError::network(format!("invalid Content-Length '{}'", value))),
            None => Ok(None),
        }
    }

    pub fn is_chunked(&self) -> bool {
        self.header("transfer-encoding")
            .map(|v| v.to_ascii_lowercase().contains("chunked"))
            .unwrap_or(false)
    }
}

/// Parse a response head, including its terminating blank line or not
pub fn parse_response_head(bytes: &[u8]) -> Result<ResponseHead> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| AppError::network("response head is not valid UTF-8"))?;

    let mut lines = text.split("\r\n");
    let status_line = lines.next().unwrap_or_default();

    let mut parts = status_line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/1.") {
        return Err(AppError::network(format!("unexpected status line '{}'", status_line)));
    }

    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| AppError::network(format!("unexpected status line '{}'", status_line)))?;

    let mut headers = Vec::new();
    for line in lines.take_while(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| AppError::network(format!("malformed header line '{}'", line)))?;
        headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    Ok(ResponseHead { status, headers })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data(u64),
    DataEnd,
    Trailer,
    Done,
}

/// Incremental reader for a `Transfer-Encoding: chunked` body.
///
/// Only tracks framing; chunk payloads are counted and discarded.
#[derive(Debug)]
pub struct ChunkedDecoder {
    state: ChunkState,
    line: Vec<u8>,
    body_bytes: u64,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            state: ChunkState::Size,
            line: Vec::new(),
            body_bytes: 0,
        }
    }

    /// Payload bytes seen so far, framing excluded
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    pub fn is_done(&self) -> bool {
        self.state == ChunkState::Done
    }

    /// Consume the next slice of the body. Returns true once the last chunk
    /// and its trailers have been read; anything after that is ignored.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<bool> {
        while !data.is_empty() && !self.is_done() {
            match self.state {
                ChunkState::Data(remaining) => {
                    let take = remaining.min(data.len() as u64);
                    self.body_bytes += take;
                    data = &data[take as usize..];
                    self.state = if take == remaining {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data(remaining - take)
                    };
                }
                _ => {
                    let Some(line) = self.take_line(&mut data)? else {
                        continue;
                    };
                    self.state = match self.state {
                        ChunkState::Size => match parse_chunk_size(&line)? {
                            0 => ChunkState::Trailer,
                            size => ChunkState::Data(size),
                        },
                        ChunkState::DataEnd if line.is_empty() => ChunkState::Size,
                        ChunkState::DataEnd => {
                            return Err(AppError::network("chunk data not followed by CRLF"))
                        }
                        ChunkState::Trailer if line.is_empty() => ChunkState::Done,
                        other => other,
                    };
                }
            }
        }
        Ok(self.is_done())
    }

    /// Complete line without its CRLF, or None while still buffering
    fn take_line(&mut self, data: &mut &[u8]) -> Result<Option<Vec<u8>>> {
        let input: &[u8] = *data;
        match input.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                self.line.extend_from_slice(&input[..pos]);
                *data = &input[pos + 1..];
                let mut line = std::mem::take(&mut self.line);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
            None => {
                self.line.extend_from_slice(input);
                *data = &[];
                if self.line.len() > MAX_CHUNK_LINE {
                    return Err(AppError::network("chunk line too long"));
                }
                Ok(None)
            }
        }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex chunk size, ignoring any `;extension`
fn parse_chunk_size(line: &[u8]) -> Result<u64> {
    let text = std::str::from_utf8(line).unwrap_or_default();
    let hex = text.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(hex, 16)
        .map_err(|_| AppError::network(format!("invalid chunk size '{}'", text)))
}
