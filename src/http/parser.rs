use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{CONTENT_LENGTH, HeaderMap};
use crate::http::protocol::{StatusCode, Version};
use crate::http::request::{Method, Request};

/// Declared bodies at or above this size are refused without being read.
pub const MAX_BODY_SIZE: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed request line, unknown verb or version, malformed header.
    #[error("{0}")]
    BadRequest(String),
    /// Header block larger than the receive buffer, or body over the cap.
    #[error("{0}")]
    TooLarge(String),
    /// The peer went away while the body was being read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ParseError {
    /// Status to answer with; `None` for failures the peer is not told about.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ParseError::BadRequest(_) => Some(StatusCode::BadRequest),
            ParseError::TooLarge(_) => Some(StatusCode::RequestEntityTooLarge),
            ParseError::Io(_) => None,
        }
    }
}

/// Request line and header block of a request, before any body is read.
#[derive(Debug)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub version: Version,
    pub headers: HeaderMap,
    /// Bytes of the buffer taken by the head, including the blank line.
    pub consumed: usize,
}

/// CRLF line reader over decoded request text.
///
/// A trailing fragment without CRLF is still returned as a line; `None`
/// means the text is exhausted.
struct Lines<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn consumed(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.pos >= self.text.len() {
            return None;
        }

        let rest = &self.text[self.pos..];
        match rest.find("\r\n") {
            Some(idx) => {
                self.pos += idx + 2;
                Some(&rest[..idx])
            }
            None => {
                self.pos = self.text.len();
                Some(rest)
            }
        }
    }
}

/// Byte-for-char ASCII decoding; anything outside ASCII becomes `?` so that
/// character offsets stay equal to byte offsets.
fn decode_ascii(buf: &[u8]) -> String {
    buf.iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect()
}

fn decode_path(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

fn read_headers(lines: &mut Lines<'_>) -> Result<HeaderMap, ParseError> {
    let mut headers = HeaderMap::new();

    loop {
        let line = match lines.next() {
            Some(line) => line,
            None => return Err(ParseError::TooLarge("Request too large.".to_string())),
        };

        if line.is_empty() {
            return Ok(headers);
        }

        let colon = match line.find(':') {
            Some(idx) if idx > 0 => idx,
            _ => return Err(ParseError::BadRequest(format!("Invalid header: '{}'", line))),
        };

        headers
            .set(line[..colon].trim(), line[colon + 1..].trim())
            .map_err(|_| ParseError::BadRequest(format!("Invalid header: '{}'", line)))?;
    }
}

/// Parses a header block terminated by a blank line.
///
/// Later occurrences of a name overwrite earlier ones.
pub fn parse_headers(text: &str) -> Result<HeaderMap, ParseError> {
    read_headers(&mut Lines::new(text))
}

/// Parses the request line and headers held in one receive buffer.
pub fn parse_head(buf: &[u8]) -> Result<RequestHead, ParseError> {
    let text = decode_ascii(buf);
    let mut lines = Lines::new(&text);

    let first_line = lines.next().unwrap_or("");
    if first_line.trim().is_empty() {
        // request line or header terminator did not fit the buffer
        return Err(ParseError::BadRequest("Request path too long.".to_string()));
    }

    let parts: Vec<&str> = first_line.split(' ').collect();
    if parts.len() != 3 {
        return Err(ParseError::BadRequest("Bad HTTP request.".to_string()));
    }

    let method = Method::parse(parts[0]);
    let path = decode_path(parts[1]);
    let version = Version::parse(parts[2]);

    if version == Version::Unknown {
        return Err(ParseError::BadRequest(format!(
            "Unknown HTTP version {}",
            parts[2]
        )));
    }

    if method == Method::Unknown {
        return Err(ParseError::BadRequest(format!("Unknown HTTP verb {}", parts[0])));
    }

    let headers = read_headers(&mut lines)?;

    Ok(RequestHead {
        method,
        path,
        version,
        headers,
        consumed: lines.consumed(),
    })
}

/// Parses one request from `buf`, reading the rest of a declared body from
/// `stream`.
///
/// Body bytes already captured past the head are used first. A body declared
/// at or above [`MAX_BODY_SIZE`] is refused and nothing is read from `stream`.
pub async fn parse_request<R>(buf: &[u8], stream: &mut R) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let head = parse_head(buf)?;

    let content_length = match head.headers.get(CONTENT_LENGTH) {
        None => None,
        Some(raw) => match head.headers.content_length() {
            Some(len) => Some(len),
            // all digits but past u64: certainly over the cap
            None if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) => {
                return Err(ParseError::TooLarge("Request body too large.".to_string()));
            }
            None => {
                return Err(ParseError::BadRequest(format!(
                    "Invalid Content-length: '{}'",
                    raw
                )));
            }
        },
    };

    let body = match content_length {
        None => None,
        Some(len) if len >= MAX_BODY_SIZE => {
            return Err(ParseError::TooLarge("Request body too large.".to_string()));
        }
        Some(len) => {
            let len = len as usize;
            let leftover = &buf[head.consumed.min(buf.len())..];
            let taken = leftover.len().min(len);

            let mut body = BytesMut::with_capacity(len);
            body.extend_from_slice(&leftover[..taken]);
            body.resize(len, 0);
            stream.read_exact(&mut body[taken..]).await?;

            Some(body.freeze())
        }
    };

    Ok(Request::new(head.version, head.method, head.path, head.headers, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_do_not_invent_a_trailing_blank_line() {
        let mut lines = Lines::new("A\r\nB\r\n");
        assert_eq!(lines.next(), Some("A"));
        assert_eq!(lines.next(), Some("B"));
        assert_eq!(lines.next(), None);
        assert_eq!(lines.consumed(), 6);
    }

    #[test]
    fn lines_return_unterminated_fragment() {
        let mut lines = Lines::new("A\r\npartial");
        assert_eq!(lines.next(), Some("A"));
        assert_eq!(lines.next(), Some("partial"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn non_ascii_bytes_keep_offsets() {
        let text = decode_ascii(&[b'a', 0xC3, 0xA9, b'b']);
        assert_eq!(text, "a??b");
        assert_eq!(text.len(), 4);
    }

    #[test]
    fn path_decoding_handles_plus_and_percent() {
        assert_eq!(decode_path("/a+b%20c"), "/a b c");
        assert_eq!(decode_path("/%2B"), "/+");
        assert_eq!(decode_path("/caf%C3%A9"), "/café");
    }
}
