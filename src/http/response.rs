use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::error::HttpError;
use crate::http::headers::{CONNECTION, HeaderMap};
use crate::http::protocol::{StatusCode, Version, is_connection_persistent};
use crate::http::writer::{send_all, serialize_head};

/// Chunk size used when streaming a body from a reader.
pub const SEND_CHUNK_SIZE: usize = 16 * 1024;

/// Socket half a response writes to.
pub type ResponseStream = dyn AsyncWrite + Send + Unpin;

/// An HTTP response being written to one connection.
///
/// Status and headers stay mutable until the head is transmitted, which
/// happens with the first body write. From then on the header store is
/// frozen and every further write is checked against the declared
/// Content-Length.
///
/// If Content-Length was not set before the first [`write`](Response::write),
/// it is taken from the length of that first write. Bodies produced by several
/// writes must set it up front.
pub struct Response<'a> {
    stream: &'a mut ResponseStream,
    version: Version,
    status: StatusCode,
    headers: HeaderMap,
    headers_sent: bool,
    total_bytes_sent: u64,
}

impl<'a> Response<'a> {
    pub fn new(stream: &'a mut ResponseStream, version: Version) -> Self {
        Self {
            stream,
            version,
            status: StatusCode::Ok,
            headers: HeaderMap::new(),
            headers_sent: false,
            total_bytes_sent: 0,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), HttpError> {
        if self.headers_sent {
            return Err(HttpError::HeadersAlreadySent);
        }
        self.status = status;
        Ok(())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable header access; mutators fail once the head has been sent.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Body bytes transmitted so far.
    pub fn total_bytes_sent(&self) -> u64 {
        self.total_bytes_sent
    }

    pub fn content_length(&self) -> Option<u64> {
        self.headers.content_length()
    }

    /// Whether the declared Content-Length has been fully transmitted.
    pub fn is_complete(&self) -> bool {
        match self.headers.content_length() {
            Some(declared) => self.total_bytes_sent >= declared,
            None => true,
        }
    }

    /// Persistence as announced by this response's `Connection` header.
    pub fn is_persistent(&self) -> bool {
        is_connection_persistent(self.version, &self.headers)
    }

    pub fn set_persistent(&mut self, persistent: bool) -> Result<(), HttpError> {
        let value = if persistent { "keep-alive" } else { "close" };
        self.headers.set(CONNECTION, value)
    }

    async fn send_headers(&mut self) -> Result<(), HttpError> {
        self.headers.freeze();
        let head = serialize_head(self.version, self.status, &self.headers);
        send_all(&mut *self.stream, &head).await?;
        self.headers_sent = true;
        Ok(())
    }

    /// Writes a chunk of body bytes, sending the head first if needed.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), HttpError> {
        let len = chunk.len() as u64;

        if !self.headers_sent {
            if self.headers.content_length().is_none() {
                self.headers.set_content_length(Some(len))?;
            }
            self.send_headers().await?;
        }

        if let Some(declared) = self.headers.content_length() {
            if self.total_bytes_sent + len > declared {
                return Err(HttpError::ContentLengthExceeded {
                    sent: self.total_bytes_sent,
                    chunk: len,
                    declared,
                });
            }
        }

        send_all(&mut *self.stream, chunk).await?;
        self.total_bytes_sent += len;
        Ok(())
    }

    /// Writes UTF-8 text as body bytes.
    pub async fn write_str(&mut self, s: &str) -> Result<(), HttpError> {
        self.write(s.as_bytes()).await
    }

    /// Streams up to the remaining declared body length from `source`.
    ///
    /// Content-Length defaults to `length` when unset. Data is forwarded in
    /// [`SEND_CHUNK_SIZE`] chunks, each fully written before the next read.
    /// A source that runs dry early is not an error here; the caller sees it
    /// through [`is_complete`](Response::is_complete). Returns the number of
    /// bytes forwarded.
    pub async fn send_from<R>(&mut self, source: &mut R, length: u64) -> Result<u64, HttpError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if !self.headers_sent {
            if self.headers.content_length().is_none() {
                self.headers.set_content_length(Some(length))?;
            }
            self.send_headers().await?;
        }

        let declared = self.headers.content_length().unwrap_or(length);
        let mut remaining = declared.saturating_sub(self.total_bytes_sent);
        let mut chunk = vec![0u8; SEND_CHUNK_SIZE];
        let mut forwarded = 0;

        while remaining > 0 {
            let want = remaining.min(SEND_CHUNK_SIZE as u64) as usize;
            let n = source.read(&mut chunk[..want]).await?;
            if n == 0 {
                break;
            }

            send_all(&mut *self.stream, &chunk[..n]).await?;
            self.total_bytes_sent += n as u64;
            forwarded += n as u64;
            remaining -= n as u64;
        }

        Ok(forwarded)
    }

    /// Sends the head of a response that never wrote a body.
    ///
    /// Content-Length defaults to 0. Does nothing once the head is out.
    pub async fn end(&mut self) -> Result<(), HttpError> {
        if self.headers_sent {
            return Ok(());
        }
        if self.headers.content_length().is_none() {
            self.headers.set_content_length(Some(0))?;
        }
        self.send_headers().await
    }
}
