use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, SERVER};
use crate::http::protocol::{StatusCode, Version};

/// Status line, header block and blank line as one contiguous buffer.
pub fn serialize_head(version: Version, status: StatusCode, headers: &HeaderMap) -> Vec<u8> {
    // unknown versions are rejected before a response exists
    let version = version.as_str().unwrap_or("HTTP/1.1");

    let mut head = format!("{} {}\r\n", version, status.status_text());
    for (name, value) in headers.iter() {
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    head.into_bytes()
}

/// Complete plaintext reply emitted by the engine itself, bypassing the
/// handler: used for parse failures and handler faults.
pub fn serialize_fatal_error(status: StatusCode, server: &str, body: &str) -> Vec<u8> {
    let mut buf = format!(
        "HTTP/1.1 {}\r\n{}: {}\r\n{}: text/plain; charset=utf-8\r\n{}: {}\r\n\r\n",
        status.status_text(),
        SERVER,
        server,
        CONTENT_TYPE,
        CONTENT_LENGTH,
        body.len()
    )
    .into_bytes();
    buf.extend_from_slice(body.as_bytes());
    buf
}

/// Writes all of `buf`, retrying partial sends, and flushes.
pub async fn send_all<W>(stream: &mut W, buf: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    stream.write_all(buf).await?;
    stream.flush().await
}
