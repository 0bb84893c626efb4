//! Errors raised by the header store, the response writer and the listener.

use std::io;

/// State, argument and framing errors of the HTTP core.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A mutating call was made on a frozen header store.
    #[error("header store is frozen and read-only")]
    HeadersFrozen,
    /// A header name contained the `:` delimiter.
    #[error("colon not allowed in header name '{0}'")]
    InvalidHeaderName(String),
    /// The status was changed after the response head went out.
    #[error("headers already sent")]
    HeadersAlreadySent,
    /// A body write would overrun the declared Content-Length.
    #[error("total data length {sent} (sent) + {chunk} exceeds specified Content-length of {declared}")]
    ContentLengthExceeded { sent: u64, chunk: u64, declared: u64 },
    /// `Listener::start` was called on a listener that is already running.
    #[error("already listening")]
    AlreadyListening,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
