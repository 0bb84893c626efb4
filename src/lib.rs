//! Plainwire - HTTP/1.0 and HTTP/1.1 server on raw TCP sockets.
//!
//! Core library: header store, request parser, response writer, the
//! per-connection engine and the admission-controlled listener.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use error::HttpError;
pub use http::handler::Handler;
pub use http::request::Request;
pub use http::response::Response;
pub use server::Listener;
