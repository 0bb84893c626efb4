//! HTTP protocol implementation.
//!
//! This module implements HTTP/1.0 and HTTP/1.1 framing with keep-alive
//! connections, directly on top of a TCP stream.
//!
//! # Architecture
//!
//! - **`headers`**: case-insensitive header store that freezes once sent
//! - **`protocol`**: versions, status codes and the persistence rule
//! - **`parser`**: turns one receive buffer (plus a declared body) into a `Request`
//! - **`request`**: the immutable parsed request
//! - **`response`**: writes the status line, headers and Content-Length framed body
//! - **`writer`**: wire serialization shared by responses and error replies
//! - **`handler`**: the application callback
//! - **`connection`**: the per-connection state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!   ┌──▶ │    Idle     │ ← idle timer armed, wait for data
//!   │    └──────┬──────┘
//!   │           │ data ready (timer fired → Closing)
//!   │           ▼
//!   │    ┌─────────────┐
//!   │    │   Reading   │ ← liveness check + receive under the close mutex
//!   │    └──────┬──────┘
//!   │           ▼
//!   │    ┌─────────────┐
//!   │    │   Parsing   │ ← malformed → error reply → Closing
//!   │    └──────┬──────┘
//!   │           ▼
//!   │    ┌─────────────┐
//!   │    │ Dispatching │ ← handler runs under the work gate and writes the response
//!   │    └──────┬──────┘
//!   │           ├─ persistent → Idle
//!   └───────────┘
//!               └─ close / fault / short body → Closing
//! ```

pub mod connection;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod protocol;
pub mod request;
pub mod response;
pub mod writer;
