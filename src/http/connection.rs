use std::io;
use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::HttpError;
use crate::http::handler::Handler;
use crate::http::parser::{ParseError, parse_request};
use crate::http::protocol::StatusCode;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{send_all, serialize_fatal_error};
use crate::server::registry::ConnectionRegistry;

/// Size of the per-connection receive buffer; bounds request line plus headers.
pub const RECEIVE_BUFFER_SIZE: usize = 4096;

/// Everything a connection shares with the listener that spawned it.
pub struct ConnectionContext<H> {
    pub handler: Arc<H>,
    pub work_gate: Arc<Semaphore>,
    pub registry: ConnectionRegistry,
    pub keep_alive_timeout: Duration,
    pub server_name: Arc<str>,
}

impl<H> Clone for ConnectionContext<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            work_gate: Arc::clone(&self.work_gate),
            registry: self.registry.clone(),
            keep_alive_timeout: self.keep_alive_timeout,
            server_name: Arc::clone(&self.server_name),
        }
    }
}

/// Close flag guarded by the close mutex, plus the wake-up for an idle engine.
struct CloseState {
    closed: Mutex<bool>,
    wake: Notify,
}

/// Shareable handle to a running connection.
#[derive(Clone)]
pub struct ConnectionHandle {
    peer: SocketAddr,
    shared: Arc<CloseState>,
}

impl ConnectionHandle {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Marks the connection closed and wakes its engine, which then tears the
    /// socket down. A request that arrives afterwards is never dispatched.
    /// Calling this more than once has no further effect.
    pub async fn close(&self) {
        let mut closed = self.shared.closed.lock().await;
        if !*closed {
            *closed = true;
            self.shared.wake.notify_one();
        }
    }

    pub async fn is_closed(&self) -> bool {
        *self.shared.closed.lock().await
    }

    /// Whether both handles refer to the same connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Engine states. Writing the response happens inside `Dispatching`, through
/// the handler.
#[derive(Debug)]
pub enum ConnectionState {
    /// Waiting for the peer; the idle timer is armed.
    Idle,
    /// Data is ready; check liveness and receive into the buffer.
    Reading,
    /// The first `n` bytes of the buffer hold a request head.
    Parsing(usize),
    Dispatching(Request),
    /// Terminal. `fast` skips the orderly socket shutdown.
    Closing { fast: bool },
}

enum Outcome {
    Finished { persistent: bool },
    Short { sent: u64, declared: u64 },
    Failed { error: anyhow::Error, headers_sent: bool },
    Io(HttpError),
}

/// One accepted socket and its receive-parse-dispatch-respond loop.
///
/// Construction does not start anything; the listener registers the
/// connection's [`handle`](Connection::handle) and then spawns
/// [`run`](Connection::run).
pub struct Connection<H> {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Box<[u8]>,
    state: ConnectionState,
    shared: Arc<CloseState>,
    idle_timer: Option<JoinHandle<()>>,
    admission: OwnedSemaphorePermit,
    ctx: ConnectionContext<H>,
}

impl<H: Handler> Connection<H> {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        admission: OwnedSemaphorePermit,
        ctx: ConnectionContext<H>,
    ) -> Self {
        Self {
            stream,
            peer,
            buffer: vec![0u8; RECEIVE_BUFFER_SIZE].into_boxed_slice(),
            state: ConnectionState::Idle,
            shared: Arc::new(CloseState {
                closed: Mutex::new(false),
                wake: Notify::new(),
            }),
            idle_timer: None,
            admission,
            ctx,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            peer: self.peer,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Serves requests until the connection stops being persistent, the peer
    /// goes away, the idle timer fires or something fails, then closes.
    pub async fn run(mut self) {
        debug!(peer = %self.peer, "connection opened");
        self.arm_idle_timer();

        loop {
            let state = mem::replace(&mut self.state, ConnectionState::Idle);
            self.state = match state {
                ConnectionState::Idle => self.wait_for_data().await,
                ConnectionState::Reading => self.receive().await,
                ConnectionState::Parsing(received) => self.parse(received).await,
                ConnectionState::Dispatching(request) => self.dispatch(request).await,
                ConnectionState::Closing { fast } => {
                    self.close(fast).await;
                    return;
                }
            };
        }
    }

    fn arm_idle_timer(&mut self) {
        let handle = self.handle();
        let timeout = self.ctx.keep_alive_timeout;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            handle.close().await;
        });

        if let Some(previous) = self.idle_timer.replace(timer) {
            previous.abort();
        }
    }

    async fn wait_for_data(&mut self) -> ConnectionState {
        tokio::select! {
            ready = self.stream.readable() => match ready {
                Ok(()) => ConnectionState::Reading,
                Err(e) => {
                    debug!(peer = %self.peer, error = %e, "socket error while idle");
                    ConnectionState::Closing { fast: true }
                }
            },
            _ = self.shared.wake.notified() => {
                debug!(peer = %self.peer, "idle timeout");
                ConnectionState::Closing { fast: false }
            }
        }
    }

    async fn receive(&mut self) -> ConnectionState {
        // Held across the liveness check and the receive so a firing idle
        // timer cannot slip in between.
        let closed = self.shared.closed.lock().await;
        if *closed {
            debug!(peer = %self.peer, "closed by idle timeout, dropping request");
            return ConnectionState::Closing { fast: false };
        }

        match self.stream.try_read(&mut self.buffer) {
            Ok(0) => {
                debug!(peer = %self.peer, "peer closed connection");
                ConnectionState::Closing { fast: false }
            }
            Ok(received) => {
                if let Some(timer) = self.idle_timer.take() {
                    timer.abort();
                }
                ConnectionState::Parsing(received)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => ConnectionState::Idle,
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "receive failed");
                ConnectionState::Closing { fast: true }
            }
        }
    }

    async fn parse(&mut self, received: usize) -> ConnectionState {
        // the idle timer is off while parsing, so a stalled body gets its own deadline
        let parsed = tokio::time::timeout(
            self.ctx.keep_alive_timeout,
            parse_request(&self.buffer[..received], &mut self.stream),
        )
        .await;
        let parsed = match parsed {
            Ok(parsed) => parsed,
            Err(_) => {
                debug!(peer = %self.peer, "request body not received in time");
                return ConnectionState::Closing { fast: true };
            }
        };
        match parsed {
            Ok(request) => {
                debug!(
                    peer = %self.peer,
                    method = request.method().as_str(),
                    path = %request.path(),
                    version = ?request.version(),
                    "request received"
                );
                ConnectionState::Dispatching(request)
            }
            Err(ParseError::Io(e)) => {
                debug!(peer = %self.peer, error = %e, "connection lost while reading body");
                ConnectionState::Closing { fast: true }
            }
            Err(e) => {
                let status = e.status().unwrap_or(StatusCode::BadRequest);
                warn!(peer = %self.peer, status = status.as_u16(), error = %e, "rejecting request");
                self.send_fatal_error(status, &e.to_string()).await
            }
        }
    }

    async fn dispatch(&mut self, request: Request) -> ConnectionState {
        let request_persistent = request.is_persistent();
        let version = request.version();

        let _work = match Arc::clone(&self.ctx.work_gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return ConnectionState::Closing { fast: false },
        };

        let outcome = {
            let mut response = Response::new(&mut self.stream, version);
            let handled = self.ctx.handler.handle(request, &mut response).await;
            match handled {
                Err(error) => Outcome::Failed {
                    error,
                    headers_sent: response.headers_sent(),
                },
                Ok(()) => match response.end().await {
                    Err(e) => Outcome::Io(e),
                    Ok(()) if !response.is_complete() => Outcome::Short {
                        sent: response.total_bytes_sent(),
                        declared: response.content_length().unwrap_or(0),
                    },
                    Ok(()) => Outcome::Finished {
                        persistent: request_persistent && response.is_persistent(),
                    },
                },
            }
        };

        match outcome {
            Outcome::Finished { persistent: true } => {
                self.arm_idle_timer();
                ConnectionState::Idle
            }
            Outcome::Finished { persistent: false } => ConnectionState::Closing { fast: false },
            Outcome::Short { sent, declared } => {
                warn!(peer = %self.peer, sent, declared, "response shorter than its Content-length");
                ConnectionState::Closing { fast: true }
            }
            Outcome::Failed {
                error,
                headers_sent: false,
            } => {
                warn!(peer = %self.peer, error = %error, "handler failed");
                self.send_fatal_error(StatusCode::InternalServerError, &format!("{:?}", error))
                    .await
            }
            Outcome::Failed {
                error,
                headers_sent: true,
            } => {
                warn!(peer = %self.peer, error = %error, "handler failed after headers were sent");
                ConnectionState::Closing { fast: true }
            }
            Outcome::Io(e) => {
                debug!(peer = %self.peer, error = %e, "failed to finish response");
                ConnectionState::Closing { fast: true }
            }
        }
    }

    async fn send_fatal_error(&mut self, status: StatusCode, body: &str) -> ConnectionState {
        let reply = serialize_fatal_error(status, &self.ctx.server_name, body);
        match send_all(&mut self.stream, &reply).await {
            Ok(()) => ConnectionState::Closing { fast: false },
            Err(e) => {
                debug!(peer = %self.peer, error = %e, "failed to send error response");
                ConnectionState::Closing { fast: true }
            }
        }
    }

    /// Shuts the socket down, disposes it and the idle timer, returns the
    /// admission slot and leaves the registry, in that order.
    async fn close(self, fast: bool) {
        let handle = self.handle();
        let Connection {
            mut stream,
            peer,
            shared,
            idle_timer,
            admission,
            ctx,
            ..
        } = self;

        let mut closed = shared.closed.lock().await;
        *closed = true;

        if !fast {
            // tokio only exposes the write side; the read side goes with the drop
            if let Err(e) = stream.shutdown().await {
                debug!(peer = %peer, error = %e, "socket shutdown failed");
            }
        }
        drop(stream);

        if let Some(timer) = idle_timer {
            timer.abort();
        }

        drop(admission);
        ctx.registry.remove(&handle);

        debug!(peer = %peer, "connection closed");
    }
}
