use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::HttpError;
use crate::http::connection::{Connection, ConnectionContext};
use crate::http::handler::Handler;
use crate::server::registry::ConnectionRegistry;

/// Pause after a failed accept before taking the next admission slot.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Running {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
}

/// Accepts connections and admits them under two independent gates.
///
/// The connection gate bounds how many sockets are open at once; the accept
/// loop waits on it before every accept, so a full server simply stops
/// accepting. The work gate bounds how many handler invocations run at once,
/// letting many idle keep-alive connections share a small pool of work.
pub struct Listener<H: Handler> {
    config: ServerConfig,
    handler: Arc<H>,
    connection_gate: Arc<Semaphore>,
    work_gate: Arc<Semaphore>,
    registry: ConnectionRegistry,
    running: Option<Running>,
}

impl<H: Handler> Listener<H> {
    pub fn new(config: ServerConfig, handler: H) -> Self {
        Self {
            connection_gate: Arc::new(Semaphore::new(config.max_connections)),
            work_gate: Arc::new(Semaphore::new(config.max_workers)),
            handler: Arc::new(handler),
            registry: ConnectionRegistry::new(),
            running: None,
            config,
        }
    }

    /// Binds the configured address and starts accepting.
    ///
    /// Returns the bound address. Fails with [`HttpError::AlreadyListening`]
    /// if the listener is already running.
    pub async fn start(&mut self) -> Result<SocketAddr, HttpError> {
        if self.running.is_some() {
            return Err(HttpError::AlreadyListening);
        }

        let listener = bind(&self.config.listen_addr, self.config.backlog).await?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        let ctx = ConnectionContext {
            handler: Arc::clone(&self.handler),
            work_gate: Arc::clone(&self.work_gate),
            registry: self.registry.clone(),
            keep_alive_timeout: self.config.keep_alive_timeout(),
            server_name: Arc::from(self.config.server_name.as_str()),
        };

        let (shutdown, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.connection_gate),
            ctx,
            shutdown_rx,
        ));

        self.running = Some(Running {
            local_addr,
            shutdown,
            accept_task,
        });

        Ok(local_addr)
    }

    /// Closes the listening socket and waits for the accept loop to unwind.
    ///
    /// Connections already accepted keep running until they close on their
    /// own. Stopping a listener that is not running does nothing.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown.send(true);
        if let Err(e) = running.accept_task.await {
            warn!(error = %e, "accept loop ended abnormally");
        }
        info!("Stopped listening on {}", running.local_addr);
    }

    pub fn is_listening(&self) -> bool {
        self.running.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Number of connections currently registered as alive.
    pub fn active_connections(&self) -> usize {
        self.registry.len()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.registry.peers()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

impl<H: Handler> Drop for Listener<H> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
        }
    }
}

async fn bind(addr: &str, backlog: u32) -> std::io::Result<TcpListener> {
    let addr = tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("no address found for {}", addr),
        )
    })?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

async fn accept_loop<H: Handler>(
    listener: TcpListener,
    connection_gate: Arc<Semaphore>,
    ctx: ConnectionContext<H>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let admission = tokio::select! {
            permit = Arc::clone(&connection_gate).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
            _ = shutdown.changed() => break,
        };

        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            // the admission slot goes back with the dropped permit
            _ = shutdown.changed() => break,
        };

        match accepted {
            Ok((stream, peer)) => {
                info!("Accepted connection from {}", peer);
                let connection = Connection::new(stream, peer, admission, ctx.clone());
                ctx.registry.insert(connection.handle());
                tokio::spawn(connection.run());
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                drop(admission);
                if !accept_backoff(&mut shutdown).await {
                    break;
                }
            }
        }
    }
}

/// Waits out a failed accept. Returns `false` if shutdown was signalled meanwhile.
async fn accept_backoff(shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
        _ = shutdown.changed() => false,
    }
}
