#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use plainwire::config::ServerConfig;
use plainwire::{Handler, Listener};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(5);

pub fn test_config(max_connections: usize, max_workers: usize, keep_alive_secs: u64) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        max_connections,
        max_workers,
        keep_alive_timeout_secs: keep_alive_secs,
        server_name: "plainwire/test".to_string(),
        ..ServerConfig::default()
    }
}

pub async fn start<H: Handler>(config: ServerConfig, handler: H) -> (Listener<H>, SocketAddr) {
    let mut listener = Listener::new(config, handler);
    let addr = listener.start().await.unwrap();
    (listener, addr)
}

/// Polls `check` until it holds or `WAIT` runs out.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}

/// A raw socket client reading Content-length framed responses.
pub struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.stream.get_ref().local_addr().unwrap()
    }

    pub async fn send(&mut self, raw: &[u8]) {
        let stream = self.stream.get_mut();
        stream.write_all(raw).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Reads one response: the head (without the blank line) and the body.
    pub async fn response(&mut self) -> (String, Vec<u8>) {
        self.try_response(WAIT)
            .await
            .expect("no response within the deadline")
    }

    pub async fn try_response(&mut self, within: Duration) -> Option<(String, Vec<u8>)> {
        timeout(within, self.read_response()).await.ok()
    }

    async fn read_response(&mut self) -> (String, Vec<u8>) {
        let mut head = String::new();
        loop {
            let mut line = String::new();
            let n = self.stream.read_line(&mut line).await.unwrap();
            assert!(n > 0, "connection closed before the response head ended");
            if line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }

        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = vec![0u8; length];
        self.stream.read_exact(&mut body).await.unwrap();
        (head, body)
    }

    /// Everything the server sends until it closes.
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut out = Vec::new();
        timeout(WAIT, self.stream.read_to_end(&mut out))
            .await
            .expect("connection not closed within the deadline")
            .unwrap();
        out
    }

    /// Whether the server closes the connection within `WAIT` without
    /// sending anything more.
    pub async fn is_closed_by_server(&mut self) -> bool {
        let mut buf = [0u8; 1];
        match timeout(WAIT, self.stream.read(&mut buf)).await {
            Ok(Ok(0)) => true,
            Ok(Err(_)) => true,
            _ => false,
        }
    }
}
