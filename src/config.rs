use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "PLAINWIRE_CONFIG";
/// Environment variable overriding the listen address.
pub const LISTEN_ENV: &str = "LISTEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
}

/// Listener settings.
///
/// ```yaml
/// server:
///   listen_addr: "0.0.0.0:8080"
///   max_connections: 1000
///   max_workers: 16
///   keep_alive_timeout_secs: 5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Capacity of the connection gate.
    pub max_connections: usize,
    /// Capacity of the work gate: handler invocations running at once.
    pub max_workers: usize,
    pub keep_alive_timeout_secs: u64,
    /// Listen backlog of the accepting socket.
    pub backlog: u32,
    /// `Server` header value on error responses the server writes itself.
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: 100,
            max_workers: parallelism * 4,
            keep_alive_timeout_secs: 5,
            backlog: 128,
            server_name: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ServerConfig {
    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout_secs)
    }
}

impl Config {
    /// Loads the file named by `PLAINWIRE_CONFIG` (defaults when unset), then
    /// applies the `LISTEN` override.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var(LISTEN_ENV) {
            cfg.server.listen_addr = listen_addr;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let server = &self.server;
        if server.max_connections == 0 {
            bail!("server.max_connections must be at least 1");
        }
        if server.max_workers == 0 {
            bail!("server.max_workers must be at least 1");
        }
        if server.keep_alive_timeout_secs == 0 {
            bail!("server.keep_alive_timeout_secs must be at least 1");
        }
        Ok(())
    }
}
