use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Server configuration, loaded once at startup and never mutated after.
///
/// Every field has a default, so an empty config file (or none at all)
/// yields a working localhost server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address and port the listening socket binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Accept queue depth handed to the OS on the listen transition.
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Hard cap on concurrently served connections; peers beyond it are
    /// rejected at accept time.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Per-read timeout; an idle peer is drained once it elapses.
    #[serde(default = "default_read_ms")]
    pub read_ms: u64,
    /// Per-write timeout, enforced with the same rigor as reads.
    #[serde(default = "default_write_ms")]
    pub write_ms: u64,
    /// Grace period for flushing outbound bytes while draining.
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
    /// Default grace between a shutdown request and forced close.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_backlog() -> u32 {
    128
}

fn default_max_connections() -> usize {
    1024
}

fn default_read_ms() -> u64 {
    30_000
}

fn default_write_ms() -> u64 {
    30_000
}

fn default_drain_ms() -> u64 {
    2_000
}

fn default_shutdown_grace_ms() -> u64 {
    5_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            backlog: default_backlog(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_ms: default_read_ms(),
            write_ms: default_write_ms(),
            drain_ms: default_drain_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the YAML file named by `HARBOR_CONFIG`,
    /// falling back to defaults when the variable is unset. A `LISTEN`
    /// env var overrides the listen address either way.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("HARBOR_CONFIG") {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("invalid config file {path}"))?
            }
            Err(_) => Config::default(),
        };

        if let Ok(addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = addr;
        }

        Ok(cfg)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.read_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.write_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.timeouts.drain_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_grace_ms)
    }
}
