use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use vaultsync_integrations::SyncQueueConfig;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Path to RocksDB database
    pub database_path: PathBuf,

    /// Sync queue capacity and retry schedule
    pub sync: SyncQueueConfig,

    /// Optional JSON seed (folders, auth records, memberships) applied at startup
    pub bootstrap_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bind_address = std::env::var("BIND_ADDRESS")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .context("BIND_ADDRESS must be a socket address")?;

        let database_path = std::env::var("DATABASE_PATH")
            .unwrap_or_else(|_| "./data/vaultsync.db".to_string())
            .into();

        let defaults = SyncQueueConfig::default();

        let capacity = std::env::var("SYNC_QUEUE_CAPACITY")
            .unwrap_or_else(|_| defaults.capacity.to_string())
            .parse()
            .context("SYNC_QUEUE_CAPACITY must be an integer")?;

        let max_attempts = std::env::var("SYNC_MAX_ATTEMPTS")
            .unwrap_or_else(|_| defaults.max_attempts.to_string())
            .parse()
            .context("SYNC_MAX_ATTEMPTS must be an integer")?;

        let base_delay_seconds = std::env::var("SYNC_BASE_DELAY_SECONDS")
            .unwrap_or_else(|_| defaults.base_delay_seconds.to_string())
            .parse()
            .context("SYNC_BASE_DELAY_SECONDS must be an integer")?;

        if capacity == 0 {
            anyhow::bail!("SYNC_QUEUE_CAPACITY must be greater than zero");
        }

        let bootstrap_path = std::env::var("BOOTSTRAP_PATH").ok().map(PathBuf::from);

        Ok(Config {
            bind_address,
            database_path,
            sync: SyncQueueConfig {
                capacity,
                max_attempts,
                base_delay_seconds,
            },
            bootstrap_path,
        })
    }
}
