use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Coordinator settings, read from a JSON file.
///
/// Every field has a default, so an empty object or a missing file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the subsystem event queue.
    pub event_queue_capacity: usize,
    /// Attempts at persisting one finished call before giving up.
    pub persist_attempts: u32,
    pub persist_retry_delay_ms: u64,
    /// Call-log database file. Defaults to the platform data directory.
    pub database_path: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 64,
            persist_attempts: 2,
            persist_retry_delay_ms: 250,
            database_path: None,
            log_filter: "callsession=info".to_string(),
        }
    }
}

impl SessionConfig {
    /// Loads the config at `path`, falling back to defaults if it does not exist.
    pub async fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let data = match tokio::fs::read_to_string(path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(anyhow!("Failed to read config '{}': {}", path.display(), err));
            }
        };
        Self::from_json(&data)
            .map_err(|e| anyhow!("Failed to parse config '{}': {:#}", path.display(), e))
    }

    pub fn from_json(data: &str) -> Result<Self, anyhow::Error> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn persist_retry_delay(&self) -> Duration {
        Duration::from_millis(self.persist_retry_delay_ms)
    }

    /// Configured database path, or `callsession/call_log.db` in the data dir.
    pub fn database_path(&self) -> Result<PathBuf, anyhow::Error> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(anyhow!("Cannot determine data directory"))?;
        Ok(data_dir.join("callsession").join("call_log.db"))
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.event_queue_capacity == 0 {
            return Err(anyhow!("event_queue_capacity must be positive"));
        }
        if self.persist_attempts == 0 {
            return Err(anyhow!("persist_attempts must be positive"));
        }
        Ok(())
    }
}
