use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::RouterId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub simulated_ip: RouterId,
    #[serde(default = "default_process_ip")]
    pub process_ip: String,
    pub process_port: u16,
    /// Connect timeout for outbound HELLO/LSUPDATE connections. None waits forever.
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout for a single message on any connection. None waits forever.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

fn default_process_ip() -> String {
    "127.0.0.1".to_string()
}

impl RouterConfig {
    pub fn new(simulated_ip: impl Into<RouterId>, process_port: u16) -> Self {
        Self {
            simulated_ip: simulated_ip.into(),
            process_ip: default_process_ip(),
            process_port,
            connect_timeout_ms: None,
            read_timeout_ms: None,
        }
    }

    pub fn with_timeouts(mut self, connect_ms: Option<u64>, read_ms: Option<u64>) -> Self {
        self.connect_timeout_ms = connect_ms;
        self.read_timeout_ms = read_ms;
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading router config {}", path.display()))?;
        let config: RouterConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing router config {}", path.display()))?;
        if config.simulated_ip.trim().is_empty() {
            anyhow::bail!("router config {} has an empty simulated_ip", path.display());
        }
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
