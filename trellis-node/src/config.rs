//! Node configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use trellis_peer::PeerConfig;
use trellis_registry::RegistryConfig;
use trellis_sync::{Priority, SyncConfig};

/// Everything a node reads from its TOML file. Every section is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NodeConfig {
    pub sync: SyncConfig,
    pub registry: RegistryConfig,
    pub peer: PeerConfig,
    pub http: HttpConfig,
    /// Paths to start synchronizing at startup.
    pub watch: Vec<WatchedPath>,
}

/// The status API listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 4002,
        }
    }
}

impl HttpConfig {
    /// `bind:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// A path synchronized from startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedPath {
    pub path: String,
    #[serde(default)]
    pub priority: Priority,
}

impl NodeConfig {
    /// Reads `path`. A missing file yields the defaults; an unreadable or
    /// malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file {path:?}"))
    }

    /// Parses TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// Default location of the identity key file.
pub fn default_identity_path() -> PathBuf {
    PathBuf::from("trellis-identity.json")
}
