//! Configuration for SqlMail

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Mailbox store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL ("postgres://..." or "sqlite:...")
    pub url: String,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    0
}

/// Mailbox store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Mailbox hierarchy delimiter
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Global default append limit in bytes. Absent means no global
    /// default; mailbox- and account-scope limits still apply.
    pub max_message_bytes: Option<u64>,

    /// Capacity of the update notification channel. The committing
    /// operation blocks when the channel is full, so this bounds how
    /// far a slow notification consumer can fall behind before it
    /// stalls writers.
    #[serde(default = "default_update_buffer")]
    pub update_buffer: usize,

    /// Upper bound on the number of messages examined by one search
    /// call. Searches over larger mailboxes are truncated (and logged).
    #[serde(default = "default_search_candidates")]
    pub search_candidates: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            max_message_bytes: None,
            update_buffer: default_update_buffer(),
            search_candidates: default_search_candidates(),
        }
    }
}

fn default_delimiter() -> String {
    ".".to_string()
}

fn default_update_buffer() -> usize {
    256
}

fn default_search_candidates() -> usize {
    10_000
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}
