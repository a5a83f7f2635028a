//! Configuration file parsing for the API service.
//!
//! Loads settings from TOML files: bind address, database path, results
//! directory, model aliases, and provider endpoint.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// API service configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bind address (e.g., "127.0.0.1")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bind port (e.g., 8000)
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// SQLite database path for cache, identity, and model state
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for timestamped result snapshots
    #[serde(default = "default_results_dir")]
    pub results_dir: String,

    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Environment variable holding the provider API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model alias for annotation completions
    #[serde(default = "default_annotation_model")]
    pub annotation_model: String,

    /// Model alias for the aggregation and merge phases
    #[serde(default = "default_aggregation_model")]
    pub aggregation_model: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Completion batch size
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "gloss.db".to_string()
}

fn default_results_dir() -> String {
    "annotation_results".to_string()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_annotation_model() -> String {
    "gpt-4.1".to_string()
}

fn default_aggregation_model() -> String {
    "deepseek-reasoner".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_batch_size() -> usize {
    20
}

impl Default for ApiConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config populates all defaults")
    }
}

impl ApiConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ApiConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// The full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.annotation_model, "gpt-4.1");
        assert_eq!(config.batch_size, 20);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config: ApiConfig =
            toml::from_str("bind_port = 9001\nannotation_model = \"gpt-4o-mini\"").unwrap();
        assert_eq!(config.bind_port, 9001);
        assert_eq!(config.annotation_model, "gpt-4o-mini");
        // untouched fields keep defaults
        assert_eq!(config.results_dir, "annotation_results");
    }
}
