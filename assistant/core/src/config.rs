//! TOML Configuration File Support
//!
//! Centralized configuration loading for the chat client, supporting a TOML
//! configuration file at `~/.config/claims-assistant/client.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:8000"
//! connect_timeout_ms = 5000
//! request_timeout_ms = 30000
//!
//! [chat]
//! max_query_length = 8192
//! seed_demo_history = false
//! update_buffer = 256
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Backend section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendToml {
    /// Backend base URL
    pub base_url: Option<String>,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// Timeout for non-streaming requests in milliseconds
    pub request_timeout_ms: Option<u64>,
}

/// Chat section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Maximum query length in bytes
    pub max_query_length: Option<usize>,

    /// Seed the history with the demo conversation
    pub seed_demo_history: Option<bool>,

    /// Capacity of the update channel
    pub update_buffer: Option<usize>,
}

/// Root of the TOML configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Backend connection settings
    pub backend: BackendToml,
    /// Chat behavior settings
    pub chat: ChatToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend base URL (no trailing slash)
    pub base_url: String,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Timeout for non-streaming requests (streams are not time-limited)
    pub request_timeout: Duration,
    /// Maximum query length in bytes
    pub max_query_length: usize,
    /// Seed the history with the demo conversation
    pub seed_demo_history: bool,
    /// Capacity of the update channel
    pub update_buffer: usize,
    /// Path of the loaded config file, if any
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            max_query_length: 8 * 1024,
            seed_demo_history: false,
            update_buffer: 256,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Check values that would make the client unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        if self.max_query_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_query_length must be greater than 0".to_string(),
            ));
        }
        if self.update_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "update_buffer must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/claims-assistant/client.toml` or
/// `~/.config/claims-assistant/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("claims-assistant").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed. A
/// missing config file is not an error (defaults are used). Values are not
/// validated here; call [`ClientConfig::validate`] once overrides are applied.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
/// Values are not validated here.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) {
    if let Some(ref url) = toml.backend.base_url {
        config.base_url = normalize_base_url(url);
    }
    if let Some(ms) = toml.backend.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = toml.backend.request_timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(max) = toml.chat.max_query_length {
        config.max_query_length = max;
    }
    if let Some(seed) = toml.chat.seed_demo_history {
        config.seed_demo_history = seed;
    }
    if let Some(buffer) = toml.chat.update_buffer {
        config.update_buffer = buffer;
    }
}

/// Apply environment overrides through a lookup function
fn apply_env_config<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let mut from_env = false;

    if let Some(url) = lookup("CLAIMS_ASSISTANT_URL") {
        config.base_url = normalize_base_url(&url);
        from_env = true;
    }
    if let Some(ms) = lookup("CLAIMS_ASSISTANT_CONNECT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.connect_timeout = Duration::from_millis(ms);
        from_env = true;
    }
    if let Some(ms) = lookup("CLAIMS_ASSISTANT_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.request_timeout = Duration::from_millis(ms);
        from_env = true;
    }
    if let Some(max) = lookup("CLAIMS_ASSISTANT_MAX_QUERY_LENGTH").and_then(|v| v.parse().ok()) {
        config.max_query_length = max;
        from_env = true;
    }
    if let Some(v) = lookup("CLAIMS_ASSISTANT_DEMO_HISTORY") {
        config.seed_demo_history = v == "1" || v.eq_ignore_ascii_case("true");
        from_env = true;
    }

    if from_env {
        config.source = ConfigSource::Env;
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

// =============================================================================
// CLI Overrides
// =============================================================================

/// Values supplied on the command line, applied last
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL
    pub base_url: Option<String>,
    /// Seed the history with the demo conversation
    pub seed_demo_history: Option<bool>,
    /// Maximum query length in bytes
    pub max_query_length: Option<usize>,
}

impl ConfigOverrides {
    /// Create empty overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the backend URL
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Override demo history seeding
    #[must_use]
    pub fn with_seed_demo_history(mut self, seed: bool) -> Self {
        self.seed_demo_history = Some(seed);
        self
    }

    /// Override the query length limit
    #[must_use]
    pub fn with_max_query_length(mut self, max: usize) -> Self {
        self.max_query_length = Some(max);
        self
    }

    /// Apply to a loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        let mut applied = false;

        if let Some(ref url) = self.base_url {
            config.base_url = normalize_base_url(url);
            applied = true;
        }
        if let Some(seed) = self.seed_demo_history {
            config.seed_demo_history = seed;
            applied = true;
        }
        if let Some(max) = self.max_query_length {
            config.max_query_length = max;
            applied = true;
        }

        if applied {
            config.source = ConfigSource::Cli;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(!config.seed_demo_history);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from_path(Some(PathBuf::from("/nonexistent/client.toml")));
        let config = config.unwrap();
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_toml_applies_values() {
        let toml: ClientToml = toml::from_str(
            r#"
            [backend]
            base_url = "http://claims.internal:9000/"
            request_timeout_ms = 1500

            [chat]
            seed_demo_history = true
            "#,
        )
        .unwrap();

        let mut config = ClientConfig::default();
        apply_toml_config(&mut config, &toml);

        assert_eq!(config.base_url, "http://claims.internal:9000");
        assert_eq!(config.request_timeout, Duration::from_millis(1500));
        assert!(config.seed_demo_history);
        assert_eq!(config.max_query_length, 8 * 1024);
    }

    #[test]
    fn test_load_from_file_sets_source() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chat]\nmax_query_length = 42").unwrap();

        let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
        // Env may override in a noisy environment, but never back to default
        assert_ne!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[chat\nmax_query_length = ").unwrap();

        let result = load_config_from_path(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("CLAIMS_ASSISTANT_URL", "https://claims.example.com/"),
            ("CLAIMS_ASSISTANT_MAX_QUERY_LENGTH", "100"),
            ("CLAIMS_ASSISTANT_DEMO_HISTORY", "TRUE"),
            ("CLAIMS_ASSISTANT_CONNECT_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config.set_source(ConfigSource::File);
        apply_env_config(&mut config, |key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.base_url, "https://claims.example.com");
        assert_eq!(config.max_query_length, 100);
        assert!(config.seed_demo_history);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_absent_keeps_source() {
        let mut config = ClientConfig::default();
        config.set_source(ConfigSource::File);
        apply_env_config(&mut config, |_| None);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = ClientConfig::default();
        config.base_url = "http://env-host:8000".to_string();
        config.set_source(ConfigSource::Env);

        ConfigOverrides::new()
            .with_base_url("http://cli-host:8000".to_string())
            .apply(&mut config);

        assert_eq!(config.base_url, "http://cli-host:8000");
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_no_change() {
        let mut config = ClientConfig::default();
        ConfigOverrides::new().apply(&mut config);
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.base_url = "localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = ClientConfig::default();
        config.max_query_length = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.update_buffer = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_override_repairs_invalid_file_value() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nbase_url = \"localhost:8000\"").unwrap();

        let mut config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
        ConfigOverrides::new()
            .with_base_url("http://localhost:9000".to_string())
            .apply(&mut config);

        assert_eq!(config.base_url, "http://localhost:9000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI");
        assert_eq!(ConfigSource::File.to_string(), "config file");
    }
}
