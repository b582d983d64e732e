//! Configuration loading, validation, and management for the startup analyst.
//!
//! Loads configuration from `~/.analyst/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use analyst_schema::InvestPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.analyst/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Generation backend: "mock", "anthropic", or any OpenAI-compatible name
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Retry loop settings
    #[serde(default)]
    pub chain: ChainConfig,

    /// Session memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "mock".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    2048
}

/// Hide secrets in Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("chain", &self.chain)
            .field("memory", &self.memory)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Settings for the deterministic retry loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Extra attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Sampling temperature sent on every attempt
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base delay after a provider failure (multiplied by the attempt number)
    #[serde(default = "default_generation_backoff_ms")]
    pub generation_backoff_ms: u64,

    /// Base delay after unparseable or invalid output (multiplied by the attempt number)
    #[serde(default = "default_correction_backoff_ms")]
    pub correction_backoff_ms: u64,

    /// How `recommendation.invest` values outside yes/no/hold are handled
    #[serde(default)]
    pub invest_policy: InvestPolicy,
}

fn default_max_retries() -> u32 {
    2
}
fn default_temperature() -> f32 {
    0.1
}
fn default_generation_backoff_ms() -> u64 {
    500
}
fn default_correction_backoff_ms() -> u64 {
    200
}

/// Highest temperature the chain accepts.
pub const MAX_TEMPERATURE: f32 = 0.2;

/// Largest `memory.capacity` accepted.
pub const MAX_MEMORY_CAPACITY: usize = 1024;

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            temperature: default_temperature(),
            generation_backoff_ms: default_generation_backoff_ms(),
            correction_backoff_ms: default_correction_backoff_ms(),
            invest_policy: InvestPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Entries retained per session
    #[serde(default = "default_memory_capacity")]
    pub capacity: usize,
}

fn default_memory_capacity() -> usize {
    4
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_memory_capacity(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.analyst/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `ANALYST_API_KEY` (highest priority)
    /// - `OPENAI_API_KEY`
    /// - `OPENROUTER_API_KEY`
    /// - `ANTHROPIC_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `ANALYST_*` and provider key environment variables.
    pub fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("ANALYST_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("ANALYST_PROVIDER") {
            self.default_provider = provider;
        }

        if let Ok(model) = std::env::var("ANALYST_MODEL") {
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".analyst")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=MAX_TEMPERATURE).contains(&self.chain.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "chain.temperature must be between 0.0 and {MAX_TEMPERATURE}"
            )));
        }

        if !(1..=MAX_MEMORY_CAPACITY).contains(&self.memory.capacity) {
            return Err(ConfigError::ValidationError(format!(
                "memory.capacity must be between 1 and {MAX_MEMORY_CAPACITY}"
            )));
        }

        if self.default_provider.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "default_provider must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// The model for the default provider, honoring per-provider overrides.
    pub fn effective_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .unwrap_or(&self.default_model)
    }

    /// Render this configuration as TOML with every API key removed.
    pub fn to_redacted_toml(&self) -> String {
        let mut config = self.clone();
        config.api_key = None;
        for provider in config.providers.values_mut() {
            provider.api_key = None;
        }
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_max_tokens: default_max_tokens(),
            chain: ChainConfig::default(),
            memory: MemoryConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "mock");
        assert_eq!(config.chain.max_retries, 2);
        assert_eq!(config.chain.generation_backoff_ms, 500);
        assert_eq!(config.chain.correction_backoff_ms, 200);
        assert_eq!(config.chain.invest_policy, InvestPolicy::Reject);
        assert_eq!(config.memory.capacity, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.chain, config.chain);
        assert_eq!(parsed.memory, config.memory);
    }

    #[test]
    fn high_temperature_rejected() {
        let config = AppConfig {
            chain: ChainConfig {
                temperature: 0.7,
                ..ChainConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_memory_capacity_rejected() {
        let config = AppConfig {
            memory: MemoryConfig { capacity: 0 },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_memory_capacity_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[memory]\ncapacity = 4611686018427387903").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("memory.capacity"));

        let config = AppConfig {
            memory: MemoryConfig {
                capacity: MAX_MEMORY_CAPACITY,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.default_provider, "mock");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_provider = "openai"

[chain]
max_retries = 4
invest_policy = "coerce_to_hold"

[providers.openai]
default_model = "gpt-4o"
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.chain.max_retries, 4);
        assert_eq!(config.chain.invest_policy, InvestPolicy::CoerceToHold);
        // Untouched keys keep their defaults
        assert!((config.chain.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.memory.capacity, 4);
        assert_eq!(config.effective_model(), "gpt-4o");
    }

    #[test]
    fn invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "chain = 3").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_values_in_file_are_validation_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[memory]\ncapacity = 0").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn debug_output_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("sk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-other".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("sk-other"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!config.to_redacted_toml().contains("sk-"));
        assert!(config.has_api_key());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("mock"));
        assert!(toml_str.contains("max_retries = 2"));
        assert!(toml_str.contains("invest_policy = \"reject\""));
    }
}
