pub mod analyze;
pub mod chat;
pub mod config_cmd;
pub mod health;
pub mod prompt;

use std::path::Path;
use std::sync::Arc;

use analyst_chain::DeterministicChain;
use analyst_config::AppConfig;
use analyst_core::provider::Provider;
use analyst_memory::RollingMemory;
use tracing::{debug, warn};

/// Per-invocation overrides of the configured backend.
#[derive(Debug, Default)]
pub struct Overrides {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Load `path` if given, otherwise the default location. Environment
/// overrides apply either way.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)
                .map_err(|e| format!("Failed to load config: {e}"))?;
            config.apply_env_overrides();
            config
        }
        None => AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?,
    };
    config.validate()?;
    Ok(config)
}

/// The configured provider, or the one named by `--provider`.
pub fn select_provider(
    config: &AppConfig,
    overrides: &Overrides,
) -> Result<(AppConfig, Arc<dyn Provider>), Box<dyn std::error::Error>> {
    let mut config = config.clone();
    if let Some(provider) = &overrides.provider {
        config.default_provider = provider.clone();
    }

    if config.default_provider != "mock" && !config.has_api_key() {
        warn!(
            provider = %config.default_provider,
            "No API key configured; set ANALYST_API_KEY or add api_key to {}",
            AppConfig::config_dir().join("config.toml").display()
        );
    }

    let router = analyst_providers::build_from_config(&config);
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not available", config.default_provider))?;
    Ok((config, provider))
}

/// Wire provider, memory and chain from the configuration.
pub fn build_chain(
    config: &AppConfig,
    overrides: &Overrides,
) -> Result<DeterministicChain, Box<dyn std::error::Error>> {
    let (config, provider) = select_provider(config, overrides)?;
    let model = overrides
        .model
        .clone()
        .unwrap_or_else(|| config.effective_model().to_string());
    let memory = Arc::new(RollingMemory::new(config.memory.capacity));

    debug!(provider = provider.name(), model = %model, "Chain composed");

    Ok(
        DeterministicChain::from_config(&config.chain, provider, memory, model)
            .with_max_tokens(Some(config.default_max_tokens)),
    )
}
