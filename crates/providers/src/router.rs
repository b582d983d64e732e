//! Provider router: selects the generation backend named in the config.
//!
//! Handles provider creation and lookup by name.

use std::collections::HashMap;
use std::sync::Arc;

use analyst_core::provider::Provider;
use tracing::debug;

use crate::anthropic::AnthropicProvider;
use crate::mock::MockProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes generation requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Name of the default provider.
    pub fn default_name(&self) -> &str {
        &self.default_provider
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Every `[providers.*]` table becomes a provider, and the default provider
/// is always registered even without a table of its own.
pub fn build_from_config(config: &analyst_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let provider = build_provider(name, provider_config.api_url.as_deref(), &api_key);
        router.register(name.clone(), provider);
    }

    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let provider = build_provider(&config.default_provider, None, &api_key);
        router.register(config.default_provider.clone(), provider);
    }

    debug!(providers = ?router.list(), default = %config.default_provider, "Providers built");
    router
}

fn build_provider(name: &str, api_url: Option<&str>, api_key: &str) -> Arc<dyn Provider> {
    match name {
        "mock" => Arc::new(MockProvider::demo()),
        "anthropic" => {
            let provider = AnthropicProvider::new(api_key);
            match api_url {
                Some(url) => Arc::new(provider.with_base_url(url)),
                None => Arc::new(provider),
            }
        }
        "ollama" => Arc::new(OpenAiCompatProvider::ollama(api_url)),
        _ => match api_url {
            Some(url) => Arc::new(OpenAiCompatProvider::new(name, url, api_key)),
            None => match name {
                "openai" => Arc::new(OpenAiCompatProvider::openai(api_key)),
                "openrouter" => Arc::new(OpenAiCompatProvider::openrouter(api_key)),
                _ => Arc::new(OpenAiCompatProvider::new(
                    name,
                    default_base_url(name),
                    api_key,
                )),
            },
        },
    }
}

/// Default base URL for OpenAI-compatible providers without a named constructor.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
