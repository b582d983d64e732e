//! Generation backends for the startup analyst chain.
//!
//! All providers implement the `analyst_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod anthropic;
pub mod mock;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
