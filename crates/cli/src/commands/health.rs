//! `analyst health`: check that the configured provider is reachable.

use std::process::ExitCode;

use analyst_config::AppConfig;
use analyst_core::provider::Provider;

use super::Overrides;

pub async fn run(
    config: &AppConfig,
    overrides: &Overrides,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let (_, provider) = super::select_provider(config, overrides)?;
    let (line, healthy) = check(provider.as_ref()).await;
    println!("{line}");
    Ok(if healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn check(provider: &dyn Provider) -> (String, bool) {
    match provider.health_check().await {
        Ok(true) => (format!("{}: ok", provider.name()), true),
        Ok(false) => (
            format!("{}: unhealthy (endpoint answered with an error)", provider.name()),
            false,
        ),
        Err(e) => (format!("{}: unreachable ({e})", provider.name()), false),
    }
}
