//! `analyst analyze`: one description in, one JSON assessment out.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use analyst_config::AppConfig;
use tracing::info;

use super::Overrides;

pub struct Args {
    pub text: Option<String>,
    pub session: Option<String>,
    pub output: Option<PathBuf>,
}

pub async fn run(
    config: &AppConfig,
    overrides: &Overrides,
    args: Args,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let input = read_input(args.text, std::io::stdin().lock())?;
    let chain = super::build_chain(config, overrides)?;

    match chain.run(&input, args.session.as_deref()).await {
        Ok(assessment) => {
            let json = serde_json::to_string_pretty(&assessment)?;
            println!("{json}");
            if let Some(path) = &args.output {
                std::fs::write(path, format!("{json}\n"))
                    .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
                info!(path = %path.display(), "Assessment written");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("{}", serde_json::to_string_pretty(&failure)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The positional text if given, otherwise everything on `reader`.
fn read_input(
    text: Option<String>,
    mut reader: impl Read,
) -> Result<String, Box<dyn std::error::Error>> {
    let input = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            reader.read_to_string(&mut buf)?;
            buf
        }
    };

    let input = input.trim();
    if input.is_empty() {
        return Err("No startup description given (pass TEXT or pipe it on stdin)".into());
    }
    Ok(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_chain::DeterministicChain;
    use analyst_memory::RollingMemory;
    use analyst_providers::MockProvider;
    use std::sync::Arc;

    #[test]
    fn positional_text_wins_over_stdin() {
        let input = read_input(Some("  Acme  ".into()), "ignored".as_bytes()).unwrap();
        assert_eq!(input, "Acme");
    }

    #[test]
    fn stdin_is_read_when_no_text() {
        let input = read_input(None, "Acme from a pipe\n".as_bytes()).unwrap();
        assert_eq!(input, "Acme from a pipe");
    }

    #[test]
    fn blank_input_is_rejected() {
        assert!(read_input(None, "  \n".as_bytes()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_serializes_for_stderr() {
        let chain = DeterministicChain::new(
            Arc::new(MockProvider::fixed("not-json")),
            Arc::new(RollingMemory::new(4)),
            "m",
        );
        let failure = chain.run("Acme", None).await.unwrap_err();
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string_pretty(&failure).unwrap()).unwrap();
        assert_eq!(json["kind"], "invalid_json");
    }
}
