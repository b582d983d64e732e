//! `analyst chat`: interactive mode against one memory session.

use std::io::Write;
use std::process::ExitCode;

use analyst_chain::DeterministicChain;
use analyst_config::AppConfig;
use analyst_core::memory::SessionMemory;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Overrides;

/// What the loop should do after a line.
#[derive(Debug, PartialEq)]
enum Reply {
    /// Print to stdout and keep going.
    Stdout(String),
    /// Print to stderr and keep going.
    Stderr(String),
    Skip,
    Exit,
}

pub async fn run(
    config: &AppConfig,
    session: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let chain = super::build_chain(config, &Overrides::default())?;
    let session = session.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    println!();
    println!("  Startup Analyst: interactive mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", chain.model());
    println!("  Session:   {session}");
    println!();
    println!("  Describe a startup and press Enter.");
    println!("  /memory shows the session memory, /reset clears it, /exit quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match handle_line(&chain, &session, &line).await {
            Reply::Stdout(text) => println!("{text}\n"),
            Reply::Stderr(text) => eprintln!("{text}\n"),
            Reply::Skip => {}
            Reply::Exit => break,
        }
    }

    println!();
    Ok(ExitCode::SUCCESS)
}

async fn handle_line(chain: &DeterministicChain, session: &str, line: &str) -> Reply {
    match line.trim() {
        "" => Reply::Skip,
        "/exit" | "/quit" => Reply::Exit,
        "/memory" => {
            let entries = chain.memory().get_recent(Some(session)).await;
            if entries.is_empty() {
                Reply::Stdout("  (memory is empty)".into())
            } else {
                let lines: Vec<String> = entries.iter().map(|e| format!("  - {e}")).collect();
                Reply::Stdout(lines.join("\n"))
            }
        }
        "/reset" => {
            chain.memory().clear(session).await;
            Reply::Stdout("  Memory cleared.".into())
        }
        input => match chain.run(input, Some(session)).await {
            Ok(assessment) => match serde_json::to_string_pretty(&assessment) {
                Ok(json) => Reply::Stdout(json),
                Err(e) => Reply::Stderr(format!("  [Error] {e}")),
            },
            Err(failure) => Reply::Stderr(
                serde_json::to_string_pretty(&failure)
                    .unwrap_or_else(|_| format!("  [Error] {failure}")),
            ),
        },
    }
}
