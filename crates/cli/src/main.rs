//! Startup Analyst CLI: the main entry point.
//!
//! Commands:
//! - `analyze`  Assess one startup description and print the JSON
//! - `chat`     Interactive mode against a single memory session
//! - `prompt`   Print the system prompt
//! - `config`   Print the effective or default configuration
//! - `health`   Check that the provider is reachable

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "analyst",
    about = "Startup Analyst: structured, validated assessments of early-stage startups",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.analyst/config.toml
    #[arg(long, global = true, env = "ANALYST_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a startup description (argument or stdin)
    Analyze {
        /// Description text; read from stdin when omitted
        text: Option<String>,

        /// Memory session id. Memory is not persisted, so a one-shot run
        /// starts empty; use `chat` to carry memory across turns
        #[arg(short, long)]
        session: Option<String>,

        /// Also write the assessment to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Override the configured provider
        #[arg(long)]
        provider: Option<String>,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
    },

    /// Assess descriptions interactively within one session
    Chat {
        /// Session id; a random one is generated when omitted
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the system prompt sent on every attempt
    Prompt {
        /// Print each instruction section under its name, without markers
        #[arg(long)]
        sections: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Print the built-in defaults instead
        #[arg(long)]
        defaults: bool,
    },

    /// Check that the configured provider is reachable
    Health {
        /// Override the configured provider
        #[arg(long)]
        provider: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let code = match cli.command {
        Commands::Analyze {
            text,
            session,
            output,
            provider,
            model,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let overrides = commands::Overrides { provider, model };
            let args = commands::analyze::Args {
                text,
                session,
                output,
            };
            commands::analyze::run(&config, &overrides, args).await?
        }
        Commands::Chat { session } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::chat::run(&config, session).await?
        }
        Commands::Prompt { sections } => commands::prompt::run(sections),
        Commands::Config { defaults } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::config_cmd::show(&config, defaults)
        }
        Commands::Health { provider } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let overrides = commands::Overrides {
                provider,
                model: None,
            };
            commands::health::run(&config, &overrides).await?
        }
    };

    Ok(code)
}

/// Logs go to stderr so stdout carries only results.
fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
