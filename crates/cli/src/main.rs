use anyhow::Result;
use clap::{Parser, Subcommand};
use qdrant_mcp_launch::{ConfigKey, RuntimeConfig, ServerCommand};
use std::process::ExitCode;
use std::time::Duration;

mod probe;

use probe::Probe;

#[derive(Parser)]
#[command(name = "qmctl", about = "Inspect the Qdrant MCP server launch configuration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration and where each value came from
    Config {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the server command line the launcher would run
    Command,

    /// Check that Qdrant and the embedding provider are reachable
    Check {
        /// Per-request timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = RuntimeConfig::from_env();

    match cli.command {
        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config.to_json())?);
            } else {
                println!("Runtime configuration:");
                for key in ConfigKey::ALL {
                    println!(
                        "  {:<20} {:<32} ({})",
                        key.env_name(),
                        config.display_value(key),
                        config.source(key)
                    );
                }
            }
        }

        Commands::Command => {
            println!("{}", ServerCommand::from_env(config)?.command_line());
        }

        Commands::Check { timeout } => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout))
                .build()?;

            let qdrant = probe::probe_qdrant(&client, &config).await;
            report("Qdrant", &config.qdrant_url, &qdrant);

            let ollama = probe::probe_ollama(&client, &config).await;
            report("Ollama", &config.ollama_base_url, &ollama);

            if qdrant.is_failure() || ollama.is_failure() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report(name: &str, url: &str, probe: &Probe) {
    match probe {
        Probe::Reachable { detail, warning } => {
            println!("  {:<8} ok          {} — {}", name, url, detail);
            if let Some(warning) = warning {
                println!("           warning: {}", warning);
            }
        }
        Probe::Unreachable { error } => {
            println!("  {:<8} unreachable {} — {}", name, url, error);
        }
        Probe::Skipped { reason } => {
            println!("  {:<8} skipped     {}", name, reason);
        }
    }
}
