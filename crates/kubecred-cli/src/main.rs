//! Kubecred CLI: issue and verify credentials from the command line.
//!
//! Subcommands: issue, verify, health.

mod client;
mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client::{ApiClient, ClientOptions};

/// Kubecred credential issuance and verification client.
#[derive(Parser, Debug)]
#[command(name = "kubecred", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: ClientOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Issue a credential.
    Issue(commands::issue::IssueArgs),
    /// Verify a credential id.
    Verify(commands::verify::VerifyArgs),
    /// Check a service's health endpoint.
    Health(commands::health::HealthArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let client = ApiClient::new(&cli.options)?;

    match &cli.command {
        Commands::Issue(args) => commands::issue::run(&client, args).await,
        Commands::Verify(args) => commands::verify::run(&client, args).await,
        Commands::Health(args) => commands::health::run(&client, args).await,
    }
}
