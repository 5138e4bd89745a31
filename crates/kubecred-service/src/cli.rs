//! Command-line entry shared by the service binaries.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{ServiceConfig, ServiceKind, StoreBackend};
use crate::{server, telemetry};

/// Kubecred credential service
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "kubecred.toml")]
    pub config: PathBuf,

    /// Override the listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Override the store backend (rocksdb, memory).
    #[arg(long)]
    pub store: Option<StoreBackend>,

    /// Fixed worker identity.
    #[arg(long)]
    pub worker_id: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    pub init: bool,
}

impl Args {
    /// Resolve the effective configuration: file, then environment, then flags.
    pub fn resolve_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = ServiceConfig::load(&self.config)?;
        config.apply_env()?;

        if let Some(port) = self.port {
            config.api.port = Some(port);
        }
        if let Some(ref data_dir) = self.data_dir {
            config.store.data_dir = data_dir.clone();
        }
        if let Some(backend) = self.store {
            config.store.backend = backend;
        }
        if let Some(ref worker_id) = self.worker_id {
            config.worker.id = Some(worker_id.clone());
        }
        if let Some(ref level) = self.log_level {
            config.logging.level = level.clone();
        }
        Ok(config)
    }
}

/// Parse arguments and run the `kind` service to completion.
pub async fn run(kind: ServiceKind) -> anyhow::Result<()> {
    let args = Args::parse();

    if args.init {
        let config = ServiceConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    let config = args.resolve_config()?;
    telemetry::init(&config.logging);

    tracing::info!("Kubecred {} service v{}", kind.name(), env!("CARGO_PKG_VERSION"));
    server::serve(kind, config).await
}
