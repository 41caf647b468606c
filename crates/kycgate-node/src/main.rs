//! kycgate node: entry point.
//!
//! Starts the verification orchestration node with configuration from a TOML
//! file or defaults.

mod api;
mod config;
mod node;
mod state;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::KycgateConfig;
use kycgate_core::{Environment, ProviderMode};
use node::KycgateNode;

/// kycgate node
#[derive(Parser, Debug)]
#[command(name = "kycgate-node", version, about = "Identity verification orchestration node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "kycgate.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the deployment environment (development, production).
    #[arg(long)]
    environment: Option<String>,

    /// Use the in-memory sandbox provider instead of the configured one.
    #[arg(long)]
    sandbox: bool,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = KycgateConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = KycgateConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref environment) = args.environment {
        config.environment = match environment.as_str() {
            "development" => Environment::Development,
            "production" => Environment::Production,
            other => anyhow::bail!("unknown environment {other:?}"),
        };
    }
    if args.sandbox {
        config.provider.mode = ProviderMode::Sandbox;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    config.validate()?;

    tracing::info!("kycgate node v{}", env!("CARGO_PKG_VERSION"));

    // Create and start the node
    let mut node = KycgateNode::new(config)?;
    node.start().await?;

    // Set up graceful shutdown on SIGINT
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node exited");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!("kycgate node exited cleanly");
    Ok(())
}
