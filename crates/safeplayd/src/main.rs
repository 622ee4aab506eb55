//! safeplayd - game session monitoring and playtime enforcement
//!
//! Wires together the components:
//! - Configuration loading
//! - Core engine (registry, timers, adaptive poller, overlay gate)
//! - Host adapter (Linux /proc + SIGTERM)
//! - IPC server

use anyhow::{Context, Result};
use clap::Parser;
use safeplay_config::{load_config, Settings};
use safeplay_host_api::ProcessHost;
use safeplay_host_linux::LinuxProcessHost;
use safeplay_util::default_config_path;
use safeplayd::Service;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// safeplayd - Game session monitoring and playtime enforcement
#[derive(Parser, Debug)]
#[command(name = "safeplayd")]
#[command(about = "Game session monitoring and playtime enforcement service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/safeplay/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set SAFEPLAY_SOCKET env var)
    #[arg(short, long, env = "SAFEPLAY_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "safeplayd starting");

    // Missing config file means defaults; a present but broken one is fatal
    let settings = if args.config.exists() {
        let settings = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;
        info!(config_path = %args.config.display(), "Configuration loaded");
        settings
    } else {
        info!(
            config_path = %args.config.display(),
            "No config file, using defaults"
        );
        Settings::default()
    };

    let socket_path = args
        .socket
        .unwrap_or_else(|| settings.service.socket_path.clone());

    let host: Arc<dyn ProcessHost> = Arc::new(LinuxProcessHost::new(
        settings.monitor.library_markers.clone(),
    ));

    let service = Service::new(settings, &socket_path, host).await?;
    service.run().await
}
