//! # posecast
//!
//! Pose relay binary: loads settings, initializes logging and metrics, and
//! serves the WebSocket relay until ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use posecast_core::logging;
use posecast_server::{PoseServer, ServerConfig};
use posecast_settings::PosecastSettings;

/// Real-time pose relay over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "posecast", about = "Real-time pose relay over WebSocket")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive, e.g. `info` or `posecast=debug` (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file (default `~/.posecast/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    /// Load layered settings, then apply command-line overrides.
    fn resolve_settings(&self) -> Result<PosecastSettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(posecast_settings::settings_path);
        let mut settings = posecast_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    logging::init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics_handle = posecast_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let server = PoseServer::new(ServerConfig::from(&settings.server)).with_metrics(metrics_handle);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!("posecast relay listening on ws://{addr}/ws");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let clean = server
        .shutdown()
        .graceful_shutdown(vec![handle], None)
        .await;

    tracing::info!(clean, "Shutdown complete");
    Ok(())
}
