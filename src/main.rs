//! CLI entry point for instrument_server.
//!
//! Loads settings, attaches the configured devices, registers the built-in
//! command plugins, and serves line-oriented commands over TCP.
//!
//! # Usage
//!
//! ```bash
//! instrument_server --config config.toml
//! instrument_server --listen 0.0.0.0:9000
//! ```

use anyhow::Result;
use clap::Parser;
use instrument_server::command::PluginRegistry;
use instrument_server::config::Settings;
use instrument_server::device::build_registry;
use instrument_server::dispatch::Dispatcher;
use instrument_server::server::CommandServer;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "instrument_server")]
#[command(about = "Line-oriented command server for laboratory instruments", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen address
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::new(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        settings.server.listen_addr = listen;
    }

    let devices = build_registry(&settings).await?;
    info!(
        "Attached {} device(s): {}",
        devices.len(),
        devices.names().join(", ")
    );

    let plugins = PluginRegistry::with_builtins();
    let dispatcher = Arc::new(Dispatcher::new(plugins, Arc::new(devices)));

    let server = CommandServer::bind(&settings.server.listen_addr, dispatcher).await?;
    server.run().await?;
    Ok(())
}
