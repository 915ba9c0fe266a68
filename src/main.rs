//! battbar — battery charge and time-remaining indicator for text panels.
//!
//! Prints one status line per refresh on stdout; logs go to stderr.
//!
//! Run with:  `RUST_LOG=info battbar [config.toml]`

use anyhow::Result;
use battbar_config::{default_path, load as load_config, ConfigWatcher};
use battbar_core::{AppState, Message};
use battbar_system::{label, spawn_monitor};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging — RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("battbar v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_path);
    let mut config = load_config(&config_path)?;

    let (_watcher, mut reloads) = ConfigWatcher::spawn(&config_path);
    let mut updates = spawn_monitor(config.monitor.clone());
    let mut state = AppState::default();

    loop {
        let message = tokio::select! {
            Some(update) = updates.recv() => Message::Battery(update),
            Some(()) = reloads.recv() => Message::ConfigReloaded,
            _ = tokio::signal::ctrl_c() => Message::Shutdown,
        };

        match message {
            Message::Battery(update) => {
                state.apply(update);
                match label::render(&state, &config.display) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!("Cannot render status line: {e}"),
                }
            }
            Message::ConfigReloaded => match load_config(&config_path) {
                Ok(new_config) => {
                    info!("Config reloaded from {}", config_path.display());
                    if new_config.monitor != config.monitor {
                        // Dropping the old receiver stops the old monitor.
                        updates = spawn_monitor(new_config.monitor.clone());
                    }
                    config = new_config;
                }
                Err(e) => warn!("Keeping previous config: {e}"),
            },
            Message::Shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
