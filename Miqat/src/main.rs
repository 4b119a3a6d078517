mod cli;
mod commands;
mod logs;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use miqconfig::{get_config, Config};
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // --config / MIQAT_CONFIG court-circuite le singleton découvert
    let config = match &cli.config {
        Some(dir) => Arc::new(Config::load_config(&dir.to_string_lossy())?),
        None => get_config(),
    };
    logs::init_logging(&config);
    debug!(config_dir = %config.directory(), "Configuration loaded");

    match cli.command {
        Command::Next {
            location,
            once,
            adhan,
        } => commands::next(&config, location, once, adhan).await,
        Command::Qiblah { location, heading } => commands::qiblah(&config, location, heading),
        Command::Locate { address, dry_run } => commands::locate(&config, &address, dry_run).await,
        Command::Voices => commands::voices(&config).await,
        Command::Download { voice } => commands::download(&config, voice).await,
        Command::Play {
            voice,
            style,
            prayer,
        } => commands::play(&config, voice, style, &prayer).await,
        Command::Alerts { prayer, state } => commands::alerts(&config, prayer, state),
        Command::Cache { action } => commands::cache(&config, action).await,
    }
}
