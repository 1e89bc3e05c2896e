mod inspect;
mod replay;
mod settings;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use quickdat_core::AppConfig;
use quickdat_extract::LocatorSet;
use tracing_subscriber::EnvFilter;

use crate::settings::SettingsCommands;

#[derive(Debug, Parser)]
#[command(name = "quickdat")]
#[command(about = "Load-board popup extraction and inquiry drafting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the extracted record of every load popup in an HTML page
    Extract {
        /// Saved page HTML
        page: PathBuf,
    },
    /// Render the email body for a record
    Render {
        /// JSON file holding a load record
        #[arg(long)]
        record: PathBuf,
        /// Template file; defaults to the saved settings' template
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Replay timed page mutations through a live session
    Replay {
        /// Scenario YAML file
        scenario: PathBuf,
    },
    /// Inspect or change the saved settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = quickdat_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract { page } => inspect::run_extract(&config, &page)?,
        Commands::Render { record, template } => {
            inspect::run_render(&config, &record, template.as_deref())?;
        }
        Commands::Replay { scenario } => replay::run_replay(&config, &scenario).await?,
        Commands::Settings { command } => settings::run_settings(&config, &command)?,
    }

    Ok(())
}

/// Built-in locator chains, or the configured override file.
pub(crate) fn load_locators(config: &AppConfig) -> anyhow::Result<LocatorSet> {
    match &config.locators_path {
        Some(path) => LocatorSet::load(path)
            .with_context(|| format!("loading locators from {}", path.display())),
        None => Ok(LocatorSet::default()),
    }
}

#[cfg(test)]
mod tests;
