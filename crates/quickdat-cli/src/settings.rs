//! `settings` subcommands: the options page, on the command line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use quickdat_compose::Placeholder;
use quickdat_core::{AppConfig, Settings, SettingsStore};

#[derive(Debug, Subcommand)]
pub enum SettingsCommands {
    /// Print the saved settings
    Show,
    /// List the placeholders a template can use
    Placeholders,
    /// Replace the email template with the contents of a file
    SetTemplate {
        file: PathBuf,
    },
    /// Put the built-in email template back
    RestoreDefault,
    /// Open drafts with an empty body instead of the template
    SetEmptyBody {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// Apply `command` to `settings`. Returns whether anything changed.
fn apply(settings: &mut Settings, command: &SettingsCommands) -> anyhow::Result<bool> {
    match command {
        SettingsCommands::Show | SettingsCommands::Placeholders => Ok(false),
        SettingsCommands::SetTemplate { file } => {
            settings.email_template = std::fs::read_to_string(file)
                .with_context(|| format!("reading template {}", file.display()))?;
            Ok(true)
        }
        SettingsCommands::RestoreDefault => {
            settings.restore_default_template();
            Ok(true)
        }
        SettingsCommands::SetEmptyBody { enabled } => {
            settings.empty_body_option = *enabled;
            Ok(true)
        }
    }
}

/// # Errors
///
/// Returns an error if a template file cannot be read or the settings file
/// cannot be written.
pub(crate) fn run_settings(
    config: &AppConfig,
    command: &SettingsCommands,
) -> anyhow::Result<()> {
    let store = SettingsStore::new(&config.settings_path);
    let mut settings = store.load();

    if matches!(command, SettingsCommands::Placeholders) {
        for placeholder in Placeholder::ALL {
            println!("{}", placeholder.token());
        }
        return Ok(());
    }

    if apply(&mut settings, command)? {
        store.save(&settings)?;
    }
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
