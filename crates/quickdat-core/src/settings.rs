//! User settings: the email body template and the empty-body toggle.
//!
//! Persisted as a flat JSON record (`{"emailTemplate": ..., "emptyBodyOption": ...}`).
//! Read once at startup; a failed read falls back to the built-in defaults
//! and is only logged.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_EMAIL_TEMPLATE: &str = "Hello,

I'm interested in the load from {{ORIGIN}} to {{DESTINATION}}{{DATE}}.

Could you please confirm the following:
- Pickup time ({{PICKUP_TIME}})
- Delivery time ({{DELIVERY_TIME}})
- Weight and commodity ({{COMMODITY}}, {{WEIGHT}})
- Any special requirements
- Your best rate (posted: {{RATE}})

Reference ID: {{REFERENCE}}

Thank you,";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub email_template: String,
    pub empty_body_option: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email_template: DEFAULT_EMAIL_TEMPLATE.to_owned(),
            empty_body_option: false,
        }
    }
}

impl Settings {
    /// The template to render with. A blank stored template means "use the default".
    #[must_use]
    pub fn effective_template(&self) -> &str {
        if self.email_template.trim().is_empty() {
            DEFAULT_EMAIL_TEMPLATE
        } else {
            &self.email_template
        }
    }

    pub fn restore_default_template(&mut self) {
        DEFAULT_EMAIL_TEMPLATE.clone_into(&mut self.email_template);
    }
}

/// File-backed settings persistence.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsIo`] if the file cannot be read and
    /// [`ConfigError::SettingsParse`] if it is not a valid settings record.
    pub fn try_load(&self) -> Result<Settings, ConfigError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| ConfigError::SettingsIo {
                path: self.path.display().to_string(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::SettingsParse {
            path: self.path.display().to_string(),
            source,
        })
    }

    /// Read the settings file, falling back to [`Settings::default`] on any failure.
    #[must_use]
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(ConfigError::SettingsIo { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                tracing::debug!(path = %self.path.display(), "no settings file; using defaults");
                Settings::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load settings; using defaults");
                Settings::default()
            }
        }
    }

    /// Write `settings` as pretty JSON, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SettingsIo`] if the file cannot be written.
    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::SettingsIo {
            path: self.path.display().to_string(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(settings).map_err(|source| {
            ConfigError::SettingsParse {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        std::fs::write(&self.path, body).map_err(io_err)?;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
