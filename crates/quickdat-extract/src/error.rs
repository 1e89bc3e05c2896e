use quickdat_compose::DispatchError;
use quickdat_core::FieldKind;
use thiserror::Error;

use crate::watcher::PopupHandle;

/// Errors raised while building locator chains.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("locator chain for {field} is empty")]
    EmptyChain { field: FieldKind },

    #[error("failed to read locators file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse locators file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors raised when a user action on a popup cannot proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("no load popup has been observed")]
    NoPopup,

    #[error("unknown popup {0}")]
    UnknownPopup(PopupHandle),

    #[error("{0} is no longer attached to the page")]
    Detached(PopupHandle),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl ActionError {
    /// Message shown to the user in place of the action.
    #[must_use]
    pub fn notice(&self) -> &'static str {
        match self {
            ActionError::NoPopup => "Open a load's details first.",
            ActionError::UnknownPopup(_) | ActionError::Detached(_) => {
                "That load is no longer on the page."
            }
            ActionError::Dispatch(err) => err.notice(),
        }
    }
}

/// Errors raised while loading a replay scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("step {index}: {source}")]
    Step {
        index: usize,
        #[source]
        source: LocatorError,
    },
}
