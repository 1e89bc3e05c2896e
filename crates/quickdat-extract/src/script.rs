//! Replay scenarios: a page snapshot plus timed mutations, loaded from YAML.
//!
//! ```yaml
//! page: |
//!   <html><body><div id="board"></div></body></html>
//! steps:
//!   - at_ms: 0
//!     op: append
//!     target: "#board"
//!     html: "<dat-load-details>...</dat-load-details>"
//!   - at_ms: 700
//!     op: set_inner
//!     target: "dat-load-details .contacts__email"
//!     html: "ops@broker.com"
//!   - at_ms: 5000
//!     op: remove
//!     target: "dat-load-details"
//! invoke: [route, email]
//! ```

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::driver::PageScript;
use crate::error::{LocatorError, ScenarioError};
use crate::inject::Action;
use crate::page::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Append,
    SetInner,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_ms: u64,
    pub op: StepKind,
    /// Selector for the element the step acts on; the first match is used.
    pub target: String,
    #[serde(default)]
    pub html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub page: String,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    /// Actions to invoke on the latest popup once the page settles.
    #[serde(default)]
    pub invoke: Vec<Action>,
}

impl Scenario {
    /// # Errors
    ///
    /// Returns [`ScenarioError::Parse`] for malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// # Errors
    ///
    /// Returns [`ScenarioError::Io`] if the file cannot be read, otherwise any
    /// [`Scenario::from_yaml`] error.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    #[must_use]
    pub fn initial_page(&self) -> Page {
        Page::parse(&self.page)
    }
}

#[derive(Debug)]
struct CompiledStep {
    at: Duration,
    op: StepKind,
    target: Selector,
    html: String,
}

/// Plays a [`Scenario`]'s steps in time order.
#[derive(Debug)]
pub struct ScenarioPlayer {
    steps: VecDeque<CompiledStep>,
}

impl ScenarioPlayer {
    /// # Errors
    ///
    /// Returns [`ScenarioError::Step`] if a step's target selector is invalid.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut steps = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let target = Selector::parse(&step.target).map_err(|e| ScenarioError::Step {
                    index,
                    source: LocatorError::InvalidSelector {
                        selector: step.target.clone(),
                        reason: e.to_string(),
                    },
                })?;
                Ok(CompiledStep {
                    at: Duration::from_millis(step.at_ms),
                    op: step.op,
                    target,
                    html: step.html.clone(),
                })
            })
            .collect::<Result<Vec<_>, ScenarioError>>()?;
        steps.sort_by_key(|step| step.at);
        Ok(Self {
            steps: steps.into(),
        })
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl PageScript for ScenarioPlayer {
    fn next_at(&self) -> Option<Duration> {
        self.steps.front().map(|step| step.at)
    }

    fn apply_due(&mut self, page: &mut Page, now: Duration) {
        while self.steps.front().is_some_and(|step| step.at <= now) {
            let Some(step) = self.steps.pop_front() else {
                break;
            };
            let Some(target) = page.select_first(&step.target) else {
                tracing::warn!(op = ?step.op, "scenario step target not found, skipped");
                continue;
            };
            match step.op {
                StepKind::Append => {
                    page.append_html(target, &step.html);
                }
                StepKind::SetInner => {
                    page.set_inner_html(target, &step.html);
                }
                StepKind::Remove => {
                    page.remove(target);
                }
            }
            tracing::debug!(op = ?step.op, at = ?step.at, "scenario step applied");
        }
    }
}
