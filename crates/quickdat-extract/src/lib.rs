//! Field extraction engine for load-board popups.
//!
//! A [`Session`] watches a [`Page`] for `dat-load-details` popups, extracts a
//! [`quickdat_core::LoadRecord`] from each one through ordered locator chains,
//! retries fields the host page fills in late, and injects route/email action
//! buttons. [`drive`] runs a session against timed page mutations.

pub mod driver;
pub mod error;
pub mod extract;
pub mod inject;
pub mod locator;
pub mod page;
pub mod retry;
pub mod script;
pub mod session;
pub mod watcher;

pub use driver::{drive, PageScript, StaticPage};
pub use error::{ActionError, LocatorError, ScenarioError};
pub use extract::{extract_field, extract_record, normalize_text};
pub use inject::Action;
pub use locator::{LocatorChain, LocatorSet, LocatorSpec, LocatorsFile};
pub use page::{InsertionSource, MutationBatch, NodeKey, Page};
pub use retry::{LateValue, RetryState, RetrySupervisor};
pub use script::{Scenario, ScenarioPlayer};
pub use session::{Dispatch, Session, SessionEvent};
pub use watcher::{PopupHandle, PopupPhase};
