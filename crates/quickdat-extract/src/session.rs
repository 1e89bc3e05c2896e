//! One page view: popups found by the watcher are extracted, decorated with
//! action buttons and kept up to date as late values arrive.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use quickdat_compose::{mail_compose_url, render, route_url, DispatchTargets};
use quickdat_core::{FieldKind, LoadRecord, Settings};

use crate::error::ActionError;
use crate::extract::{extract_field, extract_record};
use crate::inject::{inject_action, Action};
use crate::locator::LocatorSet;
use crate::page::{MutationBatch, Page};
use crate::retry::{Attempt, LateValue, RetryState, RetrySupervisor};
use crate::watcher::{PopupHandle, PopupPhase, PopupWatcher};

/// Fields the host page is known to fill in after the popup renders.
const LATE_FIELDS: [FieldKind; 3] = [
    FieldKind::Email,
    FieldKind::PickupTime,
    FieldKind::DeliveryTime,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PopupReady {
        popup: PopupHandle,
        record: LoadRecord,
        actions: Vec<Action>,
    },
    PopupIncomplete {
        popup: PopupHandle,
    },
    LateValue(LateValue),
    ActionInjected {
        popup: PopupHandle,
        action: Action,
    },
    DraftUpdated {
        popup: PopupHandle,
        body: String,
    },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::PopupReady {
                popup,
                record,
                actions,
            } => {
                let actions: Vec<&str> = actions.iter().map(|a| a.as_str()).collect();
                write!(
                    f,
                    "{popup} ready: {} -> {} [{}]",
                    record.origin,
                    record.destination,
                    actions.join(", ")
                )
            }
            SessionEvent::PopupIncomplete { popup } => {
                write!(f, "{popup} incomplete, probing for route")
            }
            SessionEvent::LateValue(late) => {
                write!(f, "{} late {}: {}", late.popup, late.kind, late.value)
            }
            SessionEvent::ActionInjected { popup, action } => {
                write!(f, "{popup} injected {action}")
            }
            SessionEvent::DraftUpdated { popup, body } => {
                write!(f, "{popup} draft updated ({} chars)", body.chars().count())
            }
        }
    }
}

/// The URL an action resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub popup: PopupHandle,
    pub action: Action,
    pub url: String,
}

#[derive(Debug)]
pub struct Session {
    locators: LocatorSet,
    settings: Settings,
    targets: DispatchTargets,
    watcher: PopupWatcher,
    retries: RetrySupervisor,
    drafts: HashMap<PopupHandle, String>,
}

impl Session {
    #[must_use]
    pub fn new(locators: LocatorSet, settings: Settings, targets: DispatchTargets) -> Self {
        let watcher = PopupWatcher::new(locators.popup().clone());
        Self {
            locators,
            settings,
            targets,
            watcher,
            retries: RetrySupervisor::new(),
            drafts: HashMap::new(),
        }
    }

    /// Process every popup already in the page.
    pub fn start(&mut self, page: &mut Page, now: Duration) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for popup in self.watcher.scan_existing(page) {
            self.process(page, popup, now, &mut events);
        }
        events
    }

    /// Process popups added by one mutation batch.
    pub fn on_insertions(
        &mut self,
        page: &mut Page,
        batch: &MutationBatch,
        now: Duration,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for popup in self.watcher.observe(page, batch) {
            self.process(page, popup, now, &mut events);
        }
        events
    }

    /// Run every retry due at `now` and apply the values that arrived.
    pub fn poll_retries(&mut self, page: &mut Page, now: Duration) -> Vec<SessionEvent> {
        let watcher = &self.watcher;
        let locators = &self.locators;
        let late = {
            let page: &Page = page;
            self.retries.poll(now, |popup, kind| {
                reattempt(page, watcher, locators, popup, kind)
            })
        };

        let mut events = Vec::new();
        for value in late {
            events.extend(self.apply_late_value(page, value));
        }
        events
    }

    /// Record a late value: stash it on the popup, patch the injected UI if it
    /// now qualifies for more actions, and re-render the draft.
    pub fn apply_late_value(&mut self, page: &mut Page, late: LateValue) -> Vec<SessionEvent> {
        let mut events = vec![SessionEvent::LateValue(late.clone())];
        let Some(entry) = self.watcher.get_mut(late.popup) else {
            return events;
        };
        entry.stashed.set(late.kind, &late.value);
        let (node, phase) = (entry.node, entry.phase);

        match (late.kind, phase) {
            (FieldKind::Origin | FieldKind::Destination, PopupPhase::Incomplete) => {
                if let Some(record) = self.current_record(page, late.popup) {
                    self.finish(page, late.popup, record, &mut events);
                }
                return events;
            }
            (FieldKind::Email, PopupPhase::Done) => {
                if inject_action(page, node, Action::Email, self.locators.action_area()) {
                    events.push(SessionEvent::ActionInjected {
                        popup: late.popup,
                        action: Action::Email,
                    });
                }
            }
            _ => {}
        }

        if let Some(record) = self.current_record(page, late.popup) {
            events.push(self.refresh_draft(late.popup, &record));
        }
        events
    }

    fn process(
        &mut self,
        page: &mut Page,
        popup: PopupHandle,
        now: Duration,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(record) = self.current_record(page, popup) else {
            return;
        };

        for kind in LATE_FIELDS {
            self.retries.schedule_retry(popup, kind, record.get(kind), now);
        }

        if record.lacks_route() {
            if let Some(entry) = self.watcher.get_mut(popup) {
                entry.phase = PopupPhase::Incomplete;
            }
            for endpoint in [FieldKind::Origin, FieldKind::Destination] {
                self.retries.schedule_retry(popup, endpoint, "", now);
            }
            tracing::info!(%popup, "popup has no route yet, actions withheld");
            events.push(SessionEvent::PopupIncomplete { popup });
            return;
        }

        self.finish(page, popup, record, events);
    }

    /// Inject the actions `record` qualifies for and mark the popup done.
    fn finish(
        &mut self,
        page: &mut Page,
        popup: PopupHandle,
        record: LoadRecord,
        events: &mut Vec<SessionEvent>,
    ) {
        let Some(entry) = self.watcher.get_mut(popup) else {
            return;
        };
        entry.phase = PopupPhase::Done;
        let node = entry.node;

        let mut actions = vec![Action::Route];
        if record.has(FieldKind::Email) {
            actions.push(Action::Email);
        }
        for &action in &actions {
            if inject_action(page, node, action, self.locators.action_area()) {
                events.push(SessionEvent::ActionInjected { popup, action });
            }
        }

        tracing::info!(
            %popup,
            origin = %record.origin,
            destination = %record.destination,
            has_email = record.has(FieldKind::Email),
            "popup processed"
        );
        let body = render(self.settings.effective_template(), &record);
        self.drafts.insert(popup, body);
        events.push(SessionEvent::PopupReady {
            popup,
            record,
            actions,
        });
    }

    fn refresh_draft(&mut self, popup: PopupHandle, record: &LoadRecord) -> SessionEvent {
        let body = render(self.settings.effective_template(), record);
        self.drafts.insert(popup, body.clone());
        SessionEvent::DraftUpdated { popup, body }
    }

    /// Fresh extraction with stashed late values filling the gaps.
    fn current_record(&self, page: &Page, popup: PopupHandle) -> Option<LoadRecord> {
        let entry = self.watcher.get(popup)?;
        let root = page.element(entry.node)?;
        let mut record = extract_record(root, &self.locators);
        record.fill_missing_from(&entry.stashed);
        Some(record)
    }

    /// Current record for `popup`, or `None` for an unknown handle.
    #[must_use]
    pub fn record(&self, page: &Page, popup: PopupHandle) -> Option<LoadRecord> {
        self.current_record(page, popup)
    }

    #[must_use]
    pub fn phase(&self, popup: PopupHandle) -> Option<PopupPhase> {
        self.watcher.get(popup).map(|entry| entry.phase)
    }

    #[must_use]
    pub fn retry_state(&self, popup: PopupHandle, kind: FieldKind) -> Option<RetryState> {
        self.retries.state(popup, kind)
    }

    /// Last rendered email body for `popup`.
    #[must_use]
    pub fn draft(&self, popup: PopupHandle) -> Option<&str> {
        self.drafts.get(&popup).map(String::as_str)
    }

    #[must_use]
    pub fn next_retry_deadline(&self) -> Option<Duration> {
        self.retries.next_deadline()
    }

    #[must_use]
    pub fn popup_count(&self) -> usize {
        self.watcher.len()
    }

    #[must_use]
    pub fn latest_popup(&self, page: &Page) -> Option<PopupHandle> {
        self.watcher.latest_attached(page)
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Swap in freshly saved settings and re-render every draft with them.
    pub fn update_settings(&mut self, page: &Page, settings: Settings) -> Vec<SessionEvent> {
        self.settings = settings;
        let mut popups: Vec<PopupHandle> = self.drafts.keys().copied().collect();
        popups.sort_unstable();
        popups
            .into_iter()
            .filter_map(|popup| {
                let record = self.current_record(page, popup)?;
                Some(self.refresh_draft(popup, &record))
            })
            .collect()
    }

    /// Resolve `action` for `popup` against the page as it is now.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownPopup`] or [`ActionError::Detached`] when
    /// the popup cannot be read, and [`ActionError::Dispatch`] when a route is
    /// requested without both endpoints.
    pub fn invoke(
        &self,
        page: &Page,
        popup: PopupHandle,
        action: Action,
    ) -> Result<Dispatch, ActionError> {
        let entry = self
            .watcher
            .get(popup)
            .ok_or(ActionError::UnknownPopup(popup))?;
        if !page.is_attached(entry.node) {
            return Err(ActionError::Detached(popup));
        }
        let record = self
            .current_record(page, popup)
            .ok_or(ActionError::Detached(popup))?;

        let url = match action {
            Action::Route => {
                let user_origin = page.input_value(self.locators.search_origin());
                route_url(
                    &self.targets.maps_base_url,
                    &record,
                    user_origin.as_deref(),
                )?
            }
            Action::Email => mail_compose_url(&self.targets.mail_base_url, &record, &self.settings),
        };

        tracing::info!(%popup, action = %action, "action dispatched");
        Ok(Dispatch { popup, action, url })
    }

    /// [`Session::invoke`] on the most recently observed popup still attached.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NoPopup`] when no popup is attached, otherwise
    /// any [`Session::invoke`] error.
    pub fn invoke_latest(&self, page: &Page, action: Action) -> Result<Dispatch, ActionError> {
        let popup = self
            .watcher
            .latest_attached(page)
            .ok_or(ActionError::NoPopup)?;
        self.invoke(page, popup, action)
    }
}

/// One retry attempt for `(popup, kind)`.
///
/// A route probe re-runs one endpoint chain; the session re-extracts the full
/// record once either endpoint hits.
fn reattempt(
    page: &Page,
    watcher: &PopupWatcher,
    locators: &LocatorSet,
    popup: PopupHandle,
    kind: FieldKind,
) -> Attempt {
    let Some(entry) = watcher.get(popup) else {
        return Attempt::Detached;
    };
    if !page.is_attached(entry.node) {
        return Attempt::Detached;
    }
    let (Some(root), Some(chain)) = (page.element(entry.node), locators.chain(kind)) else {
        return Attempt::Miss;
    };
    let value = extract_field(root, chain, kind);
    if value.is_empty() {
        Attempt::Miss
    } else {
        Attempt::Hit(value)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
