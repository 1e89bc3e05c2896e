//! Re-extraction of fields the host page fills in after the popup renders.
//!
//! Each `(popup, field)` pair runs a fixed delay schedule, measured from the
//! moment it was scheduled:
//!
//! | field                            | attempts at (ms)           |
//! |----------------------------------|----------------------------|
//! | pickup/delivery                  | 300, 800, 1500, 2500, 4000 |
//! | email                            | 500, 1000, 1500            |
//! | origin/destination (route probe) | 500, 1500, 3000            |
//!
//! The supervisor is a plain state machine over a logical clock (time since
//! the session started). It never sleeps; the session driver asks for
//! [`RetrySupervisor::next_deadline`] and calls [`RetrySupervisor::poll`].

use std::collections::BTreeMap;
use std::time::Duration;

use quickdat_core::FieldKind;

use crate::watcher::PopupHandle;

pub const TIME_DELAYS_MS: [u64; 5] = [300, 800, 1500, 2500, 4000];
pub const EMAIL_DELAYS_MS: [u64; 3] = [500, 1000, 1500];
/// Used when a popup rendered without either route endpoint.
pub const ROUTE_PROBE_DELAYS_MS: [u64; 3] = [500, 1500, 3000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySchedule(&'static [u64]);

impl RetrySchedule {
    /// The schedule for `kind`, if that field is ever populated late.
    #[must_use]
    pub fn for_field(kind: FieldKind) -> Option<Self> {
        match kind {
            FieldKind::PickupTime | FieldKind::DeliveryTime => Some(Self(&TIME_DELAYS_MS)),
            FieldKind::Email => Some(Self(&EMAIL_DELAYS_MS)),
            FieldKind::Origin | FieldKind::Destination => Some(Self(&ROUTE_PROBE_DELAYS_MS)),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0.is_empty()
    }

    fn delay(self, attempt: usize) -> Option<Duration> {
        self.0.get(attempt).copied().map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Pending { next_attempt: usize },
    Resolved,
    Abandoned,
}

/// Outcome of one re-extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// The popup is no longer attached to the page.
    Detached,
    Miss,
    Hit(String),
}

/// A field value that arrived after the popup was first processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateValue {
    pub popup: PopupHandle,
    pub kind: FieldKind,
    pub value: String,
}

#[derive(Debug, Clone)]
struct Entry {
    scheduled_at: Duration,
    schedule: RetrySchedule,
    state: RetryState,
}

impl Entry {
    fn deadline(&self) -> Option<Duration> {
        match self.state {
            RetryState::Pending { next_attempt } => self
                .schedule
                .delay(next_attempt)
                .map(|delay| self.scheduled_at + delay),
            RetryState::Resolved | RetryState::Abandoned => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RetrySupervisor {
    entries: BTreeMap<(PopupHandle, FieldKind), Entry>,
}

impl RetrySupervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the schedule for `(popup, kind)` unless the immediate extraction
    /// already produced a value, the field has no schedule, or the pair was
    /// scheduled before. Returns whether a schedule was started.
    pub fn schedule_retry(
        &mut self,
        popup: PopupHandle,
        kind: FieldKind,
        immediate: &str,
        now: Duration,
    ) -> bool {
        if !immediate.is_empty() || self.entries.contains_key(&(popup, kind)) {
            return false;
        }
        let Some(schedule) = RetrySchedule::for_field(kind) else {
            return false;
        };
        self.entries.insert(
            (popup, kind),
            Entry {
                scheduled_at: now,
                schedule,
                state: RetryState::Pending { next_attempt: 0 },
            },
        );
        tracing::debug!(%popup, field = %kind, attempts = schedule.len(), "retry scheduled");
        true
    }

    #[must_use]
    pub fn state(&self, popup: PopupHandle, kind: FieldKind) -> Option<RetryState> {
        self.entries.get(&(popup, kind)).map(|entry| entry.state)
    }

    /// Earliest pending attempt, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.values().filter_map(Entry::deadline).min()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry.state, RetryState::Pending { .. }))
            .count()
    }

    /// Fire every attempt that is due at `now`, in deadline order, one attempt
    /// per pair. `attempt` performs the re-extraction.
    pub fn poll(
        &mut self,
        now: Duration,
        mut attempt: impl FnMut(PopupHandle, FieldKind) -> Attempt,
    ) -> Vec<LateValue> {
        let mut due: Vec<(Duration, (PopupHandle, FieldKind))> = self
            .entries
            .iter()
            .filter_map(|(key, entry)| entry.deadline().map(|deadline| (deadline, *key)))
            .filter(|(deadline, _)| *deadline <= now)
            .collect();
        due.sort_unstable();

        let mut delivered = Vec::new();
        for (_, (popup, kind)) in due {
            let Some(entry) = self.entries.get_mut(&(popup, kind)) else {
                continue;
            };
            let RetryState::Pending { next_attempt } = entry.state else {
                continue;
            };

            match attempt(popup, kind) {
                Attempt::Detached => {
                    entry.state = RetryState::Abandoned;
                    tracing::debug!(%popup, field = %kind, "popup detached, retry dropped");
                }
                Attempt::Hit(value) => {
                    entry.state = RetryState::Resolved;
                    tracing::info!(
                        %popup,
                        field = %kind,
                        attempt = next_attempt + 1,
                        "late value extracted"
                    );
                    delivered.push(LateValue { popup, kind, value });
                }
                Attempt::Miss => {
                    let next = next_attempt + 1;
                    if next >= entry.schedule.len() {
                        entry.state = RetryState::Abandoned;
                        tracing::debug!(%popup, field = %kind, "retry schedule exhausted");
                    } else {
                        entry.state = RetryState::Pending { next_attempt: next };
                    }
                }
            }
        }
        delivered
    }
}
