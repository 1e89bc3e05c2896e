//! The session loop: interleaves page insertions, scripted page mutations and
//! retry deadlines on the tokio clock until nothing is left to wait for.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use crate::page::{InsertionSource, MutationBatch, Page};
use crate::session::{Session, SessionEvent};

/// Timed page mutations applied while the session runs.
pub trait PageScript {
    /// Offset from the start of the run of the next pending mutation.
    fn next_at(&self) -> Option<Duration>;

    /// Apply every mutation due at `now`.
    fn apply_due(&mut self, page: &mut Page, now: Duration);
}

/// A page nobody touches after load.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPage;

impl PageScript for StaticPage {
    fn next_at(&self) -> Option<Duration> {
        None
    }

    fn apply_due(&mut self, _page: &mut Page, _now: Duration) {}
}

/// Run `session` over `page` until no retry and no scripted mutation remains.
///
/// Every event is handed to `on_event` as it happens. Returns the time the run
/// took on the tokio clock.
pub async fn drive<S, F>(
    session: &mut Session,
    page: &mut Page,
    script: &mut S,
    mut on_event: F,
) -> Duration
where
    S: PageScript,
    F: FnMut(&SessionEvent),
{
    let mut insertions = page.observe_insertions();
    let started = Instant::now();

    for event in session.start(page, Duration::ZERO) {
        on_event(&event);
    }

    loop {
        let now = started.elapsed();
        script.apply_due(page, now);
        drain(session, page, &mut insertions, now, &mut on_event);
        for event in session.poll_retries(page, now) {
            on_event(&event);
        }
        drain(session, page, &mut insertions, now, &mut on_event);

        let next = [session.next_retry_deadline(), script.next_at()]
            .into_iter()
            .flatten()
            .min();
        let Some(next) = next else {
            break;
        };

        tokio::select! {
            biased;
            Some(batch) = insertions.recv() => {
                for event in session.on_insertions(page, &batch, started.elapsed()) {
                    on_event(&event);
                }
            }
            () = time::sleep_until(started + next) => {}
        }
    }

    let elapsed = started.elapsed();
    tracing::debug!(
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        popups = session.popup_count(),
        "session idle"
    );
    elapsed
}

/// Process every insertion batch already queued.
fn drain<F>(
    session: &mut Session,
    page: &mut Page,
    insertions: &mut mpsc::UnboundedReceiver<MutationBatch>,
    now: Duration,
    on_event: &mut F,
) where
    F: FnMut(&SessionEvent),
{
    while let Ok(batch) = insertions.try_recv() {
        for event in session.on_insertions(page, &batch, now) {
            on_event(&event);
        }
    }
}
