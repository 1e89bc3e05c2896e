//! Popup discovery: finds load popups in the page and hands each one out
//! exactly once.

use std::collections::HashMap;
use std::fmt;

use quickdat_core::LoadRecord;
use scraper::Selector;

use crate::page::{MutationBatch, NodeKey, Page};

/// Arena index of an observed popup, assigned on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupHandle(pub(crate) usize);

impl fmt::Display for PopupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupPhase {
    /// Seen, first extraction pass not finished.
    Processing,
    /// Actions injected.
    Done,
    /// Neither route endpoint was found; waiting on the route probe.
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct PopupEntry {
    pub node: NodeKey,
    pub phase: PopupPhase,
    /// Values delivered by retries, merged into every later extraction.
    pub stashed: LoadRecord,
}

#[derive(Debug)]
pub struct PopupWatcher {
    popup_selector: Selector,
    seen: HashMap<NodeKey, PopupHandle>,
    arena: Vec<PopupEntry>,
}

impl PopupWatcher {
    #[must_use]
    pub fn new(popup_selector: Selector) -> Self {
        Self {
            popup_selector,
            seen: HashMap::new(),
            arena: Vec::new(),
        }
    }

    /// Popups already in the page when the session starts.
    pub fn scan_existing(&mut self, page: &Page) -> Vec<PopupHandle> {
        page.select_all(&self.popup_selector)
            .into_iter()
            .filter_map(|node| self.admit(node))
            .collect()
    }

    /// New popups in a mutation batch, including popups nested anywhere
    /// inside an inserted subtree.
    pub fn observe(&mut self, page: &Page, batch: &MutationBatch) -> Vec<PopupHandle> {
        let mut found = Vec::new();
        for &added in &batch.added {
            if !page.is_attached(added) {
                tracing::debug!("inserted subtree already detached, skipping");
                continue;
            }
            for node in page.select_within(added, &self.popup_selector, true) {
                if let Some(handle) = self.admit(node) {
                    found.push(handle);
                }
            }
        }
        found
    }

    /// Register `node`, returning its new handle, or `None` if it was seen before.
    fn admit(&mut self, node: NodeKey) -> Option<PopupHandle> {
        if self.seen.contains_key(&node) {
            return None;
        }
        let handle = PopupHandle(self.arena.len());
        self.arena.push(PopupEntry {
            node,
            phase: PopupPhase::Processing,
            stashed: LoadRecord::default(),
        });
        self.seen.insert(node, handle);
        tracing::debug!(popup = %handle, "popup observed");
        Some(handle)
    }

    #[must_use]
    pub fn get(&self, handle: PopupHandle) -> Option<&PopupEntry> {
        self.arena.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: PopupHandle) -> Option<&mut PopupEntry> {
        self.arena.get_mut(handle.0)
    }

    /// Most recently observed popup that is still attached.
    #[must_use]
    pub fn latest_attached(&self, page: &Page) -> Option<PopupHandle> {
        self.arena
            .iter()
            .enumerate()
            .rev()
            .find(|(_, entry)| page.is_attached(entry.node))
            .map(|(index, _)| PopupHandle(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}
