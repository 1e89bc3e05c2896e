//! A mutable, in-memory host page.
//!
//! The page is a single `scraper::Html` tree. Host-side rendering is modelled
//! by grafting parsed fragments into it, and removal by detaching subtrees, so
//! node identity ([`NodeKey`]) stays stable for as long as a subtree lives.
//! Every insertion is reported to subscribers as a [`MutationBatch`], the
//! equivalent of a `childList`/`subtree` mutation observer.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use tokio::sync::mpsc;

/// Identity of one node in the page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(NodeId);

/// Top-level nodes added to the page by one mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationBatch {
    pub added: Vec<NodeKey>,
}

/// A source of subtree insertion notifications.
pub trait InsertionSource {
    /// Subscribe to every insertion made from now on.
    fn observe_insertions(&mut self) -> mpsc::UnboundedReceiver<MutationBatch>;
}

#[derive(Debug)]
pub struct Page {
    html: Html,
    observers: Vec<mpsc::UnboundedSender<MutationBatch>>,
}

impl Page {
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn element(&self, key: NodeKey) -> Option<ElementRef<'_>> {
        self.html.tree.get(key.0).and_then(ElementRef::wrap)
    }

    /// `true` while the node is reachable from the document root.
    #[must_use]
    pub fn is_attached(&self, key: NodeKey) -> bool {
        let Some(node) = self.html.tree.get(key.0) else {
            return false;
        };
        let root = self.html.tree.root().id();
        node.id() == root || node.ancestors().any(|a| a.id() == root)
    }

    #[must_use]
    pub fn body(&self) -> Option<NodeKey> {
        self.html
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .map(|el| NodeKey(el.id()))
    }

    /// Every attached element matching `selector`, in document order.
    #[must_use]
    pub fn select_all(&self, selector: &Selector) -> Vec<NodeKey> {
        self.attached(selector).map(|el| NodeKey(el.id())).collect()
    }

    #[must_use]
    pub fn select_first(&self, selector: &Selector) -> Option<NodeKey> {
        self.attached(selector).next().map(|el| NodeKey(el.id()))
    }

    /// Matches reachable from the document root. `Html::select` walks the
    /// whole node arena, detached subtrees included.
    fn attached<'a>(
        &'a self,
        selector: &'a Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(move |el| selector.matches(el))
    }

    /// Elements matching `selector` inside `scope`, optionally counting
    /// `scope` itself.
    #[must_use]
    pub fn select_within(
        &self,
        scope: NodeKey,
        selector: &Selector,
        include_scope: bool,
    ) -> Vec<NodeKey> {
        let Some(el) = self.element(scope) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if include_scope && selector.matches(&el) {
            found.push(scope);
        }
        found.extend(
            el.select(selector)
                .filter(|m| m.id() != el.id())
                .map(|m| NodeKey(m.id())),
        );
        found
    }

    /// First element inside `scope` (or `scope` itself) satisfying `predicate`.
    pub fn find_within(
        &self,
        scope: NodeKey,
        predicate: impl Fn(ElementRef<'_>) -> bool,
    ) -> Option<NodeKey> {
        let el = self.element(scope)?;
        el.descendants()
            .filter_map(ElementRef::wrap)
            .find(|candidate| predicate(*candidate))
            .map(|found| NodeKey(found.id()))
    }

    /// Trimmed `value` attribute of the first input, across `selectors` in
    /// order, that has a non-empty one.
    #[must_use]
    pub fn input_value(&self, selectors: &[Selector]) -> Option<String> {
        selectors.iter().find_map(|selector| {
            self.attached(selector)
                .filter_map(|el| el.value().attr("value"))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_owned)
        })
    }

    /// Parse `markup` as a fragment and append its nodes to `parent`.
    /// Returns the top-level nodes added.
    pub fn append_html(&mut self, parent: NodeKey, markup: &str) -> Vec<NodeKey> {
        if self.html.tree.get(parent.0).is_none() {
            return Vec::new();
        }
        let fragment = Html::parse_fragment(markup);
        let added: Vec<NodeKey> = fragment
            .root_element()
            .children()
            .filter_map(|child| graft(&mut self.html.tree, parent.0, child))
            .map(NodeKey)
            .collect();
        self.notify(&added);
        added
    }

    /// Replace the children of `target` with the nodes of `markup`.
    pub fn set_inner_html(&mut self, target: NodeKey, markup: &str) -> Vec<NodeKey> {
        let Some(node) = self.html.tree.get(target.0) else {
            return Vec::new();
        };
        let children: Vec<NodeId> = node.children().map(|c| c.id()).collect();
        for child in children {
            if let Some(mut child) = self.html.tree.get_mut(child) {
                child.detach();
            }
        }
        self.append_html(target, markup)
    }

    /// Detach `key` and its subtree from the page. Returns `false` if it was
    /// not attached.
    pub fn remove(&mut self, key: NodeKey) -> bool {
        if !self.is_attached(key) || key.0 == self.html.tree.root().id() {
            return false;
        }
        match self.html.tree.get_mut(key.0) {
            Some(mut node) => {
                node.detach();
                true
            }
            None => false,
        }
    }

    fn notify(&mut self, added: &[NodeKey]) {
        if added.is_empty() {
            return;
        }
        let batch = MutationBatch {
            added: added.to_vec(),
        };
        self.observers.retain(|tx| tx.send(batch.clone()).is_ok());
    }
}

impl InsertionSource for Page {
    fn observe_insertions(&mut self) -> mpsc::UnboundedReceiver<MutationBatch> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }
}

/// Deep-copy `source` under `parent`, returning the id of the copy.
fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) -> Option<NodeId> {
    let id = tree.get_mut(parent)?.append(source.value().clone()).id();
    for child in source.children() {
        graft(tree, id, child);
    }
    Some(id)
}
