//! Field extraction from one popup subtree.
//!
//! Extraction is total: a field that cannot be found is `""`, never an error.

use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use quickdat_core::{contains_distance_unit, FieldKind, LoadRecord};
use regex::Regex;
use scraper::ElementRef;

use crate::locator::{Locator, LocatorChain, LocatorSet};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid email regex")
});

/// Trim, and collapse every whitespace run (NBSP included) to one space.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First email address found in `text`.
#[must_use]
pub fn find_email(text: &str) -> Option<&str> {
    EMAIL_RE.find(text).map(|m| m.as_str())
}

/// Resolve `locator` against the first matching descendant of `root`.
///
/// Text locators read the element's text, falling back to its inner markup
/// when the text is empty. Attribute locators read the attribute with the
/// configured prefix and any query string removed, percent-decoded.
#[must_use]
pub fn probe(root: ElementRef<'_>, locator: &Locator) -> Option<String> {
    let element = root
        .select(locator.selector())
        .find(|el| el.id() != root.id())?;
    let spec = locator.spec();

    let value = match spec.attr.as_deref() {
        Some(attr) => {
            let raw = element.value().attr(attr)?;
            let raw = spec
                .strip_prefix
                .as_deref()
                .and_then(|prefix| strip_prefix_ignore_case(raw, prefix))
                .unwrap_or(raw);
            let raw = raw.split('?').next().unwrap_or_default();
            normalize_text(&percent_decode_str(raw).decode_utf8_lossy())
        }
        None => {
            let text = normalize_text(&element.text().collect::<String>());
            if text.is_empty() {
                normalize_text(&element.inner_html())
            } else {
                text
            }
        }
    };

    (!value.is_empty()).then_some(value)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    let head = value.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &value[prefix.len()..])
}

/// Run `chain` against `root` and return the first accepted value, or `""`.
#[must_use]
pub fn extract_field(root: ElementRef<'_>, chain: &LocatorChain, kind: FieldKind) -> String {
    for (index, locator) in chain.iter().enumerate() {
        let Some(value) = probe(root, locator) else {
            continue;
        };
        match accept(kind, &value) {
            Some(accepted) => return accepted,
            None => {
                tracing::debug!(
                    field = %kind,
                    locator = index,
                    css = %locator.spec().css,
                    "locator hit rejected by field filter"
                );
            }
        }
    }

    if kind == FieldKind::Email {
        let text = popup_text(root);
        if let Some(email) = find_email(&text) {
            return email.to_owned();
        }
    }

    tracing::debug!(field = %kind, "field not found");
    String::new()
}

/// Field-specific acceptance of a locator hit.
fn accept(kind: FieldKind, value: &str) -> Option<String> {
    match kind {
        FieldKind::Rate if contains_distance_unit(value) => None,
        FieldKind::Email => find_email(value).map(str::to_owned),
        _ => Some(value.to_owned()),
    }
}

/// All text under `root`, one space between text nodes.
fn popup_text(root: ElementRef<'_>) -> String {
    normalize_text(&root.text().collect::<Vec<_>>().join(" "))
}

/// Extract every field of a popup.
#[must_use]
pub fn extract_record(root: ElementRef<'_>, locators: &LocatorSet) -> LoadRecord {
    let mut record = LoadRecord::default();
    for kind in FieldKind::ALL {
        if let Some(chain) = locators.chain(kind) {
            record.set(kind, &extract_field(root, chain, kind));
        }
    }
    record
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
