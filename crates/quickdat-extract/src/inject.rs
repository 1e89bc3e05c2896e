//! Action buttons injected into a popup.

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::page::{NodeKey, Page};

const CONTAINER_CLASS: &str = "quickdat-actions";
const ACTION_ATTR: &str = "data-quickdat-action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Route,
    Email,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Route => "route",
            Action::Email => "email",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Action::Route => "View Route",
            Action::Email => "Email Broker",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            Action::Route => "\u{1f5fa}\u{fe0f}",
            Action::Email => "\u{1f4e7}",
        }
    }

    fn button_html(self) -> String {
        format!(
            r#"<button type="button" {ACTION_ATTR}="{}" title="{}">{}</button>"#,
            self.as_str(),
            self.title(),
            self.icon()
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_button_for(el: ElementRef<'_>, action: Action) -> bool {
    el.value().attr(ACTION_ATTR) == Some(action.as_str())
}

fn is_container(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|class| class == CONTAINER_CLASS)
}

/// `true` if `popup` already carries the button for `action`.
#[must_use]
pub fn has_action(page: &Page, popup: NodeKey, action: Action) -> bool {
    page.find_within(popup, |el| is_button_for(el, action))
        .is_some()
}

/// Add the button for `action` to `popup` unless it is already there.
///
/// Buttons live in one container, appended to the first action area found
/// (`action_area` in order) or to the popup itself. Returns whether a button
/// was inserted.
pub fn inject_action(
    page: &mut Page,
    popup: NodeKey,
    action: Action,
    action_area: &[Selector],
) -> bool {
    if !page.is_attached(popup) || has_action(page, popup, action) {
        return false;
    }

    let container = match page.find_within(popup, is_container) {
        Some(container) => container,
        None => {
            let area = action_area
                .iter()
                .find_map(|selector| page.select_within(popup, selector, false).first().copied())
                .unwrap_or(popup);
            let added = page.append_html(area, &format!(r#"<div class="{CONTAINER_CLASS}"></div>"#));
            let Some(&container) = added.first() else {
                return false;
            };
            container
        }
    };

    let inserted = !page.append_html(container, &action.button_html()).is_empty();
    if inserted {
        tracing::debug!(action = %action, "action button injected");
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn areas() -> Vec<Selector> {
        [".details-header_actions", ".details-header"]
            .iter()
            .map(|css| Selector::parse(css).unwrap())
            .collect()
    }

    fn popup(page: &Page) -> NodeKey {
        page.select_first(&Selector::parse("dat-load-details").unwrap())
            .unwrap()
    }

    fn count(page: &Page, css: &str) -> usize {
        page.select_all(&Selector::parse(css).unwrap()).len()
    }

    #[test]
    fn injection_is_idempotent() {
        let mut page = Page::parse(
            r#"<body><dat-load-details><div class="details-header"></div></dat-load-details></body>"#,
        );
        let node = popup(&page);

        assert!(inject_action(&mut page, node, Action::Route, &areas()));
        assert!(!inject_action(&mut page, node, Action::Route, &areas()));
        assert_eq!(count(&page, "button[data-quickdat-action=route]"), 1);
        assert_eq!(count(&page, ".details-header > .quickdat-actions"), 1);
    }

    #[test]
    fn second_action_shares_the_container() {
        let mut page = Page::parse(
            r#"<body><dat-load-details><div class="details-header_actions"></div><div class="details-header"></div></dat-load-details></body>"#,
        );
        let node = popup(&page);

        inject_action(&mut page, node, Action::Route, &areas());
        inject_action(&mut page, node, Action::Email, &areas());
        assert_eq!(count(&page, ".quickdat-actions"), 1);
        assert_eq!(count(&page, ".details-header_actions .quickdat-actions button"), 2);
        assert!(has_action(&page, node, Action::Email));
    }

    #[test]
    fn falls_back_to_popup_without_action_area() {
        let mut page = Page::parse("<body><dat-load-details><p>x</p></dat-load-details></body>");
        let node = popup(&page);
        assert!(inject_action(&mut page, node, Action::Email, &areas()));
        assert_eq!(count(&page, "dat-load-details > .quickdat-actions > button"), 1);
    }

    #[test]
    fn detached_popup_is_left_alone() {
        let mut page = Page::parse("<body><dat-load-details></dat-load-details></body>");
        let node = popup(&page);
        page.remove(node);
        assert!(!inject_action(&mut page, node, Action::Route, &areas()));
        assert!(!has_action(&page, node, Action::Route));
    }
}
