use std::time::Duration;

use quickdat_compose::DispatchTargets;
use quickdat_core::{FieldKind, Settings};
use scraper::Selector;

use super::*;
use crate::page::{InsertionSource, NodeKey};

const DALLAS_ATLANTA: &str = r#"<dat-load-details>
  <div class="details-header"></div>
  <div class="trip-place"><div>Dallas, TX</div><div>Atlanta, GA</div></div>
  <div class="data-item-total">$2.10</div>
  <div class="contacts__email"></div>
</dat-load-details>"#;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn session() -> Session {
    Session::new(
        LocatorSet::default(),
        Settings::default(),
        DispatchTargets::default(),
    )
}

fn select(page: &Page, css: &str) -> Vec<NodeKey> {
    page.select_all(&Selector::parse(css).unwrap())
}

fn injected(events: &[SessionEvent], wanted: Action) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::ActionInjected { action, .. } if *action == wanted))
        .count()
}

// ---------------------------------------------------------------------------
// First pass
// ---------------------------------------------------------------------------

#[test]
fn existing_popup_gets_route_action_only() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    let events = session.start(&mut page, ms(0));

    assert_eq!(injected(&events, Action::Route), 1);
    assert_eq!(injected(&events, Action::Email), 0);
    let popup = session.latest_popup(&page).unwrap();
    assert_eq!(session.phase(popup), Some(PopupPhase::Done));
    assert_eq!(
        session.retry_state(popup, FieldKind::Email),
        Some(RetryState::Pending { next_attempt: 0 })
    );
    assert!(session.draft(popup).unwrap().contains("from Dallas, TX to Atlanta, GA"));
    assert_eq!(select(&page, "button[data-quickdat-action]").len(), 1);
}

#[test]
fn popup_inserted_twice_in_batches_is_processed_once() {
    let mut page = Page::parse("<body></body>");
    let mut rx = page.observe_insertions();
    let body = page.body().unwrap();
    page.append_html(body, DALLAS_ATLANTA);
    let batch = rx.try_recv().unwrap();

    let mut session = session();
    let first = session.on_insertions(&mut page, &batch, ms(0));
    let second = session.on_insertions(&mut page, &batch, ms(50));
    assert_eq!(injected(&first, Action::Route), 1);
    assert!(second.is_empty());
    assert_eq!(session.popup_count(), 1);
    assert_eq!(select(&page, "button[data-quickdat-action=route]").len(), 1);
}

#[test]
fn popup_without_route_is_incomplete() {
    let mut page = Page::parse(
        r#"<body><dat-load-details><div class="route"></div></dat-load-details></body>"#,
    );
    let mut session = session();
    let events = session.start(&mut page, ms(0));

    let popup = session.latest_popup(&page).unwrap();
    assert_eq!(events, [SessionEvent::PopupIncomplete { popup }]);
    assert_eq!(session.phase(popup), Some(PopupPhase::Incomplete));
    assert!(select(&page, "button").is_empty());
    assert_eq!(session.next_retry_deadline(), Some(ms(300)));
}

// ---------------------------------------------------------------------------
// Late values
// ---------------------------------------------------------------------------

#[test]
fn late_email_injects_mail_action_exactly_once() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();

    assert!(session.poll_retries(&mut page, ms(500)).is_empty());
    let contacts = select(&page, ".contacts__email")[0];
    page.set_inner_html(contacts, "ops@broker.com");

    let events = session.poll_retries(&mut page, ms(1_000));
    assert!(events.contains(&SessionEvent::LateValue(LateValue {
        popup,
        kind: FieldKind::Email,
        value: "ops@broker.com".to_owned(),
    })));
    assert_eq!(injected(&events, Action::Email), 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::DraftUpdated { .. })));

    // Delivering the same value again never duplicates the button.
    let again = session.apply_late_value(
        &mut page,
        LateValue {
            popup,
            kind: FieldKind::Email,
            value: "ops@broker.com".to_owned(),
        },
    );
    assert_eq!(injected(&again, Action::Email), 0);
    assert_eq!(select(&page, "button[data-quickdat-action=email]").len(), 1);
    assert_eq!(
        session.retry_state(popup, FieldKind::Email),
        Some(RetryState::Resolved)
    );
}

#[test]
fn late_time_value_is_stashed_and_rendered() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();

    let late = LateValue {
        popup,
        kind: FieldKind::PickupTime,
        value: "Mon 08:00".to_owned(),
    };
    let events = session.apply_late_value(&mut page, late);
    assert_eq!(events.len(), 2);
    assert!(session.draft(popup).unwrap().contains("Pickup time (Mon 08:00)"));
    assert_eq!(
        session.record(&page, popup).unwrap().pickup_time,
        "Mon 08:00"
    );
}

#[test]
fn origin_probe_completes_the_popup() {
    let mut page = Page::parse(
        r#"<body><dat-load-details><div class="route"></div></dat-load-details></body>"#,
    );
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();

    let route = select(&page, ".route")[0];
    page.set_inner_html(
        route,
        r#"<div class="route-origin"><span class="city">Dallas, TX</span></div>
           <div class="route-destination"><span class="city">Atlanta, GA</span></div>"#,
    );

    let events = session.poll_retries(&mut page, ms(500));
    assert_eq!(session.phase(popup), Some(PopupPhase::Done));
    assert_eq!(injected(&events, Action::Route), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::PopupReady { record, .. } if record.destination == "Atlanta, GA"
    )));
    assert_eq!(
        session.retry_state(popup, FieldKind::Origin),
        Some(RetryState::Resolved)
    );
}

#[test]
fn destination_arriving_first_completes_the_popup() {
    let mut page = Page::parse(
        r#"<body><dat-load-details><div class="route-destination"></div></dat-load-details></body>"#,
    );
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();
    assert_eq!(session.phase(popup), Some(PopupPhase::Incomplete));

    let destination = select(&page, ".route-destination")[0];
    page.set_inner_html(destination, r#"<span class="city">Atlanta, GA</span>"#);

    let events = session.poll_retries(&mut page, ms(500));
    assert_eq!(session.phase(popup), Some(PopupPhase::Done));
    assert_eq!(injected(&events, Action::Route), 1);
    assert!(events.contains(&SessionEvent::LateValue(LateValue {
        popup,
        kind: FieldKind::Destination,
        value: "Atlanta, GA".to_owned(),
    })));
    assert_eq!(
        session.retry_state(popup, FieldKind::Destination),
        Some(RetryState::Resolved)
    );
    // The origin never shows up; its probe runs out without undoing anything.
    for at in [1_500, 3_000] {
        assert!(session.poll_retries(&mut page, ms(at)).is_empty());
    }
    assert_eq!(
        session.retry_state(popup, FieldKind::Origin),
        Some(RetryState::Abandoned)
    );
    assert_eq!(select(&page, "button[data-quickdat-action=route]").len(), 1);
}

#[test]
fn removed_search_origin_is_not_a_waypoint() {
    let mut page = Page::parse(&format!(
        r#"<body><div class="search-origin"><input formcontrolname="origin" value="Fort Worth, TX"></div>{DALLAS_ATLANTA}</body>"#
    ));
    let mut session = session();
    session.start(&mut page, ms(0));

    let search = select(&page, ".search-origin")[0];
    page.remove(search);
    let dispatch = session.invoke_latest(&page, Action::Route).unwrap();
    assert_eq!(
        dispatch.url,
        "https://www.google.com/maps/dir/Dallas%2C%20TX/Atlanta%2C%20GA"
    );
}

#[test]
fn detached_popup_abandons_its_retries() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();

    let node = select(&page, "dat-load-details")[0];
    page.remove(node);
    assert!(session.poll_retries(&mut page, ms(500)).is_empty());
    assert_eq!(
        session.retry_state(popup, FieldKind::Email),
        Some(RetryState::Abandoned)
    );
    assert_eq!(
        session.retry_state(popup, FieldKind::PickupTime),
        Some(RetryState::Abandoned)
    );
    assert_eq!(session.next_retry_deadline(), None);
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[test]
fn route_uses_search_origin_input() {
    let mut page = Page::parse(&format!(
        r#"<body><input formcontrolname="origin" value="Fort Worth, TX">{DALLAS_ATLANTA}</body>"#
    ));
    let mut session = session();
    session.start(&mut page, ms(0));

    let dispatch = session.invoke_latest(&page, Action::Route).unwrap();
    assert_eq!(
        dispatch.url,
        "https://www.google.com/maps/dir/Fort%20Worth%2C%20TX/Dallas%2C%20TX/Atlanta%2C%20GA"
    );
}

#[test]
fn email_without_address_opens_blank_recipient() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    session.start(&mut page, ms(0));

    let dispatch = session.invoke_latest(&page, Action::Email).unwrap();
    assert!(dispatch.url.contains("&to=&su=Load%20Inquiry"), "{}", dispatch.url);
}

#[test]
fn route_without_endpoints_is_a_notice() {
    let mut page = Page::parse("<body><dat-load-details></dat-load-details></body>");
    let mut session = session();
    session.start(&mut page, ms(0));

    let err = session.invoke_latest(&page, Action::Route).unwrap_err();
    assert_eq!(
        err.notice(),
        "Could not extract origin and destination from the load details."
    );
}

#[test]
fn invoke_without_popup() {
    let page = Page::parse("<body></body>");
    let err = session().invoke_latest(&page, Action::Email).unwrap_err();
    assert_eq!(err, ActionError::NoPopup);
}

#[test]
fn updated_settings_rerender_drafts() {
    let mut page = Page::parse(&format!("<body>{DALLAS_ATLANTA}</body>"));
    let mut session = session();
    session.start(&mut page, ms(0));
    let popup = session.latest_popup(&page).unwrap();

    let events = session.update_settings(
        &page,
        Settings {
            email_template: "Rate {{RATE}}".to_owned(),
            empty_body_option: false,
        },
    );
    assert_eq!(
        events,
        [SessionEvent::DraftUpdated {
            popup,
            body: "Rate $2.10".to_owned()
        }]
    );
    assert_eq!(session.draft(popup), Some("Rate $2.10"));
}
