//! Outbound URLs built from a [`LoadRecord`]: a compose-mail draft and a
//! driving-directions route. Nothing is sent anywhere; callers open the URL.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quickdat_core::{FieldKind, LoadRecord, Settings};

use crate::error::DispatchError;
use crate::template::{date_suffix, render};

/// Characters left bare by `encodeURIComponent`; everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTargets {
    pub mail_base_url: String,
    pub maps_base_url: String,
}

impl Default for DispatchTargets {
    fn default() -> Self {
        Self {
            mail_base_url: "https://mail.google.com/mail/".to_owned(),
            maps_base_url: "https://www.google.com/maps/dir/".to_owned(),
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

fn with_trailing_slash(base: &str) -> String {
    format!("{}/", base.trim_end_matches('/'))
}

/// `Load Inquiry: {origin} to {destination}`, plus ` ({date})` when a date is
/// known and ` [Ref: {reference}]` when the reference is not a dash placeholder.
#[must_use]
pub fn subject_line(record: &LoadRecord) -> String {
    let mut subject = format!(
        "Load Inquiry: {} to {}{}",
        record.get(FieldKind::Origin),
        record.get(FieldKind::Destination),
        date_suffix(record.get(FieldKind::Date)),
    );
    if record.has_valid_reference() {
        subject.push_str(&format!(" [Ref: {}]", record.reference));
    }
    subject
}

/// Compose-mail URL for `record`.
///
/// The body is the rendered template, or left out entirely when the user
/// opted for an empty body.
#[must_use]
pub fn mail_compose_url(base_url: &str, record: &LoadRecord, settings: &Settings) -> String {
    let mut url = format!(
        "{}?view=cm&fs=1&to={}&su={}",
        with_trailing_slash(base_url),
        encode(record.get(FieldKind::Email)),
        encode(&subject_line(record)),
    );
    if !settings.empty_body_option {
        let body = render(settings.effective_template(), record);
        url.push_str("&body=");
        url.push_str(&encode(&body));
    }
    url
}

/// Waypoints for a route: `[origin, destination]`, led by the user's own
/// search origin when one is known and differs from the load's origin.
///
/// # Errors
///
/// Returns [`DispatchError::InsufficientData`] unless both origin and
/// destination are present.
pub fn route_waypoints(
    record: &LoadRecord,
    user_origin: Option<&str>,
) -> Result<Vec<String>, DispatchError> {
    if !record.has_route() {
        return Err(DispatchError::InsufficientData {
            has_origin: record.has(FieldKind::Origin),
            has_destination: record.has(FieldKind::Destination),
        });
    }

    let mut waypoints = Vec::with_capacity(3);
    if let Some(start) = user_origin.map(str::trim).filter(|s| !s.is_empty()) {
        if !start.eq_ignore_ascii_case(&record.origin) {
            waypoints.push(start.to_owned());
        }
    }
    waypoints.push(record.origin.clone());
    waypoints.push(record.destination.clone());
    Ok(waypoints)
}

/// Driving-directions URL through every waypoint of [`route_waypoints`].
///
/// # Errors
///
/// Returns [`DispatchError::InsufficientData`] unless both origin and
/// destination are present.
pub fn route_url(
    base_url: &str,
    record: &LoadRecord,
    user_origin: Option<&str>,
) -> Result<String, DispatchError> {
    let waypoints = route_waypoints(record, user_origin)?;
    let path = waypoints
        .iter()
        .map(|w| encode(w))
        .collect::<Vec<_>>()
        .join("/");
    Ok(format!("{}{path}", with_trailing_slash(base_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LoadRecord {
        LoadRecord {
            origin: "Dallas, TX".to_owned(),
            destination: "Atlanta, GA".to_owned(),
            email: "ops@broker.com".to_owned(),
            ..LoadRecord::default()
        }
    }

    #[test]
    fn subject_without_date_or_reference() {
        assert_eq!(
            subject_line(&record()),
            "Load Inquiry: Dallas, TX to Atlanta, GA"
        );
    }

    #[test]
    fn subject_with_date_and_reference() {
        let mut r = record();
        r.date = "8/5".to_owned();
        r.reference = "PO-4471".to_owned();
        assert_eq!(
            subject_line(&r),
            "Load Inquiry: Dallas, TX to Atlanta, GA (8/5) [Ref: PO-4471]"
        );
    }

    #[test]
    fn subject_skips_dash_reference() {
        let mut r = record();
        r.reference = "\u{2013}".to_owned();
        assert_eq!(
            subject_line(&r),
            "Load Inquiry: Dallas, TX to Atlanta, GA"
        );
    }

    #[test]
    fn mail_url_encodes_components() {
        let settings = Settings {
            email_template: "Hi {{ORIGIN}}".to_owned(),
            empty_body_option: false,
        };
        let url = mail_compose_url("https://mail.google.com/mail", &record(), &settings);
        assert_eq!(
            url,
            "https://mail.google.com/mail/?view=cm&fs=1&to=ops%40broker.com\
             &su=Load%20Inquiry%3A%20Dallas%2C%20TX%20to%20Atlanta%2C%20GA\
             &body=Hi%20Dallas%2C%20TX"
        );
    }

    #[test]
    fn mail_url_omits_body_when_empty_body_selected() {
        let settings = Settings {
            empty_body_option: true,
            ..Settings::default()
        };
        let url = mail_compose_url("https://mail.google.com/mail/", &record(), &settings);
        assert!(!url.contains("body="), "{url}");
        assert!(url.contains("&su=Load%20Inquiry"));
    }

    #[test]
    fn route_two_waypoints() {
        let url = route_url("https://www.google.com/maps/dir/", &record(), None).unwrap();
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/Dallas%2C%20TX/Atlanta%2C%20GA"
        );
    }

    #[test]
    fn route_led_by_user_origin() {
        let waypoints = route_waypoints(&record(), Some(" Fort Worth, TX ")).unwrap();
        assert_eq!(waypoints, ["Fort Worth, TX", "Dallas, TX", "Atlanta, GA"]);
    }

    #[test]
    fn route_ignores_user_origin_equal_to_load_origin() {
        let waypoints = route_waypoints(&record(), Some("dallas, tx")).unwrap();
        assert_eq!(waypoints, ["Dallas, TX", "Atlanta, GA"]);
    }

    #[test]
    fn route_requires_both_endpoints() {
        let mut r = record();
        r.destination = String::new();
        let err = route_url("https://www.google.com/maps/dir/", &r, None).unwrap_err();
        assert_eq!(
            err,
            DispatchError::InsufficientData {
                has_origin: true,
                has_destination: false
            }
        );
        assert_eq!(
            err.notice(),
            "Could not extract origin and destination from the load details."
        );
    }
}
