//! `{{NAME}}` placeholder substitution for the email body.
//!
//! Not a templating language: the only construct is a
//! literal token from [`Placeholder::ALL`]. Anything else in the template,
//! including unknown or half-written tokens, is copied through verbatim.
//! Substituted values are never re-scanned, so a field that happens to contain
//! `{{RATE}}` is inserted as-is.

use std::sync::LazyLock;

use quickdat_core::{contains_distance_unit, is_dash_placeholder, FieldKind, LoadRecord};
use regex::{Captures, Regex};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("valid placeholder regex"));

const PICKUP_DELIVERY_LEAD: &str = "- Pickup and delivery times";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Origin,
    Destination,
    Date,
    Rate,
    Commodity,
    Weight,
    Reference,
    PickupTime,
    DeliveryTime,
    PickupDelivery,
}

impl Placeholder {
    pub const ALL: [Placeholder; 10] = [
        Placeholder::Origin,
        Placeholder::Destination,
        Placeholder::Date,
        Placeholder::Rate,
        Placeholder::Commodity,
        Placeholder::Weight,
        Placeholder::Reference,
        Placeholder::PickupTime,
        Placeholder::DeliveryTime,
        Placeholder::PickupDelivery,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Placeholder::Origin => "ORIGIN",
            Placeholder::Destination => "DESTINATION",
            Placeholder::Date => "DATE",
            Placeholder::Rate => "RATE",
            Placeholder::Commodity => "COMMODITY",
            Placeholder::Weight => "WEIGHT",
            Placeholder::Reference => "REFERENCE",
            Placeholder::PickupTime => "PICKUP_TIME",
            Placeholder::DeliveryTime => "DELIVERY_TIME",
            Placeholder::PickupDelivery => "PICKUP_DELIVERY",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The token as typed into a template, e.g. `{{ORIGIN}}`.
    #[must_use]
    pub fn token(self) -> String {
        format!("{{{{{}}}}}", self.name())
    }

    /// The value this placeholder expands to for `record`.
    #[must_use]
    pub fn resolve(self, record: &LoadRecord) -> String {
        let field = |kind: FieldKind| record.get(kind).trim().to_owned();
        match self {
            Placeholder::Origin => field(FieldKind::Origin),
            Placeholder::Destination => field(FieldKind::Destination),
            Placeholder::Commodity => field(FieldKind::Commodity),
            Placeholder::Weight => field(FieldKind::Weight),
            Placeholder::Reference => field(FieldKind::Reference),
            Placeholder::PickupTime => field(FieldKind::PickupTime),
            Placeholder::DeliveryTime => field(FieldKind::DeliveryTime),
            Placeholder::Date => date_suffix(record.get(FieldKind::Date)),
            Placeholder::Rate => posted_rate(record.get(FieldKind::Rate))
                .unwrap_or_default()
                .to_owned(),
            Placeholder::PickupDelivery => pickup_delivery_line(
                record.get(FieldKind::PickupTime),
                record.get(FieldKind::DeliveryTime),
            ),
        }
    }
}

/// Renders `template` against `record`. Total: never fails.
#[must_use]
pub fn render(template: &str, record: &LoadRecord) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| {
            match Placeholder::from_name(&caps[1]) {
                Some(placeholder) => placeholder.resolve(record),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

/// `" (date)"` when a date was found, otherwise nothing at all.
#[must_use]
pub fn date_suffix(date: &str) -> String {
    let date = date.trim();
    if date.is_empty() {
        String::new()
    } else {
        format!(" ({date})")
    }
}

/// The rate worth quoting back to the broker, if any. A bare dash or a
/// mileage figure sitting in the rate slot is not a rate.
#[must_use]
pub fn posted_rate(rate: &str) -> Option<&str> {
    let rate = rate.trim();
    if rate.is_empty() || is_dash_placeholder(rate) || contains_distance_unit(rate) {
        None
    } else {
        Some(rate)
    }
}

#[must_use]
pub fn pickup_delivery_line(pickup: &str, delivery: &str) -> String {
    match (pickup.trim(), delivery.trim()) {
        ("", "") => PICKUP_DELIVERY_LEAD.to_owned(),
        (pickup, "") => format!("{PICKUP_DELIVERY_LEAD} (posted: {pickup})"),
        ("", delivery) => format!("{PICKUP_DELIVERY_LEAD} (posted: {delivery})"),
        (pickup, delivery) => format!("{PICKUP_DELIVERY_LEAD} (posted: {pickup} - {delivery})"),
    }
}

#[cfg(test)]
#[path = "template_test.rs"]
mod tests;
