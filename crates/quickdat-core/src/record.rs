//! The extracted-fields record for one load popup.
//!
//! Every field is either a non-empty trimmed string or `""`. Absence is the
//! normal state for most fields on a freshly rendered popup, so nothing here
//! uses `Option`: templating and URL composition treat `""` as "not posted".

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static DISTANCE_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z/])(?:mi|miles?)(?:$|[^a-z])").expect("valid distance unit regex")
});

/// One named field of a [`LoadRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Origin,
    Destination,
    Date,
    Phone,
    Email,
    Rate,
    Commodity,
    Weight,
    Reference,
    PickupTime,
    DeliveryTime,
}

impl FieldKind {
    pub const ALL: [FieldKind; 11] = [
        FieldKind::Origin,
        FieldKind::Destination,
        FieldKind::Date,
        FieldKind::Phone,
        FieldKind::Email,
        FieldKind::Rate,
        FieldKind::Commodity,
        FieldKind::Weight,
        FieldKind::Reference,
        FieldKind::PickupTime,
        FieldKind::DeliveryTime,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Origin => "origin",
            FieldKind::Destination => "destination",
            FieldKind::Date => "date",
            FieldKind::Phone => "phone",
            FieldKind::Email => "email",
            FieldKind::Rate => "rate",
            FieldKind::Commodity => "commodity",
            FieldKind::Weight => "weight",
            FieldKind::Reference => "reference",
            FieldKind::PickupTime => "pickup_time",
            FieldKind::DeliveryTime => "delivery_time",
        }
    }

    /// Pickup and delivery windows are filled in by the host page after the
    /// popup first renders.
    #[must_use]
    pub fn is_time(self) -> bool {
        matches!(self, FieldKind::PickupTime | FieldKind::DeliveryTime)
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadRecord {
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub phone: String,
    pub email: String,
    pub rate: String,
    pub commodity: String,
    pub weight: String,
    pub reference: String,
    pub pickup_time: String,
    pub delivery_time: String,
}

impl LoadRecord {
    #[must_use]
    pub fn get(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::Origin => &self.origin,
            FieldKind::Destination => &self.destination,
            FieldKind::Date => &self.date,
            FieldKind::Phone => &self.phone,
            FieldKind::Email => &self.email,
            FieldKind::Rate => &self.rate,
            FieldKind::Commodity => &self.commodity,
            FieldKind::Weight => &self.weight,
            FieldKind::Reference => &self.reference,
            FieldKind::PickupTime => &self.pickup_time,
            FieldKind::DeliveryTime => &self.delivery_time,
        }
    }

    fn slot_mut(&mut self, kind: FieldKind) -> &mut String {
        match kind {
            FieldKind::Origin => &mut self.origin,
            FieldKind::Destination => &mut self.destination,
            FieldKind::Date => &mut self.date,
            FieldKind::Phone => &mut self.phone,
            FieldKind::Email => &mut self.email,
            FieldKind::Rate => &mut self.rate,
            FieldKind::Commodity => &mut self.commodity,
            FieldKind::Weight => &mut self.weight,
            FieldKind::Reference => &mut self.reference,
            FieldKind::PickupTime => &mut self.pickup_time,
            FieldKind::DeliveryTime => &mut self.delivery_time,
        }
    }

    /// Stores `value` trimmed; whitespace-only input becomes absent.
    pub fn set(&mut self, kind: FieldKind, value: &str) {
        value.trim().clone_into(self.slot_mut(kind));
    }

    #[must_use]
    pub fn has(&self, kind: FieldKind) -> bool {
        !self.get(kind).is_empty()
    }

    /// Both route endpoints are known.
    #[must_use]
    pub fn has_route(&self) -> bool {
        self.has(FieldKind::Origin) && self.has(FieldKind::Destination)
    }

    /// Neither route endpoint is known.
    #[must_use]
    pub fn lacks_route(&self) -> bool {
        !self.has(FieldKind::Origin) && !self.has(FieldKind::Destination)
    }

    /// Fills every absent field from `other`, keeping fields already present.
    pub fn fill_missing_from(&mut self, other: &LoadRecord) {
        for kind in FieldKind::ALL {
            if !self.has(kind) && other.has(kind) {
                self.set(kind, other.get(kind));
            }
        }
    }

    /// Re-establishes the trimmed-or-empty invariant, e.g. after
    /// deserializing a hand-written record.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for kind in FieldKind::ALL {
            let value = self.get(kind).to_owned();
            self.set(kind, &value);
        }
        self
    }

    /// A reference ID is usable unless it is absent or one of the dash
    /// placeholders the load board prints in empty cells.
    #[must_use]
    pub fn has_valid_reference(&self) -> bool {
        self.has(FieldKind::Reference) && !is_dash_placeholder(&self.reference)
    }
}

/// Hyphen, en dash and em dash all mean "no value" on the load board.
#[must_use]
pub fn is_dash_placeholder(value: &str) -> bool {
    matches!(value.trim(), "-" | "\u{2013}" | "\u{2014}")
}

/// `true` when `text` carries a distance unit token such as `450 mi`.
///
/// The rate slot is sometimes reused for trip mileage; this is how such
/// values are told apart from a real rate. A unit directly after `/` is a
/// per-mile rate (`$2.10/mi`) and does not count.
#[must_use]
pub fn contains_distance_unit(text: &str) -> bool {
    DISTANCE_UNIT_RE.is_match(text)
}
