//! Locator chains: the ordered selector strategies used to find each field.
//!
//! The load board's markup is an unstable, versioned schema. Each chain lists
//! the current layout first and older layouts after it; the extractor stops at
//! the first locator that produces a usable value. The built-in chains can be
//! overridden field by field from a YAML file without a rebuild.

use std::collections::BTreeMap;
use std::path::Path;

use quickdat_core::FieldKind;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::LocatorError;

const POPUP: &str = "dat-load-details";
const ACTION_AREA: [&str; 3] = [".details-header_actions", ".details-header", ".details-block"];
const SEARCH_ORIGIN: [&str; 3] = [
    "input[formcontrolname=\"origin\"]",
    ".search-origin input",
    "input[placeholder=\"Origin\"]",
];

/// How to read one candidate element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    pub css: String,
    /// Read this attribute instead of the element's text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<String>,
    /// Prefix removed from the attribute value (e.g. `mailto:`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_prefix: Option<String>,
}

impl LocatorSpec {
    #[must_use]
    pub fn css(css: &str) -> Self {
        Self {
            css: css.to_owned(),
            attr: None,
            strip_prefix: None,
        }
    }

    #[must_use]
    pub fn attr(css: &str, attr: &str, strip_prefix: &str) -> Self {
        Self {
            css: css.to_owned(),
            attr: Some(attr.to_owned()),
            strip_prefix: Some(strip_prefix.to_owned()),
        }
    }
}

/// A compiled [`LocatorSpec`].
#[derive(Debug, Clone)]
pub struct Locator {
    spec: LocatorSpec,
    selector: Selector,
}

impl Locator {
    /// # Errors
    ///
    /// Returns [`LocatorError::InvalidSelector`] if `spec.css` does not parse.
    pub fn compile(spec: LocatorSpec) -> Result<Self, LocatorError> {
        let selector = parse_selector(&spec.css)?;
        Ok(Self { spec, selector })
    }

    #[must_use]
    pub fn spec(&self) -> &LocatorSpec {
        &self.spec
    }

    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Ordered locators for one field. Earlier entries win.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    locators: Vec<Locator>,
}

impl LocatorChain {
    /// # Errors
    ///
    /// Returns [`LocatorError::EmptyChain`] for an empty list and
    /// [`LocatorError::InvalidSelector`] for any selector that does not parse.
    pub fn compile(field: FieldKind, specs: &[LocatorSpec]) -> Result<Self, LocatorError> {
        if specs.is_empty() {
            return Err(LocatorError::EmptyChain { field });
        }
        let locators = specs
            .iter()
            .cloned()
            .map(Locator::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { locators })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

/// On-disk override format. Anything left out keeps its built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorsFile {
    pub popup: Option<String>,
    pub action_area: Vec<String>,
    pub search_origin: Vec<String>,
    pub fields: BTreeMap<FieldKind, Vec<LocatorSpec>>,
}

/// Every selector the engine reads the host page with.
#[derive(Debug, Clone)]
pub struct LocatorSet {
    popup: Selector,
    action_area: Vec<Selector>,
    search_origin: Vec<Selector>,
    chains: BTreeMap<FieldKind, LocatorChain>,
}

impl LocatorSet {
    /// Built-in chains with the overrides from `file` applied on top.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError`] if any selector fails to parse or an
    /// override chain is empty.
    pub fn from_file(file: &LocatorsFile) -> Result<Self, LocatorError> {
        let popup = parse_selector(file.popup.as_deref().unwrap_or(POPUP))?;
        let action_area = parse_list(&file.action_area, &ACTION_AREA)?;
        let search_origin = parse_list(&file.search_origin, &SEARCH_ORIGIN)?;

        let mut chains = BTreeMap::new();
        for field in FieldKind::ALL {
            let chain = match file.fields.get(&field) {
                Some(specs) => LocatorChain::compile(field, specs)?,
                None => LocatorChain::compile(field, &builtin_chain(field))?,
            };
            chains.insert(field, chain);
        }

        Ok(Self {
            popup,
            action_area,
            search_origin,
            chains,
        })
    }

    /// Load overrides from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`LocatorError::Io`] / [`LocatorError::Parse`] if the file cannot
    /// be read or parsed, and any [`LocatorSet::from_file`] error.
    pub fn load(path: &Path) -> Result<Self, LocatorError> {
        let content = std::fs::read_to_string(path).map_err(|source| LocatorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: LocatorsFile =
            serde_yaml::from_str(&content).map_err(|source| LocatorError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let set = Self::from_file(&file)?;
        tracing::info!(
            path = %path.display(),
            overridden_fields = file.fields.len(),
            "loaded locator overrides"
        );
        Ok(set)
    }

    #[must_use]
    pub fn popup(&self) -> &Selector {
        &self.popup
    }

    #[must_use]
    pub fn action_area(&self) -> &[Selector] {
        &self.action_area
    }

    #[must_use]
    pub fn search_origin(&self) -> &[Selector] {
        &self.search_origin
    }

    /// The chain for `field`. Every field has one.
    #[must_use]
    pub fn chain(&self, field: FieldKind) -> Option<&LocatorChain> {
        self.chains.get(&field)
    }
}

impl Default for LocatorSet {
    fn default() -> Self {
        Self::from_file(&LocatorsFile::default()).expect("built-in locators are valid")
    }
}

fn parse_selector(css: &str) -> Result<Selector, LocatorError> {
    Selector::parse(css).map_err(|e| LocatorError::InvalidSelector {
        selector: css.to_owned(),
        reason: e.to_string(),
    })
}

fn parse_list(overrides: &[String], defaults: &[&str]) -> Result<Vec<Selector>, LocatorError> {
    if overrides.is_empty() {
        defaults.iter().map(|css| parse_selector(css)).collect()
    } else {
        overrides.iter().map(|css| parse_selector(css)).collect()
    }
}

/// Built-in chains, current layout first.
#[must_use]
pub fn builtin_chain(field: FieldKind) -> Vec<LocatorSpec> {
    let css = |list: &[&str]| list.iter().map(|s| LocatorSpec::css(s)).collect::<Vec<_>>();
    match field {
        FieldKind::Origin => css(&[
            ".trip-place div:first-child",
            ".route-origin .city",
            ".city.city-table",
            ".route-flex .route-origin .city",
        ]),
        FieldKind::Destination => css(&[
            ".trip-place div:last-child",
            ".route-destination .city",
            ".city.align.city-table",
            ".route-flex .route-destination .city",
        ]),
        FieldKind::Date => css(&[".date", ".route-origin .date", ".route-flex .date"]),
        FieldKind::Phone => css(&[
            "a[href^=\"tel:\"]",
            ".contacts__phone",
            ".company-data-container a[href^=\"tel:\"]",
        ]),
        FieldKind::Email => vec![
            LocatorSpec::attr("a[href^=\"mailto:\"]", "href", "mailto:"),
            LocatorSpec::css(".contacts__email"),
        ],
        FieldKind::Rate => css(&[".data-item-total", ".rate-data", ".data-item.data-item-total"]),
        FieldKind::Commodity => css(&[
            ".data-item.multiline",
            ".equipment-data .data-item.multiline",
            ".equipment-data .data-item",
        ]),
        FieldKind::Weight => css(&[".data-item-weight", ".equipment-data .weight"]),
        FieldKind::Reference => css(&[
            ".equipment-data .data-item:last-child",
            ".data-item:last-child",
            ".equipment-data .data-item:nth-last-child(2)",
        ]),
        FieldKind::PickupTime => css(&[
            ".pickup-time",
            ".route-origin .time",
            ".trip-place .pickup-hours",
        ]),
        FieldKind::DeliveryTime => css(&[
            ".delivery-time",
            ".route-destination .time",
            ".trip-place .delivery-hours",
        ]),
    }
}
