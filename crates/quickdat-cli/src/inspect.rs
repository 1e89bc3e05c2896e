//! One-shot commands over saved files: `extract` and `render`.

use std::path::Path;

use anyhow::Context;
use quickdat_core::{AppConfig, LoadRecord, SettingsStore};
use quickdat_extract::{extract_record, LocatorSet, Page};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ExtractedPopup {
    index: usize,
    record: LoadRecord,
}

fn extract_page(html: &str, locators: &LocatorSet) -> Vec<ExtractedPopup> {
    let page = Page::parse(html);
    page.select_all(locators.popup())
        .into_iter()
        .filter_map(|node| page.element(node))
        .enumerate()
        .map(|(index, root)| ExtractedPopup {
            index,
            record: extract_record(root, locators),
        })
        .collect()
}

/// Print every popup's record in `page` as a JSON array.
///
/// # Errors
///
/// Returns an error if the page or the locator overrides cannot be read.
pub(crate) fn run_extract(config: &AppConfig, page: &Path) -> anyhow::Result<()> {
    let locators = crate::load_locators(config)?;
    let html = std::fs::read_to_string(page)
        .with_context(|| format!("reading page {}", page.display()))?;

    let popups = extract_page(&html, &locators);
    tracing::info!(popups = popups.len(), page = %page.display(), "page extracted");
    println!("{}", serde_json::to_string_pretty(&popups)?);
    Ok(())
}

/// Print the email body for the record in `record`.
///
/// Uses `template` when given, otherwise the saved settings' template.
///
/// # Errors
///
/// Returns an error if the record or template file cannot be read or the
/// record is not valid JSON.
pub(crate) fn run_render(
    config: &AppConfig,
    record: &Path,
    template: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(record)
        .with_context(|| format!("reading record {}", record.display()))?;
    let record: LoadRecord = serde_json::from_str::<LoadRecord>(&raw)
        .with_context(|| format!("parsing record {}", record.display()))?
        .normalized();

    let template = match template {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading template {}", path.display()))?,
        None => SettingsStore::new(&config.settings_path)
            .load()
            .effective_template()
            .to_owned(),
    };

    println!("{}", quickdat_compose::render(&template, &record));
    Ok(())
}
