//! Selector-driven page extraction
//!
//! Pure HTML-to-record functions used by the configurable scraper. Each
//! field has a documented fallback order matching what event sites actually
//! publish: datetime attributes before element text before meta tags, and
//! og:image before configured image selectors.

use gather_domain::constants::{MAX_DETAIL_LINKS, MAX_SCRAPED_DESCRIPTION_LENGTH};
use gather_domain::{GatherError, RawEventRecord, RawTime, Result, SelectorSet, SourceDescriptor};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::warn;

/// Collect candidate detail-page links from a listing page: matching the
/// configured pattern, deduplicated, capped to bound load.
pub(crate) fn extract_listing_links(
    html: &str,
    descriptor: &SourceDescriptor,
    selectors: &SelectorSet,
) -> Result<Vec<String>> {
    let pattern = Regex::new(selectors.event_link_pattern()).map_err(|e| {
        GatherError::Config(format!("invalid event link pattern: {e}"))
    })?;
    let link_selector = parse_selector(selectors.event_links()).ok_or_else(|| {
        GatherError::Config(format!("invalid event link selector: {}", selectors.event_links()))
    })?;

    let doc = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();

    for element in doc.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !pattern.is_match(href) {
            continue;
        }
        let full = descriptor.full_url(href);
        if !links.contains(&full) {
            links.push(full);
        }
    }

    links.truncate(MAX_DETAIL_LINKS);
    Ok(links)
}

/// Extract one raw record from a detail page. Pages without a usable title
/// yield nothing.
pub(crate) fn extract_detail_record(
    html: &str,
    url: &str,
    descriptor: &SourceDescriptor,
    selectors: &SelectorSet,
) -> Option<RawEventRecord> {
    let doc = Html::parse_document(html);

    let title = select_text(&doc, selectors.title())?;

    Some(RawEventRecord {
        source_id: None,
        title: Some(title),
        start: extract_datetime(&doc, selectors),
        end: None,
        location: extract_location(&doc, selectors),
        venue: select_text(&doc, selectors.venue()),
        description: extract_description(&doc, selectors),
        event_type: None,
        image_url: extract_image(&doc, descriptor, selectors),
        source_url: Some(url.to_string()),
    })
}

/// Fallback order: datetime attribute on the configured selector, any
/// [datetime] attribute, the selector's text content, then structured meta
/// tags.
fn extract_datetime(doc: &Html, selectors: &SelectorSet) -> Option<RawTime> {
    if let Some(selector) = parse_selector(selectors.datetime()) {
        for element in doc.select(&selector) {
            if let Some(value) = element.value().attr("datetime") {
                if !value.trim().is_empty() {
                    return Some(RawTime::Text(value.trim().to_string()));
                }
            }
        }
    }

    if let Some(selector) = parse_selector("[datetime]") {
        if let Some(element) = doc.select(&selector).next() {
            if let Some(value) = element.value().attr("datetime") {
                if !value.trim().is_empty() {
                    return Some(RawTime::Text(value.trim().to_string()));
                }
            }
        }
    }

    if let Some(text) = select_text(doc, selectors.datetime()) {
        return Some(RawTime::Text(text));
    }

    let meta = parse_selector(r#"meta[property="event:start_time"], meta[itemprop="startDate"]"#)?;
    doc.select(&meta)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(|content| RawTime::Text(content.to_string()))
}

/// Configured selector first, then a Google Maps link's text or aria-label.
fn extract_location(doc: &Html, selectors: &SelectorSet) -> Option<String> {
    if let Some(location) = select_text(doc, selectors.location()) {
        return Some(location);
    }

    let maps = parse_selector(r#"a[href*="maps.google.com"], a[href*="goo.gl/maps"]"#)?;
    let element = doc.select(&maps).next()?;
    let text = element_text(&element);
    if !text.is_empty() {
        return Some(text);
    }
    element
        .value()
        .attr("aria-label")
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
}

/// First few matching elements joined, bounded to keep descriptions sane.
fn extract_description(doc: &Html, selectors: &SelectorSet) -> Option<String> {
    let selector = parse_selector(selectors.description())?;
    let text = doc
        .select(&selector)
        .take(3)
        .map(|element| element_text(&element))
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_SCRAPED_DESCRIPTION_LENGTH).collect())
}

/// og:image wins over the configured selector; relative sources resolve
/// against the descriptor's base URL.
fn extract_image(
    doc: &Html,
    descriptor: &SourceDescriptor,
    selectors: &SelectorSet,
) -> Option<String> {
    if let Some(og) = parse_selector(r#"meta[property="og:image"]"#) {
        if let Some(content) = doc
            .select(&og)
            .filter_map(|element| element.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
        {
            return Some(content.to_string());
        }
    }

    let selector = parse_selector(selectors.image())?;
    let element = doc.select(&selector).next()?;
    let value = element.value();
    let src = value
        .attr("src")
        .or_else(|| value.attr("content"))
        .or_else(|| value.attr("data-src"))?;
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    Some(descriptor.full_url(src))
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(selector, error = %e, "unparsable css selector");
            None
        }
    }
}

fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let parsed = parse_selector(selector)?;
    doc.select(&parsed)
        .map(|element| element_text(&element))
        .find(|text| !text.is_empty())
}

fn element_text(element: &scraper::ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
