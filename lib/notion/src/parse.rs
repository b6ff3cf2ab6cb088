//! Parse stage: projects raw Notion pages into [`RawPost`] records.
//!
//! Property names follow the editorial database schema: `Nome`/`Name`
//! (title), `Messaggio` (body), the configurable type property (default
//! `Tipo`), `Immagine URL`, `Poll Domanda`, `Poll Opzioni`, `Channel ID`,
//! `Uscita` (release date), and `Status`.

use crate::error::ParseError;
use serde_json::Value;
use telepost_core::PageId;

/// A post as extracted from the store, before the due-filter stack.
///
/// Every field but the id is carried as the store exposed it; typing and
/// timestamp normalization happen in the filter stage so each rule stays
/// independently testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    /// Store page id.
    pub id: PageId,
    /// Title, empty when absent.
    pub title: String,
    /// Message body, empty when absent.
    pub body: String,
    /// Literal type tag, `None` when the property is absent or unset.
    pub type_tag: Option<String>,
    /// Image URL.
    pub image_url: Option<String>,
    /// Poll question.
    pub poll_question: Option<String>,
    /// Poll options as the store's serialized list.
    pub poll_options: Option<String>,
    /// Channel override.
    pub channel: Option<String>,
    /// Release timestamp as the store's literal date string.
    pub publish_at: Option<String>,
    /// Literal status string, `None` when absent or unset.
    pub status: Option<String>,
}

/// Projects one raw store page into a [`RawPost`].
///
/// # Errors
///
/// Returns an error when the page has no id or is not an object; any
/// individually missing property falls back to its documented default.
pub fn parse_page(page: &Value, type_field: &str) -> Result<RawPost, ParseError> {
    let Some(obj) = page.as_object() else {
        return Err(ParseError::MalformedPage {
            reason: "page is not an object".to_string(),
        });
    };

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingId)?;

    let empty = Value::Object(Default::default());
    let properties = obj.get("properties").unwrap_or(&empty);

    // The title property is "Nome" in the editorial schema but "Name" in
    // databases created with the store's defaults.
    let title = property(properties, "Nome")
        .or_else(|| property(properties, "Name"))
        .map(extract_text)
        .unwrap_or_default();

    Ok(RawPost {
        id: PageId::new(id),
        title,
        body: property(properties, "Messaggio")
            .map(extract_text)
            .unwrap_or_default(),
        type_tag: property(properties, type_field).and_then(extract_select),
        image_url: property(properties, "Immagine URL").and_then(extract_url),
        poll_question: property(properties, "Poll Domanda")
            .map(extract_text)
            .filter(|s| !s.is_empty()),
        poll_options: property(properties, "Poll Opzioni")
            .map(extract_text)
            .filter(|s| !s.is_empty()),
        channel: property(properties, "Channel ID")
            .map(extract_text)
            .filter(|s| !s.is_empty()),
        publish_at: property(properties, "Uscita").and_then(extract_date),
        status: property(properties, "Status").and_then(extract_status),
    })
}

/// Projects a batch of raw pages, skipping malformed ones.
///
/// One bad page must never fail the whole fetch; each rejection is logged
/// with its reason and the rest of the batch is kept.
#[must_use]
pub fn parse_pages(pages: &[Value], type_field: &str) -> Vec<RawPost> {
    let mut raws = Vec::with_capacity(pages.len());
    for page in pages {
        match parse_page(page, type_field) {
            Ok(raw) => raws.push(raw),
            Err(err) => {
                tracing::warn!(error = %err, "skipping malformed store page");
            }
        }
    }
    raws
}

fn property<'a>(properties: &'a Value, name: &str) -> Option<&'a Value> {
    properties.get(name)
}

/// Concatenated plain text of a `title` or `rich_text` property.
fn extract_text(property: &Value) -> String {
    let fragments = match property.get("type").and_then(Value::as_str) {
        Some("title") => property.get("title"),
        Some("rich_text") => property.get("rich_text"),
        _ => None,
    };

    fragments
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_url(property: &Value) -> Option<String> {
    if property.get("type").and_then(Value::as_str) != Some("url") {
        return None;
    }
    property
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_select(property: &Value) -> Option<String> {
    if property.get("type").and_then(Value::as_str) != Some("select") {
        return None;
    }
    property
        .get("select")
        .and_then(|select| select.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// A status property, falling back to select for older schemas.
fn extract_status(property: &Value) -> Option<String> {
    let value = match property.get("type").and_then(Value::as_str) {
        Some("status") => property.get("status"),
        Some("select") => property.get("select"),
        _ => None,
    };
    value
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn extract_date(property: &Value) -> Option<String> {
    if property.get("type").and_then(Value::as_str) != Some("date") {
        return None;
    }
    property
        .get("date")
        .and_then(|date| date.get("start"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
