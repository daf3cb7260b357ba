//! Schema inference prompt and reply parsing.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{InferenceError, InferenceResult};
use crate::types::PageSchema;

/// System message sent with every schema request.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts schema from HTML.";

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap());

/// Build the user prompt asking for selectors on an earthquake-news page.
pub fn build_schema_prompt(html: &str, title: &str) -> String {
    format!(
        r#"Below is the complete HTML of a web page titled "{title}".
Study its structure and answer with a single JSON object of this shape:

{{
  "schema": {{
    "main_text": ["CSS selectors for the main content blocks: paragraphs, the article body or its sections. Each selector should isolate one meaningful unit of text. Do not select navigation, footers, sidebars, references or lists of links."],
    "date": "CSS selector for the element holding the publication or last-updated date, preferring metadata or footer elements with a clear date"
  }},
  "is_valid": true when the page is about earthquakes or a closely related topic, otherwise false
}}

Reply with nothing but that JSON object, wrapped in a fenced block:
```json
{{...}}
```

HTML:
{html}
"#
    )
}

#[derive(Debug, Deserialize)]
struct SchemaReply {
    #[serde(default)]
    schema: SchemaRules,
    #[serde(default)]
    is_valid: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaRules {
    #[serde(default)]
    main_text: Vec<String>,
    #[serde(default)]
    date: Option<String>,
}

/// Parse a model reply into an unsaved schema for `domain`.
///
/// Takes the first fenced JSON block, or failing that the outermost braces of
/// the reply. A missing selector list becomes empty and a missing validity
/// flag means off-topic.
pub fn parse_schema_response(text: &str, domain: &str) -> InferenceResult<PageSchema> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InferenceError::EmptyResponse);
    }

    let json = FENCED_JSON
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .or_else(|| bare_object(text))
        .ok_or(InferenceError::MissingJson)?;

    let reply: SchemaReply =
        serde_json::from_str(json).map_err(|e| InferenceError::Parse(e.to_string()))?;

    let selectors: Vec<String> = reply
        .schema
        .main_text
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let date = reply
        .schema
        .date
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut schema = PageSchema::new(domain).with_selectors(selectors);
    schema.date_selector = date;
    schema.is_valid = reply.is_valid;
    Ok(schema)
}

fn bare_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
