//! Model reply → beam fragments.
//!
//! Vision models wrap JSON in prose ("Sure! Here is the table: {...}"), in
//! ```` ```json ```` fences, or prefix it with a BOM. Nothing here ever
//! evaluates the reply as code; the payload is located by plain text search
//! and handed to `serde_json`.
//!
//! ## Locating the payload
//!
//! 1. Strip invisible characters and outer code fences.
//! 2. [`ResponseShape::BareObject`] layouts require the remaining text to
//!    start with `{` and parse it whole; trailing prose is invalid JSON.
//! 3. [`ResponseShape::Embedded`] layouts parse the span from the first `{`
//!    to the last `}`.

use crate::error::ResponseError;
use crate::layout::ResponseShape;
use crate::schedule::BeamFragment;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

/// Fragments recovered from one reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub fragments: Vec<BeamFragment>,
    /// Entries of `beams` that failed validation, with the reason.
    pub rejected: Vec<ResponseError>,
}

/// Parse one reply into beam fragments.
///
/// A payload without a `beams` key yields no fragments and no error: the
/// image simply showed no beams. A `beams` value that is not an array is a
/// [`ResponseError::Schema`]. Individual malformed entries are collected in
/// [`ParsedResponse::rejected`] and do not fail the whole reply.
pub fn parse_response(text: &str, shape: ResponseShape) -> Result<ParsedResponse, ResponseError> {
    let payload = extract_json(text, shape)?;
    let obj = payload.as_object().ok_or_else(|| ResponseError::Schema {
        detail: "top-level JSON is not an object".into(),
    })?;

    let entries = match obj.get("beams") {
        None | Some(Value::Null) => {
            debug!("Reply has no 'beams' key; treating as empty");
            return Ok(ParsedResponse::default());
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ResponseError::Schema {
                detail: "'beams' is not an array".into(),
            })
        }
    };

    let mut parsed = ParsedResponse::default();
    for (i, entry) in entries.iter().enumerate() {
        match BeamFragment::from_json(entry) {
            Ok(fragment) => parsed.fragments.push(fragment),
            Err(e) => {
                warn!("Dropping beams[{}]: {}", i, e);
                parsed.rejected.push(e);
            }
        }
    }
    Ok(parsed)
}

/// Locate and parse the JSON object inside a reply.
pub fn extract_json(text: &str, shape: ResponseShape) -> Result<Value, ResponseError> {
    let cleaned = strip_code_fences(&remove_invisible_chars(text));
    let body = cleaned.trim();
    if body.is_empty() {
        return Err(ResponseError::Empty);
    }
    if shape == ResponseShape::BareObject {
        if !body.starts_with('{') {
            return Err(ResponseError::NoJsonFound);
        }
        return parse_object(body);
    }

    let span = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if end > start => &body[start..=end],
        _ => return Err(ResponseError::NoJsonFound),
    };
    parse_object(span)
}

fn parse_object(text: &str) -> Result<Value, ResponseError> {
    serde_json::from_str(text).map_err(|e| ResponseError::InvalidJson {
        detail: e.to_string(),
    })
}

// ── Cleanup ─────────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}
