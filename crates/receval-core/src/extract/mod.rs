//! Best-effort extraction of a structured record from raw model output.
//!
//! Ordered attempts, first success wins:
//! 1. fenced code blocks, longest candidate first;
//! 2. brace-balanced object scan over the whole text;
//! 3. per-field pattern fallback driven by the schema;
//! 4. give up with an empty record.
//!
//! Extraction never fails: any input produces a [`RawRecord`] (possibly
//! empty) and an [`ExtractionStatus`].

pub mod patterns;
pub mod repair;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::record::{FieldValue, RawRecord};
use crate::schema::Schema;

use patterns::FENCED_BLOCK;

/// How the record was recovered from the raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// A JSON object was parsed (strictly or after repair).
    Parsed,
    /// No object parsed; some fields were recovered by pattern matching.
    PartialPattern,
    /// Nothing could be recovered.
    ParseFailed,
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractionStatus::Parsed => "parsed",
            ExtractionStatus::PartialPattern => "partial_pattern",
            ExtractionStatus::ParseFailed => "parse_failed",
        };
        f.write_str(s)
    }
}

/// Result of one extraction attempt over raw model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Recovered field values, as found in the text.
    pub record: RawRecord,
    /// How the record was recovered.
    pub status: ExtractionStatus,
}

/// Extract a record from raw model output text.
pub fn extract(raw_text: &str, schema: &Schema) -> Extraction {
    let attempts: [fn(&str) -> Option<RawRecord>; 2] = [from_fenced_blocks, from_balanced_object];

    for attempt in attempts {
        if let Some(record) = attempt(raw_text) {
            debug!(fields = record.len(), "extracted JSON object");
            return Extraction {
                record,
                status: ExtractionStatus::Parsed,
            };
        }
    }

    if let Some(record) = from_field_patterns(raw_text, schema) {
        debug!(fields = record.len(), "recovered fields by pattern fallback");
        return Extraction {
            record,
            status: ExtractionStatus::PartialPattern,
        };
    }

    debug!("no fields recovered from model output");
    Extraction {
        record: RawRecord::new(),
        status: ExtractionStatus::ParseFailed,
    }
}

/// Parse one candidate substring as a JSON object, strictly first, then
/// after lenient repair.
fn parse_candidate(candidate: &str) -> Option<RawRecord> {
    if let Ok(value) = serde_json::from_str::<Value>(candidate) {
        if let Some(record) = RawRecord::from_json_value(&value) {
            return Some(record);
        }
    }

    let repaired = repair::repair(candidate);
    let value = serde_json::from_str::<Value>(&repaired).ok()?;
    RawRecord::from_json_value(&value)
}

/// Attempt 1: fenced code blocks, longest candidate first.
fn from_fenced_blocks(text: &str) -> Option<RawRecord> {
    let mut candidates: Vec<&str> = FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect();

    candidates.sort_by_key(|c| std::cmp::Reverse(c.len()));

    candidates.into_iter().find_map(parse_candidate)
}

/// Attempt 2: the first brace-balanced `{...}` span in the text.
fn from_balanced_object(text: &str) -> Option<RawRecord> {
    parse_candidate(balanced_object(text)?)
}

/// Find the first `{` and its matching `}` by depth, skipping braces inside
/// string literals. Falls back to the last `}` in the text when the object
/// is never closed.
fn balanced_object(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[open..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..open + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    // Unclosed object: take everything up to the last closing brace.
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}

/// Attempt 3: schema-driven pattern fallback over free text.
fn from_field_patterns(text: &str, schema: &Schema) -> Option<RawRecord> {
    let mut record = RawRecord::new();

    for (spec, pattern) in schema.fallback_patterns() {
        if let Some(caps) = pattern.captures(text) {
            let raw = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let value = captured_value(raw, spec.kind.is_list());
            if !value.is_empty() {
                record.insert(spec.name.clone(), value);
            }
        }
    }

    (!record.is_empty()).then_some(record)
}

/// Interpret a pattern-captured value: strip wrapping quotes, split
/// bracketed or comma-separated lists for list fields.
fn captured_value(raw: &str, is_list: bool) -> FieldValue {
    let bracketed = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']'));

    if let Some(inner) = bracketed {
        let items = inner
            .split(',')
            .map(|item| unquote(item.trim()).to_string())
            .filter(|item| !item.is_empty())
            .collect();
        return FieldValue::List(items);
    }

    if is_list {
        let items = raw
            .split(',')
            .map(|item| unquote(item.trim()).to_string())
            .filter(|item| !item.is_empty())
            .collect();
        return FieldValue::List(items);
    }

    FieldValue::Text(unquote(raw).to_string())
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s)
}
