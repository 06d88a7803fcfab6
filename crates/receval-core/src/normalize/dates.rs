//! Date normalization to canonical ISO `YYYY-MM-DD`.

use chrono::{Datelike, NaiveDate};

/// Canonical output format.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Known source formats, tried in order. Day-first comes before month-first
/// because the source documents are Australian receipts; chrono rejects a
/// day-first parse when the month position exceeds 12, letting month-first
/// variants catch the remainder. `%B` also accepts abbreviated month names
/// when parsing.
const SOURCE_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%d-%m-%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// Normalize a date string to ISO `YYYY-MM-DD`.
///
/// Returns `None` when no known format matches; the caller keeps the
/// original value and flags the field instead of failing.
pub fn normalize_date(raw: &str) -> Option<String> {
    let cleaned = strip_time(raw);
    if cleaned.is_empty() {
        return None;
    }

    for format in SOURCE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            // A 4-digit-year format happily parses "23" as year 23; reject
            // and let the 2-digit-year formats handle it.
            if format.contains("%Y") && date.year().abs() < 100 {
                continue;
            }
            return Some(date.format(CANONICAL_FORMAT).to_string());
        }
    }

    None
}

/// Parse a canonical ISO date back into a [`NaiveDate`].
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, CANONICAL_FORMAT).ok()
}

/// Drop time-of-day tokens (anything containing `:`, plus am/pm markers)
/// that models often append to receipt dates.
fn strip_time(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| !token.contains(':'))
        .filter(|token| !matches!(token.to_ascii_lowercase().as_str(), "am" | "pm"))
        .collect::<Vec<_>>()
        .join(" ")
}
