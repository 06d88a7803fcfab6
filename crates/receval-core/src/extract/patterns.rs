//! Common regex patterns for recovering JSON from model output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Fenced code block, optionally tagged `json`
    pub static ref FENCED_BLOCK: Regex = Regex::new(
        r"(?s)```(?:json)?\s*(.*?)```"
    ).unwrap();

    // A line holding nothing but an orphaned quote-comma (common botch when
    // the model closes a string on the wrong line)
    pub static ref ORPHAN_QUOTE_COMMA: Regex = Regex::new(
        r#"\n\s*",\s*\n"#
    ).unwrap();

    // A line holding only a comma
    pub static ref LONE_COMMA_LINE: Regex = Regex::new(
        r"\n\s*,\s*\n"
    ).unwrap();

    // Bare identifier used as an object key
    pub static ref UNQUOTED_KEY: Regex = Regex::new(
        r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#
    ).unwrap();

    // Trailing comma before a closing brace or bracket
    pub static ref TRAILING_COMMA: Regex = Regex::new(
        r",(\s*[}\]])"
    ).unwrap();

    // Missing comma between a closed string value and the next key
    pub static ref MISSING_COMMA: Regex = Regex::new(
        r#""\s*\n(\s*)"([^"\n]+)"\s*:"#
    ).unwrap();
}
