//! Lenient JSON repair for model output that is almost, but not quite, JSON.
//!
//! The transformations here target failure modes actually observed in model
//! output: single-quoted strings, unquoted keys, trailing commas, `//` and
//! `/* */` comments, stray control characters, raw newlines inside string
//! values, and orphaned comma lines. Repair is attempted only after a strict
//! parse has failed, and its output is parsed strictly again.

use super::patterns::{
    LONE_COMMA_LINE, MISSING_COMMA, ORPHAN_QUOTE_COMMA, TRAILING_COMMA, UNQUOTED_KEY,
};

/// Rewrite a JSON-like candidate into something a strict parser may accept.
pub fn repair(text: &str) -> String {
    // Line-level comma botches are fixed before quote handling, while the
    // broken line structure is still visible.
    let cleaned = ORPHAN_QUOTE_COMMA.replace_all(text, ",\n");
    let cleaned = LONE_COMMA_LINE.replace_all(&cleaned, "\n");

    let cleaned = strip_noise(&cleaned);

    let cleaned = MISSING_COMMA.replace_all(&cleaned, "\",\n$1\"$2\":");
    let cleaned = UNQUOTED_KEY.replace_all(&cleaned, "$1\"$2\":");
    let cleaned = TRAILING_COMMA.replace_all(&cleaned, "$1");
    cleaned.into_owned()
}

/// Single pass over the candidate that tracks string state: converts
/// single-quoted strings to double-quoted, strips comments outside strings,
/// escapes raw newlines inside strings, and spaces out control characters.
fn strip_noise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_double = false;
    let mut in_single = false;

    while let Some(c) = chars.next() {
        if in_double {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    in_double = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => {}
                c if c.is_control() && c != '\t' => out.push(' '),
                c => out.push(c),
            }
            continue;
        }

        if in_single {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        if next == '\'' {
                            out.push('\'');
                        } else {
                            out.push('\\');
                            out.push(next);
                        }
                    }
                }
                '\'' => {
                    in_single = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => {}
                c if c.is_control() && c != '\t' => out.push(' '),
                c => out.push(c),
            }
            continue;
        }

        match c {
            '"' => {
                in_double = true;
                out.push(c);
            }
            '\'' => {
                in_single = true;
                out.push('"');
            }
            '/' => match chars.peek() {
                Some('/') => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
            c if c.is_control() && c != '\n' && c != '\t' && c != '\r' => out.push(' '),
            c => out.push(c),
        }
    }

    out
}
