//! Monetary and quantity normalization.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Parse an amount string into a [`Decimal`], tolerating currency symbols,
/// thousands separators, and comma decimal points.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let negative = raw.contains('-') || (raw.contains('(') && raw.contains(')'));

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    // Decide which separator is decimal: when both appear, the one further
    // right wins; a lone comma is treated as the decimal point.
    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };

    let amount = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -amount } else { amount })
}

/// Canonical form for currency fields: a fixed-point string with exactly
/// two fraction digits and no symbols or grouping.
pub fn normalize_amount(raw: &str) -> Option<String> {
    let amount = parse_amount(raw)?;
    Some(format!("{:.2}", amount.round_dp(2)))
}

/// Canonical form for quantity fields: the shortest decimal rendering with
/// trailing zeros stripped, so `"2"`, `"2.0"`, and `"2.00"` all agree.
pub fn normalize_quantity(raw: &str) -> Option<String> {
    let amount = parse_amount(raw)?;
    Some(amount.normalize().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_currency_symbol_stripped() {
        assert_eq!(normalize_amount("$42.08").as_deref(), Some("42.08"));
        assert_eq!(normalize_amount("AUD 42.08").as_deref(), Some("42.08"));
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(normalize_amount("1,234.56").as_deref(), Some("1234.56"));
        assert_eq!(normalize_amount("1.234,56").as_deref(), Some("1234.56"));
    }

    #[test]
    fn test_comma_decimal() {
        assert_eq!(normalize_amount("42,08").as_deref(), Some("42.08"));
    }

    #[test]
    fn test_fraction_digits_forced_to_two() {
        assert_eq!(normalize_amount("42").as_deref(), Some("42.00"));
        assert_eq!(normalize_amount("42.1").as_deref(), Some("42.10"));
        assert_eq!(normalize_amount("42.085").as_deref(), Some("42.08"));
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(normalize_amount("-5.00").as_deref(), Some("-5.00"));
        assert_eq!(normalize_amount("($5.00)").as_deref(), Some("-5.00"));
    }

    #[test]
    fn test_canonical_is_fixed_point() {
        let canonical = normalize_amount("$1,234.56").unwrap();
        assert_eq!(normalize_amount(&canonical), Some(canonical));
    }

    #[test]
    fn test_quantity() {
        assert_eq!(normalize_quantity("2").as_deref(), Some("2"));
        assert_eq!(normalize_quantity("2.00").as_deref(), Some("2"));
        assert_eq!(normalize_quantity("1.5").as_deref(), Some("1.5"));
    }

    #[test]
    fn test_non_numeric_returns_none() {
        assert_eq!(parse_amount("free"), None);
        assert_eq!(parse_amount(""), None);
    }
}
