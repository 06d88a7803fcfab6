//! Text normalization for store names and other free-text fields.

/// Punctuation allowed to survive normalization (common in store names and
/// product descriptions).
const KEPT_PUNCTUATION: &str = "&'.,-/()#:@+*%";

/// Canonical text form: characters outside alphanumerics, whitespace, and
/// common punctuation removed; whitespace runs collapsed; upper-cased per
/// the receipt-domain convention.
pub fn normalize_text(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(*c))
        .collect();

    filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uppercase_and_trim() {
        assert_eq!(normalize_text("  Woolworths  "), "WOOLWORTHS");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(
            normalize_text("Woolworths   Supermarket\n Pty Ltd"),
            "WOOLWORTHS SUPERMARKET PTY LTD"
        );
    }

    #[test]
    fn test_stray_characters_removed() {
        assert_eq!(normalize_text("K☆mart™ | Outlet"), "KMART OUTLET");
    }

    #[test]
    fn test_common_punctuation_kept() {
        assert_eq!(normalize_text("H&M (City) - Store #4"), "H&M (CITY) - STORE #4");
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_text("Coles Express, Hawthorn");
        assert_eq!(normalize_text(&once), once);
    }
}
