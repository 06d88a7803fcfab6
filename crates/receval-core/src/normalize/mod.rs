//! Normalization of extracted values into canonical forms.
//!
//! Dispatch is driven entirely by [`FieldKind`]; the normalizer never fails.
//! A value that cannot be converted passes through unchanged and the field
//! is flagged, never dropped.

pub mod amounts;
pub mod dates;
pub mod text;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{FieldValue, NormalizedRecord, RawRecord};
use crate::schema::{FieldKind, ListKind, Schema};

use amounts::{normalize_amount, normalize_quantity, parse_amount};
use dates::normalize_date;
use text::normalize_text;

/// A correlated list group whose member lists disagree on length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDivergence {
    /// Group name from the schema.
    pub group: String,
    /// Observed length per member field.
    pub lengths: BTreeMap<String, usize>,
}

/// Flags and warnings accumulated while normalizing one record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Fields whose value did not match any known source format and was
    /// passed through unchanged.
    pub unnormalized: Vec<String>,
    /// Suspicious but tolerated values (e.g. negative totals).
    pub warnings: Vec<String>,
    /// Correlated list groups with diverging lengths. The lists are left
    /// exactly as extracted; downstream scoring falls back to
    /// order-insensitive overlap for them.
    pub divergences: Vec<ListDivergence>,
}

impl NormalizationReport {
    /// True when every field normalized cleanly and all list groups agree.
    pub fn is_clean(&self) -> bool {
        self.unnormalized.is_empty() && self.warnings.is_empty() && self.divergences.is_empty()
    }
}

/// Normalize every field of a record per its schema kind.
///
/// Every key present in the input is present in the output. Fields unknown
/// to the schema pass through untouched.
pub fn normalize(raw: &RawRecord, schema: &Schema) -> (NormalizedRecord, NormalizationReport) {
    let mut record = NormalizedRecord::new();
    let mut report = NormalizationReport::default();

    for (name, value) in raw.iter() {
        let normalized = match schema.field(name) {
            Some(spec) => normalize_field(name, &spec.kind, value, &mut report),
            None => value.clone(),
        };
        record.insert(name.clone(), normalized);
    }

    check_list_groups(&record, schema, &mut report);

    if !report.is_clean() {
        debug!(
            unnormalized = report.unnormalized.len(),
            warnings = report.warnings.len(),
            divergences = report.divergences.len(),
            "record normalized with flags"
        );
    }

    (record, report)
}

fn normalize_field(
    name: &str,
    kind: &FieldKind,
    value: &FieldValue,
    report: &mut NormalizationReport,
) -> FieldValue {
    match (kind, value) {
        (FieldKind::Date, FieldValue::Text(s)) => {
            scalar_or_flag(name, s, normalize_date(s), report)
        }
        (FieldKind::Currency, FieldValue::Text(s)) => {
            if let Some(amount) = parse_amount(s) {
                if amount.is_sign_negative() {
                    report
                        .warnings
                        .push(format!("negative amount for {name}: {s:?}"));
                }
            }
            scalar_or_flag(name, s, normalize_amount(s), report)
        }
        (FieldKind::Text, FieldValue::Text(s)) => FieldValue::Text(normalize_text(s)),
        (FieldKind::List(element), FieldValue::List(items)) => {
            normalize_list(name, element, items, report)
        }
        // Scalar text found where a list was declared: split it rather than
        // discarding the data.
        (FieldKind::List(element), FieldValue::Text(s)) => {
            let items = split_list_text(s);
            normalize_list(name, element, &items, report)
        }
        // A list where a scalar was declared is a shape mismatch; keep it.
        (_, FieldValue::List(_)) => {
            report.unnormalized.push(name.to_string());
            value.clone()
        }
    }
}

/// Keep the canonical form when conversion succeeded, otherwise pass the
/// original through and flag the field. Empty values stay empty unflagged;
/// "no value" is not a conversion failure.
fn scalar_or_flag(
    name: &str,
    original: &str,
    canonical: Option<String>,
    report: &mut NormalizationReport,
) -> FieldValue {
    match canonical {
        Some(s) => FieldValue::Text(s),
        None => {
            if !original.trim().is_empty() {
                report.unnormalized.push(name.to_string());
            }
            FieldValue::Text(original.to_string())
        }
    }
}

fn normalize_list(
    name: &str,
    element: &ListKind,
    items: &[String],
    report: &mut NormalizationReport,
) -> FieldValue {
    let mut flagged = false;
    let normalized = items
        .iter()
        .map(|item| match element {
            ListKind::Text => normalize_text(item),
            ListKind::Currency => normalize_amount(item).unwrap_or_else(|| {
                flagged = true;
                item.clone()
            }),
            ListKind::Quantity => normalize_quantity(item).unwrap_or_else(|| {
                flagged = true;
                item.clone()
            }),
        })
        .collect();

    if flagged {
        report.unnormalized.push(name.to_string());
    }
    FieldValue::List(normalized)
}

/// Interpret a scalar string found in a list position: strip brackets, split
/// on commas.
fn split_list_text(s: &str) -> Vec<String> {
    let inner = s
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(s);

    inner
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Record length divergence for correlated list groups. Lists are never
/// truncated or padded.
fn check_list_groups(record: &NormalizedRecord, schema: &Schema, report: &mut NormalizationReport) {
    for (group, members) in schema.list_groups() {
        let lengths: BTreeMap<String, usize> = members
            .iter()
            .filter_map(|name| record.list(name).map(|items| (name.to_string(), items.len())))
            .collect();

        if lengths.len() < 2 {
            continue;
        }

        let mut values = lengths.values();
        let first = *values.next().unwrap_or(&0);
        if values.any(|&len| len != first) {
            report.divergences.push(ListDivergence {
                group: group.to_string(),
                lengths,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::receipt()
    }

    fn raw(pairs: &[(&str, FieldValue)]) -> RawRecord {
        let mut record = RawRecord::new();
        for (name, value) in pairs {
            record.insert(name.to_string(), value.clone());
        }
        record
    }

    #[test]
    fn test_scalar_fields_canonicalized() {
        let record = raw(&[
            ("date_value", "16/3/2023".into()),
            ("store_name_value", "  Woolworths  ".into()),
            ("total_value", "$42.08".into()),
        ]);

        let (normalized, report) = normalize(&record, &schema());

        assert!(report.is_clean());
        assert_eq!(normalized.text("date_value"), Some("2023-03-16"));
        assert_eq!(normalized.text("store_name_value"), Some("WOOLWORTHS"));
        assert_eq!(normalized.text("total_value"), Some("42.08"));
    }

    #[test]
    fn test_unmappable_date_flagged_not_dropped() {
        let record = raw(&[("date_value", "sometime last week".into())]);
        let (normalized, report) = normalize(&record, &schema());

        assert_eq!(normalized.text("date_value"), Some("sometime last week"));
        assert_eq!(report.unnormalized, vec!["date_value"]);
    }

    #[test]
    fn test_empty_value_not_flagged() {
        let record = raw(&[("tax_value", "".into())]);
        let (normalized, report) = normalize(&record, &schema());

        assert_eq!(normalized.text("tax_value"), Some(""));
        assert!(report.unnormalized.is_empty());
    }

    #[test]
    fn test_negative_total_warns() {
        let record = raw(&[("total_value", "-5.00".into())]);
        let (normalized, report) = normalize(&record, &schema());

        assert_eq!(normalized.text("total_value"), Some("-5.00"));
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("total_value"));
    }

    #[test]
    fn test_list_elements_normalized() {
        let record = raw(&[
            (
                "prod_item_value",
                FieldValue::List(vec!["  milk ".into(), "bread".into()]),
            ),
            (
                "prod_price_value",
                FieldValue::List(vec!["$2.00".into(), "3,50".into()]),
            ),
            (
                "prod_quantity_value",
                FieldValue::List(vec!["1".into(), "2.0".into()]),
            ),
        ]);

        let (normalized, report) = normalize(&record, &schema());

        assert!(report.is_clean());
        assert_eq!(
            normalized.list("prod_item_value"),
            Some(&["MILK".to_string(), "BREAD".to_string()][..])
        );
        assert_eq!(
            normalized.list("prod_price_value"),
            Some(&["2.00".to_string(), "3.50".to_string()][..])
        );
        assert_eq!(
            normalized.list("prod_quantity_value"),
            Some(&["1".to_string(), "2".to_string()][..])
        );
    }

    #[test]
    fn test_list_length_divergence_flagged_not_fixed() {
        let record = raw(&[
            (
                "prod_item_value",
                FieldValue::List(vec!["Milk".into(), "Bread".into()]),
            ),
            ("prod_quantity_value", FieldValue::List(vec!["2".into()])),
        ]);

        let (normalized, report) = normalize(&record, &schema());

        assert_eq!(normalized.list("prod_item_value").unwrap().len(), 2);
        assert_eq!(normalized.list("prod_quantity_value").unwrap().len(), 1);
        assert_eq!(report.divergences.len(), 1);
        assert_eq!(report.divergences[0].group, "products");
        assert_eq!(
            report.divergences[0].lengths.get("prod_item_value"),
            Some(&2)
        );
    }

    #[test]
    fn test_unknown_field_passes_through() {
        let record = raw(&[("abn_value", "51 004 085 616".into())]);
        let (normalized, report) = normalize(&record, &schema());

        assert!(report.is_clean());
        assert_eq!(normalized.text("abn_value"), Some("51 004 085 616"));
    }

    #[test]
    fn test_never_drops_keys() {
        let record = raw(&[
            ("date_value", "???".into()),
            ("total_value", "abc".into()),
            ("extra", FieldValue::List(vec!["x".into()])),
        ]);

        let (normalized, _) = normalize(&record, &schema());
        assert_eq!(normalized.len(), record.len());
        for (name, _) in record.iter() {
            assert!(normalized.contains(name));
        }
    }

    #[test]
    fn test_idempotent_on_canonical_record() {
        let record = raw(&[
            ("date_value", "16 March 2023".into()),
            ("store_name_value", "Coles  Express".into()),
            ("total_value", "$1,234.56".into()),
            (
                "prod_price_value",
                FieldValue::List(vec!["2,00".into(), "3.5".into()]),
            ),
        ]);

        let (once, _) = normalize(&record, &schema());

        let mut as_raw = RawRecord::new();
        for (name, value) in once.iter() {
            as_raw.insert(name.clone(), value.clone());
        }
        let (twice, report) = normalize(&as_raw, &schema());

        assert!(report.is_clean());
        assert_eq!(twice, once);
    }
}
