//! Field-level scoring of a predicted record against ground truth.
//!
//! Scalar fields get token-overlap precision/recall/F1 plus a normalized
//! edit-distance similarity. List fields are aligned positionally when the
//! lengths agree and fall back to order-insensitive multiset overlap when
//! they do not; a length mismatch is never an error here.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::normalize::amounts::parse_amount;
use crate::normalize::dates::parse_iso;
use crate::record::{FieldValue, NormalizedRecord};
use crate::schema::{FieldKind, FieldSpec, Schema};

/// Floor for the relative-error denominator, so a zero ground truth does
/// not blow the ratio up to infinity.
pub const RELATIVE_ERROR_EPSILON: f64 = 0.01;

/// Day-offset threshold for the auxiliary "close date" signal.
pub const CLOSE_DATE_DAYS: i64 = 7;

/// How a predicted field compared to ground truth after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Canonical forms are identical (including both stating no value).
    Exact,
    /// Some token overlap, but not identical.
    Partial,
    /// No overlap at all.
    Miss,
}

/// Extra signal for currency fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDetail {
    /// Numeric equality of the two amounts.
    pub exact: bool,
    /// `|pred - truth| / max(|truth|, epsilon)`, when both parse.
    pub relative_error: Option<f64>,
}

/// Extra signal for date fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateDetail {
    /// Canonical strings are identical.
    pub exact: bool,
    /// Absolute day difference, when both parse as ISO dates.
    pub day_offset: Option<i64>,
    /// Day offset within a week. Auxiliary only; does not affect F1.
    pub within_week: bool,
}

/// Type-specific sub-metrics attached to a [`FieldMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDetail {
    Currency(CurrencyDetail),
    Date(DateDetail),
}

/// Per-field scoring result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetric {
    /// Field name from the schema.
    pub field: String,
    /// Categorical match outcome.
    pub match_kind: MatchKind,
    /// Token-overlap precision.
    pub precision: f64,
    /// Token-overlap recall.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Character-level edit similarity in [0, 1].
    pub similarity: f64,
    /// Type-specific sub-metrics, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<FieldDetail>,
}

/// Score every schema field of a predicted record against ground truth.
///
/// Fields absent from a record score as empty values; a completely empty
/// prediction (failed extraction) therefore scores a full miss against a
/// non-empty ground truth, never an excluded row.
pub fn score(
    predicted: &NormalizedRecord,
    truth: &NormalizedRecord,
    schema: &Schema,
) -> Vec<FieldMetric> {
    schema
        .fields()
        .iter()
        .map(|spec| score_field(spec, predicted.get(&spec.name), truth.get(&spec.name)))
        .collect()
}

fn score_field(
    spec: &FieldSpec,
    predicted: Option<&FieldValue>,
    truth: Option<&FieldValue>,
) -> FieldMetric {
    if spec.kind.is_list() {
        score_list_field(spec, predicted, truth)
    } else {
        score_scalar_field(spec, predicted, truth)
    }
}

fn score_scalar_field(
    spec: &FieldSpec,
    predicted: Option<&FieldValue>,
    truth: Option<&FieldValue>,
) -> FieldMetric {
    let pred = string_form(predicted);
    let truth = string_form(truth);

    let (precision, recall, f1) = token_overlap(&pred, &truth);
    let similarity = edit_similarity(&pred, &truth);
    let match_kind = classify(pred == truth, f1);

    let detail = match spec.kind {
        FieldKind::Currency => Some(FieldDetail::Currency(currency_detail(&pred, &truth))),
        FieldKind::Date => Some(FieldDetail::Date(date_detail(&pred, &truth))),
        _ => None,
    };

    FieldMetric {
        field: spec.name.clone(),
        match_kind,
        precision,
        recall,
        f1,
        similarity,
        detail,
    }
}

fn score_list_field(
    spec: &FieldSpec,
    predicted: Option<&FieldValue>,
    truth: Option<&FieldValue>,
) -> FieldMetric {
    let pred_items = list_form(predicted);
    let truth_items = list_form(truth);

    let (precision, recall, f1) = if pred_items.len() == truth_items.len() {
        // Positional alignment: micro-average token overlap over pairs.
        let mut intersection = 0usize;
        let mut pred_total = 0usize;
        let mut truth_total = 0usize;
        for (p, t) in pred_items.iter().zip(truth_items.iter()) {
            let (i, pt, tt) = overlap_counts(p, t);
            intersection += i;
            pred_total += pt;
            truth_total += tt;
        }
        ratios(intersection, pred_total, truth_total)
    } else {
        // Length mismatch: order-insensitive overlap over the whole list.
        let pred_joined = pred_items.join(" ");
        let truth_joined = truth_items.join(" ");
        token_overlap(&pred_joined, &truth_joined)
    };

    let similarity = edit_similarity(&pred_items.join(" "), &truth_items.join(" "));
    let match_kind = classify(pred_items == truth_items, f1);

    FieldMetric {
        field: spec.name.clone(),
        match_kind,
        precision,
        recall,
        f1,
        similarity,
        detail: None,
    }
}

fn classify(exact: bool, f1: f64) -> MatchKind {
    if exact {
        MatchKind::Exact
    } else if f1 > 0.0 {
        MatchKind::Partial
    } else {
        MatchKind::Miss
    }
}

fn string_form(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::Text(s)) => s.clone(),
        Some(FieldValue::List(items)) => items.join(" "),
        None => String::new(),
    }
}

fn list_form(value: Option<&FieldValue>) -> Vec<String> {
    match value {
        Some(FieldValue::List(items)) => items.clone(),
        Some(FieldValue::Text(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// Token-overlap precision, recall, and F1 between two strings, treating
/// each as a multiset of whitespace-delimited tokens. Both empty scores
/// 1.0 (both state "no value"); one empty scores 0.0.
pub fn token_overlap(pred: &str, truth: &str) -> (f64, f64, f64) {
    let (intersection, pred_total, truth_total) = overlap_counts(pred, truth);
    ratios(intersection, pred_total, truth_total)
}

fn overlap_counts(pred: &str, truth: &str) -> (usize, usize, usize) {
    let pred_counts = token_counts(pred);
    let truth_counts = token_counts(truth);

    let intersection = pred_counts
        .iter()
        .map(|(token, count)| count.min(truth_counts.get(token).unwrap_or(&0)))
        .sum();
    let pred_total = pred_counts.values().sum();
    let truth_total = truth_counts.values().sum();

    (intersection, pred_total, truth_total)
}

fn ratios(intersection: usize, pred_total: usize, truth_total: usize) -> (f64, f64, f64) {
    if pred_total == 0 && truth_total == 0 {
        return (1.0, 1.0, 1.0);
    }
    if pred_total == 0 || truth_total == 0 {
        return (0.0, 0.0, 0.0);
    }

    let precision = intersection as f64 / pred_total as f64;
    let recall = intersection as f64 / truth_total as f64;
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    (precision, recall, f1)
}

fn token_counts(s: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in s.split_whitespace() {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Character-level edit similarity: `1 - levenshtein / max_len`, in [0, 1].
/// Two empty strings are identical (1.0).
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / max_len as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(prev[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }

    prev[b.len()]
}

fn currency_detail(pred: &str, truth: &str) -> CurrencyDetail {
    let pred_amount = parse_amount(pred);
    let truth_amount = parse_amount(truth);

    match (pred_amount, truth_amount) {
        (Some(p), Some(t)) => {
            let relative_error = match (p.to_f64(), t.to_f64()) {
                (Some(p_f64), Some(t_f64)) => {
                    let denominator = t_f64.abs().max(RELATIVE_ERROR_EPSILON);
                    Some((p_f64 - t_f64).abs() / denominator)
                }
                _ => None,
            };
            CurrencyDetail {
                exact: p == t,
                relative_error,
            }
        }
        _ => CurrencyDetail {
            exact: pred == truth,
            relative_error: None,
        },
    }
}

fn date_detail(pred: &str, truth: &str) -> DateDetail {
    let offset = match (parse_iso(pred), parse_iso(truth)) {
        (Some(p), Some(t)) => Some((p - t).num_days().abs()),
        _ => None,
    };

    DateDetail {
        exact: pred == truth,
        day_offset: offset,
        within_week: offset.is_some_and(|d| d <= CLOSE_DATE_DAYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use pretty_assertions::assert_eq;

    fn record(pairs: &[(&str, FieldValue)]) -> NormalizedRecord {
        let mut record = NormalizedRecord::new();
        for (name, value) in pairs {
            record.insert(name.to_string(), value.clone());
        }
        record
    }

    fn metric<'a>(metrics: &'a [FieldMetric], field: &str) -> &'a FieldMetric {
        metrics.iter().find(|m| m.field == field).unwrap()
    }

    #[test]
    fn test_exact_match_full_credit() {
        let schema = Schema::receipt();
        let pred = record(&[("total_value", "42.08".into())]);
        let truth = record(&[("total_value", "42.08".into())]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "total_value");
        assert_eq!(m.match_kind, MatchKind::Exact);
        assert_eq!(m.f1, 1.0);
        assert_eq!(m.similarity, 1.0);
    }

    #[test]
    fn test_token_overlap_partial_credit() {
        // "WOOLWORTHS" vs "WOOLWORTHS SUPERMARKET": precision 1.0, recall 0.5
        let schema = Schema::receipt();
        let pred = record(&[("store_name_value", "WOOLWORTHS".into())]);
        let truth = record(&[("store_name_value", "WOOLWORTHS SUPERMARKET".into())]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "store_name_value");
        assert_eq!(m.match_kind, MatchKind::Partial);
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 0.5);
        assert!((m.f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_both_empty_is_full_credit() {
        let (p, r, f1) = token_overlap("", "");
        assert_eq!((p, r, f1), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_one_empty_is_zero() {
        let (p, r, f1) = token_overlap("", "WOOLWORTHS");
        assert_eq!((p, r, f1), (0.0, 0.0, 0.0));
        let (p, r, f1) = token_overlap("WOOLWORTHS", "");
        assert_eq!((p, r, f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_multiset_counts_duplicates() {
        // Duplicate tokens only match as many times as truth carries them.
        let (p, r, _) = token_overlap("MILK MILK", "MILK BREAD");
        assert_eq!(p, 0.5);
        assert_eq!(r, 0.5);
    }

    #[test]
    fn test_parse_failed_prediction_scores_zero() {
        let schema = Schema::receipt();
        let pred = NormalizedRecord::new();
        let truth = record(&[
            ("date_value", "2023-03-16".into()),
            ("store_name_value", "ALDI".into()),
            ("total_value", "42.08".into()),
        ]);

        let metrics = score(&pred, &truth, &schema);
        for name in ["date_value", "store_name_value", "total_value"] {
            let m = metric(&metrics, name);
            assert_eq!(m.match_kind, MatchKind::Miss, "{name}");
            assert_eq!(m.f1, 0.0, "{name}");
        }
    }

    #[test]
    fn test_list_positional_alignment() {
        let schema = Schema::receipt();
        let pred = record(&[(
            "prod_item_value",
            FieldValue::List(vec!["MILK".into(), "BREAD".into()]),
        )]);
        let truth = record(&[(
            "prod_item_value",
            FieldValue::List(vec!["MILK".into(), "BREAD ROLL".into()]),
        )]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "prod_item_value");
        // 2 of 2 predicted tokens hit; 2 of 3 truth tokens covered.
        assert_eq!(m.precision, 1.0);
        assert!((m.recall - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.match_kind, MatchKind::Partial);
    }

    #[test]
    fn test_list_length_mismatch_overlap_not_error() {
        let schema = Schema::receipt();
        let pred = record(&[(
            "prod_quantity_value",
            FieldValue::List(vec!["2".into()]),
        )]);
        let truth = record(&[(
            "prod_quantity_value",
            FieldValue::List(vec!["2".into(), "1".into()]),
        )]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "prod_quantity_value");
        assert_eq!(m.precision, 1.0);
        assert_eq!(m.recall, 0.5);
    }

    #[test]
    fn test_list_order_insensitive_on_mismatch() {
        let schema = Schema::receipt();
        let pred = record(&[(
            "prod_item_value",
            FieldValue::List(vec!["BREAD".into(), "MILK".into(), "EGGS".into()]),
        )]);
        let truth = record(&[(
            "prod_item_value",
            FieldValue::List(vec!["MILK".into(), "BREAD".into()]),
        )]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "prod_item_value");
        assert!((m.precision - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(m.recall, 1.0);
    }

    #[test]
    fn test_currency_detail() {
        let schema = Schema::receipt();
        let pred = record(&[("total_value", "40.00".into())]);
        let truth = record(&[("total_value", "42.08".into())]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "total_value");
        let Some(FieldDetail::Currency(detail)) = m.detail else {
            panic!("expected currency detail");
        };
        assert!(!detail.exact);
        let expected = (42.08 - 40.00) / 42.08;
        assert!((detail.relative_error.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_date_detail_day_offset() {
        let schema = Schema::receipt();
        let pred = record(&[("date_value", "2023-03-13".into())]);
        let truth = record(&[("date_value", "2023-03-16".into())]);

        let metrics = score(&pred, &truth, &schema);
        let m = metric(&metrics, "date_value");
        let Some(FieldDetail::Date(detail)) = m.detail else {
            panic!("expected date detail");
        };
        assert!(!detail.exact);
        assert_eq!(detail.day_offset, Some(3));
        assert!(detail.within_week);
    }

    #[test]
    fn test_edit_similarity() {
        assert_eq!(edit_similarity("ALDI", "ALDI"), 1.0);
        assert_eq!(edit_similarity("", ""), 1.0);
        assert_eq!(edit_similarity("ABCD", "WXYZ"), 0.0);
        assert!((edit_similarity("COLES", "COLE") - 0.8).abs() < 1e-9);
    }
}
