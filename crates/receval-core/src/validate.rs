//! Cross-field consistency checks over a normalized record.
//!
//! Validation is a side-channel diagnostic for data-quality triage. Failed
//! checks are warnings; they never block normalization or scoring.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::normalize::amounts::parse_amount;
use crate::record::NormalizedRecord;

/// GST rate applied to the subtotal (Australian Goods and Services Tax).
const GST_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2); // 0.10

/// Relative tolerance around the expected GST amount.
const GST_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Outcome of one validation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheck {
    /// Rule identifier.
    pub rule: String,
    /// Whether the record satisfied the rule.
    pub passed: bool,
    /// Human-readable explanation of the outcome.
    pub detail: String,
}

/// Results of all applicable validation rules, in evaluation order.
/// Rules whose inputs are missing are skipped, not failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<RuleCheck>,
}

impl ValidationReport {
    /// True when no applicable rule failed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Failed checks only.
    pub fn warnings(&self) -> impl Iterator<Item = &RuleCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// Run all cross-field rules against a normalized record.
pub fn validate(record: &NormalizedRecord) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(check) = gst_consistency(record) {
        report.checks.push(check);
    }

    report
}

/// GST consistency: tax should be about 10% of the subtotal.
///
/// The subtotal is the explicit `subtotal_value` field when a schema
/// provides one, otherwise total minus tax. Returns `None` when the inputs
/// are not available or not numeric.
fn gst_consistency(record: &NormalizedRecord) -> Option<RuleCheck> {
    let tax = parse_amount(record.text("tax_value")?)?;

    let subtotal = match record.text("subtotal_value").and_then(parse_amount) {
        Some(subtotal) => subtotal,
        None => parse_amount(record.text("total_value")?)? - tax,
    };

    let expected = (subtotal * GST_RATE).round_dp(2);
    let passed = if expected.is_zero() {
        tax.is_zero()
    } else {
        (tax - expected).abs() <= (expected * GST_TOLERANCE).abs()
    };

    let detail = if passed {
        format!("tax {tax} is within 5% of expected GST {expected} (10% of {subtotal})")
    } else {
        format!("tax {tax} deviates from expected GST {expected} (10% of subtotal {subtotal})")
    };

    Some(RuleCheck {
        rule: "gst_consistency".to_string(),
        passed,
        detail,
    })
}
