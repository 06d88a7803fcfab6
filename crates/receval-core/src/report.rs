//! Dataset-level aggregation of per-sample scoring results.
//!
//! Pure aggregation: no normalization or I/O. The same [`DatasetReport`]
//! serializes to a nested JSON form and a flat tabular form (one row per
//! sample and field) without information loss; [`DatasetReport::from_rows`]
//! reconstructs identical per-field scores from the flat form.

use serde::{Deserialize, Serialize};

use crate::extract::ExtractionStatus;
use crate::metrics::{CurrencyDetail, DateDetail, FieldDetail, FieldMetric, MatchKind};

/// All field metrics for one sample. Emitted whole or not at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleReport {
    /// Sample identifier (typically the image file stem).
    pub sample_id: String,
    /// How extraction went for this sample.
    pub status: ExtractionStatus,
    /// One metric per schema field, in schema order.
    pub fields: Vec<FieldMetric>,
}

impl SampleReport {
    pub fn new(
        sample_id: impl Into<String>,
        status: ExtractionStatus,
        fields: Vec<FieldMetric>,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            status,
            fields,
        }
    }

    /// Mean F1 across this sample's fields.
    pub fn mean_f1(&self) -> f64 {
        mean(self.fields.iter().map(|m| m.f1))
    }
}

/// Aggregate statistics for one field across the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStat {
    pub field: String,
    pub samples: usize,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub mean_f1: f64,
    pub min_f1: f64,
    pub max_f1: f64,
}

/// Dataset-level headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Number of samples attempted. Failed extractions are counted, never
    /// excluded, so the mean reflects the true miss rate.
    pub samples: usize,
    /// Samples where nothing could be extracted.
    pub parse_failures: usize,
    /// Mean of the per-sample mean F1.
    pub mean_f1: f64,
}

/// Ordered samples plus aggregated statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetReport {
    pub samples: Vec<SampleReport>,
    pub field_stats: Vec<FieldStat>,
    pub summary: DatasetSummary,
}

/// Build a dataset report from per-sample reports.
///
/// Samples are sorted by id first, so the result is identical regardless of
/// the order workers completed in.
pub fn build(mut reports: Vec<SampleReport>) -> DatasetReport {
    reports.sort_by(|a, b| a.sample_id.cmp(&b.sample_id));

    // Field order follows first appearance across samples (schema order for
    // a homogeneous run).
    let mut field_order: Vec<String> = Vec::new();
    for report in &reports {
        for metric in &report.fields {
            if !field_order.contains(&metric.field) {
                field_order.push(metric.field.clone());
            }
        }
    }

    let field_stats = field_order
        .iter()
        .map(|field| {
            let metrics: Vec<&FieldMetric> = reports
                .iter()
                .flat_map(|r| r.fields.iter())
                .filter(|m| &m.field == field)
                .collect();

            FieldStat {
                field: field.clone(),
                samples: metrics.len(),
                mean_precision: mean(metrics.iter().map(|m| m.precision)),
                mean_recall: mean(metrics.iter().map(|m| m.recall)),
                mean_f1: mean(metrics.iter().map(|m| m.f1)),
                min_f1: metrics.iter().map(|m| m.f1).fold(f64::INFINITY, f64::min),
                max_f1: metrics.iter().map(|m| m.f1).fold(0.0, f64::max),
            }
        })
        .collect();

    let summary = DatasetSummary {
        samples: reports.len(),
        parse_failures: reports
            .iter()
            .filter(|r| r.status == ExtractionStatus::ParseFailed)
            .count(),
        mean_f1: mean(reports.iter().map(SampleReport::mean_f1)),
    };

    DatasetReport {
        samples: reports,
        field_stats,
        summary,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// One row of the flat tabular form: a single sample and field.
///
/// Type-specific sub-metrics are flattened into optional columns so the row
/// set carries everything the nested form does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub sample_id: String,
    pub status: ExtractionStatus,
    pub field: String,
    pub match_kind: MatchKind,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub similarity: f64,
    pub currency_exact: Option<bool>,
    pub relative_error: Option<f64>,
    pub date_exact: Option<bool>,
    pub day_offset: Option<i64>,
    pub within_week: Option<bool>,
}

impl DatasetReport {
    /// Flatten to one row per sample and field.
    pub fn to_rows(&self) -> Vec<MetricRow> {
        let mut rows = Vec::new();
        for sample in &self.samples {
            for metric in &sample.fields {
                let mut row = MetricRow {
                    sample_id: sample.sample_id.clone(),
                    status: sample.status,
                    field: metric.field.clone(),
                    match_kind: metric.match_kind,
                    precision: metric.precision,
                    recall: metric.recall,
                    f1: metric.f1,
                    similarity: metric.similarity,
                    currency_exact: None,
                    relative_error: None,
                    date_exact: None,
                    day_offset: None,
                    within_week: None,
                };
                match metric.detail {
                    Some(FieldDetail::Currency(detail)) => {
                        row.currency_exact = Some(detail.exact);
                        row.relative_error = detail.relative_error;
                    }
                    Some(FieldDetail::Date(detail)) => {
                        row.date_exact = Some(detail.exact);
                        row.day_offset = detail.day_offset;
                        row.within_week = Some(detail.within_week);
                    }
                    None => {}
                }
                rows.push(row);
            }
        }
        rows
    }

    /// Rebuild a dataset report from its flat form. Per-field scores and
    /// aggregates come out identical to the report the rows were taken from.
    pub fn from_rows(rows: Vec<MetricRow>) -> Self {
        let mut samples: Vec<SampleReport> = Vec::new();

        for row in rows {
            let detail = if let Some(exact) = row.currency_exact {
                Some(FieldDetail::Currency(CurrencyDetail {
                    exact,
                    relative_error: row.relative_error,
                }))
            } else {
                row.date_exact.map(|exact| {
                    FieldDetail::Date(DateDetail {
                        exact,
                        day_offset: row.day_offset,
                        within_week: row.within_week.unwrap_or(false),
                    })
                })
            };

            let metric = FieldMetric {
                field: row.field,
                match_kind: row.match_kind,
                precision: row.precision,
                recall: row.recall,
                f1: row.f1,
                similarity: row.similarity,
                detail,
            };

            match samples.iter_mut().find(|s| s.sample_id == row.sample_id) {
                Some(sample) => sample.fields.push(metric),
                None => samples.push(SampleReport::new(row.sample_id, row.status, vec![metric])),
            }
        }

        build(samples)
    }
}
