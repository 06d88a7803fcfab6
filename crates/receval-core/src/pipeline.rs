//! Per-sample pipeline driver: extract, normalize, validate, score.
//!
//! The pipeline is pure and stateless per sample; one instance can be
//! shared across workers processing different samples concurrently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::{self, Extraction, ExtractionStatus};
use crate::metrics;
use crate::normalize::{self, NormalizationReport};
use crate::record::{NormalizedRecord, RawRecord};
use crate::report::SampleReport;
use crate::schema::Schema;
use crate::validate::{self, ValidationReport};

/// Everything the pipeline produced for one sample, with every intermediate
/// stage preserved for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedSample {
    /// How the record was recovered from raw text.
    pub status: ExtractionStatus,
    /// Field values as extracted, pre-normalization.
    pub raw: RawRecord,
    /// Canonical field values.
    pub record: NormalizedRecord,
    /// Normalization flags and warnings.
    pub normalization: NormalizationReport,
    /// Cross-field diagnostics, when validation is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

/// Drives the extract → normalize → validate → score sequence for single
/// samples.
#[derive(Debug, Clone)]
pub struct Pipeline {
    schema: Schema,
    run_validation: bool,
}

impl Pipeline {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            run_validation: false,
        }
    }

    /// Enable the cross-field validation side channel.
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.run_validation = enabled;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Run extraction and normalization (and optionally validation) over
    /// one raw model output.
    pub fn process(&self, raw_text: &str) -> ProcessedSample {
        let Extraction { record: raw, status } = extract::extract(raw_text, &self.schema);
        let (record, normalization) = normalize::normalize(&raw, &self.schema);

        let validation = self.run_validation.then(|| validate::validate(&record));

        debug!(%status, fields = record.len(), "sample processed");

        ProcessedSample {
            status,
            raw,
            record,
            normalization,
            validation,
        }
    }

    /// Normalize a ground truth record with the same schema the predictions
    /// use, so both sides of scoring share canonical forms.
    pub fn normalize_truth(&self, truth: &RawRecord) -> NormalizedRecord {
        let (record, _) = normalize::normalize(truth, &self.schema);
        record
    }

    /// Score a processed sample against normalized ground truth.
    pub fn score_against(
        &self,
        sample_id: &str,
        sample: &ProcessedSample,
        truth: &NormalizedRecord,
    ) -> SampleReport {
        let fields = metrics::score(&sample.record, truth, &self.schema);
        SampleReport::new(sample_id, sample.status, fields)
    }
}
