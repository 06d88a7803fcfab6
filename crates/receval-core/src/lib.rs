//! Core library for receipt extraction evaluation.
//!
//! This crate provides:
//! - Best-effort recovery of a JSON record from noisy model output
//! - Schema-driven normalization of field values (dates, currency, text, lists)
//! - Cross-field consistency diagnostics (GST)
//! - Per-field and dataset-level accuracy metrics against ground truth

pub mod error;
pub mod extract;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod schema;
pub mod validate;

pub use error::{GroundTruthError, RecevalError, Result, SchemaError};
pub use extract::{Extraction, ExtractionStatus, extract};
pub use metrics::{FieldDetail, FieldMetric, MatchKind, score};
pub use normalize::{NormalizationReport, normalize};
pub use pipeline::{Pipeline, ProcessedSample};
pub use record::{FieldValue, NormalizedRecord, RawRecord};
pub use report::{DatasetReport, MetricRow, SampleReport, build};
pub use schema::{FieldKind, FieldSpec, ListKind, Schema};
pub use validate::{RuleCheck, ValidationReport, validate};
