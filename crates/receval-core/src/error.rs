//! Error types for the receval-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the receval library.
///
/// Only structural failures surface here. Data-quality problems (malformed
/// model output, unmappable dates, list-length mismatches) are reported as
/// flags on the per-sample reports and never raise.
#[derive(Error, Debug)]
pub enum RecevalError {
    /// Schema definition problem.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Ground truth file problem.
    #[error("ground truth error: {0}")]
    GroundTruth(#[from] GroundTruthError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors in the field schema configuration.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The schema defines no fields at all.
    #[error("schema has no fields")]
    Empty,

    /// Two fields share the same name.
    #[error("duplicate field name: {0}")]
    DuplicateField(String),

    /// A list group ties only one field together.
    #[error("list group {group:?} has a single member: {field}")]
    SingleMemberGroup { group: String, field: String },

    /// A non-list field was assigned to a list group.
    #[error("field {field} is in group {group:?} but is not a list")]
    ScalarInGroup { group: String, field: String },

    /// The fallback pattern for a field failed to compile.
    #[error("invalid fallback pattern for field {field}: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors while loading ground truth records.
#[derive(Error, Debug)]
pub enum GroundTruthError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON.
    #[error("invalid JSON in {}: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but is not a JSON object.
    #[error("{} does not contain a JSON object", path.display())]
    NotAnObject { path: PathBuf },
}

/// Result type for the receval library.
pub type Result<T> = std::result::Result<T, RecevalError>;
