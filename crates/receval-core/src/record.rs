//! Record types: the pre- and post-normalization shapes of one sample.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GroundTruthError, Result};

/// A single field value: either a scalar string or a list of strings.
///
/// Values stay as strings through extraction; typing happens at
/// normalization and scoring, driven by the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::List(items) => Some(items),
        }
    }

    /// Whether the value carries no content at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Field values exactly as extracted from model output, pre-normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: BTreeMap<String, FieldValue>,
}

/// Field values in canonical form. Produced only by normalization; never
/// mutated in place afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, FieldValue>,
}

macro_rules! record_accessors {
    ($ty:ident) => {
        impl $ty {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
                self.fields.insert(name.into(), value);
            }

            pub fn get(&self, name: &str) -> Option<&FieldValue> {
                self.fields.get(name)
            }

            /// Scalar value of a field, if present and non-list.
            pub fn text(&self, name: &str) -> Option<&str> {
                self.get(name).and_then(FieldValue::as_text)
            }

            /// List value of a field, if present and a list.
            pub fn list(&self, name: &str) -> Option<&[String]> {
                self.get(name).and_then(FieldValue::as_list)
            }

            pub fn contains(&self, name: &str) -> bool {
                self.fields.contains_key(name)
            }

            pub fn len(&self) -> usize {
                self.fields.len()
            }

            pub fn is_empty(&self) -> bool {
                self.fields.is_empty()
            }

            pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
                self.fields.iter()
            }
        }
    };
}

record_accessors!(RawRecord);
record_accessors!(NormalizedRecord);

impl RawRecord {
    /// Build a record from a parsed JSON object.
    ///
    /// Scalars are stringified, arrays become string lists, and nested
    /// objects are kept as their JSON text. Duplicate keys have already been
    /// resolved last-wins by the JSON parser. Returns `None` for non-object
    /// values.
    pub fn from_json_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut record = RawRecord::new();
        for (key, value) in object {
            record.insert(key.clone(), coerce_value(value));
        }
        Some(record)
    }

    /// Load a ground truth record from a JSON file on disk.
    ///
    /// Unlike model-output extraction, a missing or malformed ground truth
    /// file is a setup problem and raises a hard error.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| GroundTruthError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let value: Value =
            serde_json::from_str(&content).map_err(|source| GroundTruthError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json_value(&value).ok_or_else(|| {
            GroundTruthError::NotAnObject {
                path: path.to_path_buf(),
            }
            .into()
        })
    }
}

/// Stringify one JSON value into a [`FieldValue`].
fn coerce_value(value: &Value) -> FieldValue {
    match value {
        Value::String(s) => FieldValue::Text(s.clone()),
        Value::Array(items) => {
            FieldValue::List(items.iter().map(coerce_scalar).collect())
        }
        other => FieldValue::Text(coerce_scalar(other)),
    }
}

/// Stringify a scalar JSON value without adding quotes.
fn coerce_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
