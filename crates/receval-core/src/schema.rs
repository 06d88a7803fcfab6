//! Field schema: the set of extraction targets, treated as data.
//!
//! The pipeline never branches on hardcoded field names. Every stage takes a
//! [`Schema`] and dispatches on [`FieldKind`], so new fields can be added by
//! editing configuration only.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{RecevalError, Result, SchemaError};

/// Element type of a list field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Free text elements (product names).
    Text,
    /// Monetary elements (unit prices).
    Currency,
    /// Bare numeric elements (quantities).
    Quantity,
}

/// Declared type of a field, driving normalization and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Calendar date, canonical form `YYYY-MM-DD`.
    Date,
    /// Monetary amount, canonical form is a 2-decimal fixed-point string.
    Currency,
    /// Free text, canonical form is trimmed, collapsed, upper-cased.
    Text,
    /// List of elements of the given kind.
    List(ListKind),
}

impl FieldKind {
    /// Whether this kind holds a list of values.
    pub fn is_list(&self) -> bool {
        matches!(self, FieldKind::List(_))
    }
}

/// Static declaration of one named extraction target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, matching the ground truth JSON key exactly.
    pub name: String,

    /// Value type of the field.
    pub kind: FieldKind,

    /// Whether ground truth is expected to always carry this field.
    pub required: bool,

    /// Alternate labels the pattern fallback accepts for this field.
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Correlation group for list fields that must stay equal-length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            synonyms: Vec::new(),
            group: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms = synonyms.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Labels the pattern fallback matches: the name with its `_value`
    /// suffix stripped and underscores spaced out, plus declared synonyms.
    fn labels(&self) -> Vec<String> {
        let base = self.name.trim_end_matches("_value").replace('_', " ");
        let mut labels = vec![base];
        labels.extend(self.synonyms.iter().cloned());
        labels
    }
}

/// The full set of field specs, with fallback patterns compiled at load.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    patterns: Vec<Regex>,
}

impl Schema {
    /// Build a schema from field specs, validating the configuration.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        if fields.is_empty() {
            return Err(SchemaError::Empty.into());
        }

        let mut seen = std::collections::BTreeSet::new();
        for spec in &fields {
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateField(spec.name.clone()).into());
            }
            if let Some(group) = &spec.group {
                if !spec.kind.is_list() {
                    return Err(SchemaError::ScalarInGroup {
                        group: group.clone(),
                        field: spec.name.clone(),
                    }
                    .into());
                }
            }
        }

        let mut group_sizes: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for spec in &fields {
            if let Some(group) = &spec.group {
                group_sizes.entry(group).or_default().push(&spec.name);
            }
        }
        for (group, members) in &group_sizes {
            if members.len() < 2 {
                return Err(SchemaError::SingleMemberGroup {
                    group: group.to_string(),
                    field: members[0].to_string(),
                }
                .into());
            }
        }

        let patterns = fields
            .iter()
            .map(compile_fallback_pattern)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { fields, patterns })
    }

    /// The canonical receipt schema: the 7 fields the original evaluation
    /// pipeline extracts from Australian retail receipts.
    pub fn receipt() -> Self {
        let fields = vec![
            FieldSpec::new("date_value", FieldKind::Date)
                .with_synonyms(&["date", "purchase date", "transaction date"]),
            FieldSpec::new("store_name_value", FieldKind::Text)
                .with_synonyms(&["store", "store name", "company", "business", "merchant"]),
            FieldSpec::new("tax_value", FieldKind::Currency)
                .with_synonyms(&["tax", "gst", "gst amount"]),
            FieldSpec::new("total_value", FieldKind::Currency)
                .with_synonyms(&["total", "total amount", "amount due", "amount"]),
            FieldSpec::new("prod_item_value", FieldKind::List(ListKind::Text))
                .with_synonyms(&["items", "products", "product names"])
                .with_group("products"),
            FieldSpec::new("prod_quantity_value", FieldKind::List(ListKind::Quantity))
                .with_synonyms(&["quantities", "qty"])
                .with_group("products"),
            FieldSpec::new("prod_price_value", FieldKind::List(ListKind::Currency))
                .with_synonyms(&["prices", "unit prices", "product prices"])
                .with_group("products"),
        ];

        // The built-in schema is always valid.
        Self::new(fields).expect("builtin receipt schema")
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fields: Vec<FieldSpec> = serde_json::from_str(&content)?;
        Self::new(fields)
    }

    /// Save the field specs to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.fields)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// All field specs in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field spec by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field specs paired with their compiled fallback patterns.
    pub fn fallback_patterns(&self) -> impl Iterator<Item = (&FieldSpec, &Regex)> {
        self.fields.iter().zip(self.patterns.iter())
    }

    /// Correlated list groups: group name to member field names, in
    /// declaration order.
    pub fn list_groups(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for spec in &self.fields {
            if let Some(group) = &spec.group {
                groups.entry(group).or_default().push(&spec.name);
            }
        }
        groups
    }
}

/// Compile the fallback pattern for one field: any accepted label followed
/// by a delimiter, capturing the value up to a comma or line break. A
/// bracketed list is captured whole so it can be split later.
fn compile_fallback_pattern(spec: &FieldSpec) -> std::result::Result<Regex, RecevalError> {
    let alternates = spec
        .labels()
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");

    let pattern = format!(
        r#"(?im)"?\b(?:{alternates})\b(?:[_\s]*value)?"?\s*[:=]\s*(\[[^\]]*\]|"[^"\n]*"|[^,\n]+)"#
    );

    Regex::new(&pattern).map_err(|source| {
        SchemaError::InvalidPattern {
            field: spec.name.clone(),
            source,
        }
        .into()
    })
}
