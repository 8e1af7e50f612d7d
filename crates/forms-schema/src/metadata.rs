//! Form metadata model
//!
//! The declarative description a form author produces: a versioned, ordered
//! list of field definitions, each optionally guarded by a visibility
//! condition over other fields' values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// Metadata
// =============================================================================

/// Versioned form definition
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormMetadata {
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

impl FormMetadata {
    /// Create metadata from a version and field list
    pub fn new(version: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self { version: version.into(), fields }
    }

    /// Look up a field by id
    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Stable content hash over the version and the ordered field definitions.
    ///
    /// Structurally identical metadata hashes identically regardless of
    /// where it came from.
    pub fn content_hash(&self) -> String {
        let mut hasher = HashWriter(Sha256::new());
        // HashWriter never errors and every metadata type serializes infallibly
        let _ = serde_json::to_writer(&mut hasher, &(&self.version, &self.fields));
        hex::encode(hasher.0.finalize())
    }
}

struct HashWriter(Sha256);

impl std::io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Fields
// =============================================================================

/// Single field definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    /// Unique within the metadata; conditions refer to fields by id
    pub id: String,
    /// Submission key
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    /// Select only: accept a list of option values
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<FieldCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FormField {
    /// Create an optional field whose name and label equal its id
    pub fn new(id: impl Into<String>, field_type: FieldType) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            label: id.clone(),
            id,
            field_type,
            required: false,
            placeholder: None,
            options: None,
            multiple: false,
            condition: None,
            default_value: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Options whose label and value are the same string
    pub fn with_options<S: AsRef<str>>(mut self, values: &[S]) -> Self {
        self.options = Some(
            values
                .iter()
                .map(|v| FieldOption::new(v.as_ref(), v.as_ref()))
                .collect(),
        );
        self
    }

    pub fn with_condition(mut self, condition: FieldCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Declared options, empty if none
    pub fn options(&self) -> &[FieldOption] {
        self.options.as_deref().unwrap_or_default()
    }

    /// Checkbox with more than one option
    pub fn is_checkbox_group(&self) -> bool {
        self.field_type == FieldType::Checkbox && self.options().len() > 1
    }

    /// Whether the field must declare options
    pub fn requires_options(&self) -> bool {
        self.field_type == FieldType::Select || self.is_checkbox_group()
    }

    /// Whether submissions carry a list of option values
    pub fn is_multi_value(&self) -> bool {
        (self.field_type == FieldType::Select && self.multiple) || self.is_checkbox_group()
    }
}

/// Closed set of supported field types.
///
/// Unrecognised type strings deserialize to `Unknown` so metadata validation
/// can report every bad field at once; they never compile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Date,
    Checkbox,
    Textarea,
    Unknown(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Date => "date",
            FieldType::Checkbox => "checkbox",
            FieldType::Textarea => "textarea",
            FieldType::Unknown(other) => other,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FieldType::Unknown(_))
    }
}

impl From<String> for FieldType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => FieldType::Text,
            "number" => FieldType::Number,
            "select" => FieldType::Select,
            "date" => FieldType::Date,
            "checkbox" => FieldType::Checkbox,
            "textarea" => FieldType::Textarea,
            _ => FieldType::Unknown(s),
        }
    }
}

impl From<FieldType> for String {
    fn from(t: FieldType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Choice option
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: Value,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

// =============================================================================
// Conditions
// =============================================================================

/// Boolean expression over other fields' values
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldCondition {
    Group {
        op: LogicalOp,
        children: Vec<FieldCondition>,
    },
    Leaf {
        #[serde(rename = "fieldId")]
        field_id: String,
        operator: ConditionOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
}

impl FieldCondition {
    pub fn leaf(field_id: impl Into<String>, operator: ConditionOperator, value: Option<Value>) -> Self {
        FieldCondition::Leaf { field_id: field_id.into(), operator, value }
    }

    /// Shorthand for an `equals` leaf
    pub fn equals(field_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::leaf(field_id, ConditionOperator::Equals, Some(value.into()))
    }

    pub fn and(children: Vec<FieldCondition>) -> Self {
        FieldCondition::Group { op: LogicalOp::And, children }
    }

    pub fn or(children: Vec<FieldCondition>) -> Self {
        FieldCondition::Group { op: LogicalOp::Or, children }
    }

    /// Field ids referenced by leaves, left to right
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldCondition::Leaf { field_id, .. } => out.push(field_id),
            FieldCondition::Group { children, .. } => {
                for child in children {
                    child.collect_references(out);
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

// =============================================================================
// Value helpers
// =============================================================================

/// Strict equality; numbers compare by value so `1` equals `1.0`
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// JSON kind name used in error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
