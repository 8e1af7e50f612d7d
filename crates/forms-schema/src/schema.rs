//! Compiled validator artifact

use crate::coerce::{coerce_bool, coerce_date, coerce_number};
use crate::metadata::{value_kind, values_equal, FieldCondition};
use forms_common::Timestamp;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Submission payload or visibility values
pub type Values = Map<String, Value>;

/// One violated field
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    /// Submission key of the offending field
    pub field: String,
    pub message: String,
}

/// Outcome of validating one submission
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationResult {
    Valid(Values),
    Invalid(Vec<FieldIssue>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn data(&self) -> Option<&Values> {
        match self {
            ValidationResult::Valid(data) => Some(data),
            ValidationResult::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> &[FieldIssue] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }

    pub fn into_result(self) -> Result<Values, Vec<FieldIssue>> {
        match self {
            ValidationResult::Valid(data) => Ok(data),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

// `{success: true, data}` / `{success: false, errors}` on the wire
impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            ValidationResult::Valid(data) => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
            }
            ValidationResult::Invalid(errors) => {
                map.serialize_entry("success", &false)?;
                map.serialize_entry("errors", errors)?;
            }
        }
        map.end()
    }
}

/// Type-specific rule of a field node
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FieldRule {
    Text,
    Number,
    Date,
    Boolean,
    Choice { allowed: Vec<Value>, multiple: bool },
}

/// Per-field validator
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FieldNode {
    pub id: String,
    pub name: String,
    pub label: String,
    pub required: bool,
    pub default: Option<Value>,
    pub condition: Option<FieldCondition>,
    pub rule: FieldRule,
}

impl FieldNode {
    /// Validate and coerce one raw value. `Ok(None)` omits the key from the output.
    fn check(&self, raw: Option<&Value>) -> Result<Option<Value>, String> {
        let raw = raw.or(self.default.as_ref());
        match &self.rule {
            // Checkbox nulls are a coercion error, everywhere else null means absent
            FieldRule::Boolean => self.check_bool(raw),
            rule => match raw.filter(|v| !v.is_null()) {
                None => self.absent(),
                Some(value) => self.check_present(rule, value),
            },
        }
    }

    fn check_bool(&self, raw: Option<&Value>) -> Result<Option<Value>, String> {
        match raw {
            None if self.required => Err(self.required_message()),
            None => Ok(Some(Value::Bool(false))),
            Some(v) => coerce_bool(v)
                .map(|b| Some(Value::Bool(b)))
                .map_err(|e| e.to_string()),
        }
    }

    fn check_present(&self, rule: &FieldRule, value: &Value) -> Result<Option<Value>, String> {
        match rule {
            FieldRule::Text => match value {
                Value::String(s) if s.is_empty() && self.required => Err(self.required_message()),
                Value::String(_) => Ok(Some(value.clone())),
                other => Err(format!("Expected string, received {}", value_kind(other))),
            },
            FieldRule::Number => match coerce_number(value).map_err(|e| e.to_string())? {
                Some(n) => Ok(Some(Value::Number(n))),
                None => self.absent(),
            },
            FieldRule::Date => match coerce_date(value).map_err(|e| e.to_string())? {
                Some(d) => Ok(Some(Value::String(d))),
                None => self.absent(),
            },
            FieldRule::Boolean => self.check_bool(Some(value)),
            FieldRule::Choice { allowed, multiple: false } => {
                if value.as_str() == Some("") {
                    return self.absent();
                }
                self.check_option(allowed, value)?;
                Ok(Some(value.clone()))
            }
            FieldRule::Choice { allowed, multiple: true } => {
                let Value::Array(items) = value else {
                    return Err(format!("Expected array, received {}", value_kind(value)));
                };
                if items.is_empty() && self.required {
                    return Err(format!("Select at least one option for {}", self.label));
                }
                for item in items {
                    self.check_option(allowed, item)?;
                }
                Ok(Some(value.clone()))
            }
        }
    }

    fn absent(&self) -> Result<Option<Value>, String> {
        if self.required {
            Err(self.required_message())
        } else {
            Ok(None)
        }
    }

    fn check_option(&self, allowed: &[Value], value: &Value) -> Result<(), String> {
        if allowed.iter().any(|a| values_equal(a, value)) {
            return Ok(());
        }
        let expected = allowed.iter().map(display_value).collect::<Vec<_>>().join(", ");
        Err(format!(
            "Invalid option {}: expected one of {}",
            display_value(value),
            expected
        ))
    }

    fn required_message(&self) -> String {
        format!("{} is required", self.label)
    }

    fn estimated_size(&self) -> usize {
        let rule = match &self.rule {
            FieldRule::Choice { allowed, .. } => allowed.iter().map(|v| v.to_string().len()).sum(),
            _ => 0,
        };
        std::mem::size_of::<Self>()
            + self.id.len()
            + self.name.len()
            + self.label.len()
            + self.default.as_ref().map_or(0, |v| v.to_string().len())
            + self.condition.as_ref().map_or(0, condition_size)
            + rule
    }
}

/// Inline size of every node in the condition tree plus its owned data
fn condition_size(condition: &FieldCondition) -> usize {
    let owned = match condition {
        FieldCondition::Leaf { field_id, value, .. } => {
            field_id.len() + value.as_ref().map_or(0, |v| v.to_string().len())
        }
        FieldCondition::Group { children, .. } => children.iter().map(condition_size).sum(),
    };
    std::mem::size_of::<FieldCondition>() + owned
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validator compiled from one [`crate::FormMetadata`]
#[derive(Debug)]
pub struct CompiledSchema {
    metadata_hash: String,
    version: String,
    nodes: Vec<FieldNode>,
    compiled_at: Timestamp,
    estimated_size: usize,
}

impl CompiledSchema {
    pub(crate) fn new(metadata_hash: String, version: String, nodes: Vec<FieldNode>) -> Self {
        let estimated_size = std::mem::size_of::<Self>()
            + metadata_hash.len()
            + version.len()
            + nodes.iter().map(FieldNode::estimated_size).sum::<usize>();
        Self {
            metadata_hash,
            version,
            nodes,
            compiled_at: Timestamp::now(),
            estimated_size,
        }
    }

    /// Content hash of the metadata this schema was built from
    pub fn metadata_hash(&self) -> &str {
        &self.metadata_hash
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn field_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn compiled_at(&self) -> Timestamp {
        self.compiled_at
    }

    /// Approximate heap footprint in bytes
    pub fn estimated_size(&self) -> usize {
        self.estimated_size
    }

    /// Validate a submission keyed by field name.
    ///
    /// Reports one issue per violated field, in field order. Undeclared keys
    /// are dropped from the validated output.
    pub fn validate(&self, data: &Values) -> ValidationResult {
        Self::collect(self.nodes.iter().map(|n| (n, n.check(data.get(&n.name)))))
    }

    /// Like [`validate`](Self::validate) but skips fields hidden by their
    /// condition under this same submission, dropping their values.
    ///
    /// Conditions see the coerced values, keyed by field id, so a checkbox
    /// submitted as `"on"` counts as `true` and an absent one as `false`.
    /// A value that fails coercion is seen as submitted.
    pub fn validate_visible(&self, data: &Values) -> ValidationResult {
        let checked: Vec<_> = self
            .nodes
            .iter()
            .map(|n| (n, n.check(data.get(&n.name))))
            .collect();

        let by_id: Values = checked
            .iter()
            .filter_map(|(n, outcome)| {
                let value = match outcome {
                    Ok(coerced) => coerced.clone(),
                    Err(_) => data.get(&n.name).cloned(),
                };
                value.map(|v| (n.id.clone(), v))
            })
            .collect();

        Self::collect(checked.into_iter().filter(|(n, _)| {
            n.condition.as_ref().map_or(true, |c| c.evaluate(&by_id))
        }))
    }

    fn collect<'a>(
        checked: impl Iterator<Item = (&'a FieldNode, Result<Option<Value>, String>)>,
    ) -> ValidationResult {
        let mut output = Values::new();
        let mut issues = Vec::new();

        for (node, outcome) in checked {
            match outcome {
                Ok(Some(value)) => {
                    output.insert(node.name.clone(), value);
                }
                Ok(None) => {}
                Err(message) => issues.push(FieldIssue { field: node.name.clone(), message }),
            }
        }

        if issues.is_empty() {
            ValidationResult::Valid(output)
        } else {
            ValidationResult::Invalid(issues)
        }
    }
}
