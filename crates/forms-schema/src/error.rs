//! Error types for the schema compiler
//!
//! Metadata problems are author bugs and fail compilation outright.
//! Problems with submitted data are never errors here; they travel as
//! [`crate::ValidationResult::Invalid`].

use thiserror::Error;

/// A cycle in the condition-dependency graph, listed in traversal order
/// with the first id repeated at the end
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circular condition dependency: {}", .cycle.join(" -> "))]
pub struct CircularReferenceError {
    pub cycle: Vec<String>,
}

/// Structural problem with a form definition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetadataError {
    /// Two fields share an id
    #[error("duplicate field id: {0}")]
    DuplicateFieldId(String),

    /// Field type outside the supported set
    #[error("field {field_id}: unknown field type '{type_name}'")]
    UnknownFieldType { field_id: String, type_name: String },

    /// Choice field without options
    #[error("field {0}: choice field requires at least one option")]
    MissingOptions(String),

    /// Two options of one field share a value
    #[error("field {field_id}: duplicate option value {value}")]
    DuplicateOptionValue { field_id: String, value: String },

    /// Condition names a field that does not exist
    #[error("field {field_id}: condition references unknown field {referenced}")]
    DanglingCondition { field_id: String, referenced: String },

    /// Condition dependencies loop back on themselves
    #[error(transparent)]
    CircularReference(#[from] CircularReferenceError),
}

/// Every problem found in one metadata value
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid form metadata: {}", join(.0))]
pub struct MetadataErrors(pub Vec<MetadataError>);

impl MetadataErrors {
    pub fn errors(&self) -> &[MetadataError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any of the errors is a circular reference
    pub fn has_cycle(&self) -> bool {
        self.cycles().next().is_some()
    }

    pub fn cycles(&self) -> impl Iterator<Item = &CircularReferenceError> {
        self.0.iter().filter_map(|e| match e {
            MetadataError::CircularReference(c) => Some(c),
            _ => None,
        })
    }
}

impl From<MetadataError> for MetadataErrors {
    fn from(e: MetadataError) -> Self {
        MetadataErrors(vec![e])
    }
}

fn join(errors: &[MetadataError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for compilation
pub type Result<T> = std::result::Result<T, MetadataErrors>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = MetadataErrors(vec![
            MetadataError::DuplicateFieldId("email".into()),
            CircularReferenceError { cycle: vec!["a".into(), "b".into(), "a".into()] }.into(),
        ]);

        assert_eq!(
            errors.to_string(),
            "invalid form metadata: duplicate field id: email; circular condition dependency: a -> b -> a"
        );
        assert!(errors.has_cycle());
        assert_eq!(errors.len(), 2);
    }
}
