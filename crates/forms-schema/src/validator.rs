//! Metadata sanity checks run before compilation

use crate::error::{CircularReferenceError, MetadataError, MetadataErrors, Result};
use crate::metadata::{FormField, FormMetadata};
use std::collections::{HashMap, HashSet};

/// DFS marking for cycle detection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Stateless structural validator for [`FormMetadata`]
pub struct MetadataValidator;

impl MetadataValidator {
    /// Check the metadata, collecting every problem rather than stopping at the first
    pub fn validate(metadata: &FormMetadata) -> Result<()> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for field in &metadata.fields {
            if !seen.insert(field.id.as_str()) {
                errors.push(MetadataError::DuplicateFieldId(field.id.clone()));
            }
            if !field.field_type.is_known() {
                errors.push(MetadataError::UnknownFieldType {
                    field_id: field.id.clone(),
                    type_name: field.field_type.to_string(),
                });
            }
            Self::check_options(field, &mut errors);
        }

        for field in &metadata.fields {
            let Some(condition) = &field.condition else { continue };
            for referenced in condition.referenced_fields() {
                if !seen.contains(referenced) {
                    errors.push(MetadataError::DanglingCondition {
                        field_id: field.id.clone(),
                        referenced: referenced.to_string(),
                    });
                }
            }
        }

        errors.extend(
            Self::find_cycles(metadata)
                .into_iter()
                .map(MetadataError::CircularReference),
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MetadataErrors(errors))
        }
    }

    fn check_options(field: &FormField, errors: &mut Vec<MetadataError>) {
        let options = field.options();
        if field.requires_options() && options.is_empty() {
            errors.push(MetadataError::MissingOptions(field.id.clone()));
        }

        let mut values = Vec::with_capacity(options.len());
        for option in options {
            if values.contains(&&option.value) {
                errors.push(MetadataError::DuplicateOptionValue {
                    field_id: field.id.clone(),
                    value: option.value.to_string(),
                });
            } else {
                values.push(&option.value);
            }
        }
    }

    /// Three-colour DFS over "X's condition references Y" edges.
    ///
    /// Dangling references are ignored here; they are reported separately.
    fn find_cycles(metadata: &FormMetadata) -> Vec<CircularReferenceError> {
        let edges: HashMap<&str, Vec<&str>> = metadata
            .fields
            .iter()
            .map(|f| {
                let deps = f
                    .condition
                    .as_ref()
                    .map(|c| c.referenced_fields())
                    .unwrap_or_default();
                (f.id.as_str(), deps)
            })
            .collect();

        let mut marks: HashMap<&str, Mark> =
            edges.keys().map(|id| (*id, Mark::Unvisited)).collect();
        let mut cycles = Vec::new();

        for field in &metadata.fields {
            if marks.get(field.id.as_str()) == Some(&Mark::Unvisited) {
                Self::visit(&field.id, &edges, &mut marks, &mut cycles);
            }
        }
        cycles
    }

    /// Iterative DFS from `root`. The stack holds the current path, each
    /// entry with the index of the next dependency to explore.
    fn visit<'a>(
        root: &'a str,
        edges: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        cycles: &mut Vec<CircularReferenceError>,
    ) {
        let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
        marks.insert(root, Mark::InProgress);

        while let Some(&(id, next)) = stack.last() {
            let deps = edges.get(id).map(Vec::as_slice).unwrap_or_default();
            let Some(&dep) = deps.get(next) else {
                marks.insert(id, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            match marks.get(dep).copied() {
                Some(Mark::Unvisited) => {
                    marks.insert(dep, Mark::InProgress);
                    stack.push((dep, 0));
                }
                Some(Mark::InProgress) => {
                    let start = stack.iter().position(|(p, _)| *p == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|(p, _)| p.to_string()).collect();
                    cycle.push(dep.to_string());
                    cycles.push(CircularReferenceError { cycle });
                }
                Some(Mark::Done) | None => {}
            }
        }
    }
}
