//! Submission commands: validate, visibility

use super::{compiler, load_metadata, load_values};
use crate::output::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use forms_schema::{compute_visibility, CompilerConfig, ValidationResult};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Message")]
    message: String,
}

#[derive(Tabled)]
struct ValueRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize, Tabled)]
struct VisibilityRow {
    #[tabled(rename = "Field")]
    id: String,
    #[tabled(rename = "Visible")]
    visible: bool,
}

pub fn validate(
    metadata_path: &Path,
    data_path: &Path,
    visible_only: bool,
    config: CompilerConfig,
    format: OutputFormat,
) -> Result<bool> {
    let metadata = load_metadata(metadata_path)?;
    let data = load_values(data_path)?;
    let compiler = compiler(config);

    let schema = match compiler.compile(&metadata) {
        Ok(schema) => schema,
        Err(errors) => {
            eprintln!("{} {}", "✗ invalid metadata:".red(), errors);
            return Ok(false);
        }
    };

    let result = if visible_only {
        compiler.validate_visible(&schema, &data)
    } else {
        compiler.validate(&schema, &data)
    };

    if format.is_table() {
        match &result {
            ValidationResult::Valid(values) => {
                println!("{}", "✓ submission accepted".green());
                let rows = values
                    .iter()
                    .map(|(field, value)| ValueRow { field: field.clone(), value: value.to_string() })
                    .collect();
                format.print_rows(&result, rows);
            }
            ValidationResult::Invalid(issues) => {
                println!("{} {} issue(s)", "✗ submission rejected".red(), issues.len());
                let rows = issues
                    .iter()
                    .map(|i| IssueRow { field: i.field.clone(), message: i.message.clone() })
                    .collect();
                format.print_rows(&result, rows);
            }
        }
    } else {
        format.print(&result);
    }

    Ok(result.is_valid())
}

pub fn visibility(metadata_path: &Path, values_path: &Path, format: OutputFormat) -> Result<bool> {
    let metadata = load_metadata(metadata_path)?;
    let values = load_values(values_path)?;
    let visible = compute_visibility(&metadata.fields, &values);

    // Declaration order rather than map order
    let rows: Vec<VisibilityRow> = metadata
        .fields
        .iter()
        .map(|f| VisibilityRow {
            id: f.id.clone(),
            visible: visible.get(&f.id).copied().unwrap_or(true),
        })
        .collect();

    if format.is_table() {
        format.print_rows(&visible, rows);
    } else {
        let map: serde_json::Map<String, serde_json::Value> =
            rows.into_iter().map(|r| (r.id, r.visible.into())).collect();
        format.print(&map);
    }

    Ok(true)
}
