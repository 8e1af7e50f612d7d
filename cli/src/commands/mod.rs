//! CLI Commands

pub mod config;
pub mod schema;
pub mod submission;

use anyhow::{Context, Result};
use forms_schema::{CompilerConfig, FormMetadata, SchemaCompiler, Values};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a JSON or YAML document, chosen by file extension
pub fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    if is_yaml {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    } else {
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

pub fn load_metadata(path: &Path) -> Result<FormMetadata> {
    load_document(path)
}

pub fn load_values(path: &Path) -> Result<Values> {
    load_document(path)
}

pub fn compiler(config: CompilerConfig) -> SchemaCompiler {
    tracing::debug!(cache_capacity = config.cache_capacity, "Creating schema compiler");
    SchemaCompiler::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("formc-{}-{}", std::process::id(), name));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_yaml_and_json_metadata() {
        let yaml = temp_file(
            "form.yaml",
            "version: \"2\"\nfields:\n  - id: name\n    name: name\n    type: text\n    label: Name\n    required: true\n",
        );
        let json = temp_file(
            "form.json",
            r#"{"version":"2","fields":[{"id":"name","name":"name","type":"text","label":"Name","required":true}]}"#,
        );

        let from_yaml = load_metadata(&yaml).unwrap();
        let from_json = load_metadata(&json).unwrap();
        assert_eq!(from_yaml.content_hash(), from_json.content_hash());
        assert!(from_yaml.fields[0].required);

        let _ = fs::remove_file(yaml);
        let _ = fs::remove_file(json);
    }

    #[test]
    fn test_load_values_rejects_non_object() {
        let path = temp_file("values.json", "[1, 2]");
        assert!(load_values(&path).is_err());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_metadata(Path::new("/nonexistent/form.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/form.json"));
    }
}
