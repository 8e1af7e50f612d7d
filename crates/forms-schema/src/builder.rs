//! Field definitions to validator nodes

use crate::error::{MetadataError, MetadataErrors, Result};
use crate::metadata::{FieldType, FormField, FormMetadata};
use crate::schema::{CompiledSchema, FieldNode, FieldRule};

/// Stateless builder; call only on metadata that passed [`crate::MetadataValidator`]
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Build a schema, hashing the metadata
    pub fn build(metadata: &FormMetadata) -> Result<CompiledSchema> {
        Self::build_with_hash(metadata, metadata.content_hash())
    }

    /// Build a schema under an already computed content hash
    pub fn build_with_hash(metadata: &FormMetadata, metadata_hash: String) -> Result<CompiledSchema> {
        let mut nodes = Vec::with_capacity(metadata.fields.len());
        let mut errors = Vec::new();

        for field in &metadata.fields {
            match Self::build_node(field) {
                Ok(node) => nodes.push(node),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            return Err(MetadataErrors(errors));
        }

        Ok(CompiledSchema::new(metadata_hash, metadata.version.clone(), nodes))
    }

    fn build_node(field: &FormField) -> std::result::Result<FieldNode, MetadataError> {
        let rule = match &field.field_type {
            FieldType::Text | FieldType::Textarea => FieldRule::Text,
            FieldType::Number => FieldRule::Number,
            FieldType::Date => FieldRule::Date,
            FieldType::Checkbox if field.is_checkbox_group() => Self::choice(field, true),
            FieldType::Checkbox => FieldRule::Boolean,
            FieldType::Select => Self::choice(field, field.multiple),
            FieldType::Unknown(type_name) => {
                return Err(MetadataError::UnknownFieldType {
                    field_id: field.id.clone(),
                    type_name: type_name.clone(),
                })
            }
        };

        Ok(FieldNode {
            id: field.id.clone(),
            name: field.name.clone(),
            label: if field.label.is_empty() { field.name.clone() } else { field.label.clone() },
            required: field.required,
            default: field.default_value.clone(),
            condition: field.condition.clone(),
            rule,
        })
    }

    fn choice(field: &FormField, multiple: bool) -> FieldRule {
        FieldRule::Choice {
            allowed: field.options().iter().map(|o| o.value.clone()).collect(),
            multiple,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ConditionOperator, FieldCondition, FieldOption};
    use crate::schema::{FieldIssue, ValidationResult, Values};
    use serde_json::{json, Value};

    fn data(v: Value) -> Values {
        match v {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    fn compile(fields: Vec<FormField>) -> CompiledSchema {
        SchemaBuilder::build(&FormMetadata::new("1", fields)).unwrap()
    }

    fn checkbox_value(schema: &CompiledSchema, input: Value) -> ValidationResult {
        schema.validate(&data(json!({ "agree": input })))
    }

    #[test]
    fn test_checkbox_coercion_table() {
        let schema = compile(vec![FormField::new("agree", FieldType::Checkbox)]);

        let cases = [
            (json!(true), true),
            (json!(false), false),
            (json!(1), true),
            (json!(0), false),
            (json!(7), false),
            (json!("true"), true),
            (json!(" YES "), true),
            (json!("On"), true),
            (json!("1"), true),
            (json!("false"), false),
            (json!("0"), false),
            (json!("no"), false),
            (json!("off"), false),
            (json!(""), false),
            (json!("invalid"), false),
            (json!("maybe"), false),
        ];
        for (input, expected) in cases {
            let result = checkbox_value(&schema, input.clone());
            assert_eq!(
                result.data().and_then(|d| d.get("agree")),
                Some(&Value::Bool(expected)),
                "input {}",
                input
            );
        }

        // Absent optional checkbox defaults to false
        let absent = schema.validate(&Values::new());
        assert_eq!(absent.data().unwrap()["agree"], json!(false));
    }

    #[test]
    fn test_checkbox_rejects_structured_values() {
        let schema = compile(vec![FormField::new("agree", FieldType::Checkbox)]);

        for (input, kind) in [(json!(null), "null"), (json!({}), "object"), (json!([]), "array")] {
            let result = checkbox_value(&schema, input);
            assert_eq!(
                result.errors(),
                &[FieldIssue {
                    field: "agree".into(),
                    message: format!("Expected boolean, received {}", kind),
                }]
            );
        }
    }

    #[test]
    fn test_required_checkbox_absent() {
        let schema = compile(vec![FormField::new("agree", FieldType::Checkbox).required()]);
        let result = schema.validate(&Values::new());
        assert_eq!(result.errors()[0].message, "agree is required");
        assert!(checkbox_value(&schema, json!(false)).is_valid());
    }

    #[test]
    fn test_required_text() {
        let mut field = FormField::new("name", FieldType::Text).required();
        field.label = "Full name".into();
        let schema = compile(vec![field]);

        for bad in [json!({"name": ""}), json!({}), json!({"name": null})] {
            let result = schema.validate(&data(bad));
            assert_eq!(
                result.errors(),
                &[FieldIssue { field: "name".into(), message: "Full name is required".into() }]
            );
        }

        let ok = schema.validate(&data(json!({"name": "Ada"})));
        assert_eq!(ok.data().unwrap()["name"], json!("Ada"));

        let wrong_type = schema.validate(&data(json!({"name": 5})));
        assert_eq!(wrong_type.errors()[0].message, "Expected string, received number");
    }

    #[test]
    fn test_optional_fields_may_be_blank() {
        let schema = compile(vec![
            FormField::new("notes", FieldType::Textarea),
            FormField::new("age", FieldType::Number),
            FormField::new("born", FieldType::Date),
            FormField::new("plan", FieldType::Select).with_options(&["free", "pro"]),
        ]);

        let result = schema.validate(&data(json!({"notes": "", "age": "", "born": null, "plan": ""})));
        let out = result.data().unwrap();
        assert_eq!(out.get("notes"), Some(&json!("")));
        assert!(out.get("age").is_none());
        assert!(out.get("born").is_none());
        assert!(out.get("plan").is_none());
    }

    #[test]
    fn test_number_and_date_coercion() {
        let schema = compile(vec![
            FormField::new("age", FieldType::Number).required(),
            FormField::new("born", FieldType::Date).required(),
        ]);

        let result = schema.validate(&data(json!({"age": " 37 ", "born": "1987-06-05"})));
        assert_eq!(result.data().unwrap()["age"], json!(37));
        assert_eq!(result.data().unwrap()["born"], json!("1987-06-05"));

        let bad = schema.validate(&data(json!({"age": "old", "born": "yesterday"})));
        assert_eq!(
            bad.errors(),
            &[
                FieldIssue { field: "age".into(), message: "Expected number, received string".into() },
                FieldIssue { field: "born".into(), message: "Expected a valid date".into() },
            ]
        );
    }

    #[test]
    fn test_select_options() {
        let mut field = FormField::new("size", FieldType::Select).required();
        field.options = Some(vec![FieldOption::new("Small", 1), FieldOption::new("Large", 2)]);
        let schema = compile(vec![field]);

        assert!(schema.validate(&data(json!({"size": 2}))).is_valid());
        let bad = schema.validate(&data(json!({"size": 3})));
        assert_eq!(bad.errors()[0].message, "Invalid option 3: expected one of 1, 2");
        assert!(!schema.validate(&data(json!({"size": ""}))).is_valid());
    }

    #[test]
    fn test_multi_value_fields() {
        let schema = compile(vec![
            FormField::new("tags", FieldType::Select)
                .with_options(&["a", "b", "c"])
                .multiple()
                .required(),
            FormField::new("days", FieldType::Checkbox).with_options(&["mon", "tue"]),
        ]);

        let ok = schema.validate(&data(json!({"tags": ["a", "c"], "days": ["tue"]})));
        assert!(ok.is_valid());

        let bad = schema.validate(&data(json!({"tags": [], "days": "mon"})));
        assert_eq!(
            bad.errors(),
            &[
                FieldIssue { field: "tags".into(), message: "Select at least one option for tags".into() },
                FieldIssue { field: "days".into(), message: "Expected array, received string".into() },
            ]
        );

        let unknown = schema.validate(&data(json!({"tags": ["a", "z"]})));
        assert_eq!(unknown.errors()[0].message, "Invalid option z: expected one of a, b, c");
    }

    #[test]
    fn test_reports_every_failing_field() {
        let schema = compile(vec![
            FormField::new("name", FieldType::Text).required(),
            FormField::new("age", FieldType::Number),
            FormField::new("agree", FieldType::Checkbox),
            FormField::new("city", FieldType::Text),
        ]);

        let result = schema.validate(&data(json!({"age": "ten", "agree": [], "city": "Oslo"})));
        let fields: Vec<_> = result.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "age", "agree"]);
    }

    #[test]
    fn test_submission_keys_use_field_name() {
        let schema = compile(vec![
            FormField::new("q1", FieldType::Text).named("email").required(),
            FormField::new("q2", FieldType::Number).with_default(json!(3)),
        ]);

        let result = schema.validate(&data(json!({"email": "a@b.c", "q1": "ignored", "extra": 1})));
        let out = result.data().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out["email"], json!("a@b.c"));
        assert_eq!(out["q2"], json!(3));
    }

    #[test]
    fn test_validate_visible_skips_hidden_fields() {
        let schema = compile(vec![
            FormField::new("contact", FieldType::Select).with_options(&["email", "phone"]),
            FormField::new("phone", FieldType::Text)
                .required()
                .with_condition(FieldCondition::equals("contact", "phone")),
        ]);

        let email = data(json!({"contact": "email", "phone": "ignored"}));
        assert!(!schema.validate(&data(json!({"contact": "email"}))).is_valid());
        let result = schema.validate_visible(&email);
        assert_eq!(result.data().unwrap().len(), 1);

        let phone = schema.validate_visible(&data(json!({"contact": "phone"})));
        assert_eq!(phone.errors()[0].field, "phone");
    }

    #[test]
    fn test_validate_visible_sees_coerced_values() {
        let schema = compile(vec![
            FormField::new("subscribe", FieldType::Checkbox),
            FormField::new("email", FieldType::Text)
                .required()
                .with_condition(FieldCondition::equals("subscribe", true)),
        ]);

        for truthy in [json!("on"), json!("yes"), json!(1)] {
            let result = schema.validate_visible(&data(json!({ "subscribe": truthy.clone() })));
            assert_eq!(
                result.errors(),
                &[FieldIssue { field: "email".into(), message: "email is required".into() }],
                "input {}",
                truthy
            );

            let complete = schema.validate_visible(&data(json!({ "subscribe": truthy, "email": "a@b.c" })));
            assert_eq!(complete.data().unwrap()["email"], json!("a@b.c"));
        }

        let off = schema.validate_visible(&data(json!({"subscribe": "off", "email": "dropped"})));
        assert_eq!(off.data().unwrap().get("email"), None);
        assert_eq!(off.data().unwrap()["subscribe"], json!(false));
    }

    #[test]
    fn test_validate_visible_sees_defaults() {
        let schema = compile(vec![
            FormField::new("agree", FieldType::Checkbox),
            FormField::new("plan", FieldType::Text).with_default(json!("pro")),
            FormField::new("why", FieldType::Text)
                .required()
                .with_condition(FieldCondition::leaf("agree", ConditionOperator::IsEmpty, None)),
            FormField::new("seats", FieldType::Number)
                .required()
                .with_condition(FieldCondition::equals("plan", "pro")),
        ]);

        // Absent checkbox coerces to false, which is not empty
        let result = schema.validate_visible(&Values::new());
        assert_eq!(
            result.errors(),
            &[FieldIssue { field: "seats".into(), message: "seats is required".into() }]
        );
    }

    #[test]
    fn test_estimated_size_grows_with_condition_tree() {
        let with = |condition: FieldCondition| {
            compile(vec![
                FormField::new("a", FieldType::Text),
                FormField::new("b", FieldType::Text).with_condition(condition),
            ])
            .estimated_size()
        };

        let plain = compile(vec![FormField::new("a", FieldType::Text), FormField::new("b", FieldType::Text)])
            .estimated_size();
        let single = with(FieldCondition::equals("a", "x"));
        let nested = with(FieldCondition::or(vec![
            FieldCondition::equals("a", "x"),
            FieldCondition::and(vec![
                FieldCondition::equals("a", "y"),
                FieldCondition::equals("a", "a much longer expected value"),
            ]),
        ]));

        assert!(single > plain);
        assert!(nested > single);
        // Two groups and two more leaves
        assert!(nested - single >= 4 * std::mem::size_of::<FieldCondition>());
    }

    #[test]
    fn test_unknown_type_does_not_build() {
        let err = SchemaBuilder::build(&FormMetadata::new(
            "1",
            vec![FormField::new("x", FieldType::Unknown("map".into()))],
        ))
        .unwrap_err();
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_result_serialization() {
        let schema = compile(vec![FormField::new("name", FieldType::Text).required()]);

        let ok = serde_json::to_value(schema.validate(&data(json!({"name": "x"})))).unwrap();
        assert_eq!(ok, json!({"success": true, "data": {"name": "x"}}));

        let bad = serde_json::to_value(schema.validate(&Values::new())).unwrap();
        assert_eq!(
            bad,
            json!({"success": false, "errors": [{"field": "name", "message": "name is required"}]})
        );
    }
}
