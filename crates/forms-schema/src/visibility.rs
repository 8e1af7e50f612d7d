//! Live field visibility
//!
//! Evaluated on every value change, so nothing here is cached and nothing
//! re-checks the condition graph: cycles are rejected once, at metadata
//! validation time.

use crate::metadata::{values_equal, ConditionOperator, FieldCondition, FormField, LogicalOp};
use crate::schema::Values;
use serde_json::Value;
use std::collections::HashMap;

/// Visibility of every field, keyed by field id. `values` is keyed by field id too.
pub fn compute_visibility(fields: &[FormField], values: &Values) -> HashMap<String, bool> {
    fields
        .iter()
        .map(|field| (field.id.clone(), is_visible(field, values)))
        .collect()
}

/// Visibility of one field; fields without a condition are always shown
#[inline]
pub fn is_visible(field: &FormField, values: &Values) -> bool {
    field.condition.as_ref().map_or(true, |c| c.evaluate(values))
}

impl FieldCondition {
    /// Evaluate left to right with ordinary boolean short-circuiting
    pub fn evaluate(&self, values: &Values) -> bool {
        match self {
            FieldCondition::Leaf { field_id, operator, value } => {
                apply(*operator, values.get(field_id), value.as_ref())
            }
            FieldCondition::Group { op: LogicalOp::And, children } => {
                children.iter().all(|c| c.evaluate(values))
            }
            FieldCondition::Group { op: LogicalOp::Or, children } => {
                children.iter().any(|c| c.evaluate(values))
            }
        }
    }
}

fn apply(operator: ConditionOperator, actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match operator {
        ConditionOperator::Equals => strict_equals(actual, expected),
        ConditionOperator::NotEquals => !strict_equals(actual, expected),
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::GreaterThan => compare(actual, expected, |a, b| a > b),
        ConditionOperator::LessThan => compare(actual, expected, |a, b| a < b),
        ConditionOperator::IsEmpty => is_empty(actual),
        ConditionOperator::IsNotEmpty => !is_empty(actual),
    }
}

/// A condition without a value only matches a missing or null field value
fn strict_equals(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    match (actual, expected) {
        (Some(a), Some(e)) => values_equal(a, e),
        (None | Some(Value::Null), None) => true,
        _ => false,
    }
}

fn contains(actual: Option<&Value>, expected: Option<&Value>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
        Some(Value::String(haystack)) => expected
            .as_str()
            .is_some_and(|needle| haystack.contains(needle)),
        _ => false,
    }
}

fn compare(actual: Option<&Value>, expected: Option<&Value>, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(as_number), expected.and_then(as_number)) {
        (Some(a), Some(e)) => cmp(a, e),
        _ => false,
    }
}

/// Numbers, or strings that parse to a finite number
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn is_empty(actual: Option<&Value>) -> bool {
    match actual {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FieldType;
    use serde_json::json;

    fn values(v: Value) -> Values {
        match v {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    fn leaf(op: ConditionOperator, value: Option<Value>) -> FieldCondition {
        FieldCondition::leaf("a", op, value)
    }

    #[test]
    fn test_dependent_field_visibility() {
        let fields = vec![
            FormField::new("A", FieldType::Text),
            FormField::new("B", FieldType::Text).with_condition(FieldCondition::equals("A", "yes")),
        ];

        let shown = compute_visibility(&fields, &values(json!({"A": "yes"})));
        assert_eq!(shown, HashMap::from([("A".into(), true), ("B".into(), true)]));

        let hidden = compute_visibility(&fields, &values(json!({"A": "no"})));
        assert_eq!(hidden, HashMap::from([("A".into(), true), ("B".into(), false)]));

        let missing = compute_visibility(&fields, &Values::new());
        assert_eq!(missing, HashMap::from([("A".into(), true), ("B".into(), false)]));
    }

    #[test]
    fn test_equality_operators() {
        let v = values(json!({"a": 3}));
        assert!(leaf(ConditionOperator::Equals, Some(json!(3.0))).evaluate(&v));
        assert!(!leaf(ConditionOperator::Equals, Some(json!("3"))).evaluate(&v));
        assert!(leaf(ConditionOperator::NotEquals, Some(json!("3"))).evaluate(&v));

        let empty = Values::new();
        assert!(leaf(ConditionOperator::Equals, None).evaluate(&empty));
        assert!(leaf(ConditionOperator::NotEquals, Some(json!("x"))).evaluate(&empty));
    }

    #[test]
    fn test_contains() {
        let list = values(json!({"a": ["red", "green"]}));
        assert!(leaf(ConditionOperator::Contains, Some(json!("red"))).evaluate(&list));
        assert!(!leaf(ConditionOperator::Contains, Some(json!("blue"))).evaluate(&list));

        let text = values(json!({"a": "hello world"}));
        assert!(leaf(ConditionOperator::Contains, Some(json!("lo w"))).evaluate(&text));
        assert!(!leaf(ConditionOperator::Contains, Some(json!(1))).evaluate(&text));

        let number = values(json!({"a": 12}));
        assert!(!leaf(ConditionOperator::Contains, Some(json!(1))).evaluate(&number));
    }

    #[test]
    fn test_numeric_comparison() {
        let v = values(json!({"a": 10}));
        assert!(leaf(ConditionOperator::GreaterThan, Some(json!(5))).evaluate(&v));
        assert!(!leaf(ConditionOperator::LessThan, Some(json!(5))).evaluate(&v));
        assert!(leaf(ConditionOperator::LessThan, Some(json!("10.5"))).evaluate(&v));

        let text = values(json!({"a": "many"}));
        assert!(!leaf(ConditionOperator::GreaterThan, Some(json!(5))).evaluate(&text));
        assert!(!leaf(ConditionOperator::LessThan, Some(json!(5))).evaluate(&text));
        assert!(!leaf(ConditionOperator::GreaterThan, Some(json!(5))).evaluate(&Values::new()));
    }

    #[test]
    fn test_emptiness() {
        for empty in [json!({}), json!({"a": null}), json!({"a": ""}), json!({"a": []})] {
            let v = values(empty);
            assert!(leaf(ConditionOperator::IsEmpty, None).evaluate(&v));
            assert!(!leaf(ConditionOperator::IsNotEmpty, None).evaluate(&v));
        }
        for filled in [json!({"a": 0}), json!({"a": false}), json!({"a": " "}), json!({"a": [1]})] {
            let v = values(filled);
            assert!(leaf(ConditionOperator::IsNotEmpty, None).evaluate(&v));
        }
    }

    #[test]
    fn test_groups() {
        let cond = FieldCondition::or(vec![
            FieldCondition::equals("plan", "pro"),
            FieldCondition::and(vec![
                FieldCondition::equals("plan", "free"),
                FieldCondition::leaf("seats", ConditionOperator::GreaterThan, Some(json!(5))),
            ]),
        ]);

        assert!(cond.evaluate(&values(json!({"plan": "pro"}))));
        assert!(cond.evaluate(&values(json!({"plan": "free", "seats": 6}))));
        assert!(!cond.evaluate(&values(json!({"plan": "free", "seats": 2}))));
        assert!(!cond.evaluate(&values(json!({"plan": "trial"}))));

        assert!(FieldCondition::and(vec![]).evaluate(&Values::new()));
        assert!(!FieldCondition::or(vec![]).evaluate(&Values::new()));
    }
}
