//! Utility functions for GraphQL execution

use graphql_parser::query::{Directive, Value as GqlValue};
use serde_json::{Map, Value, json};

/// Convert a GraphQL literal to JSON, substituting variables
///
/// Variables missing from `variables` become null.
pub fn gql_value_to_json(value: &GqlValue<'_, String>, variables: &Map<String, Value>) -> Value {
    match value {
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => json!(i.as_i64().unwrap_or(0)),
        GqlValue::Float(f) => json!(f),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(list) => Value::Array(
            list.iter()
                .map(|item| gql_value_to_json(item, variables))
                .collect(),
        ),
        GqlValue::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                map.insert(k.clone(), gql_value_to_json(v, variables));
            }
            Value::Object(map)
        }
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
    }
}

/// Argument value as written, `None` when absent or bound to an unset variable
pub fn argument_value(
    arguments: &[(String, GqlValue<'_, String>)],
    name: &str,
    variables: &Map<String, Value>,
) -> Option<Value> {
    let (_, value) = arguments.iter().find(|(arg, _)| arg == name)?;
    match value {
        GqlValue::Variable(var) => variables.get(var).cloned(),
        other => Some(gql_value_to_json(other, variables)),
    }
}

/// Evaluate `@skip(if:)` and `@include(if:)`
pub fn should_include(directives: &[Directive<'_, String>], variables: &Map<String, Value>) -> bool {
    for directive in directives {
        let condition = argument_value(&directive.arguments, "if", variables)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        match directive.name.as_str() {
            "skip" if condition => return false,
            "include" if !condition => return false,
            _ => {}
        }
    }
    true
}

/// Property lookup used when a field has no resolver
///
/// Tries the field name as written, then its snake_case form.
pub fn default_property(parent: &Value, field_name: &str) -> Value {
    let Some(object) = parent.as_object() else {
        return Value::Null;
    };

    if let Some(value) = object.get(field_name) {
        return value.clone();
    }

    object
        .get(&camel_to_snake(field_name))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Convert camelCase to snake_case
pub fn camel_to_snake(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("createdAt"), "created_at");
        assert_eq!(camel_to_snake("id"), "id");
    }

    #[test]
    fn test_default_property_falls_back_to_snake_case() {
        let parent = json!({ "created_at": "2024-01-01", "title": "Hello" });
        assert_eq!(default_property(&parent, "title"), json!("Hello"));
        assert_eq!(default_property(&parent, "createdAt"), json!("2024-01-01"));
        assert_eq!(default_property(&parent, "missing"), Value::Null);
        assert_eq!(default_property(&json!("scalar"), "title"), Value::Null);
    }

    #[test]
    fn test_variables_are_substituted() {
        let mut variables = Map::new();
        variables.insert("id".to_string(), json!("42"));
        let value = GqlValue::List(vec![
            GqlValue::Variable("id".to_string()),
            GqlValue::Variable("unset".to_string()),
        ]);
        assert_eq!(gql_value_to_json(&value, &variables), json!(["42", null]));
    }
}
