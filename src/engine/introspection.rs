//! `__schema` and `__type`
//!
//! Introspection values are built as JSON, then projected through the
//! requested selection. Named type references inside fields are shallow:
//! they expose `kind` and `name`, clients follow up with `__type(name:)`.

use super::field_resolver::ExecutionScope;
use crate::schema::{BUILTIN_SCALARS, FieldDefinition, InputValue, Schema, Type, TypeRef};
use graphql_parser::query::Selection;
use serde_json::{Map, Value, json};

pub(crate) fn schema_value(schema: &Schema) -> Value {
    let mut types: Vec<Value> = schema
        .get_types()
        .iter()
        .map(|ty| type_value(schema, ty))
        .collect();
    for scalar in BUILTIN_SCALARS {
        if !types.iter().any(|t| t["name"] == scalar)
            && let Some(ty) = Type::builtin_scalar(scalar)
        {
            types.push(type_value(schema, &ty));
        }
    }

    json!({
        "__typename": "__Schema",
        "queryType": type_value(schema, schema.query()),
        "mutationType": schema.mutation().map(|t| type_value(schema, t)),
        "subscriptionType": schema.subscription().map(|t| type_value(schema, t)),
        "types": types,
        "directives": [],
    })
}

pub(crate) fn type_value(schema: &Schema, ty: &Type) -> Value {
    let mut value = json!({
        "__typename": "__Type",
        "kind": ty.kind(),
        "name": ty.name(),
        "description": ty.description(),
        "fields": null,
        "inputFields": null,
        "interfaces": null,
        "enumValues": null,
        "possibleTypes": null,
        "ofType": null,
    });

    match ty {
        Type::Object(object) => {
            value["fields"] = object
                .fields
                .values()
                .map(|field| field_value(schema, field))
                .collect();
            value["interfaces"] = json!([]);
        }
        Type::InputObject(input) => {
            value["inputFields"] = input
                .fields
                .values()
                .map(|field| input_value(schema, field))
                .collect();
        }
        Type::Enum(enum_type) => {
            value["enumValues"] = enum_type
                .values
                .iter()
                .map(|name| {
                    json!({
                        "__typename": "__EnumValue",
                        "name": name,
                        "description": null,
                        "isDeprecated": false,
                        "deprecationReason": null,
                    })
                })
                .collect();
        }
        Type::Scalar(_) => {}
    }

    value
}

fn field_value(schema: &Schema, field: &FieldDefinition) -> Value {
    json!({
        "__typename": "__Field",
        "name": field.name,
        "description": field.description,
        "args": field.args.values().map(|arg| input_value(schema, arg)).collect::<Vec<_>>(),
        "type": type_ref_value(schema, &field.ty),
        "isDeprecated": false,
        "deprecationReason": null,
    })
}

fn input_value(schema: &Schema, input: &InputValue) -> Value {
    json!({
        "__typename": "__InputValue",
        "name": input.name,
        "description": input.description,
        "type": type_ref_value(schema, &input.ty),
        "defaultValue": input.default_value.as_ref().map(|v| v.to_string()),
    })
}

fn type_ref_value(schema: &Schema, ty: &TypeRef) -> Value {
    match ty {
        TypeRef::NonNull(inner) => wrapper("NON_NULL", type_ref_value(schema, inner)),
        TypeRef::List(inner) => wrapper("LIST", type_ref_value(schema, inner)),
        TypeRef::Named(name) => {
            let kind = schema.get_type(name).map(|t| t.kind()).unwrap_or("SCALAR");
            json!({
                "__typename": "__Type",
                "kind": kind,
                "name": name,
                "ofType": null,
            })
        }
    }
}

fn wrapper(kind: &str, of_type: Value) -> Value {
    json!({
        "__typename": "__Type",
        "kind": kind,
        "name": null,
        "ofType": of_type,
    })
}

/// Keep only the requested keys, following nested selections
pub(crate) fn project<'a, 'q>(
    scope: &ExecutionScope<'a, 'q>,
    value: &Value,
    selections: &[&'a Selection<'q, String>],
) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project(scope, item, selections))
                .collect(),
        ),
        Value::Object(object) if !selections.is_empty() => {
            let type_name = object
                .get("__typename")
                .and_then(Value::as_str)
                .unwrap_or_default();

            let mut projected = Map::new();
            for (key, fields) in scope.collect_fields(type_name, selections) {
                let name = fields[0].name.as_str();
                let child = object.get(name).unwrap_or(&Value::Null);
                let nested: Vec<&'a Selection<'q, String>> = fields
                    .iter()
                    .flat_map(|&field| field.selection_set.items.iter())
                    .collect();
                projected.insert(key, project(scope, child, &nested));
            }
            Value::Object(projected)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumType, ObjectType};
    use std::sync::Arc;

    #[test]
    fn test_type_value_for_object() {
        let query = ObjectType::new("Query").field(
            FieldDefinition::new("posts", TypeRef::list(TypeRef::named("Post").non_null()))
                .argument(InputValue::new("limit", TypeRef::named("Int")).default_value(json!(10))),
        );
        let schema = Schema::new("blog", Arc::new(Type::Object(query)));

        let value = type_value(&schema, schema.query());
        assert_eq!(value["kind"], "OBJECT");
        let field = &value["fields"][0];
        assert_eq!(field["name"], "posts");
        assert_eq!(field["type"]["kind"], "LIST");
        assert_eq!(field["type"]["ofType"]["kind"], "NON_NULL");
        assert_eq!(field["type"]["ofType"]["ofType"]["name"], "Post");
        assert_eq!(field["args"][0]["defaultValue"], "10");
    }

    #[test]
    fn test_schema_value_lists_builtin_scalars() {
        let schema = Schema::new("blog", Arc::new(Type::Object(ObjectType::new("Query"))))
            .with_types(Arc::new(|| {
                vec![Arc::new(Type::Enum(EnumType::new("Status", ["OPEN"])))]
            }));

        let value = schema_value(&schema);
        let names: Vec<&str> = value["types"]
            .as_array()
            .expect("types")
            .iter()
            .filter_map(|t| t["name"].as_str())
            .collect();
        assert_eq!(names[..2], ["Query", "Status"]);
        assert!(names.contains(&"Boolean"));
        assert!(value["mutationType"].is_null());
    }
}
