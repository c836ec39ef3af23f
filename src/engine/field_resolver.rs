//! Field collection, resolution and value completion
//!
//! Completion follows the usual null-propagation rules: a field that fails is
//! reported once, then becomes null at the nearest nullable position above it.

use super::introspection;
use super::utils;
use super::{GraphQLErrorEntry, PathSegment};
use crate::core::context::ContextValue;
use crate::resolver::{FieldResolver, ResolveInfo};
use crate::schema::{FieldDefinition, InputValue, ObjectType, Schema, Type, TypeRef};
use futures::future::{BoxFuture, FutureExt};
use graphql_parser::Pos;
use graphql_parser::query::{Field, FragmentDefinition, Selection, TypeCondition};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

/// Marks a position that is null because of an already reported error
pub(crate) struct Propagate;

pub(crate) type Completion = Result<Value, Propagate>;

/// Fields grouped by response key, in document order
pub(crate) type GroupedFields<'a, 'q> = IndexMap<String, Vec<&'a Field<'q, String>>>;

/// Shared state of one execution
pub(crate) struct ExecutionScope<'a, 'q> {
    pub schema: &'a Schema,
    pub fragments: HashMap<&'a str, &'a FragmentDefinition<'q, String>>,
    pub variables: &'a Map<String, Value>,
    pub context: &'a ContextValue,
    pub root_value: &'a Value,
    pub default_resolver: Option<&'a Arc<dyn FieldResolver>>,
    pub validate_arguments: bool,
    errors: Mutex<Vec<GraphQLErrorEntry>>,
}

impl<'a, 'q> ExecutionScope<'a, 'q> {
    pub fn new(
        schema: &'a Schema,
        fragments: HashMap<&'a str, &'a FragmentDefinition<'q, String>>,
        variables: &'a Map<String, Value>,
        context: &'a ContextValue,
        root_value: &'a Value,
        default_resolver: Option<&'a Arc<dyn FieldResolver>>,
    ) -> Self {
        Self {
            schema,
            fragments,
            variables,
            context,
            root_value,
            default_resolver,
            validate_arguments: schema.argument_validation_enabled(),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, message: impl Into<String>, path: &[PathSegment], position: Pos) {
        let entry = GraphQLErrorEntry::new(message)
            .with_path(path.to_vec())
            .with_location(position.line, position.column);
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn into_errors(self) -> Vec<GraphQLErrorEntry> {
        self.errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Group the selected fields by response key
    ///
    /// Applies `@skip` / `@include` and fragment type conditions.
    pub fn collect_fields(
        &self,
        type_name: &str,
        selections: &[&'a Selection<'q, String>],
    ) -> GroupedFields<'a, 'q> {
        let mut grouped = IndexMap::new();
        self.collect_into(type_name, selections, &mut grouped, &mut HashSet::new());
        grouped
    }

    fn collect_into(
        &self,
        type_name: &str,
        selections: &[&'a Selection<'q, String>],
        grouped: &mut GroupedFields<'a, 'q>,
        visited: &mut HashSet<&'a str>,
    ) {
        for &selection in selections {
            match selection {
                Selection::Field(field) => {
                    if !utils::should_include(&field.directives, self.variables) {
                        continue;
                    }
                    let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                    grouped.entry(key).or_default().push(field);
                }
                Selection::FragmentSpread(spread) => {
                    if !utils::should_include(&spread.directives, self.variables) {
                        continue;
                    }
                    let Some((&name, &fragment)) =
                        self.fragments.get_key_value(spread.fragment_name.as_str())
                    else {
                        continue;
                    };
                    if !visited.insert(name) || !applies(&fragment.type_condition, type_name) {
                        continue;
                    }
                    let items: Vec<_> = fragment.selection_set.items.iter().collect();
                    self.collect_into(type_name, &items, grouped, visited);
                }
                Selection::InlineFragment(inline) => {
                    if !utils::should_include(&inline.directives, self.variables) {
                        continue;
                    }
                    if let Some(condition) = &inline.type_condition
                        && !applies(condition, type_name)
                    {
                        continue;
                    }
                    let items: Vec<_> = inline.selection_set.items.iter().collect();
                    self.collect_into(type_name, &items, grouped, visited);
                }
            }
        }
    }

    fn null_or_propagate(&self, ty: &TypeRef) -> Completion {
        if ty.is_non_null() {
            Err(Propagate)
        } else {
            Ok(Value::Null)
        }
    }
}

fn applies(condition: &TypeCondition<'_, String>, type_name: &str) -> bool {
    let TypeCondition::On(name) = condition;
    name == type_name
}

/// Sub-selections of every field sharing a response key
fn merged_selections<'a, 'q>(fields: &[&'a Field<'q, String>]) -> Vec<&'a Selection<'q, String>> {
    fields
        .iter()
        .flat_map(|&field| field.selection_set.items.iter())
        .collect()
}

fn child_path(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut child = path.to_vec();
    child.push(segment);
    child
}

/// Execute a selection set against an object value, fields in document order
pub(crate) fn execute_selection_set<'a, 'q>(
    scope: &'a ExecutionScope<'a, 'q>,
    object_type: Arc<Type>,
    parent: Value,
    selections: Vec<&'a Selection<'q, String>>,
    path: Vec<PathSegment>,
) -> BoxFuture<'a, Completion> {
    async move {
        let Some(object) = object_type.as_object() else {
            return Ok(Value::Null);
        };

        let grouped = scope.collect_fields(&object.name, &selections);
        let mut result = Map::new();

        for (key, fields) in grouped {
            let field_path = child_path(&path, PathSegment::Field(key.clone()));
            let value = execute_field(scope, object, &parent, &fields, field_path).await?;
            result.insert(key, value);
        }

        Ok(Value::Object(result))
    }
    .boxed()
}

async fn execute_field<'a, 'q>(
    scope: &'a ExecutionScope<'a, 'q>,
    object: &ObjectType,
    parent: &Value,
    fields: &[&'a Field<'q, String>],
    path: Vec<PathSegment>,
) -> Completion {
    let field = fields[0];
    let name = field.name.as_str();

    match name {
        "__typename" => return Ok(json!(object.name)),
        "__schema" | "__type" if object.name == scope.schema.query().name() => {
            return Ok(introspect(scope, field, fields, &path));
        }
        _ => {}
    }

    let Some(definition) = object.fields.get(name) else {
        scope.record(
            format!("Cannot query field \"{}\" on type \"{}\".", name, object.name),
            &path,
            field.position,
        );
        return Ok(Value::Null);
    };
    let label = format!("{}.{}", object.name, name);

    let args = match coerce_arguments(scope, definition, field, &label) {
        Ok(args) => args,
        Err(message) => {
            scope.record(message, &path, field.position);
            return scope.null_or_propagate(&definition.ty);
        }
    };

    if scope.validate_arguments {
        let violations = validate_arguments(scope.schema, &definition.args, &args);
        if !violations.is_empty() {
            for violation in violations {
                scope.record(violation, &path, field.position);
            }
            return scope.null_or_propagate(&definition.ty);
        }
    }

    let resolved = resolve_field(scope, object, definition, parent, &args, &path).await;
    match resolved {
        Ok(value) => {
            complete_value(
                scope,
                definition.ty.clone(),
                value,
                merged_selections(fields),
                path,
                field.position,
                label,
            )
            .await
        }
        Err(e) => {
            scope.record(e.to_string(), &path, field.position);
            scope.null_or_propagate(&definition.ty)
        }
    }
}

async fn resolve_field(
    scope: &ExecutionScope<'_, '_>,
    object: &ObjectType,
    definition: &FieldDefinition,
    parent: &Value,
    args: &Map<String, Value>,
    path: &[PathSegment],
) -> anyhow::Result<Value> {
    let resolver = definition.resolver.as_ref().or(scope.default_resolver);
    let Some(resolver) = resolver else {
        return Ok(utils::default_property(parent, &definition.name));
    };

    resolver
        .resolve(ResolveInfo {
            field_name: &definition.name,
            parent_type: &object.name,
            parent,
            args,
            context: scope.context,
            root_value: scope.root_value,
            schema: scope.schema,
            path,
        })
        .await
}

fn introspect<'a, 'q>(
    scope: &'a ExecutionScope<'a, 'q>,
    field: &'a Field<'q, String>,
    fields: &[&'a Field<'q, String>],
    path: &[PathSegment],
) -> Value {
    let value = if field.name == "__schema" {
        introspection::schema_value(scope.schema)
    } else {
        let requested = utils::argument_value(&field.arguments, "name", scope.variables);
        match requested.as_ref().and_then(Value::as_str) {
            Some(type_name) => scope
                .schema
                .get_type(type_name)
                .map(|ty| introspection::type_value(scope.schema, &ty))
                .unwrap_or(Value::Null),
            None => {
                scope.record(
                    "Argument \"name\" of required type \"String!\" was not provided.",
                    path,
                    field.position,
                );
                Value::Null
            }
        }
    };

    introspection::project(scope, &value, &merged_selections(fields))
}

/// Complete a resolved value according to its declared type
fn complete_value<'a, 'q>(
    scope: &'a ExecutionScope<'a, 'q>,
    ty: TypeRef,
    value: Value,
    selections: Vec<&'a Selection<'q, String>>,
    path: Vec<PathSegment>,
    position: Pos,
    label: String,
) -> BoxFuture<'a, Completion> {
    async move {
        match ty {
            TypeRef::NonNull(inner) => {
                let completed =
                    complete_inner(scope, *inner, value, selections, &path, position, &label)
                        .await?;
                if completed.is_null() {
                    scope.record(
                        format!("Cannot return null for non-nullable field {}.", label),
                        &path,
                        position,
                    );
                    return Err(Propagate);
                }
                Ok(completed)
            }
            nullable => Ok(
                complete_inner(scope, nullable, value, selections, &path, position, &label)
                    .await
                    .unwrap_or(Value::Null),
            ),
        }
    }
    .boxed()
}

async fn complete_inner<'a, 'q>(
    scope: &'a ExecutionScope<'a, 'q>,
    ty: TypeRef,
    value: Value,
    selections: Vec<&'a Selection<'q, String>>,
    path: &[PathSegment],
    position: Pos,
    label: &str,
) -> Completion {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        TypeRef::NonNull(inner) => {
            complete_value(
                scope,
                TypeRef::NonNull(inner),
                value,
                selections,
                path.to_vec(),
                position,
                label.to_string(),
            )
            .await
        }
        TypeRef::List(item_type) => {
            let Value::Array(items) = value else {
                scope.record(
                    format!("Expected a list for field {}.", label),
                    path,
                    position,
                );
                return Err(Propagate);
            };

            let mut completed = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_path = child_path(path, PathSegment::Index(index));
                let item = complete_value(
                    scope,
                    (*item_type).clone(),
                    item,
                    selections.clone(),
                    item_path,
                    position,
                    label.to_string(),
                )
                .await?;
                completed.push(item);
            }
            Ok(Value::Array(completed))
        }
        TypeRef::Named(type_name) => {
            let Some(named) = scope.schema.get_type(&type_name) else {
                scope.record(format!("Unknown type \"{}\".", type_name), path, position);
                return Err(Propagate);
            };

            match named.as_ref() {
                Type::Object(_) => {
                    execute_selection_set(scope, named.clone(), value, selections, path.to_vec())
                        .await
                }
                Type::Scalar(scalar) => serialize_scalar(&scalar.name, value).map_err(|message| {
                    scope.record(message, path, position);
                    Propagate
                }),
                Type::Enum(enum_type) => {
                    if is_enum_value(&enum_type.values, &value) {
                        return Ok(value);
                    }
                    scope.record(
                        format!("Enum \"{}\" cannot represent value: {}", enum_type.name, value),
                        path,
                        position,
                    );
                    Err(Propagate)
                }
                Type::InputObject(input) => {
                    scope.record(
                        format!("Input type \"{}\" cannot be used as an output type.", input.name),
                        path,
                        position,
                    );
                    Err(Propagate)
                }
            }
        }
    }
}

/// Serialize a resolved value as a built-in scalar; custom scalars pass through
pub(crate) fn serialize_scalar(name: &str, value: Value) -> Result<Value, String> {
    match name {
        "Int" => {
            let int = match &value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                Value::Bool(b) => Some(i64::from(*b)),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            match int {
                Some(i) if i32::try_from(i).is_ok() => Ok(json!(i)),
                _ => Err(format!("Int cannot represent non 32-bit signed integer value: {}", value)),
            }
        }
        "Float" => {
            let float = match &value {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            float
                .filter(|f| f.is_finite())
                .map(|f| json!(f))
                .ok_or_else(|| format!("Float cannot represent non numeric value: {}", value))
        }
        "String" => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(json!(n.to_string())),
            Value::Bool(b) => Ok(json!(if b { "true" } else { "false" })),
            other => Err(format!("String cannot represent value: {}", other)),
        },
        "ID" => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(json!(n.to_string())),
            other => Err(format!("ID cannot represent value: {}", other)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value),
            Value::Number(n) => Ok(json!(n.as_f64().is_some_and(|f| f != 0.0))),
            other => Err(format!("Boolean cannot represent a non boolean value: {}", other)),
        },
        _ => Ok(value),
    }
}

/// Coerce the arguments of `field`, applying declared defaults
fn coerce_arguments(
    scope: &ExecutionScope<'_, '_>,
    definition: &FieldDefinition,
    field: &Field<'_, String>,
    label: &str,
) -> Result<Map<String, Value>, String> {
    if let Some((unknown, _)) = field
        .arguments
        .iter()
        .find(|(name, _)| !definition.args.contains_key(name.as_str()))
    {
        return Err(format!(
            "Unknown argument \"{}\" on field \"{}\".",
            unknown, label
        ));
    }

    let mut coerced = Map::new();
    for (name, arg) in &definition.args {
        let provided = utils::argument_value(&field.arguments, name, scope.variables);
        let Some(value) = provided.or_else(|| arg.default_value.clone()) else {
            if arg.ty.is_non_null() {
                return Err(format!(
                    "Argument \"{}\" of required type \"{}\" was not provided.",
                    name, arg.ty
                ));
            }
            continue;
        };

        let value = coerce_input(scope.schema, &arg.ty, value)
            .map_err(|message| format!("Argument \"{}\" has invalid value: {}", name, message))?;
        coerced.insert(name.clone(), value);
    }

    Ok(coerced)
}

/// Coerce an input value, filling input-object field defaults
pub(crate) fn coerce_input(schema: &Schema, ty: &TypeRef, value: Value) -> Result<Value, String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(format!("Expected non-nullable type \"{}\" not to be null.", ty));
            }
            coerce_input(schema, inner, value)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| coerce_input(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input(schema, inner, single)?])),
        },
        TypeRef::Named(name) => {
            let Some(named) = schema.get_type(name) else {
                return Ok(value);
            };
            match named.as_ref() {
                Type::InputObject(input) => {
                    let Value::Object(mut provided) = value else {
                        return Err(format!("Expected type \"{}\" to be an object.", input.name));
                    };
                    if let Some(unknown) = provided.keys().find(|k| !input.fields.contains_key(*k)) {
                        return Err(format!(
                            "Field \"{}\" is not defined by type \"{}\".",
                            unknown, input.name
                        ));
                    }

                    let mut coerced = Map::new();
                    for (field_name, field) in &input.fields {
                        match provided.remove(field_name).or_else(|| field.default_value.clone()) {
                            Some(v) => {
                                coerced.insert(field_name.clone(), coerce_input(schema, &field.ty, v)?);
                            }
                            None if field.ty.is_non_null() => {
                                return Err(format!(
                                    "Field \"{}.{}\" of required type \"{}\" was not provided.",
                                    input.name, field_name, field.ty
                                ));
                            }
                            None => {}
                        }
                    }
                    Ok(Value::Object(coerced))
                }
                Type::Enum(enum_type) if is_enum_value(&enum_type.values, &value) => Ok(value),
                Type::Enum(enum_type) => Err(format!(
                    "Value {} does not exist in \"{}\" enum.",
                    value, enum_type.name
                )),
                Type::Scalar(scalar) => parse_scalar(&scalar.name, value),
                Type::Object(object) => Err(format!(
                    "Output type \"{}\" cannot be used as an input type.",
                    object.name
                )),
            }
        }
    }
}

fn is_enum_value(values: &[String], value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| values.iter().any(|v| v == s))
}

fn parse_scalar(name: &str, value: Value) -> Result<Value, String> {
    let valid = match name {
        "Int" => value
            .as_i64()
            .is_some_and(|i| i32::try_from(i).is_ok()),
        "Float" => value.is_number(),
        "String" => value.is_string(),
        "Boolean" => value.is_boolean(),
        "ID" => value.is_string() || value.is_i64() || value.is_u64(),
        _ => true,
    };

    if valid {
        Ok(value)
    } else {
        Err(format!("{} cannot represent value: {}", name, value))
    }
}

/// Check argument constraints, recursing into input objects and lists
///
/// Violations are reported as `"{path}: {message}"`.
pub(crate) fn validate_arguments(
    schema: &Schema,
    definitions: &IndexMap<String, InputValue>,
    args: &Map<String, Value>,
) -> Vec<String> {
    let mut violations = Vec::new();
    for (name, definition) in definitions {
        let value = args.get(name).unwrap_or(&Value::Null);
        validate_input(schema, definition, value, name, &mut violations);
    }
    violations
}

fn validate_input(
    schema: &Schema,
    definition: &InputValue,
    value: &Value,
    path: &str,
    violations: &mut Vec<String>,
) {
    for constraint in &definition.constraints {
        if let Err(message) = constraint.check(value) {
            violations.push(format!("{}: {}", path, message));
        }
    }
    validate_nested(schema, &definition.ty, value, path, violations);
}

fn validate_nested(
    schema: &Schema,
    ty: &TypeRef,
    value: &Value,
    path: &str,
    violations: &mut Vec<String>,
) {
    match (ty, value) {
        (TypeRef::NonNull(inner), _) => validate_nested(schema, inner, value, path, violations),
        (TypeRef::List(inner), Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                validate_nested(schema, inner, item, &format!("{}[{}]", path, index), violations);
            }
        }
        (TypeRef::Named(name), Value::Object(fields)) => {
            let Some(named) = schema.get_type(name) else {
                return;
            };
            let Some(input) = named.as_input_object() else {
                return;
            };

            for constraint in &input.constraints {
                if let Err(message) = constraint.check(value) {
                    violations.push(format!("{}: {}", path, message));
                }
            }
            for (field_name, field) in &input.fields {
                let field_value = fields.get(field_name).unwrap_or(&Value::Null);
                let field_path = format!("{}.{}", path, field_name);
                validate_input(schema, field, field_value, &field_path, violations);
            }
        }
        _ => {}
    }
}
