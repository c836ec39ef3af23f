//! Core GraphQL engine orchestration

use super::field_resolver::{ExecutionScope, execute_selection_set};
use super::rules;
use super::utils;
use super::{EngineRequest, ExecutionEngine, ExecutionResult, GraphQLErrorEntry};
use crate::core::error::GraphQLError;
use async_trait::async_trait;
use graphql_parser::query::{
    Definition, Document, OperationDefinition, Type as GqlType, VariableDefinition, parse_query,
};
use serde_json::{Map, Value};

/// Engine executing documents with [`graphql_parser`]
///
/// Queries and mutations are resolved field by field, in document order.
/// Subscriptions are rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultEngine;

impl DefaultEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ExecutionEngine for DefaultEngine {
    async fn execute(&self, request: EngineRequest) -> ExecutionResult {
        let Some(query) = request.query.as_deref() else {
            return ExecutionResult::from_error("Query string must be provided");
        };

        let document = match parse_query::<String>(query) {
            Ok(document) => document,
            Err(e) => {
                let error = GraphQLError::ParseError {
                    message: e.to_string(),
                };
                return ExecutionResult::from_error(error.to_string());
            }
        };

        let operation = match select_operation(&document, request.operation_name.as_deref()) {
            Ok(operation) => operation,
            Err(error) => return ExecutionResult::from_error(error.to_string()),
        };

        let violations = request.rules.check(&document, operation);
        if !violations.is_empty() {
            tracing::warn!(
                schema = %request.schema.name(),
                violations = ?violations,
                "Query rejected by validation rules"
            );
            return ExecutionResult::from_errors(
                violations.into_iter().map(GraphQLErrorEntry::new).collect(),
            );
        }

        let variables = match coerce_variables(operation, &request.variables) {
            Ok(variables) => variables,
            Err(message) => return ExecutionResult::from_error(message),
        };

        let schema = request.schema.as_ref();
        let root_type = match operation {
            OperationDefinition::Query(_) | OperationDefinition::SelectionSet(_) => {
                schema.query().clone()
            }
            OperationDefinition::Mutation(_) => match schema.mutation() {
                Some(mutation) => mutation.clone(),
                None => {
                    return ExecutionResult::from_error("Schema is not configured for mutations.");
                }
            },
            OperationDefinition::Subscription(_) => {
                return ExecutionResult::from_error("Subscriptions are not supported");
            }
        };

        let scope = ExecutionScope::new(
            schema,
            rules::fragments(&document),
            &variables,
            &request.context_value,
            &request.root_value,
            request.default_field_resolver.as_ref(),
        );

        let selections = rules::operation_selection_set(operation).items.iter().collect();
        let data = execute_selection_set(
            &scope,
            root_type,
            request.root_value.clone(),
            selections,
            Vec::new(),
        )
        .await
        .unwrap_or(Value::Null);

        ExecutionResult {
            data: Some(data),
            errors: scope.into_errors(),
            extensions: None,
        }
    }
}

fn select_operation<'d, 'q>(
    document: &'d Document<'q, String>,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'q, String>, GraphQLError> {
    let operations: Vec<&OperationDefinition<'q, String>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .collect();

    let invalid = |message: String| GraphQLError::InvalidOperation {
        operation: operation_name.map(str::to_string),
        message,
    };

    match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| self::operation_name(operation) == Some(name))
            .ok_or_else(|| invalid(format!("Unknown operation named \"{}\".", name))),
        None => match operations.as_slice() {
            [operation] => Ok(*operation),
            [] => Err(invalid("Must provide an operation.".to_string())),
            _ => Err(invalid(
                "Must provide operation name if query contains multiple operations.".to_string(),
            )),
        },
    }
}

fn operation_name<'d>(operation: &'d OperationDefinition<'_, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}

fn variable_definitions<'d, 'q>(
    operation: &'d OperationDefinition<'q, String>,
) -> &'d [VariableDefinition<'q, String>] {
    match operation {
        OperationDefinition::SelectionSet(_) => &[],
        OperationDefinition::Query(query) => &query.variable_definitions,
        OperationDefinition::Mutation(mutation) => &mutation.variable_definitions,
        OperationDefinition::Subscription(subscription) => &subscription.variable_definitions,
    }
}

/// Keep the declared variables, filling defaults and checking required ones
fn coerce_variables(
    operation: &OperationDefinition<'_, String>,
    provided: &Map<String, Value>,
) -> Result<Map<String, Value>, String> {
    let mut variables = Map::new();

    for definition in variable_definitions(operation) {
        let value = provided.get(&definition.name).cloned().or_else(|| {
            definition
                .default_value
                .as_ref()
                .map(|default| utils::gql_value_to_json(default, &Map::new()))
        });

        match value {
            Some(Value::Null) | None if matches!(definition.var_type, GqlType::NonNullType(_)) => {
                return Err(format!(
                    "Variable \"${}\" of required type \"{}\" was not provided.",
                    definition.name, definition.var_type
                ));
            }
            Some(value) => {
                variables.insert(definition.name.clone(), value);
            }
            None => {}
        }
    }

    Ok(variables)
}
