//! GraphQL execution engine
//!
//! The executor only depends on the [`ExecutionEngine`] trait; [`DefaultEngine`]
//! is the implementation shipped with the crate. It is split into:
//! - `core`: document parsing, operation selection and variable coercion
//! - `rules`: depth, complexity and introspection limits
//! - `field_resolver`: field collection, argument coercion and value completion
//! - `introspection`: `__schema` and `__type`
//! - `utils`: helpers shared by the above

mod core;
mod field_resolver;
mod introspection;
pub mod rules;
pub mod utils;

pub use self::core::DefaultEngine;
pub use rules::ValidationRules;

use crate::core::context::ContextValue;
use crate::resolver::FieldResolver;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Incoming GraphQL request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQLRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// One step of a response path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, "{}", name),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Error entry reported inside an [`ExecutionResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLErrorEntry {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl GraphQLErrorEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = path;
        self
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.locations.push(Location { line, column });
        self
    }
}

/// Outcome of one execution: data plus the errors met along the way
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLErrorEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Result without data, for requests rejected before execution
    pub fn from_errors(errors: Vec<GraphQLErrorEntry>) -> Self {
        Self {
            data: None,
            errors,
            extensions: None,
        }
    }

    pub fn from_error(message: impl Into<String>) -> Self {
        Self::from_errors(vec![GraphQLErrorEntry::new(message)])
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Set an entry in the `extensions` map
    pub fn set_extension(&mut self, key: impl Into<String>, value: Value) {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
    }
}

/// Everything an engine needs to run one request
pub struct EngineRequest {
    pub schema: Arc<Schema>,
    pub query: Option<String>,
    pub root_value: Value,
    pub context_value: ContextValue,
    pub variables: Map<String, Value>,
    pub operation_name: Option<String>,
    /// Used for fields that declare no resolver of their own
    pub default_field_resolver: Option<Arc<dyn FieldResolver>>,
    pub rules: ValidationRules,
}

/// Parses, validates and executes a document against a schema
///
/// Query-level failures are reported in the returned result, never as a Rust
/// error.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn execute(&self, request: EngineRequest) -> ExecutionResult;
}
