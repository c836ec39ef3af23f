//! Typed error handling for this-gql
//!
//! Only hard failures live here: a misconfigured runtime or a request for a
//! schema that does not exist. Query-level problems (syntax errors, rule
//! violations, resolver failures) are never raised as errors; they are carried
//! inside [`ExecutionResult::errors`](crate::engine::ExecutionResult) so partial
//! data survives.
//!
//! # Error Categories
//!
//! - [`ConfigError`]: Errors related to configuration and schema declaration
//! - [`RequestError`]: Errors caused by the incoming request (unknown schema, ...)
//! - [`GraphQLError`]: Errors produced while parsing or executing a document
//!
//! # Example
//!
//! ```rust,ignore
//! match executor.execute(Some("blog"), request, None).await {
//!     Ok(result) => println!("{:?}", result.data),
//!     Err(ThisGqlError::Request(RequestError::SchemaNotFound { name })) => {
//!         println!("no schema called {}", name);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Result alias used across the runtime core
pub type GqlResult<T> = std::result::Result<T, ThisGqlError>;

/// The main error type for this-gql
#[derive(Debug)]
pub enum ThisGqlError {
    /// Configuration errors (fatal, raised immediately)
    Config(ConfigError),

    /// Request errors (surfaced to the caller, usually mapped to a 4xx)
    Request(RequestError),

    /// GraphQL document errors
    GraphQL(GraphQLError),
}

impl fmt::Display for ThisGqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThisGqlError::Config(e) => write!(f, "{}", e),
            ThisGqlError::Request(e) => write!(f, "{}", e),
            ThisGqlError::GraphQL(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ThisGqlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThisGqlError::Config(e) => Some(e),
            ThisGqlError::Request(e) => Some(e),
            ThisGqlError::GraphQL(e) => Some(e),
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ThisGqlError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ThisGqlError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ThisGqlError::Request(e) => e.status_code(),
            ThisGqlError::GraphQL(e) => e.status_code(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ThisGqlError::Config(e) => e.error_code(),
            ThisGqlError::Request(e) => e.error_code(),
            ThisGqlError::GraphQL(e) => e.error_code(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ThisGqlError::Request(RequestError::SchemaNotFound { name }) => {
                Some(serde_json::json!({ "schema": name }))
            }
            ThisGqlError::Config(ConfigError::UnresolvableType { alias, schema }) => {
                Some(serde_json::json!({ "alias": alias, "schema": schema }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ThisGqlError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration and schema declaration
#[derive(Debug)]
pub enum ConfigError {
    /// No schema builder and no schema were registered on the executor
    NoSchemaDeclared,

    /// A type alias could not be resolved while building a schema
    UnresolvableType {
        alias: String,
        schema: Option<String>,
    },

    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Missing required field in configuration
    MissingField { field: String, context: String },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound { path: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoSchemaDeclared => {
                write!(f, "At least one schema should be declared.")
            }
            ConfigError::UnresolvableType { alias, schema } => match schema {
                Some(schema) => write!(
                    f,
                    "Could not find type with alias \"{}\" in schema \"{}\".",
                    alias, schema
                ),
                None => write!(f, "Could not find type with alias \"{}\".", alias),
            },
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::MissingField { field, context } => {
                write!(f, "Missing required field '{}' in {}", field, context)
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::NoSchemaDeclared => "NO_SCHEMA_DECLARED",
            ConfigError::UnresolvableType { .. } => "UNRESOLVABLE_TYPE",
            ConfigError::ParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
        }
    }
}

impl From<ConfigError> for ThisGqlError {
    fn from(err: ConfigError) -> Self {
        ThisGqlError::Config(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors caused by the incoming request
#[derive(Debug)]
pub enum RequestError {
    /// The requested schema has neither a built instance nor a builder
    SchemaNotFound { name: String },

    /// The HTTP body is not a GraphQL request
    BadRequest { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::SchemaNotFound { name } => {
                write!(f, "Could not find \"{}\" schema.", name)
            }
            RequestError::BadRequest { message } => write!(f, "Bad request: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::SchemaNotFound { .. } => StatusCode::NOT_FOUND,
            RequestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::SchemaNotFound { .. } => "SCHEMA_NOT_FOUND",
            RequestError::BadRequest { .. } => "BAD_REQUEST",
        }
    }
}

impl From<RequestError> for ThisGqlError {
    fn from(err: RequestError) -> Self {
        ThisGqlError::Request(err)
    }
}

// =============================================================================
// GraphQL Errors
// =============================================================================

/// Errors related to a GraphQL document
///
/// The engine turns these into result entries; they only surface as
/// [`ThisGqlError`] when a caller asks for them explicitly.
#[derive(Debug)]
pub enum GraphQLError {
    /// Query parsing error
    ParseError { message: String },

    /// No operation of the document can be selected
    InvalidOperation {
        operation: Option<String>,
        message: String,
    },
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphQLError::ParseError { message } => {
                write!(f, "Syntax Error: {}", message)
            }
            GraphQLError::InvalidOperation { message, .. } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for GraphQLError {}

impl GraphQLError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GraphQLError::ParseError { .. } => StatusCode::BAD_REQUEST,
            GraphQLError::InvalidOperation { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            GraphQLError::ParseError { .. } => "GRAPHQL_PARSE_ERROR",
            GraphQLError::InvalidOperation { .. } => "GRAPHQL_INVALID_OPERATION",
        }
    }
}

impl From<GraphQLError> for ThisGqlError {
    fn from(err: GraphQLError) -> Self {
        ThisGqlError::GraphQL(err)
    }
}
