//! GraphQL over HTTP
//!
//! Routes:
//! - `POST /graphql`: execute against the default schema
//! - `POST /graphql/{schema}`: execute against a named schema
//! - `GET /graphql/schemas`: list known schema names
//!
//! Query-level errors come back with a 200 and an `errors` array. A body that
//! is not a GraphQL request is a 400, an unknown schema a 404 and a runtime
//! without schemas a 500.

use crate::core::error::{RequestError, ThisGqlError};
use crate::engine::{ExecutionResult, GraphQLRequest};
use crate::server::host::Runtime;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// GraphQL API exposure implementation
pub struct GraphQLExposure;

impl GraphQLExposure {
    /// Build the GraphQL router from a runtime
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let runtime = Arc::new(builder.build()?);
    /// let app = GraphQLExposure::build_router(runtime);
    /// ```
    pub fn build_router(runtime: Arc<Runtime>) -> Router {
        Router::new()
            .route("/graphql", post(execute_default))
            .route("/graphql/schemas", get(list_schemas))
            .route("/graphql/{schema}", post(execute_named))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            )
            .with_state(runtime)
    }
}

async fn execute_default(
    State(runtime): State<Arc<Runtime>>,
    payload: Result<Json<GraphQLRequest>, JsonRejection>,
) -> Result<Json<ExecutionResult>, ThisGqlError> {
    execute(&runtime, None, request_body(payload)?).await
}

async fn execute_named(
    State(runtime): State<Arc<Runtime>>,
    Path(schema): Path<String>,
    payload: Result<Json<GraphQLRequest>, JsonRejection>,
) -> Result<Json<ExecutionResult>, ThisGqlError> {
    execute(&runtime, Some(&schema), request_body(payload)?).await
}

fn request_body(
    payload: Result<Json<GraphQLRequest>, JsonRejection>,
) -> Result<GraphQLRequest, ThisGqlError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected GraphQL request body");
            Err(RequestError::BadRequest {
                message: rejection.body_text(),
            }
            .into())
        }
    }
}

async fn execute(
    runtime: &Runtime,
    schema: Option<&str>,
    request: GraphQLRequest,
) -> Result<Json<ExecutionResult>, ThisGqlError> {
    let result = runtime.execute(schema, request).await;
    runtime.end_request();
    Ok(Json(result?))
}

async fn list_schemas(State(runtime): State<Arc<Runtime>>) -> Json<Value> {
    Json(json!({ "schemas": runtime.schema_names() }))
}
