//! Runtime host shared by every exposure
//!
//! A [`Runtime`] owns the wired-up registries and the executor. It is
//! transport-agnostic: the HTTP exposure only holds an `Arc<Runtime>` and
//! forwards requests to [`Runtime::execute`].

use crate::config::SchemaConfig;
use crate::core::error::GqlResult;
use crate::engine::{ExecutionResult, GraphQLRequest};
use crate::executor::Executor;
use crate::resolver::{ResolverMap, TypeResolver};
use crate::schema::SchemaBuilder;
use serde_json::Value;
use std::sync::Arc;

/// Host context containing all runtime state
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Arc::new(RuntimeBuilder::new().with_config_file("schema.yaml")?.build()?);
/// let app = GraphQLExposure::build_router(runtime.clone());
/// ```
pub struct Runtime {
    /// Merged configuration the runtime was built from
    pub config: Arc<SchemaConfig>,

    /// Type declarations, resolved lazily per schema
    pub type_resolver: Arc<TypeResolver>,

    /// Named field resolvers referenced by `resolve:` entries
    pub resolvers: Arc<ResolverMap>,

    /// Memoizing builder behind every configured schema
    pub schema_builder: Arc<SchemaBuilder>,

    pub executor: Arc<Executor>,

    /// Whether the HTTP exposure calls [`Runtime::reset`] after each request
    pub reset_between_requests: bool,
}

impl Runtime {
    /// Execute a request against the named (or default) schema
    pub async fn execute(
        &self,
        schema_name: Option<&str>,
        request: GraphQLRequest,
    ) -> GqlResult<ExecutionResult> {
        self.executor.execute(schema_name, request, None).await
    }

    /// Execute with an explicit root value
    pub async fn execute_with_root(
        &self,
        schema_name: Option<&str>,
        request: GraphQLRequest,
        root_value: Value,
    ) -> GqlResult<ExecutionResult> {
        self.executor
            .execute(schema_name, request, Some(root_value))
            .await
    }

    /// Known schema names, without duplicates
    pub fn schema_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for name in self.executor.get_schemas_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Drop transient state at a request boundary
    ///
    /// Resettable schemas, built types and built resolvers are dropped;
    /// declarations survive and are rebuilt on next use.
    pub fn reset(&self) {
        self.executor.reset();
        self.schema_builder.reset();
        self.type_resolver.reset();
        self.resolvers.reset();
        tracing::debug!("Runtime reset");
    }

    /// Hook called by exposures once a request is answered
    pub fn end_request(&self) {
        if self.reset_between_requests {
            self.reset();
        }
    }
}
