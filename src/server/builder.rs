//! RuntimeBuilder for fluent assembly of a GraphQL runtime

use super::exposure::GraphQLExposure;
use super::host::Runtime;
use crate::config::SchemaConfig;
use crate::core::resolvable::Resolvable;
use crate::engine::{DefaultEngine, ExecutionEngine};
use crate::executor::{DebugHook, ExecutionHook, Executor};
use crate::resolver::{FieldResolver, ResolverMap, SolutionOptions, TypeResolver};
use crate::schema::{SchemaBuilder, Type};
use anyhow::Result;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder wiring configuration, types and resolvers into a [`Runtime`]
///
/// # Example
///
/// ```ignore
/// let runtime = RuntimeBuilder::new()
///     .with_config_file("schema.yaml")?
///     .with_resolver("ping", || resolver_fn(|_| Ok(json!("pong"))))
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    configs: Vec<SchemaConfig>,
    type_resolver: Arc<TypeResolver>,
    resolvers: Arc<ResolverMap>,
    hooks: Vec<Arc<dyn ExecutionHook>>,
    engine: Option<Arc<dyn ExecutionEngine>>,
    default_field_resolver: Option<Arc<dyn FieldResolver>>,
    reset_between_requests: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            type_resolver: Arc::new(TypeResolver::new()),
            resolvers: Arc::new(ResolverMap::new("resolver")),
            hooks: Vec::new(),
            engine: None,
            default_field_resolver: None,
            reset_between_requests: false,
        }
    }

    /// Add a configuration; several configurations are merged in order
    pub fn with_config(mut self, config: SchemaConfig) -> Self {
        self.configs.push(config);
        self
    }

    /// Load and add a YAML configuration file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = SchemaConfig::from_yaml_file(path)?;
        Ok(self.with_config(config))
    }

    /// Declare a named field resolver, built on first use
    pub fn with_resolver(
        self,
        name: impl Into<String>,
        factory: impl Resolvable<Arc<dyn FieldResolver>> + 'static,
    ) -> Self {
        self.resolvers.add_solution(name, factory);
        self
    }

    /// Declare a type in code, next to the configured ones
    pub fn with_type<I, S>(
        self,
        id: impl Into<String>,
        factory: impl Resolvable<Arc<Type>> + 'static,
        aliases: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_resolver
            .add_type(id, factory, aliases, SolutionOptions::new());
        self
    }

    /// Append an execution hook
    pub fn with_hook(mut self, hook: impl ExecutionHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Replace the default engine
    pub fn with_engine(mut self, engine: impl ExecutionEngine + 'static) -> Self {
        self.engine = Some(Arc::new(engine));
        self
    }

    /// Resolver used for fields that declare none
    pub fn with_default_field_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.default_field_resolver = Some(resolver);
        self
    }

    /// Reset the runtime after every HTTP request
    pub fn reset_between_requests(mut self, enabled: bool) -> Self {
        self.reset_between_requests = enabled;
        self
    }

    /// Build the runtime
    ///
    /// This will:
    /// 1. Merge and validate the configurations
    /// 2. Register the configured types on the type resolver
    /// 3. Register one deferred schema builder per configured schema
    /// 4. Apply the executor limits and hooks
    pub fn build(self) -> Result<Runtime> {
        let config = SchemaConfig::merge(self.configs);
        config.validate()?;
        config.register_types(&self.type_resolver, &self.resolvers)?;

        let schema_builder = Arc::new(SchemaBuilder::new(
            self.type_resolver.clone(),
            config.executor.validation,
        ));

        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(DefaultEngine::new()));
        let mut executor = Executor::new(engine);
        if let Some(resolver) = self.default_field_resolver {
            executor = executor.with_default_field_resolver(resolver);
        }

        for (name, schema) in &config.schemas {
            let factory = schema_builder.get_builder(
                name.clone(),
                schema.query.clone(),
                schema.mutation.clone(),
                schema.subscription.clone(),
                schema.types.clone(),
                schema.resettable,
            );
            executor.add_schema_builder(name.clone(), move || factory.resolve());
        }

        let limits = &config.executor;
        if let Some(max_query_depth) = limits.max_query_depth {
            executor.set_max_query_depth(max_query_depth);
        }
        if let Some(max_query_complexity) = limits.max_query_complexity {
            executor.set_max_query_complexity(max_query_complexity);
        }
        if !limits.introspection {
            executor.disable_introspection_query();
        }
        if limits.show_debug_info {
            executor.add_hook(Arc::new(DebugHook));
        }
        for hook in self.hooks {
            executor.add_hook(hook);
        }

        tracing::debug!(
            schemas = config.schemas.len(),
            types = config.types.len(),
            "Runtime built"
        );

        Ok(Runtime {
            config: Arc::new(config),
            type_resolver: self.type_resolver,
            resolvers: self.resolvers,
            schema_builder,
            executor: Arc::new(executor),
            reset_between_requests: self.reset_between_requests,
        })
    }

    /// Build the runtime and expose it over HTTP
    pub fn build_router(self) -> Result<Router> {
        let runtime = Arc::new(self.build()?);
        Ok(GraphQLExposure::build_router(runtime))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Handles SIGTERM and SIGINT (Ctrl+C).
    ///
    /// # Example
    ///
    /// ```ignore
    /// RuntimeBuilder::new()
    ///     .with_config_file("schema.yaml")?
    ///     .serve("127.0.0.1:3000").await?;
    /// ```
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build_router()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("GraphQL server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
