//! Request-facing orchestrator

use super::hooks::{ExecutionHook, ExecutorArguments};
use crate::core::context::ContextValue;
use crate::core::error::{ConfigError, GqlResult, RequestError};
use crate::core::resolvable::Resolvable;
use crate::engine::{
    EngineRequest, ExecutionEngine, ExecutionResult, GraphQLRequest, ValidationRules,
};
use crate::resolver::FieldResolver;
use crate::schema::{Schema, SchemaFactory};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

/// Selects a schema, runs the hook chain and delegates to an engine
///
/// Each named schema is built at most once; the built instance is served
/// until [`Executor::reset`] drops it (only when it is flagged resettable).
/// Query limits set on the executor apply to every later execution, across
/// all of its schemas.
pub struct Executor {
    engine: RwLock<Arc<dyn ExecutionEngine>>,
    hooks: RwLock<Vec<Arc<dyn ExecutionHook>>>,
    default_field_resolver: Option<Arc<dyn FieldResolver>>,
    schema_builders: RwLock<IndexMap<String, SchemaFactory>>,
    schemas: RwLock<IndexMap<String, Arc<Schema>>>,
    build_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    rules: RwLock<ValidationRules>,
}

impl Executor {
    pub fn new(engine: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            engine: RwLock::new(engine),
            hooks: RwLock::new(Vec::new()),
            default_field_resolver: None,
            schema_builders: RwLock::new(IndexMap::new()),
            schemas: RwLock::new(IndexMap::new()),
            build_locks: Mutex::new(HashMap::new()),
            rules: RwLock::new(ValidationRules::default()),
        }
    }

    /// Resolver used for fields that declare none
    pub fn with_default_field_resolver(mut self, resolver: Arc<dyn FieldResolver>) -> Self {
        self.default_field_resolver = Some(resolver);
        self
    }

    /// Swap the execution engine
    pub fn set_engine(&self, engine: Arc<dyn ExecutionEngine>) -> &Self {
        *self.engine.write().unwrap_or_else(PoisonError::into_inner) = engine;
        self
    }

    /// Append a hook; hooks run in registration order
    pub fn add_hook(&self, hook: Arc<dyn ExecutionHook>) -> &Self {
        tracing::debug!(hook = hook.name(), "Registering execution hook");
        self.hooks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
        self
    }

    /// Register a deferred schema builder (last registration wins)
    pub fn add_schema_builder(
        &self,
        name: impl Into<String>,
        builder: impl Resolvable<GqlResult<Arc<Schema>>> + 'static,
    ) -> &Self {
        self.schema_builders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(builder));
        self
    }

    /// Register an already built schema (last registration wins)
    pub fn add_schema(&self, name: impl Into<String>, schema: Arc<Schema>) -> &Self {
        self.schemas
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), schema);
        self
    }

    /// Get a schema by name, building it on first use
    ///
    /// Without a name, picks the built `default`, then the first built schema,
    /// then the `default` builder, then the first builder.
    pub fn get_schema(&self, name: Option<&str>) -> GqlResult<Arc<Schema>> {
        self.select_schema(name).map(|(_, schema)| schema)
    }

    /// Builder names followed by built schema names
    ///
    /// A schema that has been built appears twice.
    pub fn get_schemas_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read_builders().keys().cloned().collect();
        names.extend(self.read_schemas().keys().cloned());
        names
    }

    /// Drop every built schema flagged resettable
    ///
    /// Builders are kept, so dropped schemas are rebuilt on their next use.
    pub fn reset(&self) {
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        let before = schemas.len();
        schemas.retain(|_, schema| !schema.is_resettable());
        tracing::debug!(dropped = before - schemas.len(), "Executor reset");
    }

    pub fn set_max_query_depth(&self, max_query_depth: usize) {
        tracing::info!(max_query_depth, "Setting max query depth");
        self.write_rules().max_query_depth = ValidationRules::limit(max_query_depth);
    }

    pub fn set_max_query_complexity(&self, max_query_complexity: usize) {
        tracing::info!(max_query_complexity, "Setting max query complexity");
        self.write_rules().max_query_complexity = ValidationRules::limit(max_query_complexity);
    }

    pub fn enable_introspection_query(&self) {
        tracing::info!("Enabling introspection queries");
        self.write_rules().disable_introspection = false;
    }

    pub fn disable_introspection_query(&self) {
        tracing::info!("Disabling introspection queries");
        self.write_rules().disable_introspection = true;
    }

    /// Snapshot of the current limits
    pub fn rules(&self) -> ValidationRules {
        *self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a request against the named (or default) schema
    ///
    /// Only schema selection can fail; query-level errors are carried by the
    /// returned result.
    #[tracing::instrument(skip(self, request, root_value))]
    pub async fn execute(
        &self,
        schema_name: Option<&str>,
        request: GraphQLRequest,
        root_value: Option<Value>,
    ) -> GqlResult<ExecutionResult> {
        let started_at = Instant::now();
        let (schema_name, schema) = self.select_schema(schema_name)?;

        let hooks = self.hooks();
        let context_value = ContextValue::new();
        for hook in &hooks {
            hook.on_executor_context(&context_value);
        }

        let mut arguments = ExecutorArguments {
            schema_name,
            schema,
            request_string: request.query,
            context_value,
            root_value: root_value.unwrap_or(Value::Null),
            variable_value: request.variables.unwrap_or_default(),
            operation_name: request.operation_name,
            started_at,
        };
        for hook in &hooks {
            hook.on_pre_execute(&mut arguments);
        }

        arguments.schema.process_extensions();

        let engine = self.engine();
        let mut result = engine
            .execute(EngineRequest {
                schema: arguments.schema.clone(),
                query: arguments.request_string.clone(),
                root_value: arguments.root_value.clone(),
                context_value: arguments.context_value.clone(),
                variables: arguments.variable_value.clone(),
                operation_name: arguments.operation_name.clone(),
                default_field_resolver: self.default_field_resolver.clone(),
                rules: self.rules(),
            })
            .await;

        for hook in &hooks {
            hook.on_post_execute(&mut result, &arguments);
        }

        tracing::debug!(
            schema = %arguments.schema_name,
            errors = result.errors.len(),
            "Execution finished"
        );

        Ok(result)
    }

    fn select_schema(&self, name: Option<&str>) -> GqlResult<(String, Arc<Schema>)> {
        let name = match name {
            Some(name) => name.to_string(),
            None => self.default_schema_name()?,
        };

        if let Some(schema) = self.read_schemas().get(&name).cloned() {
            return Ok((name, schema));
        }

        let builder = self.read_builders().get(&name).cloned();
        let Some(builder) = builder else {
            if self.read_builders().is_empty() && self.read_schemas().is_empty() {
                return Err(ConfigError::NoSchemaDeclared.into());
            }
            return Err(RequestError::SchemaNotFound { name }.into());
        };

        let lock = self.build_lock(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(schema) = self.read_schemas().get(&name).cloned() {
            return Ok((name, schema));
        }

        tracing::debug!(schema = %name, "Building schema");
        let schema = builder.resolve()?;
        self.add_schema(name.clone(), schema.clone());

        Ok((name, schema))
    }

    fn default_schema_name(&self) -> GqlResult<String> {
        let schemas = self.read_schemas();
        let builders = self.read_builders();

        let name = if schemas.contains_key("default") {
            Some("default")
        } else if let Some((first, _)) = schemas.first() {
            Some(first.as_str())
        } else if builders.contains_key("default") {
            Some("default")
        } else {
            builders.first().map(|(first, _)| first.as_str())
        };

        name.map(str::to_string)
            .ok_or_else(|| ConfigError::NoSchemaDeclared.into())
    }

    fn build_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.build_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    fn engine(&self) -> Arc<dyn ExecutionEngine> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn hooks(&self) -> Vec<Arc<dyn ExecutionHook>> {
        self.hooks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn read_builders(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, IndexMap<String, SchemaFactory>> {
        self.schema_builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read_schemas(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<String, Arc<Schema>>> {
        self.schemas.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_rules(&self) -> std::sync::RwLockWriteGuard<'_, ValidationRules> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DefaultEngine;
    use crate::schema::{ObjectType, Type};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema(name: &str) -> Arc<Schema> {
        Arc::new(Schema::new(
            name,
            Arc::new(Type::Object(ObjectType::new("Query"))),
        ))
    }

    fn executor() -> Executor {
        Executor::new(Arc::new(DefaultEngine))
    }

    fn builder(name: &'static str) -> impl Fn() -> GqlResult<Arc<Schema>> + Send + Sync {
        move || Ok(schema(name))
    }

    #[test]
    fn test_no_schema_declared() {
        let err = executor().get_schema(None).expect_err("nothing registered");
        assert_eq!(err.to_string(), "At least one schema should be declared.");

        let err = executor().get_schema(Some("blog")).expect_err("nothing registered");
        assert!(matches!(err, crate::core::error::ThisGqlError::Config(ConfigError::NoSchemaDeclared)));
    }

    #[test]
    fn test_schema_not_found_names_the_schema() {
        let executor = executor();
        executor.add_schema("default", schema("default"));
        let err = executor.get_schema(Some("nope")).expect_err("unknown schema");
        assert_eq!(err.to_string(), "Could not find \"nope\" schema.");
    }

    #[test]
    fn test_builder_invoked_once() {
        let executor = executor();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        executor.add_schema_builder("blog", move || -> GqlResult<Arc<Schema>> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(schema("blog"))
        });

        let a = executor.get_schema(Some("blog")).expect("built");
        let b = executor.get_schema(Some("blog")).expect("cached");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_error_is_not_cached() {
        let executor = executor();
        executor.add_schema_builder("broken", || -> GqlResult<Arc<Schema>> {
            Err(ConfigError::NoSchemaDeclared.into())
        });
        assert!(executor.get_schema(Some("broken")).is_err());
        assert_eq!(executor.get_schemas_names(), vec!["broken".to_string()]);
    }

    #[test]
    fn test_default_selection_order() {
        let executor = executor();
        executor.add_schema_builder("first_builder", builder("first_builder"));
        executor.add_schema_builder("default", builder("default"));
        assert_eq!(executor.get_schema(None).expect("built").name(), "default");

        let executor = self::executor();
        executor.add_schema_builder("only_builder", builder("only_builder"));
        executor.add_schema("public", schema("public"));
        assert_eq!(executor.get_schema(None).expect("built").name(), "public");
    }

    #[test]
    fn test_names_list_builders_then_schemas() {
        let executor = executor();
        executor.add_schema_builder("blog", builder("blog"));
        executor.add_schema("admin", schema("admin"));
        executor.get_schema(Some("blog")).expect("built");

        assert_eq!(
            executor.get_schemas_names(),
            vec!["blog".to_string(), "admin".to_string(), "blog".to_string()]
        );
    }

    #[test]
    fn test_reset_keeps_non_resettable_schemas() {
        let executor = executor();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        executor.add_schema_builder("volatile", move || -> GqlResult<Arc<Schema>> {
            counter.fetch_add(1, Ordering::SeqCst);
            let schema = schema("volatile");
            schema.set_resettable(true);
            Ok(schema)
        });
        executor.add_schema("static", schema("static"));

        let before = executor.get_schema(Some("static")).expect("added");
        executor.get_schema(Some("volatile")).expect("built");
        executor.reset();

        let after = executor.get_schema(Some("static")).expect("kept");
        assert!(Arc::ptr_eq(&before, &after));
        executor.get_schema(Some("volatile")).expect("rebuilt");
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_limits_are_scoped_to_the_executor() {
        let executor = executor();
        executor.set_max_query_depth(2);
        executor.set_max_query_complexity(0);
        executor.disable_introspection_query();

        let rules = executor.rules();
        assert_eq!(rules.max_query_depth, Some(2));
        assert_eq!(rules.max_query_complexity, None);
        assert!(rules.disable_introspection);
        assert_eq!(self::executor().rules(), ValidationRules::default());

        executor.enable_introspection_query();
        assert!(!executor.rules().disable_introspection);
    }

    struct RecordingEngine {
        seen: Mutex<Vec<(String, Option<String>)>>,
    }

    #[async_trait]
    impl ExecutionEngine for RecordingEngine {
        async fn execute(&self, request: EngineRequest) -> ExecutionResult {
            self.seen
                .lock()
                .expect("lock")
                .push((request.schema.name().to_string(), request.query.clone()));
            ExecutionResult::from_data(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_set_engine_swaps_the_engine() {
        let executor = executor();
        executor.add_schema("default", schema("default"));
        let recording = Arc::new(RecordingEngine {
            seen: Mutex::new(Vec::new()),
        });
        executor.set_engine(recording.clone());

        executor
            .execute(None, GraphQLRequest::new("{ ping }"), None)
            .await
            .expect("executed");

        let seen = recording.seen.lock().expect("lock");
        assert_eq!(seen[0], ("default".to_string(), Some("{ ping }".to_string())));
    }
}
