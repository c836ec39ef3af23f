//! Integration tests for the executor and the schema builder working together

use serde_json::Map;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use this_gql::prelude::*;

fn query_type(name: &str, field: &str, answer: &'static str) -> Arc<Type> {
    Arc::new(Type::Object(ObjectType::new(name).field(
        FieldDefinition::new(field, TypeRef::named("String"))
            .resolver(resolver_fn(move |_| Ok(json!(answer)))),
    )))
}

fn nested_query() -> Arc<Type> {
    let leaf = |name: &str| FieldDefinition::new(name, TypeRef::named("Node"));
    Arc::new(Type::Object(
        ObjectType::new("Query").field(leaf("node").resolver(resolver_fn(|_| Ok(json!({}))))),
    ))
}

fn node_type() -> Arc<Type> {
    Arc::new(Type::Object(
        ObjectType::new("Node")
            .field(
                FieldDefinition::new("child", TypeRef::named("Node"))
                    .resolver(resolver_fn(|_| Ok(json!({})))),
            )
            .field(FieldDefinition::new("name", TypeRef::named("String"))),
    ))
}

/// Type resolver with two independent roots and a counter on `Query`
fn type_resolver(builds: Arc<AtomicUsize>) -> Arc<TypeResolver> {
    let types = Arc::new(TypeResolver::new());
    types.add_type(
        "Query",
        move || {
            builds.fetch_add(1, Ordering::SeqCst);
            query_type("Query", "ping", "pong")
        },
        ["RootQuery"],
        SolutionOptions::new(),
    );
    types.add_type(
        "AdminQuery",
        || query_type("AdminQuery", "whoami", "admin"),
        Vec::<String>::new(),
        SolutionOptions::new(),
    );
    types
}

fn executor_with_builders(types: Arc<TypeResolver>, resettable: bool) -> (Executor, Arc<SchemaBuilder>) {
    let builder = Arc::new(SchemaBuilder::new(types, false));
    let executor = Executor::new(Arc::new(DefaultEngine::new()));

    let default = builder.get_builder(
        "default",
        Some("RootQuery".to_string()),
        None,
        None,
        vec![],
        resettable,
    );
    let admin = builder.get_builder(
        "admin",
        Some("AdminQuery".to_string()),
        None,
        None,
        vec![],
        false,
    );
    executor.add_schema_builder("default", move || default.resolve());
    executor.add_schema_builder("admin", move || admin.resolve());

    (executor, builder)
}

#[tokio::test]
async fn test_ping_pong_through_the_default_schema() {
    let (executor, _) = executor_with_builders(type_resolver(Arc::new(AtomicUsize::new(0))), false);

    let result = tokio_test::assert_ok!(
        executor
            .execute(None, GraphQLRequest::new("{ ping }"), None)
            .await
    );

    assert_eq!(result.data, Some(json!({ "ping": "pong" })));
    assert!(result.errors.is_empty());
}

#[tokio::test]
async fn test_named_schema_is_selected() {
    let (executor, _) = executor_with_builders(type_resolver(Arc::new(AtomicUsize::new(0))), false);

    let result = executor
        .execute(Some("admin"), GraphQLRequest::new("{ whoami }"), None)
        .await
        .unwrap();
    assert_eq!(result.data, Some(json!({ "whoami": "admin" })));

    let result = executor
        .execute(Some("admin"), GraphQLRequest::new("{ ping }"), None)
        .await
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("Cannot query field \"ping\""));
}

#[tokio::test]
async fn test_operation_name_selects_the_operation() {
    let (executor, _) = executor_with_builders(type_resolver(Arc::new(AtomicUsize::new(0))), false);
    let document = "query First { ping } query Second { alias: ping }";

    let result = executor
        .execute(
            None,
            GraphQLRequest::new(document).with_operation_name("Second"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.data, Some(json!({ "alias": "pong" })));

    let result = executor
        .execute(None, GraphQLRequest::new(document), None)
        .await
        .unwrap();
    assert!(result.data.is_none());
    assert_eq!(
        result.errors[0].message,
        "Must provide operation name if query contains multiple operations."
    );
}

#[tokio::test]
async fn test_unknown_schema_is_an_error() {
    let (executor, _) = executor_with_builders(type_resolver(Arc::new(AtomicUsize::new(0))), false);

    let err = tokio_test::assert_err!(
        executor
            .execute(Some("missing"), GraphQLRequest::new("{ ping }"), None)
            .await
    );
    assert_eq!(err.to_string(), "Could not find \"missing\" schema.");
}

#[tokio::test]
async fn test_empty_executor_reports_no_schema() {
    let executor = Executor::new(Arc::new(DefaultEngine::new()));

    let err = executor
        .execute(None, GraphQLRequest::new("{ ping }"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ThisGqlError::Config(ConfigError::NoSchemaDeclared)
    ));
}

#[tokio::test]
async fn test_schema_and_types_are_built_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let (executor, builder) = executor_with_builders(type_resolver(builds.clone()), false);

    for _ in 0..3 {
        executor
            .execute(None, GraphQLRequest::new("{ ping }"), None)
            .await
            .unwrap();
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(builder.is_built("default"));
    assert!(!builder.is_built("admin"));
}

#[tokio::test]
async fn test_concurrent_first_use_builds_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let (executor, _) = executor_with_builders(type_resolver(builds.clone()), false);
    let executor = Arc::new(executor);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let executor = executor.clone();
        handles.push(tokio::spawn(async move {
            executor
                .execute(None, GraphQLRequest::new("{ ping }"), None)
                .await
                .map(|result| result.data)
        }));
    }

    for handle in handles {
        let data = handle.await.unwrap().unwrap();
        assert_eq!(data, Some(json!({ "ping": "pong" })));
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reset_keeps_non_resettable_schemas() {
    let types = type_resolver(Arc::new(AtomicUsize::new(0)));
    let (executor, builder) = executor_with_builders(types, false);

    let before = executor.get_schema(Some("default")).unwrap();
    executor.reset();
    builder.reset();
    let after = executor.get_schema(Some("default")).unwrap();

    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_reset_rebuilds_resettable_schemas() {
    let builds = Arc::new(AtomicUsize::new(0));
    let types = type_resolver(builds.clone());
    let (executor, builder) = executor_with_builders(types.clone(), true);

    let before = executor.get_schema(Some("default")).unwrap();
    executor.reset();
    builder.reset();
    types.reset();
    let after = executor.get_schema(Some("default")).unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_added_schemas_survive_reset() {
    let executor = Executor::new(Arc::new(DefaultEngine::new()));
    let schema = Arc::new(Schema::new("static", query_type("Query", "ping", "pong")));
    executor.add_schema("static", schema.clone());

    executor.reset();

    let kept = executor.get_schema(None).unwrap();
    assert!(Arc::ptr_eq(&kept, &schema));
}

#[tokio::test]
async fn test_max_depth_applies_to_every_schema() {
    let types = Arc::new(TypeResolver::new());
    types.add_type("Query", nested_query, Vec::<String>::new(), SolutionOptions::new());
    types.add_type("Node", node_type, Vec::<String>::new(), SolutionOptions::new());
    let builder = Arc::new(SchemaBuilder::new(types, false));

    let executor = Executor::new(Arc::new(DefaultEngine::new()));
    for name in ["first", "second"] {
        let factory = builder.get_builder(name, Some("Query".to_string()), None, None, vec![], false);
        executor.add_schema_builder(name, move || factory.resolve());
    }
    executor.set_max_query_depth(2);

    let deep = "{ node { child { name } } }";
    for name in ["first", "second"] {
        let result = executor
            .execute(Some(name), GraphQLRequest::new(deep), None)
            .await
            .unwrap();
        assert!(result.data.is_none());
        assert_eq!(
            result.errors[0].message,
            "Max query depth should be 2 but got 3."
        );
    }

    executor.set_max_query_depth(0);
    let result = executor
        .execute(Some("first"), GraphQLRequest::new(deep), None)
        .await
        .unwrap();
    assert_eq!(
        result.data,
        Some(json!({ "node": { "child": { "name": null } } }))
    );
}

#[tokio::test]
async fn test_introspection_can_be_disabled() {
    let executor = Executor::new(Arc::new(DefaultEngine::new()));
    executor.add_schema("default", Arc::new(Schema::new("default", query_type("Query", "ping", "pong"))));

    let query = "{ __schema { queryType { name } } }";
    let result = executor
        .execute(None, GraphQLRequest::new(query), None)
        .await
        .unwrap();
    assert_eq!(
        result.data,
        Some(json!({ "__schema": { "queryType": { "name": "Query" } } }))
    );

    executor.disable_introspection_query();
    let result = executor
        .execute(None, GraphQLRequest::new(query), None)
        .await
        .unwrap();
    assert!(result.errors[0].message.contains("introspection is not allowed"));

    executor.enable_introspection_query();
    let result = executor
        .execute(None, GraphQLRequest::new(query), None)
        .await
        .unwrap();
    assert!(result.errors.is_empty());
}

struct TenantHook;

impl ExecutionHook for TenantHook {
    fn on_executor_context(&self, context: &ContextValue) {
        context.insert("tenant", json!("acme"));
    }

    fn on_pre_execute(&self, arguments: &mut ExecutorArguments) {
        arguments
            .variable_value
            .insert("greeting".to_string(), json!("hello"));
    }

    fn on_post_execute(&self, result: &mut ExecutionResult, arguments: &ExecutorArguments) {
        result.set_extension("schema", json!(arguments.schema_name));
    }
}

#[tokio::test]
async fn test_hooks_shape_the_execution() {
    let query = Arc::new(Type::Object(
        ObjectType::new("Query")
            .field(
                FieldDefinition::new("tenant", TypeRef::named("String"))
                    .resolver(resolver_fn(|info| Ok(info.context.get("tenant").unwrap_or(Value::Null)))),
            )
            .field(
                FieldDefinition::new("echo", TypeRef::named("String"))
                    .argument(InputValue::new("value", TypeRef::named("String")))
                    .resolver(resolver_fn(|info| Ok(info.arg("value").cloned().unwrap_or(Value::Null)))),
            ),
    ));

    let executor = Executor::new(Arc::new(DefaultEngine::new()));
    executor.add_schema("default", Arc::new(Schema::new("default", query)));
    executor.add_hook(Arc::new(TenantHook));

    let request = GraphQLRequest::new("query Echo($greeting: String) { tenant echo(value: $greeting) }")
        .with_variables(Map::new());
    let result = executor.execute(None, request, None).await.unwrap();

    assert_eq!(
        result.data,
        Some(json!({ "tenant": "acme", "echo": "hello" }))
    );
    assert_eq!(result.extensions.unwrap()["schema"], "default");
}

#[tokio::test]
async fn test_root_value_feeds_property_lookup() {
    let query = Arc::new(Type::Object(
        ObjectType::new("Query").field(FieldDefinition::new("siteName", TypeRef::named("String"))),
    ));
    let executor = Executor::new(Arc::new(DefaultEngine::new()));
    executor.add_schema("default", Arc::new(Schema::new("default", query)));

    let result = executor
        .execute(
            None,
            GraphQLRequest::new("{ siteName }"),
            Some(json!({ "site_name": "blog" })),
        )
        .await
        .unwrap();
    assert_eq!(result.data, Some(json!({ "siteName": "blog" })));
}
