//! Field resolvers and the named resolver map

use crate::core::context::ContextValue;
use crate::engine::PathSegment;
use crate::resolver::registry::SolutionRegistry;
use crate::schema::Schema;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Everything a resolver gets to see about the field being resolved
pub struct ResolveInfo<'a> {
    pub field_name: &'a str,
    pub parent_type: &'a str,
    /// Value produced by the parent field (the root value for root fields)
    pub parent: &'a Value,
    /// Coerced arguments, defaults applied
    pub args: &'a Map<String, Value>,
    pub context: &'a ContextValue,
    pub root_value: &'a Value,
    pub schema: &'a Schema,
    pub path: &'a [PathSegment],
}

impl ResolveInfo<'_> {
    /// Argument value, `None` when absent or null
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name).filter(|v| !v.is_null())
    }

    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    pub fn arg_i64(&self, name: &str) -> Option<i64> {
        self.arg(name).and_then(Value::as_i64)
    }
}

/// Computes the value of one field
///
/// Errors are reported in the execution result at the field's path; they
/// never abort the whole request.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, info: ResolveInfo<'_>) -> Result<Value>;
}

/// Adapter turning a synchronous closure into a [`FieldResolver`]
pub struct FnResolver<F>(F);

#[async_trait]
impl<F> FieldResolver for FnResolver<F>
where
    F: Fn(&ResolveInfo<'_>) -> Result<Value> + Send + Sync,
{
    async fn resolve(&self, info: ResolveInfo<'_>) -> Result<Value> {
        (self.0)(&info)
    }
}

/// Wrap a closure as a shared resolver
///
/// ```rust,ignore
/// let ping = resolver_fn(|_info| Ok(json!("pong")));
/// ```
pub fn resolver_fn<F>(f: F) -> Arc<dyn FieldResolver>
where
    F: Fn(&ResolveInfo<'_>) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnResolver(f))
}

/// Named resolvers referenced from configuration (`resolve: "post.list"`)
pub type ResolverMap = SolutionRegistry<dyn FieldResolver>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ObjectType, Type};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new("test", Arc::new(Type::Object(ObjectType::new("Query"))))
    }

    #[tokio::test]
    async fn test_resolver_fn_reads_arguments() {
        let resolver = resolver_fn(|info| {
            let name = info.arg_str("name").unwrap_or("world");
            Ok(json!(format!("hello {}", name)))
        });

        let schema = schema();
        let mut args = Map::new();
        args.insert("name".to_string(), json!("alice"));
        let context = ContextValue::new();
        let info = ResolveInfo {
            field_name: "hello",
            parent_type: "Query",
            parent: &Value::Null,
            args: &args,
            context: &context,
            root_value: &Value::Null,
            schema: &schema,
            path: &[],
        };

        let value = resolver.resolve(info).await.expect("resolver succeeds");
        assert_eq!(value, json!("hello alice"));
    }

    #[tokio::test]
    async fn test_resolver_map_is_lazy() {
        let resolvers = ResolverMap::new("resolver");
        resolvers.add_solution("ping", || resolver_fn(|_| Ok(json!("pong"))));

        assert!(!resolvers.is_loaded("ping"));
        let resolver = resolvers.get_solution("ping").expect("declared");
        assert!(resolvers.is_loaded("ping"));

        let schema = schema();
        let context = ContextValue::new();
        let args = Map::new();
        let value = resolver
            .resolve(ResolveInfo {
                field_name: "ping",
                parent_type: "Query",
                parent: &Value::Null,
                args: &args,
                context: &context,
                root_value: &Value::Null,
                schema: &schema,
                path: &[],
            })
            .await
            .expect("resolver succeeds");
        assert_eq!(value, json!("pong"));
    }

    #[test]
    fn test_null_arguments_read_as_absent() {
        let schema = schema();
        let context = ContextValue::new();
        let mut args = Map::new();
        args.insert("limit".to_string(), Value::Null);
        let info = ResolveInfo {
            field_name: "posts",
            parent_type: "Query",
            parent: &Value::Null,
            args: &args,
            context: &context,
            root_value: &Value::Null,
            schema: &schema,
            path: &[],
        };
        assert!(info.arg("limit").is_none());
        assert!(info.arg_i64("limit").is_none());
    }
}
