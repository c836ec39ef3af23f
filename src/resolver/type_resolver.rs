//! Type resolution scoped to the schema being built
//!
//! The [`TypeResolver`] is a [`SolutionRegistry`] of [`Type`]s plus one piece of
//! shared state: the name of the schema currently being assembled. Factories
//! that build schema-dependent types read it through a [`SchemaContext`].
//!
//! The current-schema field is shared by every build, so each resolution burst
//! runs under [`TypeResolver::resolve_in_schema`], which holds a scope lock
//! for the duration of the burst.

use crate::core::error::{ConfigError, GqlResult};
use crate::core::resolvable::Resolvable;
use crate::resolver::registry::{SolutionOptions, SolutionRegistry};
use crate::schema::types::Type;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Cloneable read handle on the resolver's current schema name
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    current: Arc<RwLock<Option<String>>>,
}

impl SchemaContext {
    /// Name of the schema currently being resolved, if any
    pub fn schema_name(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, name: &str) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
    }
}

/// Registry of schema types with a "current schema" context
pub struct TypeResolver {
    types: SolutionRegistry<Type>,
    context: SchemaContext,
    scope_lock: Mutex<()>,
}

impl TypeResolver {
    pub fn new() -> Self {
        let context = SchemaContext::default();
        let hook_context = context.clone();
        let types = SolutionRegistry::<Type>::new("type").with_load_hook(move |id, ty| {
            tracing::debug!(
                alias = %id,
                type_name = %ty.name(),
                schema = ?hook_context.schema_name(),
                "Type loaded"
            );
        });

        Self {
            types,
            context,
            scope_lock: Mutex::new(()),
        }
    }

    /// Declare a type; see [`SolutionRegistry::add_solution_with`]
    pub fn add_type<I, S>(
        &self,
        id: impl Into<String>,
        factory: impl Resolvable<Arc<Type>> + 'static,
        aliases: I,
        options: SolutionOptions,
    ) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.add_solution_with(id, factory, aliases, options);
        self
    }

    /// Underlying registry, for the generic lookup operations
    pub fn types(&self) -> &SolutionRegistry<Type> {
        &self.types
    }

    /// Handle that factories can capture to learn which schema they build for
    pub fn schema_context(&self) -> SchemaContext {
        self.context.clone()
    }

    pub fn set_current_schema_name(&self, name: &str) {
        self.context.set(name);
    }

    pub fn current_schema_name(&self) -> Option<String> {
        self.context.schema_name()
    }

    /// Resolve a type alias
    ///
    /// `None` resolves to `Ok(None)` (optional roots); an unknown alias is a
    /// configuration error.
    pub fn resolve(&self, alias: Option<&str>) -> GqlResult<Option<Arc<Type>>> {
        let Some(alias) = alias else {
            return Ok(None);
        };

        match self.types.get_solution(alias) {
            Some(ty) => Ok(Some(ty)),
            None => Err(ConfigError::UnresolvableType {
                alias: alias.to_string(),
                schema: self.current_schema_name(),
            }
            .into()),
        }
    }

    /// Run `f` with `schema_name` as the current schema
    ///
    /// Bursts are serialized so concurrent builds never observe each other's
    /// context. `f` must not call `resolve_in_schema` again.
    pub fn resolve_in_schema<R>(&self, schema_name: &str, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.scope_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.set_current_schema_name(schema_name);
        f(self)
    }

    /// Drop every built type
    pub fn reset(&self) {
        self.types.reset();
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{EnumType, ObjectType};

    #[test]
    fn test_resolve_none_is_ok_none() {
        let resolver = TypeResolver::new();
        assert!(resolver.resolve(None).expect("ok").is_none());
    }

    #[test]
    fn test_resolve_unknown_alias_is_config_error() {
        let resolver = TypeResolver::new();
        resolver.set_current_schema_name("blog");

        let err = resolver.resolve(Some("Missing")).expect_err("unknown type");
        let message = err.to_string();
        assert!(message.contains("Missing"));
        assert!(message.contains("blog"));
    }

    #[test]
    fn test_resolve_by_alias() {
        let resolver = TypeResolver::new();
        resolver.add_type(
            "Query",
            || Arc::new(Type::Object(ObjectType::new("Query"))),
            ["RootQuery"],
            SolutionOptions::new(),
        );

        let ty = resolver
            .resolve(Some("RootQuery"))
            .expect("ok")
            .expect("declared");
        assert_eq!(ty.name(), "Query");
    }

    #[test]
    fn test_factories_can_branch_on_current_schema() {
        let resolver = TypeResolver::new();
        let context = resolver.schema_context();
        resolver.add_type(
            "Status",
            move || {
                let values = match context.schema_name().as_deref() {
                    Some("admin") => vec!["DRAFT", "PUBLISHED", "DELETED"],
                    _ => vec!["PUBLISHED"],
                };
                Arc::new(Type::Enum(EnumType::new("Status", values)))
            },
            Vec::<String>::new(),
            SolutionOptions::new(),
        );

        let ty = resolver.resolve_in_schema("admin", |r| r.resolve(Some("Status")));
        let ty = ty.expect("ok").expect("declared");
        match ty.as_ref() {
            Type::Enum(e) => assert_eq!(e.values.len(), 3),
            other => panic!("unexpected type {:?}", other),
        }
        assert_eq!(resolver.current_schema_name().as_deref(), Some("admin"));
    }

    #[test]
    fn test_reset_drops_built_types() {
        let resolver = TypeResolver::new();
        resolver.add_type(
            "Query",
            || Arc::new(Type::Object(ObjectType::new("Query"))),
            Vec::<String>::new(),
            SolutionOptions::new(),
        );

        let before = resolver.resolve(Some("Query")).expect("ok").expect("declared");
        resolver.reset();
        let after = resolver.resolve(Some("Query")).expect("ok").expect("declared");
        assert!(!Arc::ptr_eq(&before, &after));
    }
}
