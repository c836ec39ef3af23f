//! Lazy, memoized construction of named schemas

use crate::core::error::{ConfigError, GqlResult};
use crate::core::resolvable::SharedResolvable;
use crate::resolver::TypeResolver;
use crate::schema::definition::Schema;
use crate::schema::extension::{SchemaExtension, ValidatorExtension};
use crate::schema::types::Type;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Deferred handle producing a built schema
pub type SchemaFactory = SharedResolvable<GqlResult<Arc<Schema>>>;

/// Builds schemas from type aliases registered in a [`TypeResolver`]
///
/// Every schema built here shares the resolver's "current schema" context, so
/// builds are serialized behind one lock.
pub struct SchemaBuilder {
    type_resolver: Arc<TypeResolver>,
    enable_validation: bool,
    builders: RwLock<HashMap<String, Arc<Schema>>>,
    build_lock: Mutex<()>,
}

impl SchemaBuilder {
    pub fn new(type_resolver: Arc<TypeResolver>, enable_validation: bool) -> Self {
        Self {
            type_resolver,
            enable_validation,
            builders: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    /// Deferred builder for the schema `name`
    ///
    /// The first invocation of any handle for `name` builds and memoizes the
    /// schema; later invocations get the same instance, whatever arguments
    /// their handle was created with.
    pub fn get_builder(
        self: &Arc<Self>,
        name: impl Into<String>,
        query: Option<String>,
        mutation: Option<String>,
        subscription: Option<String>,
        types: Vec<String>,
        resettable: bool,
    ) -> SchemaFactory {
        let builder = Arc::clone(self);
        let name = name.into();

        Arc::new(move || {
            if let Some(schema) = builder.built(&name) {
                return Ok(schema);
            }

            let _guard = builder
                .build_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(schema) = builder.built(&name) {
                return Ok(schema);
            }

            let schema = builder.create(
                &name,
                query.as_deref(),
                mutation.as_deref(),
                subscription.as_deref(),
                types.clone(),
                resettable,
            )?;
            builder
                .builders
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name.clone(), schema.clone());

            Ok(schema)
        })
    }

    /// Build a schema right away, without memoizing it
    ///
    /// The type loader and deferred type list of the new schema re-assert
    /// `name` as the current schema each time they resolve something, since
    /// other schemas may have been built in between.
    pub fn create(
        &self,
        name: &str,
        query: Option<&str>,
        mutation: Option<&str>,
        subscription: Option<&str>,
        types: Vec<String>,
        resettable: bool,
    ) -> GqlResult<Arc<Schema>> {
        let (query, mutation, subscription) =
            self.type_resolver.resolve_in_schema(name, |resolver| {
                GqlResult::Ok((
                    resolver.resolve(query)?,
                    resolver.resolve(mutation)?,
                    resolver.resolve(subscription)?,
                ))
            })?;

        let query = query.ok_or_else(|| ConfigError::MissingField {
            field: "query".to_string(),
            context: format!("schema \"{}\"", name),
        })?;

        let loader_resolver = Arc::clone(&self.type_resolver);
        let loader_schema = name.to_string();
        let types_resolver = Arc::clone(&self.type_resolver);
        let types_schema = name.to_string();

        let schema = Schema::new(name, query)
            .with_mutation(mutation)
            .with_subscription(subscription)
            .with_type_loader(move |type_name: &str| {
                loader_resolver.resolve_in_schema(&loader_schema, |resolver| {
                    resolver.types().get_solution(type_name)
                })
            })
            .with_types(Arc::new(move || {
                types_resolver.resolve_in_schema(&types_schema, |resolver| {
                    resolve_type_list(resolver, &types)
                })
            }));

        schema.set_resettable(resettable);
        let extensions: Vec<Arc<dyn SchemaExtension>> = if self.enable_validation {
            vec![Arc::new(ValidatorExtension)]
        } else {
            Vec::new()
        };
        schema.set_extensions(extensions);

        tracing::debug!(
            schema = %name,
            query = %schema.query().name(),
            resettable,
            validation = self.enable_validation,
            "Schema built"
        );

        Ok(Arc::new(schema))
    }

    /// Whether a schema has already been built under `name`
    pub fn is_built(&self, name: &str) -> bool {
        self.built(name).is_some()
    }

    /// Drop every built schema flagged resettable
    pub fn reset(&self) {
        self.builders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, schema| !schema.is_resettable());
    }

    fn built(&self, name: &str) -> Option<Arc<Schema>> {
        self.builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

fn resolve_type_list(resolver: &TypeResolver, aliases: &[String]) -> Vec<Arc<Type>> {
    aliases
        .iter()
        .filter_map(|alias| match resolver.resolve(Some(alias)) {
            Ok(ty) => ty,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unresolvable schema type");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SolutionOptions;
    use crate::schema::types::{EnumType, ObjectType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn resolver_with(names: &[&'static str]) -> Arc<TypeResolver> {
        let resolver = Arc::new(TypeResolver::new());
        for name in names {
            let name = *name;
            resolver.add_type(
                name,
                move || Arc::new(Type::Object(ObjectType::new(name))),
                Vec::<String>::new(),
                SolutionOptions::new(),
            );
        }
        resolver
    }

    #[test]
    fn test_builder_memoizes_first_build() {
        let builder = Arc::new(SchemaBuilder::new(resolver_with(&["Query", "Other"]), false));

        let first = builder.get_builder("blog", Some("Query".into()), None, None, vec![], false);
        let second = builder.get_builder("blog", Some("Other".into()), None, None, vec![], true);

        let a = first.resolve().expect("built");
        let b = second.resolve().expect("built");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.query().name(), "Query");
        assert!(!b.is_resettable());
    }

    #[test]
    fn test_missing_query_is_config_error() {
        let builder = SchemaBuilder::new(resolver_with(&[]), false);
        let err = builder
            .create("blog", None, None, None, vec![], false)
            .expect_err("query is required");
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn test_unknown_query_alias_is_config_error() {
        let builder = SchemaBuilder::new(resolver_with(&[]), false);
        let err = builder
            .create("blog", Some("Nope"), None, None, vec![], false)
            .expect_err("unknown alias");
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn test_validation_overwrites_extensions() {
        let builder = SchemaBuilder::new(resolver_with(&["Query"]), true);
        let schema = builder
            .create("blog", Some("Query"), None, None, vec![], false)
            .expect("built");
        let names: Vec<&str> = schema.extensions().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["validator"]);

        let builder = SchemaBuilder::new(resolver_with(&["Query"]), false);
        let schema = builder
            .create("blog", Some("Query"), None, None, vec![], false)
            .expect("built");
        assert!(schema.extensions().is_empty());
    }

    #[test]
    fn test_reset_drops_only_resettable_schemas() {
        let builder = Arc::new(SchemaBuilder::new(resolver_with(&["Query"]), false));
        builder
            .get_builder("kept", Some("Query".into()), None, None, vec![], false)
            .resolve()
            .expect("built");
        builder
            .get_builder("dropped", Some("Query".into()), None, None, vec![], true)
            .resolve()
            .expect("built");

        builder.reset();
        assert!(builder.is_built("kept"));
        assert!(!builder.is_built("dropped"));
    }

    #[test]
    fn test_type_loader_reasserts_schema_name() {
        let resolver = resolver_with(&["Query"]);
        let context = resolver.schema_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        resolver.add_type(
            "Audience",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let schema = context.schema_name().unwrap_or_default();
                Arc::new(Type::Enum(EnumType::new("Audience", [schema])))
            },
            Vec::<String>::new(),
            SolutionOptions::new(),
        );

        let builder = SchemaBuilder::new(resolver.clone(), false);
        let internal = builder
            .create("internal", Some("Query"), None, None, vec!["Audience".into()], false)
            .expect("built");
        builder
            .create("public", Some("Query"), None, None, vec![], false)
            .expect("built");

        let audience = internal.get_type("Audience").expect("loaded");
        match audience.as_ref() {
            Type::Enum(e) => assert_eq!(e.values, vec!["internal".to_string()]),
            other => panic!("unexpected type {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(internal.get_types().len(), 2);
    }
}
