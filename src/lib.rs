//! # this-gql
//!
//! A lazy, multi-schema GraphQL runtime.
//!
//! ## Features
//!
//! - **Lazy Registries**: Types and resolvers are declared up front and built on first use
//! - **Aliases**: Every declaration can be looked up by id or by any of its aliases
//! - **Multiple Schemas**: One executor serves several named schemas, each built at most once
//! - **Request Boundaries**: `reset()` drops transient state and keeps declarations
//! - **Hooks**: Context, pre-execute and post-execute hooks around every execution
//! - **Query Limits**: Max depth, max complexity and introspection switches
//! - **Configuration-Based**: Declare schemas and types in YAML
//! - **Input Validation**: Constraints on arguments, checked before resolvers run
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_gql::prelude::*;
//!
//! let runtime = RuntimeBuilder::new()
//!     .with_config_file("schema.yaml")?
//!     .with_resolver("ping", || resolver_fn(|_| Ok(json!("pong"))))
//!     .build()?;
//!
//! let result = runtime.execute(None, GraphQLRequest::new("{ ping }")).await?;
//! assert_eq!(result.data, Some(json!({ "ping": "pong" })));
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod executor;
pub mod resolver;
pub mod schema;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        context::ContextValue,
        error::{ConfigError, GqlResult, GraphQLError, RequestError, ThisGqlError},
        resolvable::{Resolvable, SharedResolvable},
    };

    // === Resolvers ===
    pub use crate::resolver::{
        FieldResolver, ResolveInfo, ResolverMap, SolutionOptions, SolutionRegistry, TypeResolver,
        resolver_fn,
    };

    // === Schema ===
    pub use crate::schema::{
        Constraint, EnumType, FieldDefinition, InputObjectType, InputValue, ObjectType,
        ScalarType, Schema, SchemaBuilder, SchemaExtension, Type, TypeRef, ValidatorExtension,
    };

    // === Engine ===
    pub use crate::engine::{
        DefaultEngine, EngineRequest, ExecutionEngine, ExecutionResult, GraphQLErrorEntry,
        GraphQLRequest, PathSegment, ValidationRules,
    };

    // === Executor ===
    pub use crate::executor::{DebugHook, ExecutionHook, Executor, ExecutorArguments};

    // === Config ===
    pub use crate::config::{ExecutorConfig, SchemaConfig, TypeDefinitionConfig};

    // === Server ===
    pub use crate::server::{GraphQLExposure, Runtime, RuntimeBuilder};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
}
