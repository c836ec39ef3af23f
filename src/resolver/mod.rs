//! Lazy, alias-aware lookups
//!
//! - `registry`: the generic [`SolutionRegistry`]
//! - `type_resolver`: types resolved in the context of a schema
//! - `field`: field resolvers and the named [`ResolverMap`]

pub mod field;
pub mod registry;
pub mod type_resolver;

pub use field::{FieldResolver, FnResolver, ResolveInfo, ResolverMap, resolver_fn};
pub use registry::{LoadHook, SolutionOptions, SolutionRegistry};
pub use type_resolver::{SchemaContext, TypeResolver};
