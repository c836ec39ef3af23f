//! Server module: runtime assembly and HTTP exposure
//!
//! - `builder`: [`RuntimeBuilder`], fluent wiring of config, types and resolvers
//! - `host`: [`Runtime`], the shared state behind every exposure
//! - `exposure`: the axum GraphQL router

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::RuntimeBuilder;
pub use exposure::GraphQLExposure;
pub use host::Runtime;
