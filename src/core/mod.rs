//! Core building blocks shared by every other module
//!
//! - `error`: the typed error hierarchy
//! - `resolvable`: deferred producers
//! - `context`: the per-request context value

pub mod context;
pub mod error;
pub mod resolvable;

pub use context::ContextValue;
pub use error::{ConfigError, GqlResult, GraphQLError, RequestError, ThisGqlError};
pub use resolvable::{Resolvable, SharedResolvable};
