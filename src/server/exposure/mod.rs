//! API exposure over HTTP
//!
//! An exposure consumes a shared [`Runtime`](super::Runtime) and produces an
//! axum `Router`.

pub mod graphql;

pub use graphql::GraphQLExposure;
