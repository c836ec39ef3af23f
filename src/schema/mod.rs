//! Schemas and the types they are made of
//!
//! - `types`: object, input-object, enum and scalar definitions
//! - `validation`: input constraints
//! - `definition`: the executable [`Schema`]
//! - `extension`: behavior attached to a schema before execution
//! - `builder`: the memoizing [`SchemaBuilder`]

pub mod builder;
pub mod definition;
pub mod extension;
pub mod types;
pub mod validation;

pub use builder::{SchemaBuilder, SchemaFactory};
pub use definition::{Schema, TypeLoader};
pub use extension::{SchemaExtension, ValidatorExtension};
pub use types::{
    BUILTIN_SCALARS, EnumType, FieldDefinition, InputObjectType, InputValue, ObjectType,
    ScalarType, Type, TypeRef,
};
pub use validation::Constraint;
