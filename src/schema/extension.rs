//! Cross-cutting behavior attached to a schema

use crate::schema::definition::Schema;

/// Behavior activated by [`Schema::process_extensions`] before each execution
pub trait SchemaExtension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply the extension; must be idempotent, it runs once per execution
    fn process(&self, schema: &Schema);
}

/// Checks argument values against their declared constraints
///
/// Once processed, the engine validates every field's arguments (recursing into
/// input objects and lists) and reports violations as field errors instead of
/// calling the resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorExtension;

impl SchemaExtension for ValidatorExtension {
    fn name(&self) -> &'static str {
        "validator"
    }

    fn process(&self, schema: &Schema) {
        schema.enable_argument_validation();
    }
}
