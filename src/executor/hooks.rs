//! Hooks run around each execution
//!
//! Hooks are called in registration order:
//! 1. [`ExecutionHook::on_executor_context`] with the fresh context value
//! 2. [`ExecutionHook::on_pre_execute`], which may rewrite any argument
//! 3. [`ExecutionHook::on_post_execute`], which may rewrite the result

use crate::core::context::ContextValue;
use crate::engine::ExecutionResult;
use crate::schema::Schema;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Instant;

/// Arguments handed to the engine, open to rewriting by pre-execute hooks
#[derive(Debug, Clone)]
pub struct ExecutorArguments {
    pub schema_name: String,
    pub schema: Arc<Schema>,
    pub request_string: Option<String>,
    pub context_value: ContextValue,
    pub root_value: Value,
    pub variable_value: Map<String, Value>,
    pub operation_name: Option<String>,
    pub started_at: Instant,
}

/// Observer/rewriter of the execution pipeline
///
/// Every method defaults to a no-op.
pub trait ExecutionHook: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn on_executor_context(&self, _context: &ContextValue) {}

    fn on_pre_execute(&self, _arguments: &mut ExecutorArguments) {}

    fn on_post_execute(&self, _result: &mut ExecutionResult, _arguments: &ExecutorArguments) {}
}

/// Reports the execution time under `extensions.debug.executionTime` (ms)
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugHook;

impl ExecutionHook for DebugHook {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn on_post_execute(&self, result: &mut ExecutionResult, arguments: &ExecutorArguments) {
        let elapsed = arguments.started_at.elapsed();
        let millis = (elapsed.as_secs_f64() * 1000.0 * 1000.0).round() / 1000.0;
        result.set_extension("debug", json!({ "executionTime": millis }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ObjectType, Type};

    #[test]
    fn test_debug_hook_adds_execution_time() {
        let arguments = ExecutorArguments {
            schema_name: "default".to_string(),
            schema: Arc::new(Schema::new(
                "default",
                Arc::new(Type::Object(ObjectType::new("Query"))),
            )),
            request_string: Some("{ ping }".to_string()),
            context_value: ContextValue::new(),
            root_value: Value::Null,
            variable_value: Map::new(),
            operation_name: None,
            started_at: Instant::now(),
        };

        let mut result = ExecutionResult::from_data(json!({ "ping": "pong" }));
        DebugHook.on_post_execute(&mut result, &arguments);

        let extensions = result.extensions.expect("extensions set");
        assert!(extensions["debug"]["executionTime"].is_number());
    }
}
