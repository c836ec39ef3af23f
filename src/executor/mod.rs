//! Executor: schema selection and the execution pipeline
//!
//! - `core`: the [`Executor`] itself
//! - `hooks`: context, pre-execute and post-execute hooks

mod core;
pub mod hooks;

pub use self::core::Executor;
pub use hooks::{DebugHook, ExecutionHook, ExecutorArguments};
