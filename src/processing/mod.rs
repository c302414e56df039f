//! Per-task orchestration
//!
//! [`TaskProcessor`] turns one locked external task into a [`TaskResolution`]:
//! either completion variables or a failure report for the engine.

pub mod task_processor;

pub use task_processor::{
    report_resolution, CompletionKind, TaskProcessor, TaskResolution, LOGISTICS_CALL_FAILED,
    UNEXPECTED_ERROR,
};
