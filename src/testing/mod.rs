//! Testing utilities and mock implementations
//!
//! Lets the processor and worker run without a live engine or provider.

pub mod mocks;

pub use mocks::*;

use crate::engine::{ExternalTask, TypedValue};
use serde_json::Value;

/// Build a locked task carrying the given variables
pub fn task_with(id: &str, retries: Option<i32>, variables: &[(&str, Value)]) -> ExternalTask {
    ExternalTask {
        id: id.to_string(),
        topic_name: "group4_rest".to_string(),
        worker_id: Some("test-worker".to_string()),
        retries,
        variables: variables
            .iter()
            .map(|(name, value)| (name.to_string(), TypedValue::infer(value.clone())))
            .collect(),
    }
}
