//! Wire types of the engine's External Task REST API

use crate::consignment::validation::RawTaskInput;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A typed process variable as the engine transports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

impl TypedValue {
    /// Wrap a JSON value, inferring the engine type name
    pub fn infer(value: Value) -> Self {
        let value_type = match &value {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(n) => match n.as_i64() {
                Some(i) if i32::try_from(i).is_ok() => "Integer",
                Some(_) => "Long",
                None => "Double",
            },
            Value::String(_) => "String",
            Value::Array(_) | Value::Object(_) => "Json",
        };

        let value = match value {
            // The engine expects structured JSON variables as serialized text
            structured @ (Value::Array(_) | Value::Object(_)) => {
                Value::String(structured.to_string())
            }
            other => other,
        };

        Self {
            value,
            value_type: Some(value_type.to_string()),
        }
    }
}

/// One locked external task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalTask {
    pub id: String,
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub worker_id: Option<String>,
    /// Engine retry counter; `None` until the first failure is reported
    #[serde(default)]
    pub retries: Option<i32>,
    #[serde(default)]
    pub variables: HashMap<String, TypedValue>,
}

impl ExternalTask {
    /// Untyped view of the task variables for validation
    pub fn input(&self) -> RawTaskInput {
        self.variables
            .iter()
            .map(|(name, typed)| (name.clone(), typed.value.clone()))
            .collect()
    }
}

/// Failure report handed to the engine for a task that should be retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub error_message: String,
    pub error_details: String,
    pub retries: u32,
    pub retry_timeout_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FetchAndLockRequest<'a> {
    pub worker_id: &'a str,
    pub max_tasks: u32,
    pub use_priority: bool,
    pub async_response_timeout: u64,
    pub topics: Vec<TopicSubscription<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TopicSubscription<'a> {
    pub topic_name: &'a str,
    pub lock_duration: u64,
    pub variables: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteRequest<'a> {
    pub worker_id: &'a str,
    pub variables: HashMap<&'a str, TypedValue>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FailureRequest<'a> {
    pub worker_id: &'a str,
    pub error_message: &'a str,
    pub error_details: &'a str,
    pub retries: u32,
    pub retry_timeout: u64,
}
