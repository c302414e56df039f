//! Test helpers and utilities for integration tests

use serde_json::{json, Value};
use spedition_worker::config::{EngineSection, ProviderSection, WorkerConfig, WorkerSection};

/// Configuration pointing at mock servers, with no engine credentials
#[allow(dead_code)]
pub fn test_config(engine_url: &str, provider_url: &str) -> WorkerConfig {
    WorkerConfig {
        engine: EngineSection {
            base_url: format!("{engine_url}/engine-rest"),
            username_env: None,
            password_env: None,
        },
        provider: ProviderSection {
            base_url: format!("{provider_url}/v1"),
            request_timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
        },
        worker: WorkerSection {
            worker_id: Some("test-worker".to_string()),
            async_response_timeout_ms: 100,
            fetch_backoff_ms: 50,
            ..Default::default()
        },
    }
}

/// Engine payload for one locked task with all four order variables
#[allow(dead_code)]
pub fn engine_task(id: &str, retries: Value) -> Value {
    json!({
        "activityId": "Task_RequestConsignment",
        "id": id,
        "topicName": "group4_rest",
        "workerId": "test-worker",
        "retries": retries,
        "priority": 0,
        "variables": {
            "order_nr": {"type": "String", "value": "A1", "valueInfo": {}},
            "weight": {"type": "Integer", "value": 5, "valueInfo": {}},
            "delivery_address": {"type": "String", "value": "Street 1", "valueInfo": {}},
            "phone": {"type": "String", "value": "+49123456789", "valueInfo": {}}
        }
    })
}
