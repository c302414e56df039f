//! Integration tests for the engine's External Task REST client

mod test_helpers;

use serde_json::json;
use spedition_worker::consignment::variables::CompletionVariables;
use spedition_worker::engine::{CamundaClient, EngineError, FailureReport, TaskQueue};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(engine_url: &str) -> CamundaClient {
    let config = test_helpers::test_config(engine_url, "http://provider.invalid");
    CamundaClient::with_credentials(&config, None).unwrap()
}

#[tokio::test]
async fn test_fetch_and_lock_subscribes_topic_with_variables() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/fetchAndLock"))
        .and(body_partial_json(json!({
            "workerId": "test-worker",
            "maxTasks": 10,
            "asyncResponseTimeout": 100,
            "topics": [{
                "topicName": "group4_rest",
                "lockDuration": 30000,
                "variables": ["order_nr", "weight", "delivery_address", "phone"]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            test_helpers::engine_task("task-1", json!(null)),
            test_helpers::engine_task("task-2", json!(2)),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let tasks = client(&mock_server.uri()).fetch_and_lock(10).await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, "task-1");
    assert_eq!(tasks[0].retries, None);
    assert_eq!(tasks[1].retries, Some(2));
    assert_eq!(tasks[0].input().get("weight"), Some(&json!(5)));
}

#[tokio::test]
async fn test_complete_sends_typed_variables() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/task-1/complete"))
        .and(body_json(json!({
            "workerId": "test-worker",
            "variables": {
                "spedition_request_success": {"value": true, "type": "Boolean"},
                "spedition_http_code": {"value": 202, "type": "Integer"},
                "spedition_order_id": {"value": "X9", "type": "String"},
                "spedition_deliverydate": {"value": null, "type": "Null"}
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let variables: CompletionVariables = [
        ("spedition_request_success", json!(true)),
        ("spedition_http_code", json!(202)),
        ("spedition_order_id", json!("X9")),
        ("spedition_deliverydate", json!(null)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    client(&mock_server.uri())
        .complete("task-1", &variables)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_handle_failure_sends_retry_hint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/task-1/failure"))
        .and(body_json(json!({
            "workerId": "test-worker",
            "errorMessage": "unexpected HTTP status 503",
            "errorDetails": "maintenance",
            "retries": 2,
            "retryTimeout": 60000
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = FailureReport {
        error_message: "unexpected HTTP status 503".to_string(),
        error_details: "maintenance".to_string(),
        retries: 2,
        retry_timeout_ms: 60_000,
    };

    client(&mock_server.uri())
        .handle_failure("task-1", &report)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_engine_error_status_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/task-1/complete"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"{"message":"task not found"}"#),
        )
        .mount(&mock_server)
        .await;

    let error = client(&mock_server.uri())
        .complete("task-1", &CompletionVariables::new())
        .await
        .unwrap_err();

    match error {
        EngineError::Status { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("task not found"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_fetch_response_is_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/fetchAndLock"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let error = client(&mock_server.uri())
        .fetch_and_lock(1)
        .await
        .unwrap_err();
    assert!(matches!(error, EngineError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_embedded_credentials_become_basic_auth() {
    let mock_server = MockServer::start().await;

    // base64("demo:s3cret")
    Mock::given(method("POST"))
        .and(path("/engine-rest/external-task/fetchAndLock"))
        .and(header("authorization", "Basic ZGVtbzpzM2NyZXQ="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.uri().trim_start_matches("http://").to_string();
    let config =
        test_helpers::test_config(&format!("http://demo:s3cret@{host}"), "http://provider.invalid");
    let credentials = config.engine_credentials_from(|_| None);
    let client = CamundaClient::with_credentials(&config, credentials).unwrap();

    assert!(!client.display_url().contains("s3cret"));
    assert!(client.fetch_and_lock(1).await.unwrap().is_empty());
}
