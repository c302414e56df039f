//! External Task REST client for a Camunda 7 engine

use crate::config::{Credentials, WorkerConfig};
use crate::consignment::validation::REQUIRED_VARIABLES;
use crate::consignment::variables::CompletionVariables;
use crate::engine::types::{
    CompleteRequest, ExternalTask, FailureReport, FailureRequest, FetchAndLockRequest,
    TopicSubscription, TypedValue,
};
use crate::engine::{EngineError, TaskQueue};
use crate::sanitize::{sanitize_url, truncate_for_log};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Extra time on top of the long-polling timeout before the HTTP call gives up
const FETCH_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);
const REPORT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine client bound to one topic subscription
pub struct CamundaClient {
    client: Client,
    base_url: String,
    worker_id: String,
    topic: String,
    lock_duration_ms: u64,
    async_response_timeout_ms: u64,
    credentials: Option<Credentials>,
}

impl CamundaClient {
    /// Build a client from configuration, resolving credentials from the environment
    pub fn new(config: &WorkerConfig) -> Result<Self, EngineError> {
        Self::with_credentials(config, config.engine_credentials())
    }

    /// Build a client with explicitly supplied credentials
    pub fn with_credentials(
        config: &WorkerConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self, EngineError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

        let base_url = config
            .engine_url_without_credentials()
            .trim_end_matches('/')
            .to_string();

        let worker_id = config
            .worker
            .worker_id
            .clone()
            .unwrap_or_else(|| format!("spedition-worker-{}", Uuid::new_v4()));

        Ok(Self {
            client,
            base_url,
            worker_id,
            topic: config.worker.topic.clone(),
            lock_duration_ms: config.worker.lock_duration_ms,
            async_response_timeout_ms: config.worker.async_response_timeout_ms,
            credentials,
        })
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Engine base URL for logging
    pub fn display_url(&self) -> String {
        sanitize_url(&self.base_url)
    }

    fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> RequestBuilder {
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .timeout(timeout)
            .json(body);

        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, creds.password.as_ref()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, EngineError> {
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(EngineError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            })
        }
    }
}

#[async_trait]
impl TaskQueue for CamundaClient {
    async fn fetch_and_lock(&self, max_tasks: u32) -> Result<Vec<ExternalTask>, EngineError> {
        let body = FetchAndLockRequest {
            worker_id: &self.worker_id,
            max_tasks,
            use_priority: true,
            async_response_timeout: self.async_response_timeout_ms,
            topics: vec![TopicSubscription {
                topic_name: &self.topic,
                lock_duration: self.lock_duration_ms,
                variables: REQUIRED_VARIABLES.to_vec(),
            }],
        };

        let timeout = Duration::from_millis(self.async_response_timeout_ms) + FETCH_TIMEOUT_MARGIN;
        let response = self
            .send(self.post("/external-task/fetchAndLock", &body, timeout))
            .await?;

        let tasks: Vec<ExternalTask> = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        debug!(count = tasks.len(), topic = %self.topic, "Fetched and locked external tasks");
        Ok(tasks)
    }

    async fn complete(
        &self,
        task_id: &str,
        variables: &CompletionVariables,
    ) -> Result<(), EngineError> {
        let body = CompleteRequest {
            worker_id: &self.worker_id,
            variables: variables
                .iter()
                .map(|(name, value)| (name.as_str(), TypedValue::infer(value.clone())))
                .collect(),
        };

        self.send(self.post(
            &format!("/external-task/{task_id}/complete"),
            &body,
            REPORT_TIMEOUT,
        ))
        .await?;
        Ok(())
    }

    async fn handle_failure(
        &self,
        task_id: &str,
        report: &FailureReport,
    ) -> Result<(), EngineError> {
        let body = FailureRequest {
            worker_id: &self.worker_id,
            error_message: &report.error_message,
            error_details: &report.error_details,
            retries: report.retries,
            retry_timeout: report.retry_timeout_ms,
        };

        self.send(self.post(
            &format!("/external-task/{task_id}/failure"),
            &body,
            REPORT_TIMEOUT,
        ))
        .await?;
        Ok(())
    }
}
