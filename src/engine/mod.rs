//! Workflow engine (task queue) integration
//!
//! The engine delivers locked external tasks, tracks their retry counters and
//! records completion. [`TaskQueue`] is the seam the worker talks to;
//! [`CamundaClient`] implements it over the engine's REST API.

pub mod camunda;
pub mod types;

pub use camunda::CamundaClient;
pub use types::{ExternalTask, FailureReport, TypedValue};

use crate::consignment::variables::CompletionVariables;
use async_trait::async_trait;
use thiserror::Error;

/// Errors talking to the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine request failed: {0}")]
    Request(String),
    #[error("Engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Task-queue collaborator
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Long-poll for up to `max_tasks` tasks and lock them for this worker
    async fn fetch_and_lock(&self, max_tasks: u32) -> Result<Vec<ExternalTask>, EngineError>;

    /// Complete a task with result variables
    async fn complete(
        &self,
        task_id: &str,
        variables: &CompletionVariables,
    ) -> Result<(), EngineError>;

    /// Report a failure so the engine re-delivers the task later
    async fn handle_failure(
        &self,
        task_id: &str,
        report: &FailureReport,
    ) -> Result<(), EngineError>;
}
