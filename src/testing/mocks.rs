//! Mock implementations for testing
//!
//! [`MockConsignmentApi`] replays scripted provider responses and
//! [`MockTaskQueue`] plays the engine, recording everything reported to it.

use crate::consignment::variables::CompletionVariables;
use crate::consignment::{ConsignmentApi, ConsignmentRequest, RawResponse, TransportError};
use crate::engine::{EngineError, ExternalTask, FailureReport, TaskQueue};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Idle pause when the mock queue has nothing left, so worker loops do not spin
const EMPTY_POLL_DELAY: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum Scripted {
    Respond(RawResponse),
    Fail(TransportError),
    Panic(String),
}

/// Mock logistics provider
///
/// Scripted replies are consumed in order; the last one repeats once the
/// script is exhausted.
#[derive(Debug, Default)]
pub struct MockConsignmentApi {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    requests: Mutex<Vec<ConsignmentRequest>>,
    calls: AtomicUsize,
}

impl MockConsignmentApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: &str) -> Self {
        self.push(Scripted::Respond(RawResponse {
            status,
            body: body.to_string(),
        }))
    }

    pub fn fail_with(self, error: TransportError) -> Self {
        self.push(Scripted::Fail(error))
    }

    /// Panic inside `send`, simulating a bug in the processing path
    pub fn panic_with(self, message: &str) -> Self {
        self.push(Scripted::Panic(message.to_string()))
    }

    fn push(self, reply: Scripted) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(reply);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ConsignmentRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self) -> Option<Scripted> {
        let mut script = self.script.lock().ok()?;
        let mut last = self.last.lock().ok()?;
        if let Some(reply) = script.pop_front() {
            *last = Some(reply);
        }
        last.clone()
    }
}

#[async_trait]
impl ConsignmentApi for MockConsignmentApi {
    fn endpoint(&self) -> &str {
        "http://mock-logistics.local/v1/consignment/request"
    }

    async fn send(&self, request: &ConsignmentRequest) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.next_reply() {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Panic(message)) => panic!("{message}"),
            None => Err(TransportError::Request(
                "no scripted response".to_string(),
            )),
        }
    }
}

/// Mock engine task queue
#[derive(Debug, Default)]
pub struct MockTaskQueue {
    batches: Mutex<VecDeque<Result<Vec<ExternalTask>, EngineError>>>,
    completions: Mutex<Vec<(String, CompletionVariables)>>,
    failures: Mutex<Vec<(String, FailureReport)>>,
    fetches: AtomicUsize,
    pub fail_reports: bool,
}

impl MockTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue rejects every completion and failure report
    pub fn with_failing_reports() -> Self {
        Self {
            fail_reports: true,
            ..Default::default()
        }
    }

    /// Next fetch returns these tasks
    pub fn push_batch(&self, tasks: Vec<ExternalTask>) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(Ok(tasks));
        }
    }

    /// Next fetch fails with this error
    pub fn push_fetch_error(&self, error: EngineError) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(Err(error));
        }
    }

    pub fn completions(&self) -> Vec<(String, CompletionVariables)> {
        self.completions
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<(String, FailureReport)> {
        self.failures.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Total tasks resolved either way
    pub fn resolved_count(&self) -> usize {
        self.completions().len() + self.failures().len()
    }
}

#[async_trait]
impl TaskQueue for MockTaskQueue {
    async fn fetch_and_lock(&self, max_tasks: u32) -> Result<Vec<ExternalTask>, EngineError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let next = self.batches.lock().ok().and_then(|mut b| b.pop_front());
        match next {
            Some(Ok(mut tasks)) => {
                tasks.truncate(max_tasks as usize);
                Ok(tasks)
            }
            Some(Err(error)) => Err(error),
            None => {
                tokio::time::sleep(EMPTY_POLL_DELAY).await;
                Ok(Vec::new())
            }
        }
    }

    async fn complete(
        &self,
        task_id: &str,
        variables: &CompletionVariables,
    ) -> Result<(), EngineError> {
        if self.fail_reports {
            return Err(EngineError::Status {
                status: 500,
                body: "complete rejected".to_string(),
            });
        }
        if let Ok(mut completions) = self.completions.lock() {
            completions.push((task_id.to_string(), variables.clone()));
        }
        Ok(())
    }

    async fn handle_failure(
        &self,
        task_id: &str,
        report: &FailureReport,
    ) -> Result<(), EngineError> {
        if self.fail_reports {
            return Err(EngineError::Status {
                status: 500,
                body: "failure rejected".to_string(),
            });
        }
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((task_id.to_string(), report.clone()));
        }
        Ok(())
    }
}
