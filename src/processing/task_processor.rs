//! Validate, call the provider, classify, map
//!
//! The processor never talks to the engine itself; it hands back a
//! [`TaskResolution`] and [`report_resolution`] delivers it. That keeps the
//! whole pipeline testable with a mock provider and no engine at all.

use crate::consignment::{
    ConsignmentApi, ConsignmentRequest, FieldValidator, Outcome, OutcomeMapper,
    ResponseClassifier, RetryPolicy, TransportError,
};
use crate::consignment::variables::CompletionVariables;
use crate::engine::{EngineError, ExternalTask, FailureReport, TaskQueue};
use crate::error::sanitize_error_message;
use crate::observability::metrics::metrics;
use crate::sanitize::{mask_phone, mask_value, or_dash, sanitize_url};
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

/// Failure message when the provider could not be reached
pub const LOGISTICS_CALL_FAILED: &str = "Logistics API call failed";

/// Failure message for anything else that went wrong while processing
pub const UNEXPECTED_ERROR: &str = "Unexpected logistics worker error";

/// Which completion path a task took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Success,
    BusinessError,
    InputError,
}

/// What should happen to a task in the engine
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResolution {
    Complete {
        kind: CompletionKind,
        variables: CompletionVariables,
    },
    Failure(FailureReport),
}

/// Runs the consignment pipeline for single tasks
pub struct TaskProcessor<C: ConsignmentApi> {
    client: C,
    retry_policy: RetryPolicy,
}

impl<C: ConsignmentApi> TaskProcessor<C> {
    pub fn new(client: C) -> Self {
        Self::with_retry_policy(client, RetryPolicy::default())
    }

    pub fn with_retry_policy(client: C, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Process one task into a resolution
    ///
    /// Never fails: every error path becomes a [`TaskResolution::Failure`].
    pub async fn process(&self, task: &ExternalTask) -> TaskResolution {
        let span = crate::task_span!(
            task_id = %task.id,
            topic = %task.topic_name,
            retries = ?task.retries
        );

        async {
            metrics().task_received();
            let started = Instant::now();

            let resolution = match self.execute(task).await {
                Ok(outcome) => self.resolve_outcome(task, outcome),
                Err(error) => self.resolve_error(task, &error),
            };

            match &resolution {
                TaskResolution::Complete { kind, .. } => {
                    metrics().task_completed(*kind, started.elapsed())
                }
                TaskResolution::Failure(_) => metrics().task_failure_reported(started.elapsed()),
            }

            resolution
        }
        .instrument(span)
        .await
    }

    async fn execute(&self, task: &ExternalTask) -> Result<Outcome, TransportError> {
        let order = match FieldValidator::validate(&task.input()) {
            Ok(order) => order,
            Err(e) => {
                warn!(field = e.field(), reason = %e, "Rejecting task input");
                return Ok(Outcome::InvalidInput {
                    reason: e.to_string(),
                });
            }
        };

        info!(
            order_nr = %mask_value(&order.order_id),
            weight_kg = order.weight_kg,
            address_length = order.delivery_address.chars().count(),
            phone = %mask_phone(&order.phone),
            "Task input validated"
        );

        let request = ConsignmentRequest::build(&order);
        info!(
            endpoint = %sanitize_url(self.client.endpoint()),
            "Sending consignment request"
        );

        metrics().provider_request_sent();
        let response = self.client.send(&request).await.map_err(|e| {
            metrics().provider_transport_error();
            e
        })?;

        info!(
            status = response.status,
            body_length = response.body.len(),
            "Logistics API responded"
        );

        Ok(ResponseClassifier::classify(response.status, &response.body))
    }

    fn resolve_outcome(&self, task: &ExternalTask, outcome: Outcome) -> TaskResolution {
        let kind = match &outcome {
            Outcome::Success {
                http_code,
                response,
                ..
            } => {
                let consignment_id = response.order_id.as_deref().map(mask_value);
                info!(
                    http_code,
                    consignment_id = or_dash(consignment_id.as_deref()),
                    pickup_date = or_dash(response.pickup_date.as_deref()),
                    delivery_date = or_dash(response.delivery_date.as_deref()),
                    "Consignment accepted"
                );
                CompletionKind::Success
            }
            Outcome::BusinessError {
                http_code, message, ..
            } => {
                warn!(http_code, %message, "Consignment rejected by provider");
                CompletionKind::BusinessError
            }
            Outcome::InvalidInput { reason } => {
                warn!(%reason, "Completing task with input error");
                CompletionKind::InputError
            }
            Outcome::TransientFailure { reason, detail } => {
                warn!(%reason, %detail, "Transient logistics failure");
                return TaskResolution::Failure(self.failure_report(task, reason, detail));
            }
        };

        match OutcomeMapper::to_completion_variables(&outcome) {
            Some(variables) => TaskResolution::Complete { kind, variables },
            None => TaskResolution::Failure(self.failure_report(
                task,
                UNEXPECTED_ERROR,
                &format!("no completion variables for {} outcome", outcome.label()),
            )),
        }
    }

    fn resolve_error(&self, task: &ExternalTask, error: &TransportError) -> TaskResolution {
        error!(kind = error.kind(), error = %error, "Logistics API call failed");
        TaskResolution::Failure(self.failure_report(
            task,
            LOGISTICS_CALL_FAILED,
            &format!("{}: {}", error.kind(), error),
        ))
    }

    /// Failure report carrying the retry countdown for this task
    ///
    /// Details are sanitized before they leave the process.
    pub fn failure_report(
        &self,
        task: &ExternalTask,
        message: &str,
        details: &str,
    ) -> FailureReport {
        let retry = self.retry_policy.next(task.retries);
        FailureReport {
            error_message: message.to_string(),
            error_details: sanitize_error_message(details),
            retries: retry.remaining,
            retry_timeout_ms: retry.delay_ms,
        }
    }
}

/// Deliver a resolution to the engine
pub async fn report_resolution<Q: TaskQueue + ?Sized>(
    queue: &Q,
    task: &ExternalTask,
    resolution: &TaskResolution,
) -> Result<(), EngineError> {
    match resolution {
        TaskResolution::Complete { kind, variables } => {
            queue.complete(&task.id, variables).await?;
            info!(task_id = %task.id, ?kind, "Task completed");
        }
        TaskResolution::Failure(report) => {
            queue.handle_failure(&task.id, report).await?;
            warn!(
                task_id = %task.id,
                retries = report.retries,
                retry_timeout_ms = report.retry_timeout_ms,
                error_message = %report.error_message,
                "Task failure reported"
            );
        }
    }
    Ok(())
}
