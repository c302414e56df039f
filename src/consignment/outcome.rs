//! Classified result of processing one task

use crate::consignment::response::ConsignmentResponse;

/// Exactly one of these is produced per processed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Provider accepted the order
    Success {
        http_code: u16,
        response: ConsignmentResponse,
        raw_body: String,
    },
    /// Provider rejected the order; not retried
    BusinessError {
        http_code: u16,
        message: String,
        raw_body: String,
    },
    /// Worth retrying later; reported as a failure, never completed
    TransientFailure { reason: String, detail: String },
    /// Task input is unusable; completed without calling the provider
    InvalidInput { reason: String },
}

impl Outcome {
    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::BusinessError { .. } => "business_error",
            Outcome::TransientFailure { .. } => "transient_failure",
            Outcome::InvalidInput { .. } => "invalid_input",
        }
    }
}
