//! Maps a provider HTTP status and body onto an [`Outcome`]

use crate::consignment::outcome::Outcome;
use crate::consignment::response::ConsignmentResponse;
use crate::sanitize::truncate_for_log;

/// Status codes the provider uses for deliberate, non-retryable rejections
const BUSINESS_ERRORS: &[(u16, &str)] = &[
    (405, "invalid input data reported by provider"),
    (501, "provider cannot auto-process order"),
];

/// Message for a provider business error code, if the code is one
pub fn business_error_message(status: u16) -> Option<&'static str> {
    BUSINESS_ERRORS
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, message)| *message)
}

/// Stateless classifier; identical inputs always yield identical outcomes
pub struct ResponseClassifier;

impl ResponseClassifier {
    pub fn classify(status: u16, body: &str) -> Outcome {
        match status {
            200 | 202 => match ConsignmentResponse::parse(body) {
                Ok(response) => Outcome::Success {
                    http_code: status,
                    response,
                    raw_body: body.to_string(),
                },
                // The provider nominally accepted the order, so a garbled body is retried
                Err(e) => Outcome::TransientFailure {
                    reason: format!("malformed consignment response (HTTP {status})"),
                    detail: truncate_for_log(&format!("{e}: {body}")),
                },
            },
            code => match business_error_message(code) {
                Some(message) => Outcome::BusinessError {
                    http_code: code,
                    message: message.to_string(),
                    raw_body: body.to_string(),
                },
                None => Outcome::TransientFailure {
                    reason: format!("unexpected HTTP status {code}"),
                    detail: truncate_for_log(body),
                },
            },
        }
    }
}
