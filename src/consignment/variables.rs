//! Completion variables written back to the engine
//!
//! Keys carry a stable `spedition_` prefix so process models can branch on
//! them without knowing about the provider.

use crate::consignment::outcome::Outcome;
use crate::sanitize::sanitize_body_for_variable;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const REQUEST_SUCCESS: &str = "spedition_request_success";
pub const HTTP_CODE: &str = "spedition_http_code";
pub const ORDER_ID: &str = "spedition_order_id";
pub const PICKUP_DATE: &str = "spedition_pickupdate";
pub const DELIVERY_DATE: &str = "spedition_deliverydate";
pub const CUSTOMER_REFERENCE: &str = "spedition_customer_reference";
pub const RECIPIENT_PHONE: &str = "spedition_recepient_phone";
pub const DESTINATION: &str = "spedition_destination";
pub const WEIGHT: &str = "spedition_weight";
pub const RESPONSE_BODY: &str = "spedition_response_body";
pub const ERROR_MESSAGE: &str = "spedition_error_message";

/// HTTP code recorded for rejected task input; mirrors the provider's own
/// "invalid input" code even though no call was made
pub const INPUT_ERROR_HTTP_CODE: u16 = 405;

/// Message recorded for rejected task input
pub const INPUT_ERROR_MESSAGE: &str = "invalid input data for consignment order";

/// Variables recorded when a task is completed, in stable key order
pub type CompletionVariables = BTreeMap<String, Value>;

/// Converts outcomes into completion variables
pub struct OutcomeMapper;

impl OutcomeMapper {
    /// Completion variables for an outcome
    ///
    /// Returns `None` for [`Outcome::TransientFailure`], which is reported as a
    /// failure instead of being completed.
    pub fn to_completion_variables(outcome: &Outcome) -> Option<CompletionVariables> {
        match outcome {
            Outcome::Success {
                http_code,
                response,
                raw_body,
            } => Some(Self::variables([
                (REQUEST_SUCCESS, json!(true)),
                (HTTP_CODE, json!(http_code)),
                (ORDER_ID, json!(response.order_id)),
                (PICKUP_DATE, json!(response.pickup_date)),
                (DELIVERY_DATE, json!(response.delivery_date)),
                (CUSTOMER_REFERENCE, json!(response.customer_reference())),
                (RECIPIENT_PHONE, json!(response.recipient_phone)),
                (DESTINATION, json!(response.destination)),
                (WEIGHT, json!(response.weight)),
                (RESPONSE_BODY, json!(sanitize_body_for_variable(raw_body))),
            ])),
            Outcome::BusinessError {
                http_code,
                message,
                raw_body,
            } => Some(Self::variables([
                (REQUEST_SUCCESS, json!(false)),
                (HTTP_CODE, json!(http_code)),
                (ERROR_MESSAGE, json!(message)),
                (RESPONSE_BODY, json!(sanitize_body_for_variable(raw_body))),
            ])),
            Outcome::InvalidInput { .. } => Some(Self::variables([
                (REQUEST_SUCCESS, json!(false)),
                (HTTP_CODE, json!(INPUT_ERROR_HTTP_CODE)),
                (ERROR_MESSAGE, json!(INPUT_ERROR_MESSAGE)),
                (RESPONSE_BODY, json!("")),
            ])),
            Outcome::TransientFailure { .. } => None,
        }
    }

    fn variables<const N: usize>(entries: [(&str, Value); N]) -> CompletionVariables {
        entries
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }
}
