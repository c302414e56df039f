//! Consignment pipeline building blocks
//!
//! Validation, request construction, the provider client, response
//! classification, completion-variable mapping and the retry hint. The
//! orchestration lives in [`crate::processing`].

pub mod classifier;
pub mod client;
pub mod outcome;
pub mod request;
pub mod response;
pub mod retry;
pub mod validation;
pub mod variables;

pub use classifier::ResponseClassifier;
pub use client::{ConsignmentApi, ConsignmentClient, RawResponse, TransportError};
pub use outcome::Outcome;
pub use request::ConsignmentRequest;
pub use response::ConsignmentResponse;
pub use retry::{RetryPolicy, RetryState};
pub use validation::{FieldValidator, InputError, RawTaskInput, ValidatedOrder};
pub use variables::{CompletionVariables, OutcomeMapper};
