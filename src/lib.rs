//! Spedition worker
//!
//! An external-task worker that turns workflow-engine tasks into consignment
//! orders at a logistics provider and writes the classified result back.
//!
//! # Overview
//!
//! - [`consignment`]: validation, request building, the provider client,
//!   response classification, completion variables and the retry hint
//! - [`engine`]: the task-queue seam and its Camunda REST implementation
//! - [`processing`]: per-task orchestration into a [`TaskResolution`]
//! - [`worker`]: the long-polling subscription loop
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use spedition_worker::consignment::{FieldValidator, RawTaskInput};
//!
//! let input = RawTaskInput::new()
//!     .with("order_nr", "A1")
//!     .with("weight", 5)
//!     .with("delivery_address", "Street 1")
//!     .with("phone", "+49123456789");
//!
//! let order = FieldValidator::validate(&input).unwrap();
//! assert_eq!(order.weight_kg, 5);
//! assert_eq!(input.get("weight"), Some(&json!(5)));
//! ```

pub mod config;
pub mod consignment;
pub mod engine;
pub mod error;
pub mod observability;
pub mod processing;
pub mod sanitize;
pub mod testing;
pub mod worker;

pub use config::{ConfigError, WorkerConfig};
pub use consignment::{ConsignmentApi, ConsignmentClient, Outcome};
pub use engine::{CamundaClient, TaskQueue};
pub use error::{WorkerError, WorkerResult};
pub use processing::{CompletionKind, TaskProcessor, TaskResolution};
pub use worker::{ShutdownHandle, Worker};
