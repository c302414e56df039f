//! Outbound consignment request
//!
//! Only the four fields the provider needs are transmitted; nothing else from
//! the task crosses this boundary.

use crate::consignment::validation::ValidatedOrder;
use serde::{Deserialize, Serialize};

/// Request body for `POST <provider>/consignment/request`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsignmentRequest {
    pub destination: String,
    #[serde(rename = "customerReference")]
    pub customer_reference: String,
    /// Field name as spelled by the provider API
    #[serde(rename = "recepientPhone")]
    pub recipient_phone: String,
    pub weight: u32,
}

impl ConsignmentRequest {
    /// Map a validated order onto the provider's request shape
    pub fn build(order: &ValidatedOrder) -> Self {
        Self {
            destination: order.delivery_address.clone(),
            customer_reference: order.order_id.clone(),
            recipient_phone: order.phone.clone(),
            weight: order.weight_kg,
        }
    }
}

impl From<&ValidatedOrder> for ConsignmentRequest {
    fn from(order: &ValidatedOrder) -> Self {
        Self::build(order)
    }
}
