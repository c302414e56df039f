//! Provider response for an accepted consignment

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body returned by the provider on `200`/`202`
///
/// Every field is optional and unknown fields are ignored. Older provider
/// versions spell the customer reference `customerRefernce`; both spellings
/// are kept so the canonical one can win when both are present. Scalars are
/// coerced the way the provider's own clients read them: numbers and booleans
/// become text, and a fractional or quoted weight becomes a whole number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsignmentResponse {
    #[serde(rename = "orderId", default, deserialize_with = "lenient_string")]
    pub order_id: Option<String>,
    #[serde(rename = "pickupdate", default, deserialize_with = "lenient_string")]
    pub pickup_date: Option<String>,
    #[serde(rename = "deliverydate", default, deserialize_with = "lenient_string")]
    pub delivery_date: Option<String>,
    #[serde(
        rename = "customerReference",
        default,
        deserialize_with = "lenient_string"
    )]
    pub customer_reference: Option<String>,
    #[serde(
        rename = "customerRefernce",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub legacy_customer_reference: Option<String>,
    #[serde(rename = "recepientPhone", default, deserialize_with = "lenient_string")]
    pub recipient_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_weight")]
    pub weight: Option<i64>,
}

impl ConsignmentResponse {
    /// Parse a response body
    ///
    /// Only a JSON object is a consignment; arrays and bare scalars are
    /// rejected rather than mapped onto fields by position.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(de::Error::invalid_type(
                unexpected(&value),
                &"a consignment object",
            ));
        }
        serde_json::from_value(value)
    }

    /// Customer reference, preferring the canonical spelling
    pub fn customer_reference(&self) -> Option<&str> {
        self.customer_reference
            .as_deref()
            .or(self.legacy_customer_reference.as_deref())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::invalid_type(unexpected(&other), &"a string")),
    }
}

/// Whole kilograms within the 32-bit range; fractions are truncated
fn lenient_weight<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let whole = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => Some(v),
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64),
        },
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(other) => {
            return Err(de::Error::invalid_type(
                unexpected(&other),
                &"a whole number",
            ))
        }
    };

    whole
        .filter(|v| i32::try_from(*v).is_ok())
        .map(Some)
        .ok_or_else(|| de::Error::custom("weight is not a 32-bit whole number"))
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}
