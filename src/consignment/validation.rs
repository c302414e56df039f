//! Field validation for delivered task variables
//!
//! Turns the untyped variable map of an external task into a
//! [`ValidatedOrder`], or explains which field is unusable.

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Task variable carrying the order number
pub const ORDER_NR: &str = "order_nr";
/// Task variable carrying the parcel weight in kilograms
pub const WEIGHT: &str = "weight";
/// Task variable carrying the delivery address
pub const DELIVERY_ADDRESS: &str = "delivery_address";
/// Task variable carrying the recipient phone number
pub const PHONE: &str = "phone";

/// Variables the worker asks the engine to deliver with each task
pub const REQUIRED_VARIABLES: [&str; 4] = [ORDER_NR, WEIGHT, DELIVERY_ADDRESS, PHONE];

const MAX_ORDER_NR_LEN: usize = 128;
const MAX_DELIVERY_ADDRESS_LEN: usize = 512;
const MAX_PHONE_LEN: usize = 64;

/// Untyped task variables as delivered by the engine
///
/// A JSON `null` is treated the same as an absent variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTaskInput {
    values: HashMap<String, Value>,
}

impl RawTaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Look up a variable, treating `null` as absent
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Value)> for RawTaskInput {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Order data that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub order_id: String,
    pub weight_kg: u32,
    pub delivery_address: String,
    pub phone: String,
}

/// Reasons a task input is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("missing: {field}")]
    Missing { field: &'static str },

    #[error("empty: {field}")]
    Empty { field: &'static str },

    #[error("too long: {field} (max {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("invalid: {field}")]
    Invalid { field: &'static str },

    #[error("not positive: {field}")]
    NotPositive { field: &'static str },
}

impl InputError {
    /// Name of the offending task variable
    pub fn field(&self) -> &'static str {
        match self {
            InputError::Missing { field }
            | InputError::Empty { field }
            | InputError::TooLong { field, .. }
            | InputError::Invalid { field }
            | InputError::NotPositive { field } => field,
        }
    }
}

/// Extracts and checks the four order fields
pub struct FieldValidator;

impl FieldValidator {
    /// Validate all required fields, failing on the first unusable one
    pub fn validate(input: &RawTaskInput) -> Result<ValidatedOrder, InputError> {
        let order_id = read_required_string(input, ORDER_NR, MAX_ORDER_NR_LEN)?;
        let weight_kg = read_required_weight(input)?;
        let delivery_address =
            read_required_string(input, DELIVERY_ADDRESS, MAX_DELIVERY_ADDRESS_LEN)?;
        let phone = read_required_string(input, PHONE, MAX_PHONE_LEN)?;

        Ok(ValidatedOrder {
            order_id,
            weight_kg,
            delivery_address,
            phone,
        })
    }
}

/// Text form of a raw value (strings unquoted, everything else as JSON)
fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_required_string(
    input: &RawTaskInput,
    field: &'static str,
    max_len: usize,
) -> Result<String, InputError> {
    let raw = input.get(field).ok_or(InputError::Missing { field })?;
    let value = coerce_to_string(raw).trim().to_string();

    if value.is_empty() {
        return Err(InputError::Empty { field });
    }
    if value.chars().count() > max_len {
        return Err(InputError::TooLong {
            field,
            max: max_len,
        });
    }

    Ok(value)
}

fn read_required_weight(input: &RawTaskInput) -> Result<u32, InputError> {
    let raw = input.get(WEIGHT).ok_or(InputError::Missing { field: WEIGHT })?;

    let parsed: i64 = match raw {
        Value::Number(number) => {
            if let Some(whole) = number.as_i64() {
                whole
            } else if let Some(float) = number.as_f64() {
                // Truncate toward zero; fractional kilograms are dropped, not rounded
                if !float.is_finite() || float.trunc().abs() > i64::MAX as f64 {
                    return Err(InputError::Invalid { field: WEIGHT });
                }
                float.trunc() as i64
            } else {
                // u64 beyond i64::MAX
                return Err(InputError::Invalid { field: WEIGHT });
            }
        }
        other => coerce_to_string(other)
            .trim()
            .parse::<i32>()
            .map(i64::from)
            .map_err(|_| InputError::Invalid { field: WEIGHT })?,
    };

    if parsed <= 0 {
        return Err(InputError::NotPositive { field: WEIGHT });
    }

    u32::try_from(parsed)
        .ok()
        .filter(|w| *w <= i32::MAX as u32)
        .ok_or(InputError::Invalid { field: WEIGHT })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn valid_input() -> RawTaskInput {
        RawTaskInput::new()
            .with(ORDER_NR, "A1")
            .with(WEIGHT, 5)
            .with(DELIVERY_ADDRESS, "Street 1")
            .with(PHONE, "+49123456789")
    }

    #[test]
    fn test_valid_input_produces_order() {
        let order = FieldValidator::validate(&valid_input()).unwrap();
        assert_eq!(order.order_id, "A1");
        assert_eq!(order.weight_kg, 5);
        assert_eq!(order.delivery_address, "Street 1");
        assert_eq!(order.phone, "+49123456789");
    }

    #[test]
    fn test_string_fields_are_trimmed() {
        let input = valid_input()
            .with(ORDER_NR, "  A1  ")
            .with(DELIVERY_ADDRESS, "\tStreet 1\n");
        let order = FieldValidator::validate(&input).unwrap();
        assert_eq!(order.order_id, "A1");
        assert_eq!(order.delivery_address, "Street 1");
    }

    #[test]
    fn test_numeric_order_number_is_coerced() {
        let order = FieldValidator::validate(&valid_input().with(ORDER_NR, 4711)).unwrap();
        assert_eq!(order.order_id, "4711");
    }

    #[test]
    fn test_missing_field_is_named() {
        for field in REQUIRED_VARIABLES {
            let input: RawTaskInput = [
                (ORDER_NR, json!("A1")),
                (WEIGHT, json!(5)),
                (DELIVERY_ADDRESS, json!("Street 1")),
                (PHONE, json!("+49123456789")),
            ]
            .into_iter()
            .filter(|(name, _)| *name != field)
            .map(|(name, value)| (name.to_string(), value))
            .collect();

            let err = FieldValidator::validate(&input).unwrap_err();
            assert_eq!(err, InputError::Missing { field });
            assert_eq!(err.to_string(), format!("missing: {field}"));
        }
    }

    #[test]
    fn test_null_is_treated_as_missing() {
        let input = valid_input().with(PHONE, Value::Null);
        assert_eq!(
            FieldValidator::validate(&input).unwrap_err(),
            InputError::Missing { field: PHONE }
        );
    }

    #[test]
    fn test_blank_field_is_empty() {
        let input = valid_input().with(DELIVERY_ADDRESS, "   ");
        let err = FieldValidator::validate(&input).unwrap_err();
        assert_eq!(err, InputError::Empty { field: DELIVERY_ADDRESS });
        assert_eq!(err.field(), DELIVERY_ADDRESS);
    }

    #[test]
    fn test_length_bounds() {
        let at_limit = valid_input().with(ORDER_NR, "x".repeat(128));
        assert!(FieldValidator::validate(&at_limit).is_ok());

        let over_limit = valid_input().with(ORDER_NR, "x".repeat(129));
        assert_eq!(
            FieldValidator::validate(&over_limit).unwrap_err(),
            InputError::TooLong {
                field: ORDER_NR,
                max: 128
            }
        );

        let long_phone = valid_input().with(PHONE, "1".repeat(65));
        assert_eq!(
            FieldValidator::validate(&long_phone).unwrap_err().field(),
            PHONE
        );

        let long_address = valid_input().with(DELIVERY_ADDRESS, "a".repeat(513));
        assert_eq!(
            FieldValidator::validate(&long_address).unwrap_err().field(),
            DELIVERY_ADDRESS
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let input = valid_input().with(PHONE, "ü".repeat(64));
        assert!(FieldValidator::validate(&input).is_ok());
    }

    #[test]
    fn test_weight_from_numeric_string() {
        let order = FieldValidator::validate(&valid_input().with(WEIGHT, "12")).unwrap();
        assert_eq!(order.weight_kg, 12);

        let order = FieldValidator::validate(&valid_input().with(WEIGHT, " 7 ")).unwrap();
        assert_eq!(order.weight_kg, 7);
    }

    #[test]
    fn test_weight_float_is_truncated_not_rounded() {
        let order = FieldValidator::validate(&valid_input().with(WEIGHT, 12.9)).unwrap();
        assert_eq!(order.weight_kg, 12);
    }

    #[test]
    fn test_non_positive_weight_is_rejected() {
        for weight in [json!(0), json!(-5), json!("0"), json!(0.7)] {
            let err = FieldValidator::validate(&valid_input().with(WEIGHT, weight)).unwrap_err();
            assert_eq!(err, InputError::NotPositive { field: WEIGHT });
        }
    }

    #[test]
    fn test_unparsable_weight_is_invalid() {
        for weight in [json!("heavy"), json!("12.5"), json!(""), json!(true)] {
            let err = FieldValidator::validate(&valid_input().with(WEIGHT, weight)).unwrap_err();
            assert_eq!(err, InputError::Invalid { field: WEIGHT });
        }
    }

    #[test]
    fn test_weight_beyond_integer_range_is_invalid() {
        let err = FieldValidator::validate(&valid_input().with(WEIGHT, 3_000_000_000u64))
            .unwrap_err();
        assert_eq!(err, InputError::Invalid { field: WEIGHT });
    }

    proptest! {
        #[test]
        fn valid_fields_survive_trimmed(
            order in "[A-Za-z0-9-]{1,128}",
            weight in 1u32..100_000,
            address in "[A-Za-z0-9 ,.]{0,500}[A-Za-z]",
            phone in "\\+?[0-9 ]{0,60}[0-9]",
        ) {
            let input = RawTaskInput::new()
                .with(ORDER_NR, format!(" {order} "))
                .with(WEIGHT, weight)
                .with(DELIVERY_ADDRESS, address.clone())
                .with(PHONE, phone.clone());

            let validated = FieldValidator::validate(&input).unwrap();
            prop_assert_eq!(validated.order_id, order);
            prop_assert_eq!(validated.weight_kg, weight);
            prop_assert_eq!(validated.delivery_address, address.trim().to_string());
            prop_assert_eq!(validated.phone, phone.trim().to_string());
        }

        #[test]
        fn numeric_weight_truncates(weight in 1.0f64..1_000_000.0) {
            let input = RawTaskInput::new()
                .with(ORDER_NR, "A1")
                .with(WEIGHT, weight)
                .with(DELIVERY_ADDRESS, "Street 1")
                .with(PHONE, "+49123456789");

            let validated = FieldValidator::validate(&input).unwrap();
            prop_assert_eq!(validated.weight_kg, weight.trunc() as u32);
        }
    }
}
