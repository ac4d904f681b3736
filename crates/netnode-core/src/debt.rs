//! # Debt
//!
//! Money a node owes its supplier. Stored as a two-decimal-place
//! [`Decimal`] that mirrors a `NUMERIC(15, 2)` column with a non-negative
//! check.
//!
//! Debt has exactly one mutation path: clearing it to zero. The general
//! update path rejects any payload carrying a `debt` key, see
//! [`guard_debt_absent`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::DebtError;
use crate::validation::FieldErrors;

/// Name of the debt field in payloads and error reports.
pub const DEBT_FIELD: &str = "debt";

/// Digits after the decimal point.
pub const DEBT_SCALE: u32 = 2;

/// Total digits allowed.
pub const DEBT_MAX_DIGITS: usize = 15;

/// A non-negative amount with two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Debt(Decimal);

impl Debt {
    /// Validate and normalize an amount.
    ///
    /// Trailing zeros beyond two places are accepted (`1.500` is `1.50`), but
    /// significant digits beyond two places are not.
    pub fn new(amount: Decimal) -> Result<Self, DebtError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DebtError::Negative(amount.to_string()));
        }
        let normalized = amount.normalize();
        if normalized.scale() > DEBT_SCALE {
            return Err(DebtError::TooManyDecimalPlaces(amount.to_string()));
        }
        let mut value = normalized;
        value.rescale(DEBT_SCALE);
        // `abs` drops the sign of a negative zero.
        let value = value.abs();
        let digits = value.mantissa().unsigned_abs().to_string().len();
        if digits > DEBT_MAX_DIGITS {
            return Err(DebtError::TooManyDigits(amount.to_string()));
        }
        Ok(Self(value))
    }

    /// A cleared balance.
    pub fn zero() -> Self {
        Self(Decimal::new(0, DEBT_SCALE))
    }

    /// Whether nothing is owed.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The underlying amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl Default for Debt {
    fn default() -> Self {
        Self::zero()
    }
}

impl TryFrom<Decimal> for Debt {
    type Error = DebtError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl FromStr for Debt {
    type Err = DebtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let amount = Decimal::from_str_exact(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| DebtError::NotANumber(s.to_string()))?;
        Self::new(amount)
    }
}

impl fmt::Display for Debt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Debt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Debt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}

/// Reject a general-update payload that mentions debt at all.
///
/// The presence of the key is what matters: `{"debt": null}` and a payload
/// repeating the current balance are rejected just the same.
pub fn guard_debt_absent<'a>(keys: impl IntoIterator<Item = &'a str>) -> Result<(), FieldErrors> {
    if keys.into_iter().any(|k| k == DEBT_FIELD) {
        let mut errors = FieldErrors::new();
        errors.add(
            DEBT_FIELD,
            "Updating debt through the API is forbidden; use the clear_debt action.",
        );
        return Err(errors);
    }
    Ok(())
}

/// Read a debt value from raw JSON, recording a field error on failure.
///
/// Accepts numbers and numeric strings, the way a decimal form field does.
pub fn parse_debt(value: &serde_json::Value, errors: &mut FieldErrors) -> Option<Debt> {
    let parsed = match value {
        serde_json::Value::String(s) => s.parse::<Debt>(),
        serde_json::Value::Number(n) => n.to_string().parse::<Debt>(),
        other => Err(DebtError::NotANumber(other.to_string())),
    };
    match parsed {
        Ok(debt) => Some(debt),
        Err(e) => {
            errors.add(DEBT_FIELD, debt_error_message(&e));
            None
        }
    }
}

fn debt_error_message(err: &DebtError) -> String {
    match err {
        DebtError::Negative(_) => "Ensure this value is greater than or equal to 0.00.".to_string(),
        DebtError::TooManyDecimalPlaces(_) => {
            "Ensure that there are no more than 2 decimal places.".to_string()
        }
        DebtError::TooManyDigits(_) => {
            "Ensure that there are no more than 15 digits in total.".to_string()
        }
        DebtError::NotANumber(_) => "A valid number is required.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn zero_renders_with_two_places() {
        assert_eq!(Debt::zero().to_string(), "0.00");
        assert!(Debt::zero().is_zero());
        assert_eq!(Debt::default(), Debt::zero());
    }

    #[test]
    fn positive_amount_is_normalized_to_two_places() {
        assert_eq!(Debt::new(dec("1000")).unwrap().to_string(), "1000.00");
        assert_eq!(Debt::new(dec("12.5")).unwrap().to_string(), "12.50");
        assert_eq!(Debt::new(dec("1.500")).unwrap().to_string(), "1.50");
    }

    #[test]
    fn negative_amount_rejected() {
        let err = Debt::new(dec("-0.01")).unwrap_err();
        assert!(matches!(err, DebtError::Negative(_)));
    }

    #[test]
    fn negative_zero_is_zero() {
        let debt = Debt::new(dec("-0.00")).unwrap();
        assert!(debt.is_zero());
        assert_eq!(debt.to_string(), "0.00");
    }

    #[test]
    fn third_decimal_place_rejected() {
        let err = Debt::new(dec("1.005")).unwrap_err();
        assert!(matches!(err, DebtError::TooManyDecimalPlaces(_)));
    }

    #[test]
    fn digit_budget_enforced() {
        assert!(Debt::new(dec("9999999999999.99")).is_ok());
        let err = Debt::new(dec("99999999999999.99")).unwrap_err();
        assert!(matches!(err, DebtError::TooManyDigits(_)));
    }

    #[test]
    fn serializes_as_string() {
        let debt: Debt = "250.4".parse().unwrap();
        assert_eq!(serde_json::to_value(debt).unwrap(), json!("250.40"));
    }

    #[test]
    fn deserialize_rejects_negative() {
        assert!(serde_json::from_value::<Debt>(json!("-5")).is_err());
        assert!(serde_json::from_value::<Debt>(json!("5.25")).is_ok());
    }

    #[test]
    fn deserialize_normalizes_scale() {
        let debt: Debt = serde_json::from_value(json!("1500.5")).unwrap();
        assert_eq!(debt.to_string(), "1500.50");
        assert!(serde_json::from_value::<Debt>(json!("1.005")).is_err());
    }

    #[test]
    fn guard_rejects_any_debt_key() {
        let errors = guard_debt_absent(["name", "debt"]).unwrap_err();
        assert!(errors.get(DEBT_FIELD).is_some());
        assert!(guard_debt_absent(["name", "city"]).is_ok());
    }

    #[test]
    fn parse_debt_accepts_numbers_and_strings() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            parse_debt(&json!(10), &mut errors).unwrap().to_string(),
            "10.00"
        );
        assert_eq!(
            parse_debt(&json!("7.10"), &mut errors).unwrap().to_string(),
            "7.10"
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn parse_debt_records_field_error() {
        let mut errors = FieldErrors::new();
        assert!(parse_debt(&json!(-1), &mut errors).is_none());
        assert!(parse_debt(&json!(true), &mut errors).is_none());
        let messages = errors.get(DEBT_FIELD).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("greater than or equal to 0.00"));
    }
}
