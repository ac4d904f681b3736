//! # Field Validation
//!
//! Per-field error collection and the text/email/date checks shared by node
//! and product payloads. Messages follow the wording API clients of the
//! network service already expect.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Message for a missing required field.
pub const REQUIRED: &str = "This field is required.";

/// Message for a required field sent as `null`.
pub const NOT_NULL: &str = "This field may not be null.";

/// Field-level validation failures, keyed by field name.
///
/// Ordered by field name so error bodies are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// No errors yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field failure.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a failure for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fold another set of failures into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Field names with at least one failure.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Check a required, length-limited text field and return it trimmed.
pub fn check_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> Option<String> {
    let Some(value) = value else {
        errors.add(field, REQUIRED);
        return None;
    };
    check_present_text(errors, field, value, max_len)
}

/// Check a text field that was supplied (possibly on a partial update).
pub fn check_present_text(
    errors: &mut FieldErrors,
    field: &str,
    value: String,
    max_len: usize,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field may not be blank.");
        return None;
    }
    if trimmed.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this field has no more than {max_len} characters."),
        );
        return None;
    }
    Some(trimmed.to_string())
}

/// Longest accepted email address.
pub const EMAIL_MAX_LEN: usize = 254;

/// Check an email address field.
///
/// Structural check only: one `@`, a non-empty local part, and a dotted
/// domain without empty labels or whitespace.
pub fn check_email(errors: &mut FieldErrors, field: &str, value: String) -> Option<String> {
    let value = check_present_text(errors, field, value, EMAIL_MAX_LEN)?;
    if is_valid_email(&value) {
        Some(value)
    } else {
        errors.add(field, "Enter a valid email address.");
        None
    }
}

fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty() && !l.starts_with('-') && !l.ends_with('-')
        })
}

/// Check a `YYYY-MM-DD` date field.
pub fn check_date(errors: &mut FieldErrors, field: &str, value: String) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(
                field,
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            );
            None
        }
    }
}

/// Deserialize helper distinguishing an absent field from an explicit `null`.
///
/// Use with `#[serde(default, deserialize_with = "deserialize_present")]` on an
/// `Option<Option<T>>` field: absent → `None`, `null` → `Some(None)`.
pub fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "bad");
        errors.add("name", "worse");
        errors.add("city", "missing");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name").unwrap().len(), 2);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["city", "name"]);
        assert_eq!(errors.to_string(), "city: missing; name: bad; name: worse");
    }

    #[test]
    fn errors_serialize_as_map() {
        let errors = FieldErrors::single("debt", "nope");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"debt": ["nope"]})
        );
    }

    #[test]
    fn finish_returns_value_when_clean() {
        assert_eq!(FieldErrors::new().finish(5).unwrap(), 5);
        assert!(FieldErrors::single("a", "b").finish(5).is_err());
    }

    #[test]
    fn merge_appends_messages() {
        let mut a = FieldErrors::single("name", "one");
        a.merge(FieldErrors::single("name", "two"));
        assert_eq!(a.get("name").unwrap(), ["one", "two"]);
    }

    #[test]
    fn text_checks() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            check_text(&mut errors, "name", Some("  Plant  ".into()), 10),
            Some("Plant".to_string())
        );
        assert!(check_text(&mut errors, "city", None, 10).is_none());
        assert!(check_text(&mut errors, "street", Some("   ".into()), 10).is_none());
        assert!(check_text(&mut errors, "house_number", Some("x".repeat(21)), 20).is_none());
        assert_eq!(errors.get("city").unwrap(), [REQUIRED]);
        assert!(errors.get("street").unwrap()[0].contains("blank"));
        assert!(errors.get("house_number").unwrap()[0].contains("20 characters"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let mut errors = FieldErrors::new();
        // 6 Cyrillic letters are 12 bytes.
        assert!(check_text(&mut errors, "country", Some("Россия".into()), 6).is_some());
        assert!(errors.is_empty());
    }

    #[test]
    fn email_checks() {
        let mut errors = FieldErrors::new();
        assert!(check_email(&mut errors, "email", "factory@example.com".into()).is_some());
        assert!(check_email(&mut errors, "email", "no-at-sign".into()).is_none());
        assert!(check_email(&mut errors, "email", "a@b".into()).is_none());
        assert!(check_email(&mut errors, "email", "a@@b.com".into()).is_none());
        assert!(check_email(&mut errors, "email", "a b@c.com".into()).is_none());
        assert_eq!(errors.get("email").unwrap().len(), 4);
    }

    #[test]
    fn date_checks() {
        let mut errors = FieldErrors::new();
        assert_eq!(
            check_date(&mut errors, "release_date", "2023-01-01".into()),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert!(check_date(&mut errors, "release_date", "01.01.2023".into()).is_none());
        assert_eq!(errors.len(), 1);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_present")]
        supplier: Option<Option<u32>>,
    }

    #[test]
    fn present_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"supplier": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"supplier": 3}"#).unwrap();
        assert_eq!(absent.supplier, None);
        assert_eq!(null.supplier, Some(None));
        assert_eq!(set.supplier, Some(Some(3)));
    }
}
