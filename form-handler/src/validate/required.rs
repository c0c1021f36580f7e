//! Schema-level validation: required fields and their format checks.

use std::borrow::Cow;

use serde_json::Value;

use crate::forms::{FormSchema, RawSubmission};
use crate::validate::fields::FieldValidators;

/// Error messages in field declaration order. Empty means valid.
pub type ValidationResult = Vec<String>;

/// Check that every required field is present and passes its validator.
///
/// Errors are collected for all fields rather than stopping at the first, so
/// the caller can fix everything in one round trip.
pub fn validate_required(
    submission: &RawSubmission,
    required_fields: &[&str],
    validators: &FieldValidators,
) -> ValidationResult {
    let mut errors = Vec::new();

    for &field in required_fields {
        match submission.get(field).and_then(field_text) {
            None => errors.push(format!("Missing required field: {}", field)),
            Some(text) => {
                if let Err(reason) = check(validators, field, submission.get(field), &text) {
                    errors.push(format!("{}: {}", field, reason));
                }
            }
        }
    }

    errors
}

/// Full validation for a form.
///
/// Only required fields go through the validators. Optional fields are
/// passed along as sent, even when a validator is registered under their name.
pub fn validate_submission(
    submission: &RawSubmission,
    schema: &FormSchema,
    validators: &FieldValidators,
) -> ValidationResult {
    validate_required(submission, schema.required_fields, validators)
}

/// Textual form of a present value, or `None` if the value counts as missing.
///
/// Missing means `null` or a string that is blank after trimming. Numbers and
/// booleans are present and validated on their JSON text.
fn field_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

fn check(
    validators: &FieldValidators,
    field: &str,
    value: Option<&Value>,
    text: &str,
) -> Result<(), String> {
    // Structured values cannot satisfy a format check.
    if matches!(value, Some(Value::Array(_)) | Some(Value::Object(_))) && validators.has(field) {
        return Err("Invalid value".to_string());
    }
    validators.validate(field, text)
}
