//! Submission payload types.

use serde::Serialize;
use serde_json::{Map, Value};

/// Field carrying the form identifier, both in requests and in sanitized output.
pub const FORM_ID_FIELD: &str = "form_id";

/// Server-generated ISO-8601 timestamp injected by the sanitizer.
pub const SUBMITTED_AT_FIELD: &str = "submitted_at";

/// Parsed request body, exactly as the client sent it.
///
/// May contain control keys (prefixed with `_`) such as the honeypot and the
/// client render timestamp.
pub type RawSubmission = Map<String, Value>;

/// A submission that passed anti-spam and validation.
///
/// Control keys are gone, every string value is escaped, and `form_id` and
/// `submitted_at` are set by the server. Only the sanitizer builds these.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SanitizedSubmission {
    fields: Map<String, Value>,
}

impl SanitizedSubmission {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Identifier of the form that produced this submission.
    pub fn form_id(&self) -> &str {
        self.fields
            .get(FORM_ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Server timestamp recorded when the submission was sanitized.
    pub fn submitted_at(&self) -> &str {
        self.fields
            .get(SUBMITTED_AT_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Look up a single field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields, including the injected metadata.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Names of all fields, for logging without exposing values.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitized_submission_accessors() {
        let fields = json!({
            "email": "x@y.com",
            "form_id": "newsletter",
            "submitted_at": "2024-01-01T00:00:00.000Z",
        });
        let submission = SanitizedSubmission::new(fields.as_object().unwrap().clone());

        assert_eq!(submission.form_id(), "newsletter");
        assert_eq!(submission.submitted_at(), "2024-01-01T00:00:00.000Z");
        assert_eq!(submission.get("email"), Some(&json!("x@y.com")));
        assert_eq!(submission.field_names().len(), 3);
    }

    #[test]
    fn test_sanitized_submission_serializes_flat() {
        let fields = json!({ "email": "x@y.com", "form_id": "newsletter" });
        let submission = SanitizedSubmission::new(fields.as_object().unwrap().clone());

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json, fields);
    }
}
