//! Submission error types.

use axum::http::StatusCode;
use thiserror::Error;

/// Why a submission was not accepted.
///
/// Honeypot hits are not errors: they end the pipeline with a normal success
/// response (see [`crate::dispatch::Outcome::Suppressed`]).
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("Failed to read request body")]
    UnreadableBody,

    #[error("Invalid JSON body")]
    MalformedBody(#[source] serde_json::Error),

    #[error("{}", unknown_form_message(.requested.as_deref(), .known))]
    UnknownForm {
        requested: Option<String>,
        known: String,
    },

    #[error("Submission too fast. Please wait a moment and try again.")]
    TooFast { elapsed_ms: i64 },

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Failed to process submission. Please try again later.")]
    Action(#[source] anyhow::Error),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            SubmissionError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            SubmissionError::UnreadableBody
            | SubmissionError::MalformedBody(_)
            | SubmissionError::UnknownForm { .. }
            | SubmissionError::TooFast { .. }
            | SubmissionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubmissionError::Action(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Never includes action failure causes.
    pub fn public_message(&self) -> String {
        self.to_string()
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::MethodNotAllowed => "method_not_allowed",
            SubmissionError::BodyTooLarge => "body_too_large",
            SubmissionError::UnreadableBody => "unreadable_body",
            SubmissionError::MalformedBody(_) => "malformed_body",
            SubmissionError::UnknownForm { .. } => "unknown_form",
            SubmissionError::TooFast { .. } => "too_fast",
            SubmissionError::Validation(_) => "validation",
            SubmissionError::Action(_) => "action_failed",
        }
    }
}

fn unknown_form_message(requested: Option<&str>, known: &str) -> String {
    match requested {
        Some(id) => format!("Unknown form_id '{}'. Valid forms: {}", id, known),
        None => format!("Missing form_id. Valid forms: {}", known),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            SubmissionError::MethodNotAllowed.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            SubmissionError::BodyTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            SubmissionError::UnreadableBody.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SubmissionError::Validation(vec![]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SubmissionError::TooFast { elapsed_ms: 10 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SubmissionError::Action(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unknown_form_messages() {
        let err = SubmissionError::UnknownForm {
            requested: Some("bogus".to_string()),
            known: "contact, newsletter".to_string(),
        };
        assert_eq!(
            err.public_message(),
            "Unknown form_id 'bogus'. Valid forms: contact, newsletter"
        );

        let err = SubmissionError::UnknownForm {
            requested: None,
            known: "contact".to_string(),
        };
        assert_eq!(err.public_message(), "Missing form_id. Valid forms: contact");
    }

    #[test]
    fn test_validation_joins_messages() {
        let err = SubmissionError::Validation(vec![
            "Missing required field: name".to_string(),
            "email: Invalid email format".to_string(),
        ]);
        assert_eq!(
            err.public_message(),
            "Missing required field: name, email: Invalid email format"
        );
    }

    #[test]
    fn test_action_message_hides_cause() {
        let err = SubmissionError::Action(anyhow::anyhow!("password=hunter2"));
        assert!(!err.public_message().contains("hunter2"));
    }
}
