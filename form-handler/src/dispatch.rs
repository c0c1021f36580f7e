//! The submission pipeline.
//!
//! Every request goes through the same fixed sequence, and any step can end
//! it with a response:
//!
//! ```text
//! MethodCheck → BodyParse → FormResolve → AntiSpam → FieldValidate
//!     → Sanitize → SuccessAction → Respond
//! ```
//!
//! The dispatcher holds only immutable tables built at startup, so one
//! instance is shared by all requests without locking.

use std::panic::AssertUnwindSafe;

use anyhow::{anyhow, Result};
use axum::http::Method;
use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::actions::build_actions;
use crate::config::Config;
use crate::error::SubmissionError;
use crate::forms::{FormId, FormRegistry, RawSubmission, RegisteredForm, FORM_ID_FIELD};
use crate::response::{CorsHeaders, FormResponse};
use crate::sanitize::sanitize;
use crate::spam::{SpamFilter, SpamPolicy, SpamVerdict};
use crate::validate::{validate_submission, FieldValidators};

/// How an accepted request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Validated, sanitized and handed to the form's action
    Accepted(FormId),
    /// Honeypot hit. The client gets the same response as `Accepted`, but the
    /// action never runs.
    Suppressed(FormId),
}

impl Outcome {
    pub fn form(self) -> FormId {
        match self {
            Outcome::Accepted(form) | Outcome::Suppressed(form) => form,
        }
    }
}

/// Runs submissions through the pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    registry: FormRegistry,
    validators: FieldValidators,
    spam: SpamFilter,
    cors: CorsHeaders,
}

impl Dispatcher {
    pub fn new(
        registry: FormRegistry,
        validators: FieldValidators,
        spam: SpamFilter,
        cors: CorsHeaders,
    ) -> Self {
        Self {
            registry,
            validators,
            spam,
            cors,
        }
    }

    /// Build the dispatcher and all configured actions.
    pub fn from_config(config: &Config) -> Result<Self> {
        let actions = build_actions(config)?;
        let validators = FieldValidators::standard(&config.phone_pattern)?;

        Ok(Self::new(
            FormRegistry::new(actions),
            validators,
            SpamFilter::new(SpamPolicy::from(config)),
            CorsHeaders::new(config.cors_allow_origin.clone()),
        ))
    }

    pub fn registry(&self) -> &FormRegistry {
        &self.registry
    }

    /// Handle one request and produce its response.
    pub async fn handle(&self, method: &Method, body: &[u8]) -> FormResponse {
        if *method == Method::OPTIONS {
            return FormResponse::preflight(&self.cors);
        }

        match self.process(method, body).await {
            Ok(outcome) => FormResponse::success(outcome.form().as_str(), &self.cors),
            Err(e) => self.reject(e),
        }
    }

    /// Log a failed request and build its error response.
    pub fn reject(&self, e: SubmissionError) -> FormResponse {
        match &e {
            SubmissionError::Action(cause) => {
                let detail = format!("{:#}", cause);
                error!(error = %detail, "submission_action_failed");
            }
            other => warn!(
                kind = other.kind(),
                error = %other,
                "submission_rejected"
            ),
        }
        FormResponse::error(e.status(), e.public_message(), &self.cors)
    }

    /// Method check and body parse, then [`Dispatcher::submit`].
    pub async fn process(&self, method: &Method, body: &[u8]) -> Result<Outcome, SubmissionError> {
        if *method != Method::POST {
            return Err(SubmissionError::MethodNotAllowed);
        }

        let submission = parse_body(body)?;
        self.submit(submission).await
    }

    /// Run a parsed submission from form resolution through the action.
    pub async fn submit(&self, submission: RawSubmission) -> Result<Outcome, SubmissionError> {
        let form = self.resolve(&submission)?;
        let form_id = form.schema.id;
        let now = Utc::now();

        info!(
            form_id = %form_id,
            field_count = submission.len(),
            "submission_received"
        );

        match self.spam.check(&submission, now.timestamp_millis()) {
            SpamVerdict::Clean => {}
            SpamVerdict::Honeypot => {
                warn!(form_id = %form_id, "submission_honeypot_triggered");
                return Ok(Outcome::Suppressed(form_id));
            }
            SpamVerdict::TooFast { elapsed_ms } => {
                warn!(
                    form_id = %form_id,
                    elapsed_ms = elapsed_ms,
                    min_elapsed_ms = self.spam.policy().min_elapsed_ms,
                    "submission_too_fast"
                );
                return Err(SubmissionError::TooFast { elapsed_ms });
            }
        }

        let errors = validate_submission(&submission, form.schema, &self.validators);
        if !errors.is_empty() {
            return Err(SubmissionError::Validation(errors));
        }

        let sanitized = sanitize(submission, form_id, now);

        // `run` itself may panic before handing back a future
        let result = AssertUnwindSafe(async { form.action.run(sanitized).await })
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                info!(form_id = %form_id, action = form.action.name(), "submission_accepted");
                Ok(Outcome::Accepted(form_id))
            }
            Ok(Err(e)) => Err(SubmissionError::Action(
                e.context(format!("{} action failed for form '{}'", form.action.name(), form_id)),
            )),
            Err(panic) => Err(SubmissionError::Action(anyhow!(
                "{} action panicked for form '{}': {}",
                form.action.name(),
                form_id,
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// Find the form named by the submission's `form_id`.
    fn resolve(&self, submission: &RawSubmission) -> Result<RegisteredForm<'_>, SubmissionError> {
        let requested = match submission.get(FORM_ID_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let form = requested.as_deref().and_then(|id| self.registry.lookup(id));

        form.ok_or_else(|| SubmissionError::UnknownForm {
            requested,
            known: self.registry.known_ids(),
        })
    }
}

/// Parse a request body that must be a JSON object.
fn parse_body(body: &[u8]) -> Result<RawSubmission, SubmissionError> {
    serde_json::from_slice::<RawSubmission>(body).map_err(SubmissionError::MalformedBody)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
