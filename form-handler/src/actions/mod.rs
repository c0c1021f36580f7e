//! Success actions.
//!
//! The dispatcher hands every accepted submission to the action configured
//! for its form. Actions are opaque: whatever they do (call a webhook, publish
//! to a queue, just log), the dispatcher only sees success or failure.
//!
//! ```text
//! SanitizedSubmission → SubmissionAction::run() → Ok | Err
//! ```

pub mod log;
pub mod queue;
pub mod webhook;

use std::sync::Arc;

use anyhow::{bail, Result};
use futures::future::BoxFuture;
use tracing::info;

use crate::config::{ActionKind, Config};
use crate::forms::{FormActions, FormId, SanitizedSubmission};

pub use self::log::LogAction;
pub use queue::{QueueAction, SubmissionPublisher};
pub use webhook::{sign_payload, verify_webhook_signature, WebhookAction};

/// Side effect run for an accepted submission.
pub trait SubmissionAction: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Consume the submission. Errors are logged by the caller and never
    /// shown to the client.
    fn run(&self, submission: SanitizedSubmission) -> BoxFuture<'_, Result<()>>;

    /// Release connections on shutdown.
    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(futures::future::ready(()))
    }
}

/// Build the per-form actions selected in `config`.
///
/// The webhook client and queue publisher are shared between forms that use
/// the same kind of action.
pub fn build_actions(config: &Config) -> Result<FormActions> {
    let uses = |kind: ActionKind| FormId::ALL.iter().any(|&f| config.action_for(f) == kind);

    let log: Arc<dyn SubmissionAction> = Arc::new(LogAction);

    let webhook: Option<Arc<dyn SubmissionAction>> = if uses(ActionKind::Webhook) {
        let Some(url) = config.webhook_url.as_deref() else {
            bail!("A form uses the webhook action but WEBHOOK_URL is not set");
        };
        Some(Arc::new(WebhookAction::new(
            url,
            config.webhook_signing_key.clone(),
            config.webhook_timeout_ms,
        )?))
    } else {
        None
    };

    let queue: Option<Arc<dyn SubmissionAction>> = if uses(ActionKind::Queue) {
        let Some(url) = config.cloudamqp_url.as_deref() else {
            bail!("A form uses the queue action but CLOUDAMQP_URL is not set");
        };
        let publisher = SubmissionPublisher::new(url.to_string(), config.submission_queue.clone());
        Some(Arc::new(QueueAction::new(publisher)))
    } else {
        None
    };

    let resolve = |form: FormId| -> Arc<dyn SubmissionAction> {
        let action = match config.action_for(form) {
            ActionKind::Log => &log,
            ActionKind::Webhook => webhook.as_ref().unwrap_or(&log),
            ActionKind::Queue => queue.as_ref().unwrap_or(&log),
        };
        info!(form_id = %form, action = action.name(), "form_action_configured");
        Arc::clone(action)
    };

    Ok(FormActions {
        contact: resolve(FormId::Contact),
        newsletter: resolve(FormId::Newsletter),
        quote: resolve(FormId::Quote),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_actions_defaults_to_log() {
        let actions = build_actions(&Config::default()).unwrap();
        for form in FormId::ALL {
            assert_eq!(actions.get(form).name(), "log");
        }
    }

    #[test]
    fn test_build_actions_webhook_shared() {
        let config = Config {
            webhook_url: Some("https://hooks.example.com/forms".to_string()),
            contact_action: ActionKind::Webhook,
            quote_action: ActionKind::Webhook,
            ..Config::default()
        };
        let actions = build_actions(&config).unwrap();

        assert_eq!(actions.contact.name(), "webhook");
        assert_eq!(actions.newsletter.name(), "log");
        assert!(Arc::ptr_eq(&actions.contact, &actions.quote));
    }

    #[test]
    fn test_build_actions_webhook_requires_url() {
        let config = Config {
            contact_action: ActionKind::Webhook,
            ..Config::default()
        };
        let err = build_actions(&config).err().unwrap();
        assert!(err.to_string().contains("WEBHOOK_URL"));
    }

    #[test]
    fn test_build_actions_queue_requires_url() {
        let config = Config {
            newsletter_action: ActionKind::Queue,
            ..Config::default()
        };
        let err = build_actions(&config).err().unwrap();
        assert!(err.to_string().contains("CLOUDAMQP_URL"));
    }

    #[test]
    fn test_build_actions_queue() {
        let config = Config {
            cloudamqp_url: Some("amqp://localhost:5672".to_string()),
            newsletter_action: ActionKind::Queue,
            ..Config::default()
        };
        let actions = build_actions(&config).unwrap();
        assert_eq!(actions.newsletter.name(), "queue");
    }
}
