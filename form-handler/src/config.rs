//! Configuration module for environment variable parsing.
//!
//! All settings come from environment variables. Anything missing or
//! malformed falls back to a default and logs a warning.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::forms::FormId;

/// Default pattern accepted by the phone validator.
pub const DEFAULT_PHONE_PATTERN: &str = r"^[\d\s\-+()]{7,20}$";

/// Which success action a form dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Log the submission and do nothing else
    Log,
    /// POST the submission to `WEBHOOK_URL`
    Webhook,
    /// Publish the submission to `SUBMISSION_QUEUE`
    Queue,
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(ActionKind::Log),
            "webhook" => Ok(ActionKind::Webhook),
            "queue" => Ok(ActionKind::Queue),
            other => Err(format!("unknown action kind '{}'", other)),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Value of the Access-Control-Allow-Origin response header
    pub cors_allow_origin: String,

    // =========================================================================
    // Anti-spam policy
    // =========================================================================

    /// Minimum time in milliseconds between form render and submission
    pub min_submit_elapsed_ms: u64,

    /// Control field that humans never fill in
    pub honeypot_field: String,

    /// Control field carrying the client render time (epoch millis)
    pub timestamp_field: String,

    // =========================================================================
    // Field validation
    // =========================================================================

    /// Regex the phone validator applies to non-empty values
    pub phone_pattern: String,

    // =========================================================================
    // Success actions
    // =========================================================================

    /// Endpoint the webhook action posts submissions to
    pub webhook_url: Option<String>,

    /// HMAC-SHA256 key used to sign outgoing webhook requests
    pub webhook_signing_key: Option<String>,

    /// HTTP request timeout in milliseconds for the webhook action
    pub webhook_timeout_ms: u64,

    /// RabbitMQ connection URL (CloudAMQP) for the queue action
    pub cloudamqp_url: Option<String>,

    /// Queue the queue action publishes to
    pub submission_queue: String,

    /// Action for the `contact` form
    pub contact_action: ActionKind,

    /// Action for the `newsletter` form
    pub newsletter_action: ActionKind,

    /// Action for the `quote` form
    pub quote_action: ActionKind,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            port: parse_or("PORT", 8080),

            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "*".to_string()),

            min_submit_elapsed_ms: parse_or("MIN_SUBMIT_ELAPSED_MS", 2000),

            honeypot_field: parse_control_field("HONEYPOT_FIELD", "_honeypot"),

            timestamp_field: parse_control_field("TIMESTAMP_FIELD", "_timestamp"),

            phone_pattern: env::var("PHONE_PATTERN")
                .unwrap_or_else(|_| DEFAULT_PHONE_PATTERN.to_string()),

            webhook_url: non_empty("WEBHOOK_URL"),

            webhook_signing_key: non_empty("WEBHOOK_SIGNING_KEY"),

            webhook_timeout_ms: parse_or("WEBHOOK_TIMEOUT_MS", 8000),

            cloudamqp_url: non_empty("CLOUDAMQP_URL"),

            submission_queue: env::var("SUBMISSION_QUEUE")
                .unwrap_or_else(|_| "form_submissions".to_string()),

            contact_action: parse_or("FORM_ACTION_CONTACT", ActionKind::Log),

            newsletter_action: parse_or("FORM_ACTION_NEWSLETTER", ActionKind::Log),

            quote_action: parse_or("FORM_ACTION_QUOTE", ActionKind::Log),
        }
    }

    /// The action configured for a form.
    pub fn action_for(&self, form: FormId) -> ActionKind {
        match form {
            FormId::Contact => self.contact_action,
            FormId::Newsletter => self.newsletter_action,
            FormId::Quote => self.quote_action,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            cors_allow_origin: "*".to_string(),
            min_submit_elapsed_ms: 2000,
            honeypot_field: "_honeypot".to_string(),
            timestamp_field: "_timestamp".to_string(),
            phone_pattern: DEFAULT_PHONE_PATTERN.to_string(),
            webhook_url: None,
            webhook_signing_key: None,
            webhook_timeout_ms: 8000,
            cloudamqp_url: None,
            submission_queue: "form_submissions".to_string(),
            contact_action: ActionKind::Log,
            newsletter_action: ActionKind::Log,
            quote_action: ActionKind::Log,
        }
    }
}

/// Parse an environment variable, warning and falling back on bad input.
fn parse_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

/// Read an optional variable, treating blank values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a control field name. Control fields must start with `_` so the
/// sanitizer strips them before any action sees the submission.
fn parse_control_field(name: &str, default: &str) -> String {
    match non_empty(name) {
        Some(field) if field.starts_with('_') => field,
        Some(field) => {
            warn!(env_var = name, value = %field, "Control field must start with '_', using default");
            default.to_string()
        }
        None => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("TEST_FORMGATE_MS", "1500");
        assert_eq!(parse_or("TEST_FORMGATE_MS", 2000u64), 1500);
        env::remove_var("TEST_FORMGATE_MS");
    }

    #[test]
    fn test_parse_or_invalid_falls_back() {
        env::set_var("TEST_FORMGATE_BAD", "soon");
        assert_eq!(parse_or("TEST_FORMGATE_BAD", 2000u64), 2000);
        env::remove_var("TEST_FORMGATE_BAD");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("NONEXISTENT_FORMGATE_VAR", 42u16), 42);
    }

    #[test]
    fn test_action_kind_from_str() {
        assert_eq!("webhook".parse::<ActionKind>(), Ok(ActionKind::Webhook));
        assert_eq!(" Queue ".parse::<ActionKind>(), Ok(ActionKind::Queue));
        assert_eq!("LOG".parse::<ActionKind>(), Ok(ActionKind::Log));
        assert!("email".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_parse_control_field_requires_prefix() {
        env::set_var("TEST_FORMGATE_HONEYPOT", "website");
        assert_eq!(
            parse_control_field("TEST_FORMGATE_HONEYPOT", "_honeypot"),
            "_honeypot"
        );
        env::set_var("TEST_FORMGATE_HONEYPOT", "_website");
        assert_eq!(
            parse_control_field("TEST_FORMGATE_HONEYPOT", "_honeypot"),
            "_website"
        );
        env::remove_var("TEST_FORMGATE_HONEYPOT");
    }

    #[test]
    fn test_action_for_each_form() {
        let config = Config {
            newsletter_action: ActionKind::Queue,
            ..Config::default()
        };
        assert_eq!(config.action_for(FormId::Contact), ActionKind::Log);
        assert_eq!(config.action_for(FormId::Newsletter), ActionKind::Queue);
        assert_eq!(config.action_for(FormId::Quote), ActionKind::Log);
    }
}
