//! Webhook action with HMAC-SHA256 request signing.
//!
//! Each accepted submission is POSTed as JSON to the configured URL. When a
//! signing key is set, two headers let the receiver authenticate the call:
//! - `X-Form-Timestamp`: Unix epoch seconds when the request was signed
//! - `X-Form-Signature`: hex HMAC-SHA256 of timestamp + raw body
//!
//! Receivers can use [`verify_webhook_signature`] to check them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use futures::future::BoxFuture;
use hmac::{Hmac, Mac};
use reqwest::{header::CONTENT_TYPE, Client};
use sha2::Sha256;
use tracing::{info, warn};
use url::Url;

use super::SubmissionAction;
use crate::forms::SanitizedSubmission;

type HmacSha256 = Hmac<Sha256>;

pub const TIMESTAMP_HEADER: &str = "X-Form-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Form-Signature";

/// Compute the hex HMAC-SHA256 of `timestamp` followed by `body`.
pub fn sign_payload(signing_key: &str, timestamp: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .context("Invalid webhook signing key")?;
    mac.update(timestamp.as_bytes());
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signed webhook request.
///
/// # Arguments
///
/// * `signing_key` - Shared webhook signing key
/// * `timestamp` - The `X-Form-Timestamp` header value
/// * `body` - The raw request body
/// * `signature` - The `X-Form-Signature` header value
/// * `max_age_seconds` - Maximum allowed age of the timestamp (prevents replay attacks)
///
/// # Returns
///
/// `true` if the signature is valid and not stale, `false` otherwise.
pub fn verify_webhook_signature(
    signing_key: &str,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    max_age_seconds: u64,
) -> bool {
    if signing_key.is_empty() || timestamp.is_empty() || signature.is_empty() {
        warn!(
            has_signing_key = !signing_key.is_empty(),
            has_timestamp = !timestamp.is_empty(),
            has_signature = !signature.is_empty(),
            "webhook_signature_missing_fields"
        );
        return false;
    }

    let signed_at: u64 = match timestamp.parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "webhook_signature_invalid_timestamp");
            return false;
        }
    };

    let age = unix_seconds().abs_diff(signed_at);
    if age > max_age_seconds {
        warn!(
            signed_at = signed_at,
            age_seconds = age,
            max_age_seconds = max_age_seconds,
            "webhook_signature_stale"
        );
        return false;
    }

    let expected = match sign_payload(signing_key, timestamp, body) {
        Ok(sig) => sig,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    let valid = constant_time_compare(&expected, signature);
    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// POSTs submissions to a webhook endpoint.
pub struct WebhookAction {
    client: Client,
    url: Url,
    signing_key: Option<String>,
}

impl WebhookAction {
    pub fn new(url: &str, signing_key: Option<String>, timeout_ms: u64) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid webhook URL: {}", url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Webhook URL must be http or https, got '{}'", url.scheme());
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            signing_key: signing_key.filter(|k| !k.trim().is_empty()),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn deliver(&self, submission: SanitizedSubmission) -> Result<()> {
        let body = serde_json::to_vec(&submission).context("Failed to serialize submission")?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json");

        if let Some(key) = &self.signing_key {
            let timestamp = unix_seconds().to_string();
            let signature = sign_payload(key, &timestamp, &body)?;
            request = request
                .header(TIMESTAMP_HEADER, timestamp)
                .header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Webhook returned status {}", status);
        }

        info!(
            form_id = %submission.form_id(),
            host = self.url.host_str().unwrap_or_default(),
            status = status.as_u16(),
            signed = self.signing_key.is_some(),
            "webhook_delivered"
        );

        Ok(())
    }
}

impl SubmissionAction for WebhookAction {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn run(&self, submission: SanitizedSubmission) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.deliver(submission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = "test-signing-key";
        let timestamp = unix_seconds().to_string();
        let body = br#"{"email":"x@y.com","form_id":"newsletter"}"#;

        let signature = sign_payload(key, &timestamp, body).unwrap();

        assert!(verify_webhook_signature(key, &timestamp, body, &signature, 300));
        assert!(!verify_webhook_signature("other-key", &timestamp, body, &signature, 300));
        assert!(!verify_webhook_signature(key, &timestamp, b"{}", &signature, 300));
    }

    #[test]
    fn test_verify_missing_fields() {
        assert!(!verify_webhook_signature("", "123", b"{}", "sig", 300));
        assert!(!verify_webhook_signature("key", "", b"{}", "sig", 300));
        assert!(!verify_webhook_signature("key", "123", b"{}", "", 300));
    }

    #[test]
    fn test_verify_invalid_timestamp() {
        assert!(!verify_webhook_signature("key", "not-a-number", b"{}", "sig", 300));
    }

    #[test]
    fn test_verify_stale() {
        // Year 2000
        let signature = sign_payload("key", "946684800", b"{}").unwrap();
        assert!(!verify_webhook_signature("key", "946684800", b"{}", &signature, 300));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let a = sign_payload("key", "100", b"body").unwrap();
        let b = sign_payload("key", "100", b"body").unwrap();
        let c = sign_payload("key", "101", b"body").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_webhook_action_rejects_bad_urls() {
        assert!(WebhookAction::new("not a url", None, 1000).is_err());
        assert!(WebhookAction::new("ftp://example.com/hook", None, 1000).is_err());
    }

    #[test]
    fn test_webhook_action_blank_key_disables_signing() {
        let action =
            WebhookAction::new("https://example.com/hook", Some("  ".to_string()), 1000).unwrap();
        assert!(action.signing_key.is_none());
        assert_eq!(action.url().as_str(), "https://example.com/hook");
        assert_eq!(action.name(), "webhook");
    }
}
