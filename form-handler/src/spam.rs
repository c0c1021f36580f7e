//! Anti-automation heuristics.
//!
//! Two independent checks run before validation:
//! - Honeypot: a hidden field humans leave empty and form-filling bots don't.
//! - Timestamp: the client records when the form was rendered; anything
//!   submitted faster than a human could type is rejected.
//!
//! The dispatcher answers the two differently. A honeypot hit gets a normal
//! success response so the bot learns nothing. A timestamp hit gets an explicit
//! error, since a fast double-submit from a real person is plausible.

use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::forms::RawSubmission;

/// Field names and thresholds for the spam checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpamPolicy {
    pub honeypot_field: String,
    pub timestamp_field: String,
    /// Submissions faster than this (render to submit) are rejected
    pub min_elapsed_ms: u64,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            honeypot_field: "_honeypot".to_string(),
            timestamp_field: "_timestamp".to_string(),
            min_elapsed_ms: 2000,
        }
    }
}

impl From<&Config> for SpamPolicy {
    fn from(config: &Config) -> Self {
        Self {
            honeypot_field: config.honeypot_field.clone(),
            timestamp_field: config.timestamp_field.clone(),
            min_elapsed_ms: config.min_submit_elapsed_ms,
        }
    }
}

/// Result of running the spam checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Clean,
    /// The honeypot field was filled in
    Honeypot,
    /// Submitted `elapsed_ms` after render, under the policy minimum.
    /// Negative when the client clock is ahead of ours.
    TooFast { elapsed_ms: i64 },
}

/// Applies a `SpamPolicy` to submissions.
#[derive(Debug, Clone, Default)]
pub struct SpamFilter {
    policy: SpamPolicy,
}

impl SpamFilter {
    pub fn new(policy: SpamPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &SpamPolicy {
        &self.policy
    }

    /// Run both checks, honeypot first. `now_ms` is server time in epoch millis.
    pub fn check(&self, submission: &RawSubmission, now_ms: i64) -> SpamVerdict {
        if self.honeypot_filled(submission) {
            return SpamVerdict::Honeypot;
        }

        if let Some(elapsed_ms) = self.elapsed_ms(submission, now_ms) {
            let min_elapsed_ms = i64::try_from(self.policy.min_elapsed_ms).unwrap_or(i64::MAX);
            if elapsed_ms < min_elapsed_ms {
                return SpamVerdict::TooFast { elapsed_ms };
            }
        }

        SpamVerdict::Clean
    }

    /// Whether the honeypot carries any content.
    fn honeypot_filled(&self, submission: &RawSubmission) -> bool {
        match submission.get(&self.policy.honeypot_field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// Milliseconds between client render and `now_ms`, if the client sent a
    /// usable timestamp.
    fn elapsed_ms(&self, submission: &RawSubmission, now_ms: i64) -> Option<i64> {
        let value = submission.get(&self.policy.timestamp_field)?;

        let rendered_at = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        match rendered_at {
            Some(ts) => Some(now_ms.saturating_sub(ts)),
            None => {
                warn!(
                    field = %self.policy.timestamp_field,
                    "spam_timestamp_unparsable"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    fn submission(value: Value) -> RawSubmission {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_clean_without_control_fields() {
        let filter = SpamFilter::default();
        let data = submission(json!({"email": "x@y.com"}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Clean);
    }

    #[test]
    fn test_honeypot_filled() {
        let filter = SpamFilter::default();
        let data = submission(json!({"email": "x@y.com", "_honeypot": "http://spam.example"}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Honeypot);
    }

    #[test]
    fn test_honeypot_empty_or_blank() {
        let filter = SpamFilter::default();
        for value in [json!(""), json!("   "), Value::Null] {
            let data = submission(json!({ "_honeypot": value }));
            assert_eq!(filter.check(&data, NOW), SpamVerdict::Clean);
        }
    }

    #[test]
    fn test_honeypot_non_string_content() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_honeypot": true}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Honeypot);
    }

    #[test]
    fn test_timestamp_too_fast() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_timestamp": NOW - 500}));
        assert_eq!(
            filter.check(&data, NOW),
            SpamVerdict::TooFast { elapsed_ms: 500 }
        );
    }

    #[test]
    fn test_timestamp_exactly_at_threshold_is_clean() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_timestamp": NOW - 2000}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Clean);
    }

    #[test]
    fn test_timestamp_as_string() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_timestamp": (NOW - 100).to_string()}));
        assert_eq!(
            filter.check(&data, NOW),
            SpamVerdict::TooFast { elapsed_ms: 100 }
        );
    }

    #[test]
    fn test_timestamp_in_future_is_too_fast() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_timestamp": NOW + 60_000}));
        assert_eq!(
            filter.check(&data, NOW),
            SpamVerdict::TooFast { elapsed_ms: -60_000 }
        );
    }

    #[test]
    fn test_timestamp_unparsable_is_ignored() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_timestamp": "yesterday"}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Clean);
    }

    #[test]
    fn test_honeypot_checked_before_timestamp() {
        let filter = SpamFilter::default();
        let data = submission(json!({"_honeypot": "x", "_timestamp": NOW}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Honeypot);
    }

    #[test]
    fn test_huge_minimum_saturates() {
        let filter = SpamFilter::new(SpamPolicy {
            min_elapsed_ms: u64::MAX,
            ..SpamPolicy::default()
        });
        let data = submission(json!({"_timestamp": NOW - 3_600_000}));
        assert_eq!(
            filter.check(&data, NOW),
            SpamVerdict::TooFast { elapsed_ms: 3_600_000 }
        );
    }

    #[test]
    fn test_custom_policy() {
        let filter = SpamFilter::new(SpamPolicy {
            honeypot_field: "_website".to_string(),
            timestamp_field: "_rendered".to_string(),
            min_elapsed_ms: 10_000,
        });

        let data = submission(json!({"_honeypot": "ignored", "_rendered": NOW - 5000}));
        assert_eq!(
            filter.check(&data, NOW),
            SpamVerdict::TooFast { elapsed_ms: 5000 }
        );

        let data = submission(json!({"_website": "filled"}));
        assert_eq!(filter.check(&data, NOW), SpamVerdict::Honeypot);
    }
}
