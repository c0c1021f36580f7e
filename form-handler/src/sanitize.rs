//! Submission sanitizing.
//!
//! Removes control fields, escapes markup characters in every string value,
//! and stamps the result with the resolved form id and server time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::forms::{FormId, RawSubmission, SanitizedSubmission, FORM_ID_FIELD, SUBMITTED_AT_FIELD};

/// Keys starting with this are control fields and never reach an action.
pub const CONTROL_PREFIX: char = '_';

/// Whether `key` names a control field.
pub fn is_control_key(key: &str) -> bool {
    key.starts_with(CONTROL_PREFIX)
}

/// Escape `<`, `>`, `"` and `'`.
///
/// `&` is left alone, so escaping already-escaped text changes nothing.
pub fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Build the sanitized submission for `form` at server time `now`.
pub fn sanitize(submission: RawSubmission, form: FormId, now: DateTime<Utc>) -> SanitizedSubmission {
    let mut fields: Map<String, Value> = submission
        .into_iter()
        .filter(|(key, _)| !is_control_key(key))
        .map(|(key, value)| (key, escape_value(value)))
        .collect();

    // Trusted metadata goes in after escaping and overrides anything the
    // client sent under the same names.
    fields.insert(FORM_ID_FIELD.to_string(), Value::String(form.as_str().to_string()));
    fields.insert(
        SUBMITTED_AT_FIELD.to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    SanitizedSubmission::new(fields)
}

fn escape_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_markup(&s)),
        other => other,
    }
}
