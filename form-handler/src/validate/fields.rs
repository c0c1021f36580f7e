//! Per-field format validators.
//!
//! Validators are keyed by field name. A field without a validator is always
//! valid; the required-field check handles absence separately.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// A pure check on a single field value.
pub trait FieldValidator: Send + Sync {
    /// `Ok(())` if the value is acceptable, `Err(reason)` otherwise.
    fn validate(&self, value: &str) -> Result<(), String>;
}

/// Accepts `local@domain.tld` shaped addresses.
pub struct EmailValidator {
    pattern: Regex,
}

impl EmailValidator {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(EMAIL_PATTERN).context("Invalid email pattern")?;
        Ok(Self { pattern })
    }
}

impl FieldValidator for EmailValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        if self.pattern.is_match(value) {
            Ok(())
        } else {
            Err("Invalid email format".to_string())
        }
    }
}

/// Accepts phone numbers matching a configurable pattern.
///
/// Empty values pass: whether the field is needed at all is up to the
/// required-field check.
pub struct PhoneValidator {
    pattern: Regex,
}

impl PhoneValidator {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .with_context(|| format!("Invalid phone pattern: {}", pattern))?;
        Ok(Self { pattern })
    }
}

impl FieldValidator for PhoneValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() || self.pattern.is_match(value) {
            Ok(())
        } else {
            Err("Invalid phone format".to_string())
        }
    }
}

/// Table of validators keyed by field name.
#[derive(Clone, Default)]
pub struct FieldValidators {
    validators: HashMap<String, Arc<dyn FieldValidator>>,
}

impl FieldValidators {
    /// An empty table: every field is valid.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table: `email` and `phone`.
    pub fn standard(phone_pattern: &str) -> Result<Self> {
        let mut validators = Self::empty();
        validators.register("email", EmailValidator::new()?);
        validators.register("phone", PhoneValidator::new(phone_pattern)?);
        Ok(validators)
    }

    /// Add or replace the validator for a field.
    pub fn register(&mut self, field: impl Into<String>, validator: impl FieldValidator + 'static) {
        self.validators.insert(field.into(), Arc::new(validator));
    }

    /// Check a value against the validator registered for `field`, if any.
    pub fn validate(&self, field: &str, value: &str) -> Result<(), String> {
        match self.validators.get(field) {
            Some(validator) => validator.validate(value),
            None => Ok(()),
        }
    }

    /// Whether a validator is registered for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.validators.contains_key(field)
    }
}

impl std::fmt::Debug for FieldValidators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<&String> = self.validators.keys().collect();
        fields.sort();
        f.debug_struct("FieldValidators").field("fields", &fields).finish()
    }
}
