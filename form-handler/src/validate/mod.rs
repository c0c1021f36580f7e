//! Submission validation.
//!
//! - `fields`: named format validators (email, phone, ...)
//! - `required`: the per-form pass that checks presence and runs validators

pub mod fields;
pub mod required;

pub use fields::{EmailValidator, FieldValidator, FieldValidators, PhoneValidator};
pub use required::{validate_required, validate_submission, ValidationResult};
