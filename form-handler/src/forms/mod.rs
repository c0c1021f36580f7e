//! Form definitions and submission types.
//!
//! The set of forms is closed and known at compile time. Each form has a
//! static schema (required and optional fields) and a success action chosen
//! at startup.
//!
//! ## Flow
//!
//! ```text
//! RawSubmission → (validate, sanitize) → SanitizedSubmission → SubmissionAction
//! ```

pub mod registry;
pub mod types;

pub use registry::{FormActions, FormId, FormRegistry, FormSchema, RegisteredForm};
pub use types::{RawSubmission, SanitizedSubmission, FORM_ID_FIELD, SUBMITTED_AT_FIELD};
