//! Formgate - multi-form submission endpoint.
//!
//! A single endpoint accepts submissions for several forms. Each submission
//! is checked for spam, validated against its form's schema, sanitized, and
//! handed to the success action configured for that form.
//!
//! ## Architecture
//!
//! ```text
//! HTTP → web → Dispatcher → (forms, spam, validate, sanitize) → actions
//!                  ↓
//!              FormResponse
//! ```

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod forms;
pub mod response;
pub mod sanitize;
pub mod spam;
pub mod validate;
pub mod web;

// Re-export commonly used types
pub use actions::{build_actions, SubmissionAction};
pub use config::{ActionKind, Config};
pub use dispatch::{Dispatcher, Outcome};
pub use error::SubmissionError;
pub use forms::{FormActions, FormId, FormRegistry, RawSubmission, SanitizedSubmission};
pub use response::{CorsHeaders, FormResponse, ResponseEnvelope};
pub use web::AppState;
