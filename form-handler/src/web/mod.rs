//! HTTP binding for the submission pipeline.
//!
//! The web layer only turns requests into `(method, body)` pairs for the
//! dispatcher and turns its `FormResponse` back into HTTP. All decisions are
//! made in [`crate::dispatch`].

pub mod handlers;

pub use handlers::{health, router, submit, AppState, HealthResponse};
