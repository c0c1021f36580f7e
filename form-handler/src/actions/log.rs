//! Action that only records the submission in the logs.

use anyhow::Result;
use futures::future::{self, BoxFuture};
use tracing::info;

use super::SubmissionAction;
use crate::forms::SanitizedSubmission;

/// Logs field names (not values) of each submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAction;

impl SubmissionAction for LogAction {
    fn name(&self) -> &'static str {
        "log"
    }

    fn run(&self, submission: SanitizedSubmission) -> BoxFuture<'_, Result<()>> {
        info!(
            form_id = %submission.form_id(),
            submitted_at = %submission.submitted_at(),
            fields = ?submission.field_names(),
            "submission_logged"
        );
        Box::pin(future::ready(Ok(())))
    }
}
