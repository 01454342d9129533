use anyhow::{Context, Result};
use prequal_core::record::MissingRequiredFields;
use tracing::{info, warn};

use crate::session::Session;
use crate::sink::{Submission, SubmissionReceipt};
use crate::App;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(SubmissionReceipt),
    /// Nothing was handed to the sink.
    Blocked(MissingRequiredFields),
}

impl<'a> App<'a> {
    pub fn submit(&self, session: &Session) -> Result<SubmitOutcome> {
        if let Err(missing) = session.validate() {
            warn!(fields = ?missing.fields, "submission blocked by missing required fields");
            return Ok(SubmitOutcome::Blocked(missing));
        }

        let submitted_at =
            prequal_core::time::now_utc_rfc3339().context("failed to format submission time")?;
        let submission = Submission {
            submitted_at,
            branch: session.controller().branch().map(ToString::to_string),
            record: session.record(),
        };

        let receipt = self
            .sink
            .submit(&submission)
            .context("failed to hand off submission")?;
        info!(
            branch = submission.branch.as_deref(),
            fields = submission.record.len(),
            "submission handed off"
        );

        Ok(SubmitOutcome::Submitted(receipt))
    }
}
