//! Provenance tracking: nested run / step / request lineage
//!
//! Each tracer is an explicit acquire/release handle:
//! - `open` writes the initial row (runs and steps) or starts the clock
//!   (requests) and returns the handle.
//! - `close(outcome)` consumes the handle, writes the final row exactly once
//!   and hands the outcome back untouched, so a failure recorded for lineage
//!   still propagates to the caller.
//!
//! A handle dropped without `close` logs a warning; its row stays
//! `in_progress`, which is the queryable signal of where a run stalled.

mod request;
mod run;
mod step;

pub use request::RequestTracer;
pub use run::RunTracer;
pub use step::StepTracer;

use popmetrics_common::{IdGenerator, UuidIds};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::error::TracedError;

/// Upper bound on persisted error messages (characters)
pub const MAX_ERROR_MESSAGE_LEN: usize = 1000;

/// Shared handles every tracer needs: the store, an id source and the
/// build identifier recorded on runs
#[derive(Clone)]
pub struct Provenance {
    db: SqlitePool,
    ids: Arc<dyn IdGenerator>,
    build_version: String,
}

impl Provenance {
    pub fn new(db: SqlitePool, ids: Arc<dyn IdGenerator>, build_version: impl Into<String>) -> Self {
        Self {
            db,
            ids,
            build_version: build_version.into(),
        }
    }

    /// Production setup with random UUID ids
    pub fn with_uuid_ids(db: SqlitePool, build_version: impl Into<String>) -> Self {
        Self::new(db, Arc::new(UuidIds), build_version)
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    pub fn build_version(&self) -> &str {
        &self.build_version
    }

    pub(crate) fn next_id(&self) -> String {
        self.ids.next_id()
    }
}

/// Error kind and bounded message for a failed outcome
pub(crate) fn error_fields<T, E: TracedError>(outcome: &Result<T, E>) -> (Option<String>, Option<String>) {
    match outcome {
        Ok(_) => (None, None),
        Err(e) => (
            Some(e.kind().to_string()),
            Some(truncate_message(&e.to_string())),
        ),
    }
}

/// Truncate to [`MAX_ERROR_MESSAGE_LEN`] characters on a char boundary
pub(crate) fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_LEN) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

/// Hand back the caller's outcome after the closing write
///
/// A failed closing write surfaces as the error when the work itself
/// succeeded. When the work already failed, the original error wins and the
/// storage failure is logged; both end the job.
pub(crate) fn merge_close_result<T, E>(
    scope: &str,
    id: &str,
    outcome: Result<T, E>,
    write: popmetrics_common::Result<()>,
) -> Result<T, E>
where
    E: From<popmetrics_common::Error>,
{
    match (outcome, write) {
        (outcome, Ok(())) => outcome,
        (Ok(_), Err(storage)) => Err(E::from(storage)),
        (Err(original), Err(storage)) => {
            tracing::error!(
                scope,
                id,
                error = %storage,
                "Failed to persist closing lineage row after failure"
            );
            Err(original)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;

    #[test]
    fn test_truncate_message_bounds_length() {
        let long = "é".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let truncated = truncate_message(&long);
        assert_eq!(truncated.chars().count(), MAX_ERROR_MESSAGE_LEN);

        assert_eq!(truncate_message("short"), "short");
    }

    fn write_failed() -> popmetrics_common::Result<()> {
        Err(popmetrics_common::Error::Internal("disk full".into()))
    }

    #[test]
    fn test_failed_close_write_after_success_surfaces_storage_error() {
        let merged = merge_close_result::<_, JobError>("run", "run-1", Ok(5), write_failed());
        assert!(matches!(merged, Err(JobError::Storage(_))));

        let merged = merge_close_result::<_, JobError>("run", "run-1", Ok(5), Ok(()));
        assert_eq!(merged.unwrap(), 5);
    }

    #[test]
    fn test_failed_close_write_after_failure_keeps_original_error() {
        let outcome: Result<(), JobError> = Err(JobError::Setup("no client".into()));
        let merged = merge_close_result("step", "step-1", outcome, write_failed());
        assert!(matches!(merged, Err(JobError::Setup(_))));
    }
}
