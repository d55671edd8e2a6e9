//! Run tracer: one end-to-end execution

use popmetrics_common::time::{duration_ms, now};
use popmetrics_common::Result;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::{error_fields, merge_close_result, Provenance};
use crate::db::lineage;
use crate::error::TracedError;
use crate::models::{RunRecord, RunStatus};

/// Open run handle
///
/// Exactly two writes per run: `in_progress` at open, final status at close.
/// Several runs may exist for the same logical day; each gets a fresh id.
pub struct RunTracer {
    db: SqlitePool,
    record: RunRecord,
    closed: bool,
}

impl RunTracer {
    /// Create the run row with status `in_progress`
    pub async fn open(provenance: &Provenance, run_day: impl Into<String>) -> Result<Self> {
        let record = RunRecord {
            run_id: provenance.next_id(),
            run_day: run_day.into(),
            build_version: provenance.build_version().to_string(),
            started_at: now(),
            ended_at: None,
            duration_ms: None,
            status: RunStatus::InProgress,
            error_type: None,
            error_message: None,
        };

        lineage::upsert_run(provenance.db(), &record).await?;

        info!(
            run_id = %record.run_id,
            run_day = %record.run_day,
            build_version = %record.build_version,
            "Run started"
        );

        Ok(Self {
            db: provenance.db().clone(),
            record,
            closed: false,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn run_day(&self) -> &str {
        &self.record.run_day
    }

    /// Finalize the run from the outcome of its work and return that outcome
    ///
    /// `Ok` marks the run completed, `Err` marks it failed with the error
    /// kind and truncated message. The error is always handed back.
    pub async fn close<T, E>(mut self, outcome: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: TracedError + From<popmetrics_common::Error>,
    {
        self.closed = true;

        let ended_at = now().max(self.record.started_at);
        let (error_type, error_message) = error_fields(&outcome);
        let record = RunRecord {
            ended_at: Some(ended_at),
            duration_ms: Some(duration_ms(&self.record.started_at, &ended_at)),
            status: if outcome.is_ok() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            },
            error_type,
            error_message,
            ..self.record.clone()
        };

        match record.status {
            RunStatus::Completed => info!(
                run_id = %record.run_id,
                duration_ms = record.duration_ms.unwrap_or_default(),
                "Run completed"
            ),
            _ => error!(
                run_id = %record.run_id,
                error_type = record.error_type.as_deref().unwrap_or_default(),
                error = record.error_message.as_deref().unwrap_or_default(),
                "Run failed"
            ),
        }

        let write = lineage::upsert_run(&self.db, &record).await;
        merge_close_result("run", &record.run_id, outcome, write)
    }
}

impl Drop for RunTracer {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                run_id = %self.record.run_id,
                "Run tracer dropped without close; run stays in_progress"
            );
        }
    }
}
