//! Step tracer: one logical phase within a run

use popmetrics_common::time::{duration_ms, now};
use popmetrics_common::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{error_fields, merge_close_result, Provenance};
use crate::db::lineage;
use crate::error::TracedError;
use crate::models::{RunStatus, StepRecord};

/// Open step handle with per-item success/error counters
///
/// Per-item failures are the caller's to catch and tally; the step only
/// fails when an error escapes its own scope.
pub struct StepTracer {
    db: SqlitePool,
    record: StepRecord,
    success_count: i64,
    error_count: i64,
    closed: bool,
}

impl StepTracer {
    /// Create the step row with status `in_progress` and no tally
    pub async fn open(
        provenance: &Provenance,
        run_id: &str,
        step_name: impl Into<String>,
        inputs: Vec<String>,
        outputs: Vec<String>,
    ) -> Result<Self> {
        let record = StepRecord {
            step_run_id: provenance.next_id(),
            run_id: run_id.to_string(),
            step_name: step_name.into(),
            started_at: now(),
            ended_at: None,
            duration_ms: None,
            success_count: None,
            error_count: None,
            status: RunStatus::InProgress,
            inputs,
            outputs,
            error_type: None,
            error_message: None,
        };

        lineage::upsert_step(provenance.db(), &record).await?;

        info!(
            run_id = %record.run_id,
            step_run_id = %record.step_run_id,
            step = %record.step_name,
            "Step started"
        );

        Ok(Self {
            db: provenance.db().clone(),
            record,
            success_count: 0,
            error_count: 0,
            closed: false,
        })
    }

    pub fn step_run_id(&self) -> &str {
        &self.record.step_run_id
    }

    pub fn run_id(&self) -> &str {
        &self.record.run_id
    }

    pub fn step_name(&self) -> &str {
        &self.record.step_name
    }

    /// One item processed successfully
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    /// One item failed and was skipped
    pub fn record_error(&mut self) {
        self.error_count += 1;
    }

    pub fn success_count(&self) -> i64 {
        self.success_count
    }

    pub fn error_count(&self) -> i64 {
        self.error_count
    }

    /// Finalize the step and return the outcome unchanged
    ///
    /// Counters that were never touched are persisted as unknown (NULL),
    /// not zero. Both counts are written together or not at all.
    pub async fn close<T, E>(mut self, outcome: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: TracedError + From<popmetrics_common::Error>,
    {
        self.closed = true;

        let (success_count, error_count) = if self.success_count == 0 && self.error_count == 0 {
            (None, None)
        } else {
            (Some(self.success_count), Some(self.error_count))
        };

        let ended_at = now().max(self.record.started_at);
        let (error_type, error_message) = error_fields(&outcome);
        let record = StepRecord {
            ended_at: Some(ended_at),
            duration_ms: Some(duration_ms(&self.record.started_at, &ended_at)),
            success_count,
            error_count,
            status: if outcome.is_ok() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            },
            error_type,
            error_message,
            ..self.record.clone()
        };

        info!(
            run_id = %record.run_id,
            step_run_id = %record.step_run_id,
            step = %record.step_name,
            status = %record.status,
            success_count = ?record.success_count,
            error_count = ?record.error_count,
            "Step finished"
        );

        let write = lineage::upsert_step(&self.db, &record).await;
        merge_close_result("step", &record.step_run_id, outcome, write)
    }
}

impl Drop for StepTracer {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                step_run_id = %self.record.step_run_id,
                step = %self.record.step_name,
                "Step tracer dropped without close; step stays in_progress"
            );
        }
    }
}
