//! Request tracer: one outbound call attempt for one artist

use chrono::{DateTime, Utc};
use popmetrics_common::time::{duration_ms, now};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::{error_fields, merge_close_result, Provenance};
use crate::db::lineage;
use crate::error::TracedError;
use crate::models::{Platform, RequestParams, RequestRecord};
use crate::sources::CallRecorder;

/// Open request handle
///
/// Nothing is written until `close`, which persists one immutable row.
/// Clients fill in endpoint, parameters and HTTP status through
/// [`CallRecorder`] while the call runs.
pub struct RequestTracer {
    db: SqlitePool,
    request_id: String,
    run_id: String,
    step_run_id: Option<String>,
    source: Platform,
    local_artist_id: String,
    platform_id: String,
    endpoint: Option<String>,
    request_params: Option<RequestParams>,
    http_status: Option<u16>,
    requested_at: DateTime<Utc>,
    closed: bool,
}

impl RequestTracer {
    /// Start timing one call; `step_run_id` is `None` outside the daily steps
    pub fn open(
        provenance: &Provenance,
        run_id: &str,
        step_run_id: Option<&str>,
        source: Platform,
        local_artist_id: &str,
        platform_id: &str,
    ) -> Self {
        Self {
            db: provenance.db().clone(),
            request_id: provenance.next_id(),
            run_id: run_id.to_string(),
            step_run_id: step_run_id.map(str::to_string),
            source,
            local_artist_id: local_artist_id.to_string(),
            platform_id: platform_id.to_string(),
            endpoint: None,
            request_params: None,
            http_status: None,
            requested_at: now(),
            closed: false,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn source(&self) -> Platform {
        self.source
    }

    /// Persist the attempt and return its outcome unchanged
    ///
    /// `ok` is true exactly when the outcome is `Ok`. Missing endpoint or
    /// status only produce a warning; the row is still written.
    pub async fn close<T, E>(mut self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: TracedError + From<popmetrics_common::Error>,
    {
        self.closed = true;

        if self.endpoint.is_none() || self.http_status.is_none() {
            warn!(
                request_id = %self.request_id,
                source = %self.source,
                local_artist_id = %self.local_artist_id,
                has_endpoint = self.endpoint.is_some(),
                has_status = self.http_status.is_some(),
                "Request closed without endpoint or HTTP status"
            );
        }

        let finished_at = now().max(self.requested_at);
        let (error_type, error_message) = error_fields(&outcome);
        let record = RequestRecord {
            request_id: self.request_id.clone(),
            run_id: self.run_id.clone(),
            step_run_id: self.step_run_id.clone(),
            source: self.source,
            local_artist_id: self.local_artist_id.clone(),
            platform_id: self.platform_id.clone(),
            endpoint: self.endpoint.take(),
            request_params: self.request_params.take(),
            requested_at: self.requested_at,
            finished_at,
            duration_ms: duration_ms(&self.requested_at, &finished_at),
            http_status: self.http_status,
            ok: outcome.is_ok(),
            error_type,
            error_message,
        };

        debug!(
            request_id = %record.request_id,
            source = %record.source,
            local_artist_id = %record.local_artist_id,
            endpoint = record.endpoint.as_deref().unwrap_or_default(),
            http_status = ?record.http_status,
            ok = record.ok,
            duration_ms = record.duration_ms,
            "Request finished"
        );

        let write = lineage::upsert_request(&self.db, &record).await;
        merge_close_result("request", &record.request_id, outcome, write)
    }
}

impl CallRecorder for RequestTracer {
    fn set_endpoint(&mut self, endpoint: &str) {
        self.endpoint = Some(endpoint.to_string());
    }

    fn set_params(&mut self, params: RequestParams) {
        self.request_params = Some(params);
    }

    fn set_http_status(&mut self, status: u16) {
        self.http_status = Some(status);
    }
}

impl Drop for RequestTracer {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                request_id = %self.request_id,
                source = %self.source,
                "Request tracer dropped without close; attempt not recorded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{JobError, SourceError};
    use crate::provenance::RunTracer;
    use popmetrics_common::SequentialIds;
    use std::sync::Arc;

    async fn provenance() -> Provenance {
        let pool = crate::db::init_in_memory_pool().await.unwrap();
        Provenance::new(pool, Arc::new(SequentialIds::new("id")), "test-build")
    }

    #[tokio::test]
    async fn test_failed_call_is_persisted_with_status() {
        let prov = provenance().await;
        let run = RunTracer::open(&prov, "2025-06-01").await.unwrap();

        let mut req = RequestTracer::open(&prov, run.run_id(), None, Platform::Youtube, "artist_x", "UC1");
        req.set_endpoint("youtube.channels.list");
        req.set_http_status(404);
        let request_id = req.request_id().to_string();

        let outcome: Result<(), JobError> = req
            .close(Err(JobError::Source(SourceError::NotFound("UC1".into()))))
            .await;
        assert!(outcome.is_err());

        let row = lineage::load_request(prov.db(), &request_id).await.unwrap().unwrap();
        assert!(!row.ok);
        assert_eq!(row.http_status, Some(404));
        assert_eq!(row.error_type.as_deref(), Some("not_found"));
        assert_eq!(row.step_run_id, None);
        assert!(row.finished_at >= row.requested_at);

        run.close::<(), JobError>(Ok(())).await.unwrap();
    }
}
