//! Lineage record store: runs, steps and API requests
//!
//! Pure storage. Writes are upsert-by-primary-key; the tracers in
//! `crate::provenance` decide when and what to write.

use popmetrics_common::time::{format_timestamp, parse_timestamp};
use popmetrics_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::parse_optional_timestamp;
use crate::models::{RequestParams, RequestRecord, RunRecord, RunStatus, StepRecord};

// ============================================================================
// Runs
// ============================================================================

/// Insert or replace a run row
pub async fn upsert_run(pool: &SqlitePool, run: &RunRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (
            run_id, run_day, build_version, started_at, ended_at,
            duration_ms, status, error_type, error_message
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(run_id) DO UPDATE SET
            run_day = excluded.run_day,
            build_version = excluded.build_version,
            started_at = excluded.started_at,
            ended_at = excluded.ended_at,
            duration_ms = excluded.duration_ms,
            status = excluded.status,
            error_type = excluded.error_type,
            error_message = excluded.error_message
        "#,
    )
    .bind(&run.run_id)
    .bind(&run.run_day)
    .bind(&run.build_version)
    .bind(format_timestamp(&run.started_at))
    .bind(run.ended_at.as_ref().map(format_timestamp))
    .bind(run.duration_ms)
    .bind(run.status.as_str())
    .bind(&run.error_type)
    .bind(&run.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a run by id
pub async fn load_run(pool: &SqlitePool, run_id: &str) -> Result<Option<RunRecord>> {
    let row = sqlx::query(
        r#"
        SELECT run_id, run_day, build_version, started_at, ended_at,
               duration_ms, status, error_type, error_message
        FROM pipeline_runs
        WHERE run_id = ?
        "#,
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(run_from_row).transpose()
}

/// Runs for a logical day, oldest first
pub async fn list_runs_for_day(pool: &SqlitePool, run_day: &str) -> Result<Vec<RunRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, run_day, build_version, started_at, ended_at,
               duration_ms, status, error_type, error_message
        FROM pipeline_runs
        WHERE run_day = ?
        ORDER BY started_at, run_id
        "#,
    )
    .bind(run_day)
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

/// Runs never finalized (crash or hang signal)
pub async fn list_stalled_runs(pool: &SqlitePool) -> Result<Vec<RunRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, run_day, build_version, started_at, ended_at,
               duration_ms, status, error_type, error_message
        FROM pipeline_runs
        WHERE status = 'in_progress'
        ORDER BY started_at, run_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(run_from_row).collect()
}

fn run_from_row(row: &SqliteRow) -> Result<RunRecord> {
    let status: String = row.try_get("status")?;

    Ok(RunRecord {
        run_id: row.try_get("run_id")?,
        run_day: row.try_get("run_day")?,
        build_version: row.try_get("build_version")?,
        started_at: parse_timestamp(&row.try_get::<String, _>("started_at")?)?,
        ended_at: parse_optional_timestamp(row.try_get("ended_at")?)?,
        duration_ms: row.try_get("duration_ms")?,
        status: status.parse()?,
        error_type: row.try_get("error_type")?,
        error_message: row.try_get("error_message")?,
    })
}

// ============================================================================
// Steps
// ============================================================================

/// Insert or replace a step row
pub async fn upsert_step(pool: &SqlitePool, step: &StepRecord) -> Result<()> {
    let inputs_json = serde_json::to_string(&step.inputs)?;
    let outputs_json = serde_json::to_string(&step.outputs)?;

    sqlx::query(
        r#"
        INSERT INTO run_steps (
            step_run_id, run_id, step_name, started_at, ended_at, duration_ms,
            success_count, error_count, status, inputs_json, outputs_json,
            error_type, error_message
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(step_run_id) DO UPDATE SET
            run_id = excluded.run_id,
            step_name = excluded.step_name,
            started_at = excluded.started_at,
            ended_at = excluded.ended_at,
            duration_ms = excluded.duration_ms,
            success_count = excluded.success_count,
            error_count = excluded.error_count,
            status = excluded.status,
            inputs_json = excluded.inputs_json,
            outputs_json = excluded.outputs_json,
            error_type = excluded.error_type,
            error_message = excluded.error_message
        "#,
    )
    .bind(&step.step_run_id)
    .bind(&step.run_id)
    .bind(&step.step_name)
    .bind(format_timestamp(&step.started_at))
    .bind(step.ended_at.as_ref().map(format_timestamp))
    .bind(step.duration_ms)
    .bind(step.success_count)
    .bind(step.error_count)
    .bind(step.status.as_str())
    .bind(inputs_json)
    .bind(outputs_json)
    .bind(&step.error_type)
    .bind(&step.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a step by id
pub async fn load_step(pool: &SqlitePool, step_run_id: &str) -> Result<Option<StepRecord>> {
    let row = sqlx::query(
        r#"
        SELECT step_run_id, run_id, step_name, started_at, ended_at, duration_ms,
               success_count, error_count, status, inputs_json, outputs_json,
               error_type, error_message
        FROM run_steps
        WHERE step_run_id = ?
        "#,
    )
    .bind(step_run_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(step_from_row).transpose()
}

/// Steps of a run in execution order
pub async fn list_steps(pool: &SqlitePool, run_id: &str) -> Result<Vec<StepRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT step_run_id, run_id, step_name, started_at, ended_at, duration_ms,
               success_count, error_count, status, inputs_json, outputs_json,
               error_type, error_message
        FROM run_steps
        WHERE run_id = ?
        ORDER BY started_at, rowid
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(step_from_row).collect()
}

fn step_from_row(row: &SqliteRow) -> Result<StepRecord> {
    let status: String = row.try_get("status")?;
    let inputs: String = row.try_get("inputs_json")?;
    let outputs: String = row.try_get("outputs_json")?;

    Ok(StepRecord {
        step_run_id: row.try_get("step_run_id")?,
        run_id: row.try_get("run_id")?,
        step_name: row.try_get("step_name")?,
        started_at: parse_timestamp(&row.try_get::<String, _>("started_at")?)?,
        ended_at: parse_optional_timestamp(row.try_get("ended_at")?)?,
        duration_ms: row.try_get("duration_ms")?,
        success_count: row.try_get("success_count")?,
        error_count: row.try_get("error_count")?,
        status: status.parse()?,
        inputs: serde_json::from_str(&inputs)
            .map_err(|e| Error::InvalidInput(format!("Bad inputs_json: {}", e)))?,
        outputs: serde_json::from_str(&outputs)
            .map_err(|e| Error::InvalidInput(format!("Bad outputs_json: {}", e)))?,
        error_type: row.try_get("error_type")?,
        error_message: row.try_get("error_message")?,
    })
}

// ============================================================================
// API requests
// ============================================================================

/// Insert or replace a request row
pub async fn upsert_request(pool: &SqlitePool, request: &RequestRecord) -> Result<()> {
    let params_json = request
        .request_params
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO api_requests (
            request_id, run_id, step_run_id, source, local_artist_id, platform_id,
            endpoint, request_params_json, requested_at, finished_at, duration_ms,
            http_status, ok, error_type, error_message
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(request_id) DO UPDATE SET
            run_id = excluded.run_id,
            step_run_id = excluded.step_run_id,
            source = excluded.source,
            local_artist_id = excluded.local_artist_id,
            platform_id = excluded.platform_id,
            endpoint = excluded.endpoint,
            request_params_json = excluded.request_params_json,
            requested_at = excluded.requested_at,
            finished_at = excluded.finished_at,
            duration_ms = excluded.duration_ms,
            http_status = excluded.http_status,
            ok = excluded.ok,
            error_type = excluded.error_type,
            error_message = excluded.error_message
        "#,
    )
    .bind(&request.request_id)
    .bind(&request.run_id)
    .bind(&request.step_run_id)
    .bind(request.source.as_str())
    .bind(&request.local_artist_id)
    .bind(&request.platform_id)
    .bind(&request.endpoint)
    .bind(params_json)
    .bind(format_timestamp(&request.requested_at))
    .bind(format_timestamp(&request.finished_at))
    .bind(request.duration_ms)
    .bind(request.http_status.map(i64::from))
    .bind(request.ok)
    .bind(&request.error_type)
    .bind(&request.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load a request by id
pub async fn load_request(pool: &SqlitePool, request_id: &str) -> Result<Option<RequestRecord>> {
    let row = sqlx::query(&format!("{} WHERE request_id = ?", SELECT_REQUESTS))
        .bind(request_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(request_from_row).transpose()
}

/// All requests of a run, in issue order
pub async fn list_requests_for_run(pool: &SqlitePool, run_id: &str) -> Result<Vec<RequestRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE run_id = ? ORDER BY requested_at, rowid",
        SELECT_REQUESTS
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

/// All requests of a step, in issue order
pub async fn list_requests_for_step(
    pool: &SqlitePool,
    step_run_id: &str,
) -> Result<Vec<RequestRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE step_run_id = ? ORDER BY requested_at, rowid",
        SELECT_REQUESTS
    ))
    .bind(step_run_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

/// Failed requests of a run (answers "which entity/request failed")
pub async fn list_failed_requests(pool: &SqlitePool, run_id: &str) -> Result<Vec<RequestRecord>> {
    let rows = sqlx::query(&format!(
        "{} WHERE run_id = ? AND ok = 0 ORDER BY requested_at, rowid",
        SELECT_REQUESTS
    ))
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(request_from_row).collect()
}

const SELECT_REQUESTS: &str = r#"
    SELECT request_id, run_id, step_run_id, source, local_artist_id, platform_id,
           endpoint, request_params_json, requested_at, finished_at, duration_ms,
           http_status, ok, error_type, error_message
    FROM api_requests
"#;

fn request_from_row(row: &SqliteRow) -> Result<RequestRecord> {
    let source: String = row.try_get("source")?;
    let params_json: Option<String> = row.try_get("request_params_json")?;
    let request_params = params_json
        .map(|s| serde_json::from_str::<RequestParams>(&s))
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("Bad request_params_json: {}", e)))?;
    let http_status = row
        .try_get::<Option<i64>, _>("http_status")?
        .map(u16::try_from)
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("Bad http_status: {}", e)))?;

    Ok(RequestRecord {
        request_id: row.try_get("request_id")?,
        run_id: row.try_get("run_id")?,
        step_run_id: row.try_get("step_run_id")?,
        source: source.parse()?,
        local_artist_id: row.try_get("local_artist_id")?,
        platform_id: row.try_get("platform_id")?,
        endpoint: row.try_get("endpoint")?,
        request_params,
        requested_at: parse_timestamp(&row.try_get::<String, _>("requested_at")?)?,
        finished_at: parse_timestamp(&row.try_get::<String, _>("finished_at")?)?,
        duration_ms: row.try_get("duration_ms")?,
        http_status,
        ok: row.try_get("ok")?,
        error_type: row.try_get("error_type")?,
        error_message: row.try_get("error_message")?,
    })
}
