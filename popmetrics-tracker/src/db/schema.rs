//! Table definitions
//!
//! Idempotent: every statement is `IF NOT EXISTS`, safe on each startup.
//! Timestamps are UTC ISO-8601 text, durations integer milliseconds, list
//! and map values serialized JSON text.

use popmetrics_common::Result;
use sqlx::SqlitePool;

/// Create all tracker tables and indexes
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    create_lineage_tables(pool).await?;
    create_artist_info_table(pool).await?;
    create_snapshot_tables(pool).await?;
    create_artist_day_table(pool).await?;
    create_indexes(pool).await?;

    tracing::debug!("Database schema initialized");
    Ok(())
}

async fn create_lineage_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            run_id TEXT PRIMARY KEY,
            run_day TEXT NOT NULL,
            build_version TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            duration_ms INTEGER,
            status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed', 'failed')),
            error_type TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_steps (
            step_run_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES pipeline_runs(run_id),
            step_name TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            duration_ms INTEGER,
            success_count INTEGER,
            error_count INTEGER,
            status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed', 'failed')),
            inputs_json TEXT NOT NULL DEFAULT '[]',
            outputs_json TEXT NOT NULL DEFAULT '[]',
            error_type TEXT,
            error_message TEXT,
            CHECK ((success_count IS NULL) = (error_count IS NULL))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_requests (
            request_id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES pipeline_runs(run_id),
            step_run_id TEXT REFERENCES run_steps(step_run_id),
            source TEXT NOT NULL,
            local_artist_id TEXT NOT NULL,
            platform_id TEXT NOT NULL,
            endpoint TEXT,
            request_params_json TEXT,
            requested_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            duration_ms INTEGER NOT NULL,
            http_status INTEGER,
            ok INTEGER NOT NULL,
            error_type TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_artist_info_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_info (
            local_artist_id TEXT PRIMARY KEY,
            artist_name TEXT,
            spotify_artist_id TEXT,
            wiki_title TEXT,
            youtube_channel_id TEXT,
            country TEXT,
            debut_year INTEGER,
            genres_json TEXT,
            image_url TEXT,
            spotify_url TEXT,
            wikipedia_url TEXT,
            youtube_channel_url TEXT,
            fetched_at TEXT,
            job_run_id TEXT REFERENCES pipeline_runs(run_id),
            spotify_request_id TEXT REFERENCES api_requests(request_id),
            wikipedia_request_id TEXT REFERENCES api_requests(request_id),
            youtube_request_id TEXT REFERENCES api_requests(request_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_snapshot_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS spotify_artist_daily (
            local_artist_id TEXT NOT NULL REFERENCES artist_info(local_artist_id),
            spotify_artist_id TEXT NOT NULL,
            day_date TEXT NOT NULL,
            fetched_at TEXT NOT NULL,
            job_run_id TEXT REFERENCES pipeline_runs(run_id),
            artist_request_id TEXT REFERENCES api_requests(request_id),
            top_tracks_request_id TEXT REFERENCES api_requests(request_id),
            followers_total INTEGER,
            popularity INTEGER,
            top_track_popularity_max REAL,
            top_track_popularity_mean REAL,
            num_top_tracks INTEGER,
            PRIMARY KEY (local_artist_id, day_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS wiki_artist_daily (
            local_artist_id TEXT NOT NULL REFERENCES artist_info(local_artist_id),
            wiki_title TEXT NOT NULL,
            day_date TEXT NOT NULL,
            fetched_at TEXT NOT NULL,
            job_run_id TEXT REFERENCES pipeline_runs(run_id),
            request_id TEXT REFERENCES api_requests(request_id),
            pageviews INTEGER,
            PRIMARY KEY (local_artist_id, day_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS youtube_artist_daily (
            local_artist_id TEXT NOT NULL REFERENCES artist_info(local_artist_id),
            youtube_channel_id TEXT NOT NULL,
            day_date TEXT NOT NULL,
            fetched_at TEXT NOT NULL,
            job_run_id TEXT REFERENCES pipeline_runs(run_id),
            request_id TEXT REFERENCES api_requests(request_id),
            subscribers INTEGER,
            total_views INTEGER,
            video_count INTEGER,
            PRIMARY KEY (local_artist_id, day_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_artist_day_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artist_day (
            local_artist_id TEXT NOT NULL REFERENCES artist_info(local_artist_id),
            day_date TEXT NOT NULL,
            spotify_job_run_id TEXT REFERENCES pipeline_runs(run_id),
            wiki_job_run_id TEXT REFERENCES pipeline_runs(run_id),
            youtube_job_run_id TEXT REFERENCES pipeline_runs(run_id),
            spotify_followers_total INTEGER,
            spotify_popularity INTEGER,
            spotify_top_track_popularity_mean REAL,
            wiki_pageviews INTEGER,
            youtube_subscribers INTEGER,
            youtube_total_views INTEGER,
            youtube_video_count INTEGER,
            PRIMARY KEY (local_artist_id, day_date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_artist_info_spotify ON artist_info(spotify_artist_id)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_artist_info_wiki ON artist_info(wiki_title)",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_artist_info_youtube ON artist_info(youtube_channel_id)",
        "CREATE INDEX IF NOT EXISTS idx_run_steps_run ON run_steps(run_id)",
        "CREATE INDEX IF NOT EXISTS idx_api_requests_run ON api_requests(run_id)",
        "CREATE INDEX IF NOT EXISTS idx_api_requests_step ON api_requests(step_run_id)",
        "CREATE INDEX IF NOT EXISTS idx_spotify_daily_date ON spotify_artist_daily(day_date)",
        "CREATE INDEX IF NOT EXISTS idx_wiki_daily_date ON wiki_artist_daily(day_date)",
        "CREATE INDEX IF NOT EXISTS idx_youtube_daily_date ON youtube_artist_daily(day_date)",
        "CREATE INDEX IF NOT EXISTS idx_artist_day_date ON artist_day(day_date)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let pool = crate::db::init_in_memory_pool().await.unwrap();
        initialize_schema(&pool).await.expect("second initialization should succeed");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(
            tables,
            vec![
                "api_requests",
                "artist_day",
                "artist_info",
                "pipeline_runs",
                "run_steps",
                "spotify_artist_daily",
                "wiki_artist_daily",
                "youtube_artist_daily",
            ]
        );
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = crate::db::init_in_memory_pool().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO run_steps (step_run_id, run_id, step_name, started_at, status) \
             VALUES ('s1', 'missing-run', 'x', '2025-06-01T00:00:00.000Z', 'in_progress')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err(), "step without run must be rejected");
    }
}
