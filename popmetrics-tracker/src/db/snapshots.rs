//! Source snapshot writers
//!
//! One row per (artist, day) per source. A re-fetch of the same day replaces
//! every column of the stored row: last write wins, no field coalescing.
//! Contrast with `artist_info::upsert_artist_info`, which coalesces.

use chrono::NaiveDate;
use popmetrics_common::time::{format_day, format_timestamp, parse_day, parse_timestamp};
use popmetrics_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{SpotifyDaily, WikiDaily, YoutubeDaily};

// ============================================================================
// Spotify
// ============================================================================

/// Insert or fully replace the Spotify snapshot for (artist, day)
pub async fn upsert_spotify_daily(pool: &SqlitePool, row: &SpotifyDaily) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO spotify_artist_daily (
            local_artist_id, spotify_artist_id, day_date, fetched_at, job_run_id,
            artist_request_id, top_tracks_request_id,
            followers_total, popularity,
            top_track_popularity_max, top_track_popularity_mean, num_top_tracks
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_artist_id, day_date) DO UPDATE SET
            spotify_artist_id = excluded.spotify_artist_id,
            fetched_at = excluded.fetched_at,
            job_run_id = excluded.job_run_id,
            artist_request_id = excluded.artist_request_id,
            top_tracks_request_id = excluded.top_tracks_request_id,
            followers_total = excluded.followers_total,
            popularity = excluded.popularity,
            top_track_popularity_max = excluded.top_track_popularity_max,
            top_track_popularity_mean = excluded.top_track_popularity_mean,
            num_top_tracks = excluded.num_top_tracks
        "#,
    )
    .bind(&row.local_artist_id)
    .bind(&row.spotify_artist_id)
    .bind(format_day(&row.day))
    .bind(format_timestamp(&row.fetched_at))
    .bind(&row.job_run_id)
    .bind(&row.artist_request_id)
    .bind(&row.top_tracks_request_id)
    .bind(row.followers_total)
    .bind(row.popularity)
    .bind(row.top_track_popularity_max)
    .bind(row.top_track_popularity_mean)
    .bind(row.num_top_tracks)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recently fetched Spotify snapshot for (artist, day)
///
/// Equal fetch times are broken by the highest run id.
pub async fn latest_spotify_daily(
    pool: &SqlitePool,
    local_artist_id: &str,
    day: NaiveDate,
) -> Result<Option<SpotifyDaily>> {
    let row = sqlx::query(
        r#"
        SELECT local_artist_id, spotify_artist_id, day_date, fetched_at, job_run_id,
               artist_request_id, top_tracks_request_id,
               followers_total, popularity,
               top_track_popularity_max, top_track_popularity_mean, num_top_tracks
        FROM spotify_artist_daily
        WHERE local_artist_id = ? AND day_date = ?
        ORDER BY fetched_at DESC, job_run_id DESC
        LIMIT 1
        "#,
    )
    .bind(local_artist_id)
    .bind(format_day(&day))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(spotify_from_row).transpose()
}

fn spotify_from_row(row: &SqliteRow) -> Result<SpotifyDaily> {
    Ok(SpotifyDaily {
        local_artist_id: row.try_get("local_artist_id")?,
        spotify_artist_id: row.try_get("spotify_artist_id")?,
        day: parse_day(&row.try_get::<String, _>("day_date")?)?,
        fetched_at: parse_timestamp(&row.try_get::<String, _>("fetched_at")?)?,
        job_run_id: row.try_get("job_run_id")?,
        artist_request_id: row.try_get("artist_request_id")?,
        top_tracks_request_id: row.try_get("top_tracks_request_id")?,
        followers_total: row.try_get("followers_total")?,
        popularity: row.try_get("popularity")?,
        top_track_popularity_max: row.try_get("top_track_popularity_max")?,
        top_track_popularity_mean: row.try_get("top_track_popularity_mean")?,
        num_top_tracks: row.try_get("num_top_tracks")?,
    })
}

// ============================================================================
// Wikipedia
// ============================================================================

/// Insert or fully replace the Wikipedia snapshot for (artist, day)
pub async fn upsert_wiki_daily(pool: &SqlitePool, row: &WikiDaily) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO wiki_artist_daily (
            local_artist_id, wiki_title, day_date, fetched_at, job_run_id,
            request_id, pageviews
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_artist_id, day_date) DO UPDATE SET
            wiki_title = excluded.wiki_title,
            fetched_at = excluded.fetched_at,
            job_run_id = excluded.job_run_id,
            request_id = excluded.request_id,
            pageviews = excluded.pageviews
        "#,
    )
    .bind(&row.local_artist_id)
    .bind(&row.wiki_title)
    .bind(format_day(&row.day))
    .bind(format_timestamp(&row.fetched_at))
    .bind(&row.job_run_id)
    .bind(&row.request_id)
    .bind(row.pageviews)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recently fetched Wikipedia snapshot for (artist, day)
pub async fn latest_wiki_daily(
    pool: &SqlitePool,
    local_artist_id: &str,
    day: NaiveDate,
) -> Result<Option<WikiDaily>> {
    let row = sqlx::query(
        r#"
        SELECT local_artist_id, wiki_title, day_date, fetched_at, job_run_id,
               request_id, pageviews
        FROM wiki_artist_daily
        WHERE local_artist_id = ? AND day_date = ?
        ORDER BY fetched_at DESC, job_run_id DESC
        LIMIT 1
        "#,
    )
    .bind(local_artist_id)
    .bind(format_day(&day))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(wiki_from_row).transpose()
}

fn wiki_from_row(row: &SqliteRow) -> Result<WikiDaily> {
    Ok(WikiDaily {
        local_artist_id: row.try_get("local_artist_id")?,
        wiki_title: row.try_get("wiki_title")?,
        day: parse_day(&row.try_get::<String, _>("day_date")?)?,
        fetched_at: parse_timestamp(&row.try_get::<String, _>("fetched_at")?)?,
        job_run_id: row.try_get("job_run_id")?,
        request_id: row.try_get("request_id")?,
        pageviews: row.try_get("pageviews")?,
    })
}

// ============================================================================
// YouTube
// ============================================================================

/// Insert or fully replace the YouTube snapshot for (artist, day)
pub async fn upsert_youtube_daily(pool: &SqlitePool, row: &YoutubeDaily) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO youtube_artist_daily (
            local_artist_id, youtube_channel_id, day_date, fetched_at, job_run_id,
            request_id, subscribers, total_views, video_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_artist_id, day_date) DO UPDATE SET
            youtube_channel_id = excluded.youtube_channel_id,
            fetched_at = excluded.fetched_at,
            job_run_id = excluded.job_run_id,
            request_id = excluded.request_id,
            subscribers = excluded.subscribers,
            total_views = excluded.total_views,
            video_count = excluded.video_count
        "#,
    )
    .bind(&row.local_artist_id)
    .bind(&row.youtube_channel_id)
    .bind(format_day(&row.day))
    .bind(format_timestamp(&row.fetched_at))
    .bind(&row.job_run_id)
    .bind(&row.request_id)
    .bind(row.subscribers)
    .bind(row.total_views)
    .bind(row.video_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recently fetched YouTube snapshot for (artist, day)
pub async fn latest_youtube_daily(
    pool: &SqlitePool,
    local_artist_id: &str,
    day: NaiveDate,
) -> Result<Option<YoutubeDaily>> {
    let row = sqlx::query(
        r#"
        SELECT local_artist_id, youtube_channel_id, day_date, fetched_at, job_run_id,
               request_id, subscribers, total_views, video_count
        FROM youtube_artist_daily
        WHERE local_artist_id = ? AND day_date = ?
        ORDER BY fetched_at DESC, job_run_id DESC
        LIMIT 1
        "#,
    )
    .bind(local_artist_id)
    .bind(format_day(&day))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(youtube_from_row).transpose()
}

fn youtube_from_row(row: &SqliteRow) -> Result<YoutubeDaily> {
    Ok(YoutubeDaily {
        local_artist_id: row.try_get("local_artist_id")?,
        youtube_channel_id: row.try_get("youtube_channel_id")?,
        day: parse_day(&row.try_get::<String, _>("day_date")?)?,
        fetched_at: parse_timestamp(&row.try_get::<String, _>("fetched_at")?)?,
        job_run_id: row.try_get("job_run_id")?,
        request_id: row.try_get("request_id")?,
        subscribers: row.try_get("subscribers")?,
        total_views: row.try_get("total_views")?,
        video_count: row.try_get("video_count")?,
    })
}
