//! Unified daily records (`artist_day`)

use chrono::NaiveDate;
use popmetrics_common::time::{format_day, parse_day};
use popmetrics_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::ArtistDay;

/// Insert or fully replace the unified record for (artist, day)
pub async fn upsert_artist_day(pool: &SqlitePool, record: &ArtistDay) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO artist_day (
            local_artist_id, day_date,
            spotify_job_run_id, wiki_job_run_id, youtube_job_run_id,
            spotify_followers_total, spotify_popularity, spotify_top_track_popularity_mean,
            wiki_pageviews,
            youtube_subscribers, youtube_total_views, youtube_video_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_artist_id, day_date) DO UPDATE SET
            spotify_job_run_id = excluded.spotify_job_run_id,
            wiki_job_run_id = excluded.wiki_job_run_id,
            youtube_job_run_id = excluded.youtube_job_run_id,
            spotify_followers_total = excluded.spotify_followers_total,
            spotify_popularity = excluded.spotify_popularity,
            spotify_top_track_popularity_mean = excluded.spotify_top_track_popularity_mean,
            wiki_pageviews = excluded.wiki_pageviews,
            youtube_subscribers = excluded.youtube_subscribers,
            youtube_total_views = excluded.youtube_total_views,
            youtube_video_count = excluded.youtube_video_count
        "#,
    )
    .bind(&record.local_artist_id)
    .bind(format_day(&record.day))
    .bind(&record.spotify_job_run_id)
    .bind(&record.wiki_job_run_id)
    .bind(&record.youtube_job_run_id)
    .bind(record.spotify_followers_total)
    .bind(record.spotify_popularity)
    .bind(record.spotify_top_track_popularity_mean)
    .bind(record.wiki_pageviews)
    .bind(record.youtube_subscribers)
    .bind(record.youtube_total_views)
    .bind(record.youtube_video_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the unified record for (artist, day)
pub async fn load_artist_day(
    pool: &SqlitePool,
    local_artist_id: &str,
    day: NaiveDate,
) -> Result<Option<ArtistDay>> {
    let row = sqlx::query(&format!(
        "{} WHERE local_artist_id = ? AND day_date = ?",
        SELECT_ARTIST_DAY
    ))
    .bind(local_artist_id)
    .bind(format_day(&day))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(artist_day_from_row).transpose()
}

/// All unified records for a day, ordered by artist
pub async fn list_artist_days(pool: &SqlitePool, day: NaiveDate) -> Result<Vec<ArtistDay>> {
    let rows = sqlx::query(&format!(
        "{} WHERE day_date = ? ORDER BY local_artist_id",
        SELECT_ARTIST_DAY
    ))
    .bind(format_day(&day))
    .fetch_all(pool)
    .await?;

    rows.iter().map(artist_day_from_row).collect()
}

const SELECT_ARTIST_DAY: &str = r#"
    SELECT local_artist_id, day_date,
           spotify_job_run_id, wiki_job_run_id, youtube_job_run_id,
           spotify_followers_total, spotify_popularity, spotify_top_track_popularity_mean,
           wiki_pageviews,
           youtube_subscribers, youtube_total_views, youtube_video_count
    FROM artist_day
"#;

fn artist_day_from_row(row: &SqliteRow) -> Result<ArtistDay> {
    Ok(ArtistDay {
        local_artist_id: row.try_get("local_artist_id")?,
        day: parse_day(&row.try_get::<String, _>("day_date")?)?,
        spotify_job_run_id: row.try_get("spotify_job_run_id")?,
        wiki_job_run_id: row.try_get("wiki_job_run_id")?,
        youtube_job_run_id: row.try_get("youtube_job_run_id")?,
        spotify_followers_total: row.try_get("spotify_followers_total")?,
        spotify_popularity: row.try_get("spotify_popularity")?,
        spotify_top_track_popularity_mean: row.try_get("spotify_top_track_popularity_mean")?,
        wiki_pageviews: row.try_get("wiki_pageviews")?,
        youtube_subscribers: row.try_get("youtube_subscribers")?,
        youtube_total_views: row.try_get("youtube_total_views")?,
        youtube_video_count: row.try_get("youtube_video_count")?,
    })
}
