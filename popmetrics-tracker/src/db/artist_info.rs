//! Artist reference info (`artist_info`)
//!
//! Merge strategy: new values overwrite old, old values preserved if new is
//! NULL. Identity fields come from search/disambiguation calls and are
//! costly to rediscover, so an unknown never replaces a known value.

use popmetrics_common::time::format_timestamp;
use popmetrics_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::parse_optional_timestamp;
use crate::models::{ArtistInfo, TrackedArtist};

/// Insert or coalescing-update the reference record of one artist
pub async fn upsert_artist_info(pool: &SqlitePool, info: &ArtistInfo) -> Result<()> {
    // Empty genre list means "unknown", stored as NULL so COALESCE keeps the old list
    let genres_json = if info.genres.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&info.genres)?)
    };

    sqlx::query(
        r#"
        INSERT INTO artist_info (
            local_artist_id, artist_name,
            spotify_artist_id, wiki_title, youtube_channel_id,
            country, debut_year, genres_json, image_url,
            spotify_url, wikipedia_url, youtube_channel_url,
            fetched_at, job_run_id,
            spotify_request_id, wikipedia_request_id, youtube_request_id
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(local_artist_id) DO UPDATE SET
            artist_name = COALESCE(excluded.artist_name, artist_info.artist_name),
            spotify_artist_id = COALESCE(excluded.spotify_artist_id, artist_info.spotify_artist_id),
            wiki_title = COALESCE(excluded.wiki_title, artist_info.wiki_title),
            youtube_channel_id = COALESCE(excluded.youtube_channel_id, artist_info.youtube_channel_id),
            country = COALESCE(excluded.country, artist_info.country),
            debut_year = COALESCE(excluded.debut_year, artist_info.debut_year),
            genres_json = COALESCE(excluded.genres_json, artist_info.genres_json),
            image_url = COALESCE(excluded.image_url, artist_info.image_url),
            spotify_url = COALESCE(excluded.spotify_url, artist_info.spotify_url),
            wikipedia_url = COALESCE(excluded.wikipedia_url, artist_info.wikipedia_url),
            youtube_channel_url = COALESCE(excluded.youtube_channel_url, artist_info.youtube_channel_url),
            fetched_at = COALESCE(excluded.fetched_at, artist_info.fetched_at),
            job_run_id = COALESCE(excluded.job_run_id, artist_info.job_run_id),
            spotify_request_id = COALESCE(excluded.spotify_request_id, artist_info.spotify_request_id),
            wikipedia_request_id = COALESCE(excluded.wikipedia_request_id, artist_info.wikipedia_request_id),
            youtube_request_id = COALESCE(excluded.youtube_request_id, artist_info.youtube_request_id)
        "#,
    )
    .bind(&info.local_artist_id)
    .bind(&info.artist_name)
    .bind(&info.spotify_artist_id)
    .bind(&info.wiki_title)
    .bind(&info.youtube_channel_id)
    .bind(&info.country)
    .bind(info.debut_year)
    .bind(genres_json)
    .bind(&info.image_url)
    .bind(&info.spotify_url)
    .bind(&info.wikipedia_url)
    .bind(&info.youtube_channel_url)
    .bind(info.fetched_at.as_ref().map(format_timestamp))
    .bind(&info.job_run_id)
    .bind(&info.spotify_request_id)
    .bind(&info.wikipedia_request_id)
    .bind(&info.youtube_request_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Make sure every tracked artist has a reference row carrying its platform ids
pub async fn register_tracked_artists(pool: &SqlitePool, artists: &[TrackedArtist]) -> Result<()> {
    for artist in artists {
        upsert_artist_info(pool, &ArtistInfo::from_tracked(artist)).await?;
    }
    Ok(())
}

/// Load the reference record of one artist
pub async fn load_artist_info(pool: &SqlitePool, local_artist_id: &str) -> Result<Option<ArtistInfo>> {
    let row = sqlx::query(
        r#"
        SELECT local_artist_id, artist_name,
               spotify_artist_id, wiki_title, youtube_channel_id,
               country, debut_year, genres_json, image_url,
               spotify_url, wikipedia_url, youtube_channel_url,
               fetched_at, job_run_id,
               spotify_request_id, wikipedia_request_id, youtube_request_id
        FROM artist_info
        WHERE local_artist_id = ?
        "#,
    )
    .bind(local_artist_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(artist_info_from_row).transpose()
}

fn artist_info_from_row(row: &SqliteRow) -> Result<ArtistInfo> {
    let genres_json: Option<String> = row.try_get("genres_json")?;
    let genres = match genres_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| Error::InvalidInput(format!("Bad genres_json: {}", e)))?,
        None => Vec::new(),
    };

    Ok(ArtistInfo {
        local_artist_id: row.try_get("local_artist_id")?,
        artist_name: row.try_get("artist_name")?,
        spotify_artist_id: row.try_get("spotify_artist_id")?,
        wiki_title: row.try_get("wiki_title")?,
        youtube_channel_id: row.try_get("youtube_channel_id")?,
        country: row.try_get("country")?,
        debut_year: row.try_get("debut_year")?,
        genres,
        image_url: row.try_get("image_url")?,
        spotify_url: row.try_get("spotify_url")?,
        wikipedia_url: row.try_get("wikipedia_url")?,
        youtube_channel_url: row.try_get("youtube_channel_url")?,
        fetched_at: parse_optional_timestamp(row.try_get("fetched_at")?)?,
        job_run_id: row.try_get("job_run_id")?,
        spotify_request_id: row.try_get("spotify_request_id")?,
        wikipedia_request_id: row.try_get("wikipedia_request_id")?,
        youtube_request_id: row.try_get("youtube_request_id")?,
    })
}
