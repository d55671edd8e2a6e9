//! Consolidation engine: latest-wins, partial sources, no-data skip, idempotence

mod helpers;

use chrono::{DateTime, TimeZone, Utc};
use helpers::{day, provenance};
use popmetrics_tracker::db::{artist_day, artist_info, lineage, snapshots};
use popmetrics_tracker::models::{
    ArtistInfo, RunRecord, RunStatus, SpotifyDaily, TrackedArtist, WikiDaily, YoutubeDaily,
};
use popmetrics_tracker::services::{consolidate, consolidate_artist};
use sqlx::SqlitePool;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
}

async fn seed_artist(pool: &SqlitePool, id: &str) {
    artist_info::upsert_artist_info(pool, &ArtistInfo::new(id)).await.unwrap();
}

async fn seed_run(pool: &SqlitePool, run_id: &str) {
    let run = RunRecord {
        run_id: run_id.to_string(),
        run_day: "2025-06-01".to_string(),
        build_version: helpers::BUILD.to_string(),
        started_at: at(3),
        ended_at: None,
        duration_ms: None,
        status: RunStatus::InProgress,
        error_type: None,
        error_message: None,
    };
    lineage::upsert_run(pool, &run).await.unwrap();
}

fn spotify(artist: &str, fetched_at: DateTime<Utc>, run_id: &str, followers: i64) -> SpotifyDaily {
    SpotifyDaily {
        local_artist_id: artist.to_string(),
        spotify_artist_id: format!("sp_{}", artist),
        day: day(),
        fetched_at,
        job_run_id: Some(run_id.to_string()),
        artist_request_id: None,
        top_tracks_request_id: None,
        followers_total: Some(followers),
        popularity: Some(40),
        top_track_popularity_max: Some(80.0),
        top_track_popularity_mean: Some(65.5),
        num_top_tracks: Some(10),
    }
}

fn youtube(artist: &str, run_id: &str) -> YoutubeDaily {
    YoutubeDaily {
        local_artist_id: artist.to_string(),
        youtube_channel_id: format!("UC_{}", artist),
        day: day(),
        fetched_at: at(11),
        job_run_id: Some(run_id.to_string()),
        request_id: None,
        subscribers: Some(300),
        total_views: Some(9000),
        video_count: Some(12),
    }
}

#[tokio::test]
async fn test_latest_fetch_wins_and_one_snapshot_remains() {
    let prov = provenance().await;
    let pool = prov.db();
    seed_artist(pool, "artist_x").await;
    seed_run(pool, "run-1").await;
    seed_run(pool, "run-2").await;

    snapshots::upsert_spotify_daily(pool, &spotify("artist_x", at(10), "run-1", 100)).await.unwrap();
    snapshots::upsert_spotify_daily(pool, &spotify("artist_x", at(14), "run-2", 150)).await.unwrap();

    let unified = consolidate_artist(pool, "artist_x", day()).await.unwrap().unwrap();
    assert_eq!(unified.spotify_followers_total, Some(150));
    assert_eq!(unified.spotify_job_run_id.as_deref(), Some("run-2"));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spotify_artist_daily")
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_missing_source_yields_null_fields() {
    let prov = provenance().await;
    let pool = prov.db();
    seed_artist(pool, "artist_x").await;
    seed_run(pool, "run-1").await;

    snapshots::upsert_spotify_daily(pool, &spotify("artist_x", at(10), "run-1", 100)).await.unwrap();
    snapshots::upsert_youtube_daily(pool, &youtube("artist_x", "run-1")).await.unwrap();

    consolidate_artist(pool, "artist_x", day()).await.unwrap();

    let unified = artist_day::load_artist_day(pool, "artist_x", day()).await.unwrap().unwrap();
    assert_eq!(unified.spotify_followers_total, Some(100));
    assert_eq!(unified.spotify_top_track_popularity_mean, Some(65.5));
    assert_eq!(unified.youtube_subscribers, Some(300));
    assert_eq!(unified.wiki_pageviews, None);
    assert_eq!(unified.wiki_job_run_id, None);
}

#[tokio::test]
async fn test_artist_without_snapshots_is_skipped() {
    let prov = provenance().await;
    let pool = prov.db();
    seed_artist(pool, "artist_x").await;
    seed_artist(pool, "artist_empty").await;
    seed_run(pool, "run-1").await;

    let wiki = WikiDaily {
        local_artist_id: "artist_x".to_string(),
        wiki_title: "Artist_X".to_string(),
        day: day(),
        fetched_at: at(9),
        job_run_id: Some("run-1".to_string()),
        request_id: None,
        pageviews: Some(77),
    };
    snapshots::upsert_wiki_daily(pool, &wiki).await.unwrap();

    let artists = vec![TrackedArtist::new("artist_x"), TrackedArtist::new("artist_empty")];
    let summary = consolidate(pool, &artists, day()).await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);

    assert!(artist_day::load_artist_day(pool, "artist_empty", day())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_consolidation_is_idempotent() {
    let prov = provenance().await;
    let pool = prov.db();
    seed_artist(pool, "artist_x").await;
    seed_artist(pool, "artist_y").await;
    seed_run(pool, "run-1").await;

    snapshots::upsert_spotify_daily(pool, &spotify("artist_x", at(10), "run-1", 100)).await.unwrap();
    snapshots::upsert_youtube_daily(pool, &youtube("artist_y", "run-1")).await.unwrap();

    let artists = vec![TrackedArtist::new("artist_x"), TrackedArtist::new("artist_y")];
    consolidate(pool, &artists, day()).await.unwrap();
    let first = artist_day::list_artist_days(pool, day()).await.unwrap();

    consolidate(pool, &artists, day()).await.unwrap();
    let second = artist_day::list_artist_days(pool, day()).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.len(), 2);
}
