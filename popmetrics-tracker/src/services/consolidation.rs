//! Consolidation engine: per-source daily snapshots to one `artist_day` row
//!
//! For each artist the latest snapshot of every source is selected
//! independently (latest `fetched_at`, ties to the highest run id). An
//! artist with no snapshot at all is skipped rather than zero-filled.
//! The result depends only on the snapshot tables, so re-running is
//! idempotent.

use chrono::NaiveDate;
use popmetrics_common::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::{artist_day, snapshots};
use crate::models::{ArtistDay, TrackedArtist};

/// Outcome of consolidating one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsolidationSummary {
    /// Artists with a unified record written
    pub written: usize,
    /// Artists without any snapshot for the day
    pub skipped: usize,
}

/// Consolidate one artist; `None` when no source has data for the day
pub async fn consolidate_artist(
    pool: &SqlitePool,
    local_artist_id: &str,
    day: NaiveDate,
) -> Result<Option<ArtistDay>> {
    let spotify = snapshots::latest_spotify_daily(pool, local_artist_id, day).await?;
    let wiki = snapshots::latest_wiki_daily(pool, local_artist_id, day).await?;
    let youtube = snapshots::latest_youtube_daily(pool, local_artist_id, day).await?;

    let Some(record) = ArtistDay::from_snapshots(
        local_artist_id,
        day,
        spotify.as_ref(),
        wiki.as_ref(),
        youtube.as_ref(),
    ) else {
        debug!(local_artist_id, %day, "No snapshots, skipping consolidation");
        return Ok(None);
    };

    artist_day::upsert_artist_day(pool, &record).await?;
    Ok(Some(record))
}

/// Consolidate every artist for `day`, in list order
pub async fn consolidate(
    pool: &SqlitePool,
    artists: &[TrackedArtist],
    day: NaiveDate,
) -> Result<ConsolidationSummary> {
    let mut summary = ConsolidationSummary::default();

    for artist in artists {
        match consolidate_artist(pool, &artist.local_artist_id, day).await? {
            Some(_) => summary.written += 1,
            None => summary.skipped += 1,
        }
    }

    info!(
        %day,
        written = summary.written,
        skipped = summary.skipped,
        "Consolidation finished"
    );

    Ok(summary)
}
