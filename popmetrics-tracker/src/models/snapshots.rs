//! Per-source daily snapshots and the unified cross-platform record

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Daily Spotify snapshot for one artist, keyed on (artist, day)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyDaily {
    pub local_artist_id: String,
    pub spotify_artist_id: String,
    pub day: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub job_run_id: Option<String>,
    pub artist_request_id: Option<String>,
    pub top_tracks_request_id: Option<String>,
    pub followers_total: Option<i64>,
    pub popularity: Option<i64>,
    pub top_track_popularity_max: Option<f64>,
    pub top_track_popularity_mean: Option<f64>,
    pub num_top_tracks: Option<i64>,
}

/// Daily Wikipedia pageview snapshot for one artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiDaily {
    pub local_artist_id: String,
    pub wiki_title: String,
    pub day: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub job_run_id: Option<String>,
    pub request_id: Option<String>,
    pub pageviews: Option<i64>,
}

/// Daily YouTube channel snapshot for one artist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeDaily {
    pub local_artist_id: String,
    pub youtube_channel_id: String,
    pub day: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub job_run_id: Option<String>,
    pub request_id: Option<String>,
    pub subscribers: Option<i64>,
    pub total_views: Option<i64>,
    pub video_count: Option<i64>,
}

/// Unified daily record, derived from whichever snapshots exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistDay {
    pub local_artist_id: String,
    pub day: NaiveDate,

    // Provenance: run that produced each contributing snapshot
    pub spotify_job_run_id: Option<String>,
    pub wiki_job_run_id: Option<String>,
    pub youtube_job_run_id: Option<String>,

    pub spotify_followers_total: Option<i64>,
    pub spotify_popularity: Option<i64>,
    pub spotify_top_track_popularity_mean: Option<f64>,

    pub wiki_pageviews: Option<i64>,

    pub youtube_subscribers: Option<i64>,
    pub youtube_total_views: Option<i64>,
    pub youtube_video_count: Option<i64>,
}

impl ArtistDay {
    /// Combine the latest snapshot of each source into one record
    ///
    /// Returns `None` when no source has data: an artist without snapshots
    /// gets no unified record, not a null-filled one.
    pub fn from_snapshots(
        local_artist_id: &str,
        day: NaiveDate,
        spotify: Option<&SpotifyDaily>,
        wiki: Option<&WikiDaily>,
        youtube: Option<&YoutubeDaily>,
    ) -> Option<Self> {
        if spotify.is_none() && wiki.is_none() && youtube.is_none() {
            return None;
        }

        Some(Self {
            local_artist_id: local_artist_id.to_string(),
            day,
            spotify_job_run_id: spotify.and_then(|s| s.job_run_id.clone()),
            wiki_job_run_id: wiki.and_then(|w| w.job_run_id.clone()),
            youtube_job_run_id: youtube.and_then(|y| y.job_run_id.clone()),
            spotify_followers_total: spotify.and_then(|s| s.followers_total),
            spotify_popularity: spotify.and_then(|s| s.popularity),
            spotify_top_track_popularity_mean: spotify.and_then(|s| s.top_track_popularity_mean),
            wiki_pageviews: wiki.and_then(|w| w.pageviews),
            youtube_subscribers: youtube.and_then(|y| y.subscribers),
            youtube_total_views: youtube.and_then(|y| y.total_views),
            youtube_video_count: youtube.and_then(|y| y.video_count),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn wiki(views: i64) -> WikiDaily {
        WikiDaily {
            local_artist_id: "artist_x".to_string(),
            wiki_title: "Artist_X".to_string(),
            day: day(),
            fetched_at: Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap(),
            job_run_id: Some("run-1".to_string()),
            request_id: None,
            pageviews: Some(views),
        }
    }

    fn youtube(subscribers: i64) -> YoutubeDaily {
        YoutubeDaily {
            local_artist_id: "artist_x".to_string(),
            youtube_channel_id: "UC123".to_string(),
            day: day(),
            fetched_at: Utc.with_ymd_and_hms(2025, 6, 2, 8, 5, 0).unwrap(),
            job_run_id: Some("run-2".to_string()),
            request_id: None,
            subscribers: Some(subscribers),
            total_views: Some(10_000),
            video_count: None,
        }
    }

    #[test]
    fn test_no_snapshots_no_record() {
        assert!(ArtistDay::from_snapshots("artist_x", day(), None, None, None).is_none());
    }

    #[test]
    fn test_missing_source_leaves_nulls() {
        let w = wiki(42);
        let y = youtube(900);
        let record = ArtistDay::from_snapshots("artist_x", day(), None, Some(&w), Some(&y)).unwrap();

        assert_eq!(record.spotify_followers_total, None);
        assert_eq!(record.spotify_job_run_id, None);
        assert_eq!(record.wiki_pageviews, Some(42));
        assert_eq!(record.wiki_job_run_id.as_deref(), Some("run-1"));
        assert_eq!(record.youtube_subscribers, Some(900));
        assert_eq!(record.youtube_job_run_id.as_deref(), Some("run-2"));
        assert_eq!(record.youtube_video_count, None);
    }
}
