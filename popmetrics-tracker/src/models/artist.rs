//! Tracked artists and their slowly-changing reference info

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Platform;

/// One entry of the tracked-artist registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedArtist {
    pub local_artist_id: String,
    #[serde(default)]
    pub spotify_artist_id: Option<String>,
    #[serde(default)]
    pub wiki_title: Option<String>,
    #[serde(default)]
    pub youtube_channel_id: Option<String>,
}

impl TrackedArtist {
    pub fn new(local_artist_id: impl Into<String>) -> Self {
        Self {
            local_artist_id: local_artist_id.into(),
            spotify_artist_id: None,
            wiki_title: None,
            youtube_channel_id: None,
        }
    }

    /// Platform-specific identifier, if known
    pub fn platform_id(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Spotify => self.spotify_artist_id.as_deref(),
            Platform::Wikipedia => self.wiki_title.as_deref(),
            Platform::Youtube => self.youtube_channel_id.as_deref(),
        }
    }
}

/// Reference record for one artist (one row of `artist_info`)
///
/// Fields are expensive to rediscover, so stored values are only replaced
/// by newer non-null ones (see `services::reference_merge`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistInfo {
    pub local_artist_id: String,
    pub artist_name: Option<String>,

    pub spotify_artist_id: Option<String>,
    pub wiki_title: Option<String>,
    pub youtube_channel_id: Option<String>,

    pub country: Option<String>,
    pub debut_year: Option<i64>,
    /// Empty means unknown
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub spotify_url: Option<String>,
    pub wikipedia_url: Option<String>,
    pub youtube_channel_url: Option<String>,

    pub fetched_at: Option<DateTime<Utc>>,
    pub job_run_id: Option<String>,
    pub spotify_request_id: Option<String>,
    pub wikipedia_request_id: Option<String>,
    pub youtube_request_id: Option<String>,
}

impl ArtistInfo {
    /// Empty record for an artist
    pub fn new(local_artist_id: impl Into<String>) -> Self {
        Self {
            local_artist_id: local_artist_id.into(),
            ..Default::default()
        }
    }

    /// Seed a record with the identifiers carried by the registry
    pub fn from_tracked(artist: &TrackedArtist) -> Self {
        Self {
            local_artist_id: artist.local_artist_id.clone(),
            spotify_artist_id: artist.spotify_artist_id.clone(),
            wiki_title: artist.wiki_title.clone(),
            youtube_channel_id: artist.youtube_channel_id.clone(),
            ..Default::default()
        }
    }
}
