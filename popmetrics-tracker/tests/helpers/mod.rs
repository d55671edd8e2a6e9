//! Shared test fixtures: in-memory store, deterministic ids, fake platforms
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use popmetrics_common::SequentialIds;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use popmetrics_tracker::models::TrackedArtist;
use popmetrics_tracker::provenance::Provenance;
use popmetrics_tracker::sources::spotify::{
    SpotifyExternalUrls, SpotifyFollowers, SpotifyImage, SpotifyTrack,
};
use popmetrics_tracker::sources::wikipedia::{ContentUrls, PageUrls, PageviewItem};
use popmetrics_tracker::sources::youtube::{Channel, ChannelStatistics};
use popmetrics_tracker::sources::{
    CallRecorder, ChannelList, PageSummary, Pageviews, SpotifyApi, SpotifyArtist,
    SpotifyTopTracks, WikipediaApi, YoutubeApi,
};
use popmetrics_tracker::workflow::PlatformClients;
use popmetrics_tracker::SourceError;

pub const BUILD: &str = "test-build";

/// Provenance over a fresh in-memory database with `id-000001`-style ids
pub async fn provenance() -> Provenance {
    let pool = popmetrics_tracker::db::init_in_memory_pool()
        .await
        .expect("in-memory pool");
    Provenance::new(pool, Arc::new(SequentialIds::new("id")), BUILD)
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
}

/// Artist with every platform id derived from its local id
pub fn tracked(local_artist_id: &str) -> TrackedArtist {
    TrackedArtist {
        local_artist_id: local_artist_id.to_string(),
        spotify_artist_id: Some(format!("sp_{}", local_artist_id)),
        wiki_title: Some(format!("Wiki_{}", local_artist_id)),
        youtube_channel_id: Some(format!("UC_{}", local_artist_id)),
    }
}

/// Fakes that fail for the given platform ids and answer for everything else
#[derive(Clone, Default)]
pub struct Fakes {
    pub spotify: Arc<FakeSpotify>,
    pub wikipedia: Arc<FakeWikipedia>,
    pub youtube: Arc<FakeYoutube>,
}

impl Fakes {
    pub fn clients(&self) -> PlatformClients {
        PlatformClients {
            spotify: Some(self.spotify.clone()),
            wikipedia: Some(self.wikipedia.clone()),
            youtube: Some(self.youtube.clone()),
        }
    }
}

fn fail_not_found(recorder: &mut dyn CallRecorder, what: &str) -> SourceError {
    recorder.set_http_status(404);
    SourceError::NotFound(what.to_string())
}

// ============================================================================
// Spotify
// ============================================================================

#[derive(Default)]
pub struct FakeSpotify {
    /// Followers reported per Spotify id (default 100)
    pub followers: Mutex<HashMap<String, i64>>,
    pub failing: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeSpotify {
    pub fn set_followers(&self, spotify_id: &str, followers: i64) {
        self.followers.lock().unwrap().insert(spotify_id.to_string(), followers);
    }

    pub fn fail_for(&self, spotify_id: &str) {
        self.failing.lock().unwrap().insert(spotify_id.to_string());
    }

    fn artist(&self, spotify_id: &str) -> SpotifyArtist {
        let followers = self.followers.lock().unwrap().get(spotify_id).copied().unwrap_or(100);
        SpotifyArtist {
            id: Some(spotify_id.to_string()),
            name: Some(format!("Name of {}", spotify_id)),
            genres: vec!["pop".to_string()],
            followers: Some(SpotifyFollowers { total: Some(followers) }),
            popularity: Some(50),
            images: vec![SpotifyImage {
                url: Some(format!("https://img.example/{}.png", spotify_id)),
                width: Some(640),
                height: Some(640),
            }],
            external_urls: Some(SpotifyExternalUrls {
                spotify: Some(format!("https://open.spotify.com/artist/{}", spotify_id)),
            }),
        }
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn get_artist(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError> {
        self.calls.lock().unwrap().push(format!("artist:{}", artist_id));
        recorder.set_endpoint(&format!("/artists/{}", artist_id));
        if self.failing.lock().unwrap().contains(artist_id) {
            return Err(fail_not_found(recorder, artist_id));
        }
        recorder.set_http_status(200);
        Ok(self.artist(artist_id))
    }

    async fn get_top_tracks(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyTopTracks, SourceError> {
        self.calls.lock().unwrap().push(format!("top:{}", artist_id));
        recorder.set_endpoint(&format!("/artists/{}/top-tracks", artist_id));
        if self.failing.lock().unwrap().contains(artist_id) {
            return Err(fail_not_found(recorder, artist_id));
        }
        recorder.set_http_status(200);
        Ok(SpotifyTopTracks {
            tracks: [70, 90]
                .into_iter()
                .map(|p| SpotifyTrack {
                    popularity: Some(serde_json::json!(p)),
                    ..Default::default()
                })
                .collect(),
        })
    }

    async fn search_artist(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError> {
        self.calls.lock().unwrap().push(format!("search:{}", query));
        recorder.set_endpoint("/search");
        recorder.set_http_status(200);
        Ok(self.artist(&format!("sp_{}", query)))
    }
}

// ============================================================================
// Wikipedia
// ============================================================================

#[derive(Default)]
pub struct FakeWikipedia {
    pub failing: Mutex<HashSet<String>>,
}

impl FakeWikipedia {
    pub fn fail_for(&self, title: &str) {
        self.failing.lock().unwrap().insert(title.to_string());
    }
}

#[async_trait]
impl WikipediaApi for FakeWikipedia {
    async fn get_daily_pageviews(
        &self,
        title: &str,
        _day: NaiveDate,
        recorder: &mut dyn CallRecorder,
    ) -> Result<Pageviews, SourceError> {
        recorder.set_endpoint(&format!("/metrics/pageviews/per-article/{}", title));
        if self.failing.lock().unwrap().contains(title) {
            return Err(fail_not_found(recorder, title));
        }
        recorder.set_http_status(200);
        Ok(Pageviews {
            items: vec![PageviewItem {
                timestamp: Some("2025060100".to_string()),
                views: Some(1234),
            }],
        })
    }

    async fn get_page_summary(
        &self,
        title: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<PageSummary, SourceError> {
        recorder.set_endpoint(&format!("/page/summary/{}", title));
        if self.failing.lock().unwrap().contains(title) {
            return Err(fail_not_found(recorder, title));
        }
        recorder.set_http_status(200);
        Ok(PageSummary {
            title: Some(title.to_string()),
            content_urls: Some(ContentUrls {
                desktop: Some(PageUrls {
                    page: Some(format!("https://en.wikipedia.org/wiki/{}", title)),
                }),
            }),
        })
    }

    async fn search_title(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError> {
        recorder.set_endpoint("/w/api.php");
        recorder.set_http_status(200);
        Ok(format!("Wiki_{}", query))
    }
}

// ============================================================================
// YouTube
// ============================================================================

#[derive(Default)]
pub struct FakeYoutube {
    pub failing: Mutex<HashSet<String>>,
}

impl FakeYoutube {
    pub fn fail_for(&self, channel_id: &str) {
        self.failing.lock().unwrap().insert(channel_id.to_string());
    }
}

#[async_trait]
impl YoutubeApi for FakeYoutube {
    async fn get_channel(
        &self,
        channel_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<ChannelList, SourceError> {
        recorder.set_endpoint("/channels");
        if self.failing.lock().unwrap().contains(channel_id) {
            return Err(fail_not_found(recorder, channel_id));
        }
        recorder.set_http_status(200);
        Ok(ChannelList {
            items: vec![Channel {
                id: Some(channel_id.to_string()),
                snippet: None,
                statistics: Some(ChannelStatistics {
                    subscriber_count: Some("2000".to_string()),
                    view_count: Some("500000".to_string()),
                    video_count: Some("42".to_string()),
                }),
            }],
        })
    }

    async fn search_channel(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError> {
        recorder.set_endpoint("/search");
        recorder.set_http_status(200);
        Ok(format!("UC_{}", query))
    }
}
