//! Platform API clients
//!
//! Each platform is reached through an async trait so jobs can run against
//! in-process fakes. The reqwest implementations share [`http::HttpFetcher`]
//! for rate limiting and transient-failure retry.
//!
//! Every call reports what it did to a [`CallRecorder`] before returning,
//! on success and failure alike.

pub mod http;
pub mod spotify;
pub mod wikipedia;
pub mod youtube;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::SourceError;
use crate::models::RequestParams;

pub use http::{HttpFetcher, HttpSettings};
pub use spotify::{SpotifyArtist, SpotifyClient, SpotifyTopTracks};
pub use wikipedia::{PageSummary, Pageviews, WikipediaClient};
pub use youtube::{ChannelList, YoutubeClient};

/// Sink for the details of one outbound call
///
/// Implemented by the request tracer; clients set the endpoint and
/// parameters before sending and the final HTTP status once known.
pub trait CallRecorder: Send {
    fn set_endpoint(&mut self, endpoint: &str);
    fn set_params(&mut self, params: RequestParams);
    fn set_http_status(&mut self, status: u16);
}

/// Spotify Web API (client-credentials flow)
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// `GET /artists/{id}`
    async fn get_artist(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError>;

    /// `GET /artists/{id}/top-tracks?market=`
    async fn get_top_tracks(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyTopTracks, SourceError>;

    /// Best artist match for a free-text query
    async fn search_artist(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError>;
}

/// Wikimedia pageviews and Wikipedia page APIs
#[async_trait]
pub trait WikipediaApi: Send + Sync {
    /// Daily user pageviews of one article for one day
    async fn get_daily_pageviews(
        &self,
        title: &str,
        day: NaiveDate,
        recorder: &mut dyn CallRecorder,
    ) -> Result<Pageviews, SourceError>;

    /// REST page summary (canonical title, page URL)
    async fn get_page_summary(
        &self,
        title: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<PageSummary, SourceError>;

    /// Title of the most relevant page for a query
    async fn search_title(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError>;
}

/// YouTube Data API v3
#[async_trait]
pub trait YoutubeApi: Send + Sync {
    /// `channels.list` with snippet and statistics
    async fn get_channel(
        &self,
        channel_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<ChannelList, SourceError>;

    /// Channel id of the best `search.list` match
    async fn search_channel(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError>;
}

/// Build a [`RequestParams`] map from string pairs
pub(crate) fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> RequestParams {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
        .collect()
}
