//! YouTube Data API v3 client
//!
//! The API key travels as a query parameter and is never reported to the
//! recorder.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http::{HttpFetcher, HttpSettings};
use super::{params, CallRecorder, YoutubeApi};
use crate::error::SourceError;
use crate::models::Platform;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// `channels.list` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChannelList {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Channel {
    pub id: Option<String>,
    pub snippet: Option<ChannelSnippet>,
    pub statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnippet {
    pub title: Option<String>,
    pub custom_url: Option<String>,
    pub country: Option<String>,
}

/// Counts arrive as decimal strings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    pub subscriber_count: Option<String>,
    pub view_count: Option<String>,
    pub video_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    channel_id: Option<String>,
}

/// reqwest-backed [`YoutubeApi`]
pub struct YoutubeClient {
    http: HttpFetcher,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(api_key: impl Into<String>, settings: &HttpSettings) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(SourceError::Config("Missing YOUTUBE_API_KEY".to_string()));
        }

        Ok(Self {
            http: HttpFetcher::new(Platform::Youtube, settings)?,
            api_key,
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        recorder: &mut dyn CallRecorder,
    ) -> Result<T, SourceError> {
        recorder.set_endpoint(path);
        recorder.set_params(params(query.iter().cloned()));

        let url = format!("{}{}", API_BASE, path);
        self.http
            .get_json(
                |c| c.get(&url).query(query).query(&[("key", &self.api_key)]),
                recorder,
            )
            .await
    }
}

#[async_trait]
impl YoutubeApi for YoutubeClient {
    async fn get_channel(
        &self,
        channel_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<ChannelList, SourceError> {
        let query = [
            ("part", "snippet,statistics".to_string()),
            ("id", channel_id.to_string()),
            ("maxResults", "1".to_string()),
        ];
        let channels: ChannelList = self.get("/channels", &query, recorder).await?;

        if channels.items.is_empty() {
            return Err(SourceError::NotFound(format!("channel {}", channel_id)));
        }
        Ok(channels)
    }

    async fn search_channel(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError> {
        let query_params = [
            ("part", "snippet".to_string()),
            ("q", query.to_string()),
            ("type", "channel".to_string()),
            ("maxResults", "1".to_string()),
        ];
        let response: SearchResponse = self.get("/search", &query_params, recorder).await?;

        response
            .items
            .into_iter()
            .find_map(|item| item.id.channel_id)
            .ok_or_else(|| SourceError::NoMatch(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_parse_camel_case_strings() {
        let list: ChannelList = serde_json::from_str(
            r#"{"items":[{"id":"UC1","statistics":{"subscriberCount":"1200","viewCount":"98000","videoCount":"41"}}]}"#,
        )
        .unwrap();
        let stats = list.items[0].statistics.as_ref().unwrap();
        assert_eq!(stats.subscriber_count.as_deref(), Some("1200"));
        assert_eq!(stats.video_count.as_deref(), Some("41"));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(matches!(
            YoutubeClient::new("", &HttpSettings::default()),
            Err(SourceError::Config(_))
        ));
    }
}
