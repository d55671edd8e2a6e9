//! Spotify Web API client (client-credentials OAuth, no user context)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use super::http::{HttpFetcher, HttpSettings};
use super::{params, CallRecorder, SpotifyApi};
use crate::error::SourceError;
use crate::models::Platform;

const AUTH_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Refresh this long before the token actually expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(20);

/// Spotify artist object (subset)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyArtist {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub followers: Option<SpotifyFollowers>,
    pub popularity: Option<i64>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub external_urls: Option<SpotifyExternalUrls>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyFollowers {
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyImage {
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

/// `top-tracks` response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyTopTracks {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

/// Track entry; popularity is kept raw so non-numeric values can be skipped
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub popularity: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    artists: Option<SearchArtists>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchArtists {
    #[serde(default)]
    items: Vec<SpotifyArtist>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// reqwest-backed [`SpotifyApi`]
pub struct SpotifyClient {
    http: HttpFetcher,
    client_id: String,
    client_secret: String,
    market: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        market: impl Into<String>,
        settings: &HttpSettings,
    ) -> Result<Self, SourceError> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(SourceError::Config(
                "Missing Spotify credentials (SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET)".to_string(),
            ));
        }

        Ok(Self {
            http: HttpFetcher::new(Platform::Spotify, settings)?,
            client_id,
            client_secret,
            market: market.into(),
            token: Mutex::new(None),
        })
    }

    /// Cached bearer token, refreshed shortly before expiry
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let response = self
            .http
            .client()
            .post(AUTH_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Spotify token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                body: format!("token request: {}", body),
            });
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Spotify token response: {}", e)))?;

        let (Some(value), Some(expires_in)) = (payload.access_token, payload.expires_in.filter(|s| *s > 0)) else {
            return Err(SourceError::Parse("Spotify token response malformed".to_string()));
        };

        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Authorized GET; a 401 drops the cached token and retries once
    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        recorder: &mut dyn CallRecorder,
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", API_BASE, path);

        for refreshed in [false, true] {
            let token = self.access_token().await?;
            let result = self
                .http
                .get_json(|c| c.get(&url).bearer_auth(&token).query(query), recorder)
                .await;

            match result {
                Err(SourceError::Api { status: 401, .. }) if !refreshed => {
                    debug!(path, "Spotify token rejected, refreshing");
                    self.invalidate_token().await;
                }
                other => return other,
            }
        }

        Err(SourceError::Api {
            status: 401,
            body: "unauthorized after token refresh".to_string(),
        })
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn get_artist(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError> {
        let path = format!("/artists/{}", artist_id);
        recorder.set_endpoint(&path);
        self.get(&path, &[], recorder).await
    }

    async fn get_top_tracks(
        &self,
        artist_id: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyTopTracks, SourceError> {
        let path = format!("/artists/{}/top-tracks", artist_id);
        let query = [("market", self.market.clone())];
        recorder.set_endpoint(&path);
        recorder.set_params(params(query.clone()));
        self.get(&path, &query, recorder).await
    }

    async fn search_artist(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<SpotifyArtist, SourceError> {
        let query_params = [
            ("q", query.to_string()),
            ("type", "artist".to_string()),
            ("limit", "1".to_string()),
            ("market", self.market.clone()),
        ];
        recorder.set_endpoint("/search");
        recorder.set_params(params(query_params.clone()));

        let response: SearchResponse = self.get("/search", &query_params, recorder).await?;
        response
            .artists
            .and_then(|a| a.items.into_iter().next())
            .ok_or_else(|| SourceError::NoMatch(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_rejected() {
        let result = SpotifyClient::new("", "secret", "FR", &HttpSettings::default());
        assert!(matches!(result, Err(SourceError::Config(_))));
    }

    #[test]
    fn test_artist_payload_tolerates_missing_fields() {
        let artist: SpotifyArtist = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert_eq!(artist.id.as_deref(), Some("abc"));
        assert!(artist.genres.is_empty());
        assert!(artist.followers.is_none());
    }
}
