//! Wikimedia pageviews and Wikipedia page APIs
//!
//! No API key, but Wikimedia asks for a User-Agent with a contact address.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::http::{HttpFetcher, HttpSettings, USER_AGENT};
use super::{params, CallRecorder, WikipediaApi};
use crate::error::SourceError;
use crate::models::Platform;

const PAGEVIEWS_BASE: &str = "https://wikimedia.org/api/rest_v1/metrics/pageviews/per-article";
const REST_BASE: &str = "https://en.wikipedia.org/api/rest_v1";
const ACTION_API: &str = "https://en.wikipedia.org/w/api.php";

const PROJECT: &str = "en.wikipedia";
const ACCESS: &str = "all-access";
const AGENT: &str = "user";

/// Per-article pageviews response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Pageviews {
    #[serde(default)]
    pub items: Vec<PageviewItem>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageviewItem {
    pub timestamp: Option<String>,
    pub views: Option<i64>,
}

/// REST page summary (subset)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageSummary {
    pub title: Option<String>,
    pub content_urls: Option<ContentUrls>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContentUrls {
    pub desktop: Option<PageUrls>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageUrls {
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

/// reqwest-backed [`WikipediaApi`]
pub struct WikipediaClient {
    http: HttpFetcher,
}

impl WikipediaClient {
    pub fn new(contact_email: &str, settings: &HttpSettings) -> Result<Self, SourceError> {
        if contact_email.trim().is_empty() {
            return Err(SourceError::Config(
                "Missing CONTACT_EMAIL for the Wikimedia User-Agent".to_string(),
            ));
        }
        let settings = settings
            .clone()
            .with_user_agent(format!("{} (contact:{})", USER_AGENT, contact_email.trim()));

        Ok(Self {
            http: HttpFetcher::new(Platform::Wikipedia, &settings)?,
        })
    }
}

/// `yyyymmdd00` bound used by the pageviews API
fn pageviews_timestamp(day: NaiveDate) -> String {
    format!("{}00", day.format("%Y%m%d"))
}

/// Base URL with `segments` appended, each percent-encoded
fn url_with_segments(base: &str, segments: &[&str]) -> Result<Url, SourceError> {
    let mut url = Url::parse(base).map_err(|e| SourceError::Config(format!("Bad base URL {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::Config(format!("Base URL cannot take a path: {}", base)))?
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl WikipediaApi for WikipediaClient {
    async fn get_daily_pageviews(
        &self,
        title: &str,
        day: NaiveDate,
        recorder: &mut dyn CallRecorder,
    ) -> Result<Pageviews, SourceError> {
        let bound = pageviews_timestamp(day);
        let url = url_with_segments(
            PAGEVIEWS_BASE,
            &[PROJECT, ACCESS, AGENT, title, "daily", &bound, &bound],
        )?;

        let endpoint = url.path().trim_start_matches("/api/rest_v1").to_string();
        recorder.set_endpoint(&endpoint);
        recorder.set_params(params([("start", bound.clone()), ("end", bound.clone())]));

        self.http.get_json(|c| c.get(url.clone()), recorder).await
    }

    async fn get_page_summary(
        &self,
        title: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<PageSummary, SourceError> {
        let normalized = title.replace(' ', "_");
        let url = url_with_segments(REST_BASE, &["page", "summary", &normalized])?;

        let endpoint = url.path().trim_start_matches("/api/rest_v1").to_string();
        recorder.set_endpoint(&endpoint);

        self.http.get_json(|c| c.get(url.clone()), recorder).await
    }

    async fn search_title(
        &self,
        query: &str,
        recorder: &mut dyn CallRecorder,
    ) -> Result<String, SourceError> {
        let query_params = [
            ("action", "query".to_string()),
            ("list", "search".to_string()),
            ("srsearch", query.to_string()),
            ("srlimit", "1".to_string()),
            ("format", "json".to_string()),
        ];
        recorder.set_endpoint("/w/api.php");
        recorder.set_params(params(query_params.clone()));

        let response: SearchResponse = self
            .http
            .get_json(|c| c.get(ACTION_API).query(&query_params), recorder)
            .await?;

        response
            .query
            .and_then(|q| q.search.into_iter().next())
            .map(|hit| hit.title)
            .ok_or_else(|| SourceError::NoMatch(query.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pageviews_timestamp_format() {
        let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(pageviews_timestamp(day), "2025060100");
    }

    #[test]
    fn test_title_is_percent_encoded_as_one_segment() {
        let url = url_with_segments(REST_BASE, &["page", "summary", "AC/DC"]).unwrap();
        assert_eq!(url.path(), "/api/rest_v1/page/summary/AC%2FDC");
    }

    #[test]
    fn test_contact_email_required() {
        assert!(matches!(
            WikipediaClient::new("  ", &HttpSettings::default()),
            Err(SourceError::Config(_))
        ));
    }
}
