//! Wikimedia pageviews and page summary payloads

use chrono::{DateTime, Utc};

use super::FetchContext;
use crate::models::{ArtistInfo, WikiDaily};
use crate::sources::{PageSummary, Pageviews};

/// Daily snapshot: views of the first returned item
pub fn wiki_daily(ctx: &FetchContext<'_>, wiki_title: &str, pageviews: &Pageviews, request_id: &str) -> WikiDaily {
    WikiDaily {
        local_artist_id: ctx.local_artist_id.to_string(),
        wiki_title: wiki_title.to_string(),
        day: ctx.day,
        fetched_at: ctx.fetched_at,
        job_run_id: Some(ctx.job_run_id.to_string()),
        request_id: Some(request_id.to_string()),
        pageviews: pageviews.items.first().and_then(|item| item.views),
    }
}

/// Canonical title and desktop page URL
pub fn wiki_artist_info(
    local_artist_id: &str,
    summary: &PageSummary,
    fetched_at: DateTime<Utc>,
    job_run_id: &str,
    request_id: &str,
) -> ArtistInfo {
    ArtistInfo {
        wiki_title: summary.title.clone(),
        wikipedia_url: summary
            .content_urls
            .as_ref()
            .and_then(|u| u.desktop.as_ref())
            .and_then(|d| d.page.clone()),
        fetched_at: Some(fetched_at),
        job_run_id: Some(job_run_id.to_string()),
        wikipedia_request_id: Some(request_id.to_string()),
        ..ArtistInfo::new(local_artist_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_pageviews_from_first_item_or_null() {
        let ctx = FetchContext {
            local_artist_id: "artist_x",
            day: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            fetched_at: Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
            job_run_id: "run-1",
        };

        let payload: Pageviews =
            serde_json::from_str(r#"{"items":[{"timestamp":"2025060100","views":4321}]}"#).unwrap();
        assert_eq!(wiki_daily(&ctx, "Artist_X", &payload, "req-1").pageviews, Some(4321));

        let empty = Pageviews::default();
        assert_eq!(wiki_daily(&ctx, "Artist_X", &empty, "req-2").pageviews, None);
    }

    #[test]
    fn test_summary_url() {
        let summary: PageSummary = serde_json::from_str(
            r#"{"title":"Artist X","content_urls":{"desktop":{"page":"https://en.wikipedia.org/wiki/Artist_X"}}}"#,
        )
        .unwrap();
        let info = wiki_artist_info("artist_x", &summary, Utc::now(), "run-1", "req-1");
        assert_eq!(info.wiki_title.as_deref(), Some("Artist X"));
        assert_eq!(
            info.wikipedia_url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Artist_X")
        );
        assert_eq!(info.wikipedia_request_id.as_deref(), Some("req-1"));
    }
}
