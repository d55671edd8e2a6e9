//! YouTube channel payloads

use chrono::{DateTime, Utc};

use super::FetchContext;
use crate::models::{ArtistInfo, YoutubeDaily};
use crate::sources::ChannelList;

/// Decimal-string count; anything unparseable is unknown
fn parse_count(value: Option<&String>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Daily snapshot from the first channel's statistics
pub fn youtube_daily(
    ctx: &FetchContext<'_>,
    youtube_channel_id: &str,
    channels: &ChannelList,
    request_id: &str,
) -> YoutubeDaily {
    let stats = channels.items.first().and_then(|c| c.statistics.as_ref());

    YoutubeDaily {
        local_artist_id: ctx.local_artist_id.to_string(),
        youtube_channel_id: youtube_channel_id.to_string(),
        day: ctx.day,
        fetched_at: ctx.fetched_at,
        job_run_id: Some(ctx.job_run_id.to_string()),
        request_id: Some(request_id.to_string()),
        subscribers: parse_count(stats.and_then(|s| s.subscriber_count.as_ref())),
        total_views: parse_count(stats.and_then(|s| s.view_count.as_ref())),
        video_count: parse_count(stats.and_then(|s| s.video_count.as_ref())),
    }
}

/// Channel id, channel URL and (if given) country
pub fn youtube_artist_info(
    local_artist_id: &str,
    channels: &ChannelList,
    fetched_at: DateTime<Utc>,
    job_run_id: &str,
    request_id: &str,
) -> ArtistInfo {
    let channel = channels.items.first();
    let channel_id = channel.and_then(|c| c.id.clone());

    ArtistInfo {
        youtube_channel_url: channel_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/channel/{}", id)),
        youtube_channel_id: channel_id,
        country: channel
            .and_then(|c| c.snippet.as_ref())
            .and_then(|s| s.country.clone()),
        fetched_at: Some(fetched_at),
        job_run_id: Some(job_run_id.to_string()),
        youtube_request_id: Some(request_id.to_string()),
        ..ArtistInfo::new(local_artist_id)
    }
}
