//! Spotify artist + top-tracks payloads

use chrono::{DateTime, Utc};

use super::FetchContext;
use crate::models::{ArtistInfo, SpotifyDaily};
use crate::sources::spotify::{SpotifyImage, SpotifyTopTracks};
use crate::sources::SpotifyArtist;

/// Popularity summary of the top tracks: (max, mean, count of numeric entries)
pub fn summarize_top_tracks(top_tracks: &SpotifyTopTracks) -> (Option<f64>, Option<f64>, i64) {
    let values: Vec<f64> = top_tracks
        .tracks
        .iter()
        .filter_map(|t| t.popularity.as_ref().and_then(serde_json::Value::as_f64))
        .collect();

    if values.is_empty() {
        return (None, None, 0);
    }

    let max = values.iter().copied().fold(f64::MIN, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    (Some(max), Some(mean), values.len() as i64)
}

/// Daily snapshot from the artist object and (optionally) its top tracks
pub fn spotify_daily(
    ctx: &FetchContext<'_>,
    spotify_artist_id: &str,
    artist: &SpotifyArtist,
    top_tracks: Option<&SpotifyTopTracks>,
    artist_request_id: &str,
    top_tracks_request_id: Option<&str>,
) -> SpotifyDaily {
    let (max, mean, count) = match top_tracks {
        Some(tracks) => {
            let (max, mean, count) = summarize_top_tracks(tracks);
            (max, mean, Some(count))
        }
        None => (None, None, None),
    };

    SpotifyDaily {
        local_artist_id: ctx.local_artist_id.to_string(),
        spotify_artist_id: artist
            .id
            .clone()
            .unwrap_or_else(|| spotify_artist_id.to_string()),
        day: ctx.day,
        fetched_at: ctx.fetched_at,
        job_run_id: Some(ctx.job_run_id.to_string()),
        artist_request_id: Some(artist_request_id.to_string()),
        top_tracks_request_id: top_tracks_request_id.map(str::to_string),
        followers_total: artist.followers.as_ref().and_then(|f| f.total),
        popularity: artist.popularity,
        top_track_popularity_max: max,
        top_track_popularity_mean: mean,
        num_top_tracks: count,
    }
}

/// Reference fields carried by a Spotify artist object
pub fn spotify_artist_info(
    local_artist_id: &str,
    artist: &SpotifyArtist,
    fetched_at: DateTime<Utc>,
    job_run_id: &str,
    request_id: &str,
) -> ArtistInfo {
    ArtistInfo {
        artist_name: artist.name.clone(),
        spotify_artist_id: artist.id.clone(),
        genres: artist.genres.clone(),
        image_url: best_image_url(&artist.images),
        spotify_url: artist.external_urls.as_ref().and_then(|u| u.spotify.clone()),
        fetched_at: Some(fetched_at),
        job_run_id: Some(job_run_id.to_string()),
        spotify_request_id: Some(request_id.to_string()),
        ..ArtistInfo::new(local_artist_id)
    }
}

/// URL of the image with the largest pixel area; unknown dimensions count as 0
fn best_image_url(images: &[SpotifyImage]) -> Option<String> {
    images
        .iter()
        .filter(|im| im.url.is_some())
        .enumerate()
        // Earliest wins among equal areas
        .max_by_key(|(idx, im)| {
            let area = u64::from(im.width.unwrap_or(0)) * u64::from(im.height.unwrap_or(0));
            (area, std::cmp::Reverse(*idx))
        })
        .and_then(|(_, im)| im.url.clone())
}
