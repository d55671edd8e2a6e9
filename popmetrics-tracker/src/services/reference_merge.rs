//! Reference-info merge
//!
//! Merge strategy: new values overwrite old, old values preserved if new is
//! NULL. Applied field by field; an empty genre list counts as NULL.

use crate::models::ArtistInfo;

/// Overlay `update` onto `base`, never replacing a known value with an unknown one
///
/// The artist id of `base` is kept.
pub fn merge_artist_info(base: &ArtistInfo, update: &ArtistInfo) -> ArtistInfo {
    fn pick<T: Clone>(new: &Option<T>, old: &Option<T>) -> Option<T> {
        new.clone().or_else(|| old.clone())
    }

    ArtistInfo {
        local_artist_id: base.local_artist_id.clone(),
        artist_name: pick(&update.artist_name, &base.artist_name),
        spotify_artist_id: pick(&update.spotify_artist_id, &base.spotify_artist_id),
        wiki_title: pick(&update.wiki_title, &base.wiki_title),
        youtube_channel_id: pick(&update.youtube_channel_id, &base.youtube_channel_id),
        country: pick(&update.country, &base.country),
        debut_year: pick(&update.debut_year, &base.debut_year),
        genres: if update.genres.is_empty() {
            base.genres.clone()
        } else {
            update.genres.clone()
        },
        image_url: pick(&update.image_url, &base.image_url),
        spotify_url: pick(&update.spotify_url, &base.spotify_url),
        wikipedia_url: pick(&update.wikipedia_url, &base.wikipedia_url),
        youtube_channel_url: pick(&update.youtube_channel_url, &base.youtube_channel_url),
        fetched_at: pick(&update.fetched_at, &base.fetched_at),
        job_run_id: pick(&update.job_run_id, &base.job_run_id),
        spotify_request_id: pick(&update.spotify_request_id, &base.spotify_request_id),
        wikipedia_request_id: pick(&update.wikipedia_request_id, &base.wikipedia_request_id),
        youtube_request_id: pick(&update.youtube_request_id, &base.youtube_request_id),
    }
}

/// Fold updates onto `base` in order; later updates win where they know more
pub fn merge_many<'a>(base: ArtistInfo, updates: impl IntoIterator<Item = &'a ArtistInfo>) -> ArtistInfo {
    updates
        .into_iter()
        .fold(base, |acc, update| merge_artist_info(&acc, update))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_does_not_overwrite_known_value() {
        let mut stored = ArtistInfo::new("artist_z");
        stored.image_url = Some("old.png".to_string());

        let mut update = ArtistInfo::new("artist_z");
        update.artist_name = Some("Artist Z".to_string());

        let merged = merge_artist_info(&stored, &update);
        assert_eq!(merged.image_url.as_deref(), Some("old.png"));
        assert_eq!(merged.artist_name.as_deref(), Some("Artist Z"));
    }

    #[test]
    fn test_newer_value_wins() {
        let mut stored = ArtistInfo::new("artist_z");
        stored.image_url = Some("old.png".to_string());
        stored.genres = vec!["rock".to_string()];

        let mut update = ArtistInfo::new("artist_z");
        update.image_url = Some("new.png".to_string());

        let merged = merge_artist_info(&stored, &update);
        assert_eq!(merged.image_url.as_deref(), Some("new.png"));
        assert_eq!(merged.genres, vec!["rock".to_string()]);
    }

    #[test]
    fn test_merge_many_layers_platforms() {
        let mut spotify = ArtistInfo::new("a");
        spotify.artist_name = Some("From Spotify".to_string());
        spotify.spotify_url = Some("https://open.spotify.com/artist/1".to_string());

        let mut wiki = ArtistInfo::new("a");
        wiki.wikipedia_url = Some("https://en.wikipedia.org/wiki/A".to_string());

        let merged = merge_many(ArtistInfo::new("a"), [&spotify, &wiki]);
        assert_eq!(merged.artist_name.as_deref(), Some("From Spotify"));
        assert!(merged.spotify_url.is_some());
        assert!(merged.wikipedia_url.is_some());
        assert!(merged.youtube_channel_url.is_none());
    }
}
