//! Tracked-artist registry
//!
//! A JSON array of `{ local_artist_id, spotify_artist_id?, wiki_title?,
//! youtube_channel_id? }`. Order is kept: jobs process artists in file
//! order. Blank platform ids count as missing.

use popmetrics_common::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::models::TrackedArtist;

/// Load and validate the registry file
pub fn load_registry(path: &Path) -> Result<Vec<TrackedArtist>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read artist registry {} failed: {}", path.display(), e)))?;
    let artists = parse_registry(&content)?;

    info!(path = %path.display(), artists = artists.len(), "Loaded artist registry");
    Ok(artists)
}

/// Parse and validate registry JSON
pub fn parse_registry(json: &str) -> Result<Vec<TrackedArtist>> {
    let raw: Vec<TrackedArtist> = serde_json::from_str(json)
        .map_err(|e| Error::Config(format!("Invalid artist registry: {}", e)))?;

    let mut seen = HashSet::with_capacity(raw.len());
    let mut artists = Vec::with_capacity(raw.len());

    for mut artist in raw {
        artist.local_artist_id = artist.local_artist_id.trim().to_string();
        if artist.local_artist_id.is_empty() {
            return Err(Error::Config("Artist registry entry with empty local_artist_id".to_string()));
        }
        if !seen.insert(artist.local_artist_id.clone()) {
            return Err(Error::Config(format!(
                "Duplicate local_artist_id in artist registry: {}",
                artist.local_artist_id
            )));
        }

        for id in [
            &mut artist.spotify_artist_id,
            &mut artist.wiki_title,
            &mut artist.youtube_channel_id,
        ] {
            if id.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *id = None;
            }
        }

        artists.push(artist);
    }

    Ok(artists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_order_is_preserved() {
        let artists = parse_registry(
            r#"[
                {"local_artist_id": "b", "spotify_artist_id": "sp_b"},
                {"local_artist_id": "a", "wiki_title": "A", "youtube_channel_id": ""}
            ]"#,
        )
        .unwrap();

        let ids: Vec<_> = artists.iter().map(|a| a.local_artist_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(artists[1].youtube_channel_id, None);
        assert_eq!(artists[1].wiki_title.as_deref(), Some("A"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = parse_registry(r#"[{"local_artist_id": "a"}, {"local_artist_id": "a"}]"#);
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Duplicate")));
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(parse_registry(r#"[{"local_artist_id": "  "}]"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"local_artist_id": "artist_x"}}]"#).unwrap();

        let artists = load_registry(file.path()).unwrap();
        assert_eq!(artists, vec![TrackedArtist::new("artist_x")]);
    }
}
