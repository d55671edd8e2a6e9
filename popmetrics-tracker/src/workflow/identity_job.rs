//! Identity-resolution job
//!
//! Looks every tracked artist up on each platform, merges the reference
//! fields (newest non-null wins) and stores one `artist_info` row per
//! artist. Identifiers missing from the registry are discovered by search.
//! Requests belong to the run directly; this job has no steps.

use popmetrics_common::time::now;
use tracing::{info, warn};

use super::PlatformClients;
use crate::db::artist_info;
use crate::error::{JobError, JobResult, TracedError};
use crate::models::{ArtistInfo, Platform, TrackedArtist};
use crate::normalize;
use crate::provenance::{Provenance, RequestTracer, RunTracer};
use crate::services::reference_merge::merge_many;
use crate::sources::{SpotifyApi, WikipediaApi, YoutubeApi};

/// Logical day recorded on identity runs
pub const IDENTITY_RUN_DAY: &str = "identity_retrieval";

/// Result of a completed identity run
#[derive(Debug, Clone, Default)]
pub struct IdentityReport {
    pub run_id: String,
    /// Artists whose reference record was written
    pub artists: usize,
    /// Platform lookups that produced reference fields
    pub lookups_ok: usize,
    /// Platform lookups that failed and contributed nothing
    pub lookups_failed: usize,
}

/// Resolve and store reference info for every artist
pub async fn run_identity_job(
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
) -> JobResult<IdentityReport> {
    let run = RunTracer::open(provenance, IDENTITY_RUN_DAY).await?;
    let run_id = run.run_id().to_string();

    info!(run_id = %run_id, artists = artists.len(), "Identity resolution started");

    let outcome = execute(provenance, clients, artists, &run_id).await;
    run.close(outcome).await
}

async fn execute(
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
    run_id: &str,
) -> JobResult<IdentityReport> {
    let spotify = clients.spotify()?;
    let wikipedia = clients.wikipedia()?;
    let youtube = clients.youtube()?;

    let resolver = Resolver { provenance, run_id };
    let mut report = IdentityReport {
        run_id: run_id.to_string(),
        ..Default::default()
    };

    for artist in artists {
        let stored = artist_info::load_artist_info(provenance.db(), &artist.local_artist_id)
            .await?
            .unwrap_or_else(|| ArtistInfo::from_tracked(artist));

        let mut found = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            let lookup = match platform {
                Platform::Spotify => resolver.spotify(spotify, artist).await,
                Platform::Wikipedia => resolver.wikipedia(wikipedia, artist).await,
                Platform::Youtube => resolver.youtube(youtube, artist).await,
            };

            match lookup {
                Ok(info) => {
                    report.lookups_ok += 1;
                    found.push(info);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.lookups_failed += 1;
                    warn!(
                        %platform,
                        local_artist_id = %artist.local_artist_id,
                        error_type = e.kind(),
                        error = %e,
                        "Identity lookup failed"
                    );
                }
            }
        }

        let merged = merge_many(stored, &found);
        artist_info::upsert_artist_info(provenance.db(), &merged).await?;
        report.artists += 1;
    }

    info!(
        run_id = %run_id,
        artists = report.artists,
        lookups_ok = report.lookups_ok,
        lookups_failed = report.lookups_failed,
        "Identity resolution finished"
    );

    Ok(report)
}

struct Resolver<'a> {
    provenance: &'a Provenance,
    run_id: &'a str,
}

impl Resolver<'_> {
    fn open_request(&self, platform: Platform, artist: &TrackedArtist, platform_id: &str) -> RequestTracer {
        RequestTracer::open(
            self.provenance,
            self.run_id,
            None,
            platform,
            &artist.local_artist_id,
            platform_id,
        )
    }

    async fn spotify(&self, client: &dyn SpotifyApi, artist: &TrackedArtist) -> JobResult<ArtistInfo> {
        let (request_id, payload) = match artist.spotify_artist_id.as_deref() {
            Some(id) => {
                let mut req = self.open_request(Platform::Spotify, artist, id);
                let result = client.get_artist(id, &mut req).await.map_err(JobError::from);
                let request_id = req.request_id().to_string();
                (request_id, req.close(result).await?)
            }
            None => {
                let query = &artist.local_artist_id;
                let mut req = self.open_request(Platform::Spotify, artist, query);
                let result = client.search_artist(query, &mut req).await.map_err(JobError::from);
                let request_id = req.request_id().to_string();
                (request_id, req.close(result).await?)
            }
        };

        Ok(normalize::spotify::spotify_artist_info(
            &artist.local_artist_id,
            &payload,
            now(),
            self.run_id,
            &request_id,
        ))
    }

    async fn wikipedia(&self, client: &dyn WikipediaApi, artist: &TrackedArtist) -> JobResult<ArtistInfo> {
        let title = match artist.wiki_title.clone() {
            Some(title) => title,
            None => {
                let query = &artist.local_artist_id;
                let mut req = self.open_request(Platform::Wikipedia, artist, query);
                let result = client.search_title(query, &mut req).await.map_err(JobError::from);
                req.close(result).await?
            }
        };

        let mut req = self.open_request(Platform::Wikipedia, artist, &title);
        let request_id = req.request_id().to_string();
        let result = client.get_page_summary(&title, &mut req).await.map_err(JobError::from);
        let summary = req.close(result).await?;

        let mut info =
            normalize::wikipedia::wiki_artist_info(&artist.local_artist_id, &summary, now(), self.run_id, &request_id);
        // Summary may omit the title; keep the one that was looked up
        info.wiki_title.get_or_insert(title);
        Ok(info)
    }

    async fn youtube(&self, client: &dyn YoutubeApi, artist: &TrackedArtist) -> JobResult<ArtistInfo> {
        let channel_id = match artist.youtube_channel_id.clone() {
            Some(id) => id,
            None => {
                let query = &artist.local_artist_id;
                let mut req = self.open_request(Platform::Youtube, artist, query);
                let result = client.search_channel(query, &mut req).await.map_err(JobError::from);
                req.close(result).await?
            }
        };

        let mut req = self.open_request(Platform::Youtube, artist, &channel_id);
        let request_id = req.request_id().to_string();
        let result = client.get_channel(&channel_id, &mut req).await.map_err(JobError::from);
        let channels = req.close(result).await?;

        Ok(normalize::youtube::youtube_artist_info(
            &artist.local_artist_id,
            &channels,
            now(),
            self.run_id,
            &request_id,
        ))
    }
}
