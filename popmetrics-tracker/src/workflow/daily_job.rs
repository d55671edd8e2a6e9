//! Daily collection job
//!
//! Run → one step per source (Spotify, Wikipedia, YouTube) → consolidation
//! step → run close. Inside a source step each artist is processed on its
//! own: a failed artist is tallied and the loop moves on. Only fatal errors
//! (storage, setup) escape a step, and they fail the run with it.

use chrono::NaiveDate;
use popmetrics_common::time::{format_day, now};
use tracing::{info, warn};

use super::PlatformClients;
use crate::db::{artist_info, snapshots};
use crate::error::{JobError, JobResult};
use crate::models::{Platform, TrackedArtist};
use crate::normalize::{self, FetchContext};
use crate::provenance::{Provenance, RequestTracer, RunTracer, StepTracer};
use crate::services::consolidation::{consolidate_artist, ConsolidationSummary};
use crate::sources::{SpotifyApi, WikipediaApi, YoutubeApi};

/// Name of the final step
pub const CONSOLIDATION_STEP: &str = "consolidate_daily_data";

/// Step name of a per-source collection step
pub fn step_name(platform: Platform) -> &'static str {
    match platform {
        Platform::Spotify => "process_spotify_data",
        Platform::Wikipedia => "process_wikipedia_data",
        Platform::Youtube => "process_youtube_data",
    }
}

/// Final tally of one completed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTally {
    pub step_name: String,
    pub success_count: i64,
    pub error_count: i64,
}

/// Result of a completed daily run
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub run_id: String,
    pub day: NaiveDate,
    pub steps: Vec<StepTally>,
    pub consolidation: ConsolidationSummary,
}

/// Collect, store and consolidate one day of metrics for `artists`
///
/// The run is recorded as failed when a fatal error escapes; the error is
/// returned to the caller either way.
pub async fn run_daily_job(
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
    day: NaiveDate,
) -> JobResult<DailyReport> {
    let run = RunTracer::open(provenance, format_day(&day)).await?;
    let run_id = run.run_id().to_string();

    info!(run_id = %run_id, %day, artists = artists.len(), "Daily job started");

    let outcome = execute(provenance, clients, artists, day, &run_id).await;
    run.close(outcome).await
}

async fn execute(
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
    day: NaiveDate,
    run_id: &str,
) -> JobResult<DailyReport> {
    // Snapshot rows reference artist_info
    artist_info::register_tracked_artists(provenance.db(), artists).await?;

    let mut steps = Vec::with_capacity(Platform::ALL.len() + 1);
    for platform in Platform::ALL {
        steps.push(run_source_step(provenance, clients, artists, day, run_id, platform).await?);
    }

    let (tally, consolidation) = run_consolidation_step(provenance, artists, day, run_id).await?;
    steps.push(tally);

    Ok(DailyReport {
        run_id: run_id.to_string(),
        day,
        steps,
        consolidation,
    })
}

/// Identity of the step an artist is processed in
struct StepScope<'a> {
    provenance: &'a Provenance,
    run_id: String,
    step_run_id: String,
    day: NaiveDate,
}

impl StepScope<'_> {
    fn open_request(&self, platform: Platform, artist: &TrackedArtist, platform_id: &str) -> RequestTracer {
        RequestTracer::open(
            self.provenance,
            &self.run_id,
            Some(&self.step_run_id),
            platform,
            &artist.local_artist_id,
            platform_id,
        )
    }

    fn fetch_context<'b>(&'b self, artist: &'b TrackedArtist) -> FetchContext<'b> {
        FetchContext {
            local_artist_id: &artist.local_artist_id,
            day: self.day,
            fetched_at: now(),
            job_run_id: &self.run_id,
        }
    }
}

async fn run_source_step(
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
    day: NaiveDate,
    run_id: &str,
    platform: Platform,
) -> JobResult<StepTally> {
    let label = format_day(&day);
    let mut step = StepTracer::open(
        provenance,
        run_id,
        step_name(platform),
        vec![format!("artist_list:{}", label)],
        vec![format!("{}_daily:{}", platform, label)],
    )
    .await?;

    let outcome = collect_all(&mut step, provenance, clients, artists, day, platform).await;
    step.close(outcome).await
}

async fn collect_all(
    step: &mut StepTracer,
    provenance: &Provenance,
    clients: &PlatformClients,
    artists: &[TrackedArtist],
    day: NaiveDate,
    platform: Platform,
) -> JobResult<StepTally> {
    let scope = StepScope {
        provenance,
        run_id: step.run_id().to_string(),
        step_run_id: step.step_run_id().to_string(),
        day,
    };

    match platform {
        Platform::Spotify => {
            let client = clients.spotify()?;
            for artist in artists {
                let result = collect_spotify(&scope, client, artist).await;
                tally(step, platform, artist, result)?;
            }
        }
        Platform::Wikipedia => {
            let client = clients.wikipedia()?;
            for artist in artists {
                let result = collect_wikipedia(&scope, client, artist).await;
                tally(step, platform, artist, result)?;
            }
        }
        Platform::Youtube => {
            let client = clients.youtube()?;
            for artist in artists {
                let result = collect_youtube(&scope, client, artist).await;
                tally(step, platform, artist, result)?;
            }
        }
    }

    Ok(StepTally {
        step_name: step.step_name().to_string(),
        success_count: step.success_count(),
        error_count: step.error_count(),
    })
}

/// Count one artist's outcome; fatal errors are passed up instead
fn tally(
    step: &mut StepTracer,
    platform: Platform,
    artist: &TrackedArtist,
    result: JobResult<()>,
) -> JobResult<()> {
    match result {
        Ok(()) => step.record_success(),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(
                %platform,
                local_artist_id = %artist.local_artist_id,
                error_type = crate::error::TracedError::kind(&e),
                error = %e,
                "Artist skipped"
            );
            step.record_error();
        }
    }
    Ok(())
}

fn platform_id<'a>(platform: Platform, artist: &'a TrackedArtist) -> JobResult<&'a str> {
    artist
        .platform_id(platform)
        .ok_or_else(|| JobError::MissingPlatformId {
            platform,
            local_artist_id: artist.local_artist_id.clone(),
        })
}

async fn collect_spotify(scope: &StepScope<'_>, client: &dyn SpotifyApi, artist: &TrackedArtist) -> JobResult<()> {
    let spotify_id = platform_id(Platform::Spotify, artist)?;

    let mut req = scope.open_request(Platform::Spotify, artist, spotify_id);
    let artist_request_id = req.request_id().to_string();
    let result = client.get_artist(spotify_id, &mut req).await.map_err(JobError::from);
    let payload = req.close(result).await?;

    let mut req = scope.open_request(Platform::Spotify, artist, spotify_id);
    let top_tracks_request_id = req.request_id().to_string();
    let result = client.get_top_tracks(spotify_id, &mut req).await.map_err(JobError::from);
    let top_tracks = req.close(result).await?;

    let daily = normalize::spotify::spotify_daily(
        &scope.fetch_context(artist),
        spotify_id,
        &payload,
        Some(&top_tracks),
        &artist_request_id,
        Some(&top_tracks_request_id),
    );
    snapshots::upsert_spotify_daily(scope.provenance.db(), &daily).await?;
    Ok(())
}

async fn collect_wikipedia(
    scope: &StepScope<'_>,
    client: &dyn WikipediaApi,
    artist: &TrackedArtist,
) -> JobResult<()> {
    let title = platform_id(Platform::Wikipedia, artist)?;

    let mut req = scope.open_request(Platform::Wikipedia, artist, title);
    let request_id = req.request_id().to_string();
    let result = client
        .get_daily_pageviews(title, scope.day, &mut req)
        .await
        .map_err(JobError::from);
    let pageviews = req.close(result).await?;

    let daily = normalize::wikipedia::wiki_daily(&scope.fetch_context(artist), title, &pageviews, &request_id);
    snapshots::upsert_wiki_daily(scope.provenance.db(), &daily).await?;
    Ok(())
}

async fn collect_youtube(scope: &StepScope<'_>, client: &dyn YoutubeApi, artist: &TrackedArtist) -> JobResult<()> {
    let channel_id = platform_id(Platform::Youtube, artist)?;

    let mut req = scope.open_request(Platform::Youtube, artist, channel_id);
    let request_id = req.request_id().to_string();
    let result = client.get_channel(channel_id, &mut req).await.map_err(JobError::from);
    let channels = req.close(result).await?;

    let daily = normalize::youtube::youtube_daily(&scope.fetch_context(artist), channel_id, &channels, &request_id);
    snapshots::upsert_youtube_daily(scope.provenance.db(), &daily).await?;
    Ok(())
}

async fn run_consolidation_step(
    provenance: &Provenance,
    artists: &[TrackedArtist],
    day: NaiveDate,
    run_id: &str,
) -> JobResult<(StepTally, ConsolidationSummary)> {
    let label = format_day(&day);
    let inputs = Platform::ALL
        .iter()
        .map(|p| format!("{}_daily:{}", p, label))
        .collect();

    let mut step = StepTracer::open(
        provenance,
        run_id,
        CONSOLIDATION_STEP,
        inputs,
        vec![format!("artist_day:{}", label)],
    )
    .await?;

    let outcome = consolidate_all(&mut step, provenance, artists, day).await;
    step.close(outcome).await
}

/// Every artist counts as a success, written or skipped; storage errors are fatal
async fn consolidate_all(
    step: &mut StepTracer,
    provenance: &Provenance,
    artists: &[TrackedArtist],
    day: NaiveDate,
) -> JobResult<(StepTally, ConsolidationSummary)> {
    let mut summary = ConsolidationSummary::default();

    for artist in artists {
        match consolidate_artist(provenance.db(), &artist.local_artist_id, day).await? {
            Some(_) => summary.written += 1,
            None => summary.skipped += 1,
        }
        step.record_success();
    }

    info!(
        step_run_id = %step.step_run_id(),
        %day,
        written = summary.written,
        skipped = summary.skipped,
        "Consolidation finished"
    );

    let tally = StepTally {
        step_name: step.step_name().to_string(),
        success_count: step.success_count(),
        error_count: step.error_count(),
    };
    Ok((tally, summary))
}
