//! Identity resolution: search fallback, run-level requests, coalescing merge

mod helpers;

use helpers::{provenance, tracked, Fakes};
use popmetrics_tracker::db::{artist_info, lineage};
use popmetrics_tracker::models::{ArtistInfo, Platform, RunStatus, TrackedArtist};
use popmetrics_tracker::workflow::{run_identity_job, PlatformClients, IDENTITY_RUN_DAY};
use popmetrics_tracker::JobError;

#[tokio::test]
async fn test_known_ids_are_fetched_and_merged() {
    let prov = provenance().await;
    let fakes = Fakes::default();

    let report = run_identity_job(&prov, &fakes.clients(), &[tracked("artist_x")])
        .await
        .unwrap();
    assert_eq!(report.artists, 1);
    assert_eq!(report.lookups_ok, 3);
    assert_eq!(report.lookups_failed, 0);

    let run = lineage::load_run(prov.db(), &report.run_id).await.unwrap().unwrap();
    assert_eq!(run.run_day, IDENTITY_RUN_DAY);
    assert_eq!(run.status, RunStatus::Completed);
    assert!(lineage::list_steps(prov.db(), &report.run_id).await.unwrap().is_empty());

    let requests = lineage::list_requests_for_run(prov.db(), &report.run_id).await.unwrap();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.step_run_id.is_none() && r.ok));

    let info = artist_info::load_artist_info(prov.db(), "artist_x").await.unwrap().unwrap();
    assert_eq!(info.artist_name.as_deref(), Some("Name of sp_artist_x"));
    assert_eq!(info.genres, vec!["pop".to_string()]);
    assert_eq!(info.wiki_title.as_deref(), Some("Wiki_artist_x"));
    assert_eq!(info.job_run_id.as_deref(), Some(report.run_id.as_str()));

    let spotify_request = requests.iter().find(|r| r.source == Platform::Spotify).unwrap();
    assert_eq!(info.spotify_request_id.as_deref(), Some(spotify_request.request_id.as_str()));
}

#[tokio::test]
async fn test_missing_ids_are_discovered_by_search() {
    let prov = provenance().await;
    let fakes = Fakes::default();

    let report = run_identity_job(&prov, &fakes.clients(), &[TrackedArtist::new("artist_q")])
        .await
        .unwrap();
    assert_eq!(report.lookups_ok, 3);

    // Spotify search returns the artist itself; the other two search then fetch
    let requests = lineage::list_requests_for_run(prov.db(), &report.run_id).await.unwrap();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().any(|r| r.endpoint.as_deref() == Some("/w/api.php")));

    let info = artist_info::load_artist_info(prov.db(), "artist_q").await.unwrap().unwrap();
    assert_eq!(info.spotify_artist_id.as_deref(), Some("sp_artist_q"));
    assert_eq!(info.wiki_title.as_deref(), Some("Wiki_artist_q"));
    assert_eq!(info.youtube_channel_id.as_deref(), Some("UC_artist_q"));
    assert_eq!(
        info.youtube_channel_url.as_deref(),
        Some("https://www.youtube.com/channel/UC_artist_q")
    );
}

#[tokio::test]
async fn test_failed_lookup_keeps_stored_reference_fields() {
    let prov = provenance().await;

    let mut stored = ArtistInfo::from_tracked(&tracked("artist_z"));
    stored.image_url = Some("old.png".to_string());
    stored.country = Some("FR".to_string());
    artist_info::upsert_artist_info(prov.db(), &stored).await.unwrap();

    let fakes = Fakes::default();
    fakes.spotify.fail_for("sp_artist_z");

    let report = run_identity_job(&prov, &fakes.clients(), &[tracked("artist_z")])
        .await
        .unwrap();
    assert_eq!(report.lookups_ok, 2);
    assert_eq!(report.lookups_failed, 1);

    let run = lineage::load_run(prov.db(), &report.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let failed = lineage::list_failed_requests(prov.db(), &report.run_id).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].source, Platform::Spotify);
    assert_eq!(failed[0].http_status, Some(404));

    let info = artist_info::load_artist_info(prov.db(), "artist_z").await.unwrap().unwrap();
    assert_eq!(info.image_url.as_deref(), Some("old.png"));
    assert_eq!(info.country.as_deref(), Some("FR"));
    assert_eq!(info.artist_name, None);
    assert_eq!(info.wikipedia_url.as_deref(), Some("https://en.wikipedia.org/wiki/Wiki_artist_z"));
}

#[tokio::test]
async fn test_missing_client_fails_identity_run() {
    let prov = provenance().await;
    let fakes = Fakes::default();
    let clients = PlatformClients {
        wikipedia: None,
        ..fakes.clients()
    };

    let err = run_identity_job(&prov, &clients, &[tracked("artist_x")])
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Setup(_)));

    let runs = lineage::list_runs_for_day(prov.db(), IDENTITY_RUN_DAY).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].error_type.as_deref(), Some("setup"));
}
