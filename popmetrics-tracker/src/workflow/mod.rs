//! Jobs: the daily collection run and the identity-resolution run
//!
//! Both run sequentially: one source at a time, one artist at a time, one
//! remote call at a time, in registry order.

pub mod daily_job;
pub mod identity_job;

use std::sync::Arc;

use crate::error::JobError;
use crate::models::Platform;
use crate::sources::{SpotifyApi, WikipediaApi, YoutubeApi};

pub use daily_job::{run_daily_job, DailyReport, StepTally};
pub use identity_job::{run_identity_job, IdentityReport, IDENTITY_RUN_DAY};

/// Platform clients available to a job
///
/// A missing client fails the phase that needs it (a setup failure), so
/// the failure is recorded in lineage rather than hidden.
#[derive(Clone, Default)]
pub struct PlatformClients {
    pub spotify: Option<Arc<dyn SpotifyApi>>,
    pub wikipedia: Option<Arc<dyn WikipediaApi>>,
    pub youtube: Option<Arc<dyn YoutubeApi>>,
}

impl PlatformClients {
    pub(crate) fn spotify(&self) -> Result<&dyn SpotifyApi, JobError> {
        self.spotify.as_deref().ok_or_else(|| missing_client(Platform::Spotify))
    }

    pub(crate) fn wikipedia(&self) -> Result<&dyn WikipediaApi, JobError> {
        self.wikipedia
            .as_deref()
            .ok_or_else(|| missing_client(Platform::Wikipedia))
    }

    pub(crate) fn youtube(&self) -> Result<&dyn YoutubeApi, JobError> {
        self.youtube.as_deref().ok_or_else(|| missing_client(Platform::Youtube))
    }
}

fn missing_client(platform: Platform) -> JobError {
    JobError::Setup(format!("{} client is not configured", platform))
}
