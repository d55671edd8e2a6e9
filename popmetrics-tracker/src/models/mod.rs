//! Typed records, one per persisted table
//!
//! Conversion to and from SQL rows happens only in `crate::db`.

pub mod artist;
pub mod lineage;
pub mod snapshots;

pub use artist::{ArtistInfo, TrackedArtist};
pub use lineage::{RequestParams, RequestRecord, RunRecord, RunStatus, StepRecord};
pub use snapshots::{ArtistDay, SpotifyDaily, WikiDaily, YoutubeDaily};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External platform a metric or request comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Wikipedia,
    Youtube,
}

impl Platform {
    /// All platforms in daily-job step order
    pub const ALL: [Platform; 3] = [Platform::Spotify, Platform::Wikipedia, Platform::Youtube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Wikipedia => "wikipedia",
            Platform::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = popmetrics_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spotify" => Ok(Platform::Spotify),
            "wikipedia" => Ok(Platform::Wikipedia),
            "youtube" => Ok(Platform::Youtube),
            other => Err(popmetrics_common::Error::InvalidInput(format!(
                "Unknown platform: {}",
                other
            ))),
        }
    }
}
