//! Tracker configuration
//!
//! Resolution order: command line > environment > TOML > compiled default.
//! Credentials are optional here; a missing one only matters when the
//! client needing it is built.

use popmetrics_common::config::{
    resolve_path, resolve_string, write_toml_config, CompiledDefaults, TomlConfig,
};
use popmetrics_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use crate::sources::{HttpSettings, SpotifyClient, WikipediaClient, YoutubeClient};
use crate::workflow::PlatformClients;

pub const DEFAULT_MARKET: &str = "FR";
pub const UNKNOWN_BUILD: &str = "unknown";

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub database_path: PathBuf,
    pub artists_path: PathBuf,
    pub build_version: String,
    pub log_level: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_market: String,
    pub youtube_api_key: Option<String>,
    pub contact_email: Option<String>,
    pub http: HttpSettings,
}

impl TrackerConfig {
    /// Resolve every setting from CLI arguments, environment and TOML
    pub fn resolve(cli_database: Option<&Path>, cli_artists: Option<&Path>, toml: &TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        Self {
            database_path: resolve_path(
                cli_database,
                "POPMETRICS_DB",
                toml.database_path.as_deref(),
                &defaults.database_path,
            ),
            artists_path: resolve_path(
                cli_artists,
                "POPMETRICS_ARTISTS",
                toml.artists_path.as_deref(),
                &defaults.artists_path,
            ),
            build_version: resolve_string(
                &["POPMETRICS_BUILD_VERSION", "COMMIT_HASH"],
                toml.build_version.as_deref(),
            )
            .unwrap_or_else(|| UNKNOWN_BUILD.to_string()),
            log_level: toml.logging.level.clone(),
            spotify_client_id: resolve_string(&["SPOTIFY_CLIENT_ID"], toml.spotify.client_id.as_deref()),
            spotify_client_secret: resolve_string(
                &["SPOTIFY_CLIENT_SECRET"],
                toml.spotify.client_secret.as_deref(),
            ),
            spotify_market: resolve_string(&[], toml.spotify.market.as_deref())
                .unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            youtube_api_key: resolve_string(&["YOUTUBE_API_KEY"], toml.youtube.api_key.as_deref()),
            contact_email: resolve_string(&["CONTACT_EMAIL"], toml.wikipedia.contact_email.as_deref()),
            http: HttpSettings::from_section(&toml.http),
        }
    }

    /// Build every platform client the credentials allow
    ///
    /// A client that cannot be built is logged and left out; the job phase
    /// that needs it then fails with a setup error recorded in lineage.
    pub fn build_clients(&self) -> PlatformClients {
        let spotify = SpotifyClient::new(
            self.spotify_client_id.clone().unwrap_or_default(),
            self.spotify_client_secret.clone().unwrap_or_default(),
            self.spotify_market.clone(),
            &self.http,
        );
        let wikipedia = WikipediaClient::new(self.contact_email.as_deref().unwrap_or_default(), &self.http);
        let youtube = YoutubeClient::new(self.youtube_api_key.clone().unwrap_or_default(), &self.http);

        let mut clients = PlatformClients::default();
        match spotify {
            Ok(c) => clients.spotify = Some(Arc::new(c)),
            Err(e) => error!(platform = "spotify", error = %e, "Client unavailable"),
        }
        match wikipedia {
            Ok(c) => clients.wikipedia = Some(Arc::new(c)),
            Err(e) => error!(platform = "wikipedia", error = %e, "Client unavailable"),
        }
        match youtube {
            Ok(c) => clients.youtube = Some(Arc::new(c)),
            Err(e) => error!(platform = "youtube", error = %e, "Client unavailable"),
        }

        info!(
            spotify = clients.spotify.is_some(),
            wikipedia = clients.wikipedia.is_some(),
            youtube = clients.youtube.is_some(),
            "Platform clients ready"
        );
        clients
    }
}

/// Starter `popmetrics.toml` with the compiled defaults spelled out
pub fn starter_config() -> TomlConfig {
    let defaults = CompiledDefaults::for_current_platform();
    let mut config = TomlConfig {
        database_path: Some(defaults.database_path),
        artists_path: Some(defaults.artists_path),
        ..TomlConfig::default()
    };
    config.spotify.market = Some(DEFAULT_MARKET.to_string());
    config
}

/// Write [`starter_config`] to `path`
///
/// An existing file is only replaced with `force`.
pub fn init_config_file(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    write_toml_config(&starter_config(), path)?;
    info!(path = %path.display(), "Wrote starter config");
    Ok(())
}
