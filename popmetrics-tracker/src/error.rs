//! Error types for popmetrics-tracker
//!
//! Taxonomy:
//! - [`SourceError`]: one remote call failed. Transient classes are retried
//!   inside the client; whatever surfaces is a per-artist failure.
//! - [`JobError`]: anything escaping a unit of work. Storage and setup
//!   failures are fatal; the rest are tallied per artist.
//!
//! Every error that can cross a tracer scope implements [`TracedError`] so
//! the tracer can persist a stable kind next to the message.

use thiserror::Error;

use crate::models::Platform;

/// Error that a tracer can record: a stable kind plus a display message
pub trait TracedError: std::fmt::Display {
    /// Short machine-readable classification (`network`, `storage`, ...)
    fn kind(&self) -> &'static str;
}

/// Failure of one outbound call to an external platform
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport failure or timeout
    #[error("Network error: {0}")]
    Network(String),

    /// Still rate limited after exhausting retries
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Platform reports the entity does not exist (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Client cannot be used (missing credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Search returned no candidate
    #[error("No match for query: {0}")]
    NoMatch(String),
}

impl TracedError for SourceError {
    fn kind(&self) -> &'static str {
        match self {
            SourceError::Network(_) => "network",
            SourceError::RateLimited(_) => "rate_limited",
            SourceError::NotFound(_) => "not_found",
            SourceError::Api { .. } => "api_error",
            SourceError::Parse(_) => "parse_error",
            SourceError::Config(_) => "config",
            SourceError::NoMatch(_) => "no_match",
        }
    }
}

/// Failure escaping a job, step or per-artist unit of work
#[derive(Debug, Error)]
pub enum JobError {
    /// A remote call failed
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The store failed; lineage can no longer be trusted
    #[error("Storage failure: {0}")]
    Storage(#[from] popmetrics_common::Error),

    /// The registry carries no identifier for this platform
    #[error("Artist {local_artist_id} has no {platform} identifier")]
    MissingPlatformId {
        platform: Platform,
        local_artist_id: String,
    },

    /// A phase could not even begin
    #[error("Setup failed: {0}")]
    Setup(String),
}

impl JobError {
    /// Fatal errors abort the enclosing step and run instead of being tallied
    pub fn is_fatal(&self) -> bool {
        matches!(self, JobError::Storage(_) | JobError::Setup(_))
    }
}

impl TracedError for JobError {
    fn kind(&self) -> &'static str {
        match self {
            JobError::Source(e) => e.kind(),
            JobError::Storage(_) => "storage",
            JobError::MissingPlatformId { .. } => "missing_platform_id",
            JobError::Setup(_) => "setup",
        }
    }
}

impl TracedError for popmetrics_common::Error {
    fn kind(&self) -> &'static str {
        use popmetrics_common::Error;
        match self {
            Error::Database(_) => "database",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::NotFound(_) => "not_found",
            Error::InvalidInput(_) => "invalid_input",
            Error::Internal(_) => "internal",
        }
    }
}

/// Result type for job code
pub type JobResult<T> = Result<T, JobError>;
