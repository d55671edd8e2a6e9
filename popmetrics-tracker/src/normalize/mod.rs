//! Payload to record mapping
//!
//! Pure functions: no HTTP, no store access. Provenance (day, fetch time,
//! run and request ids) is passed in by the caller.

pub mod spotify;
pub mod wikipedia;
pub mod youtube;

use chrono::{DateTime, NaiveDate, Utc};

/// Where and when a payload was fetched
#[derive(Debug, Clone)]
pub struct FetchContext<'a> {
    pub local_artist_id: &'a str,
    pub day: NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub job_run_id: &'a str,
}
