//! Lineage records: runs, steps and individual remote-call attempts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::Platform;

/// Opaque request parameters, ordered so the serialized form is stable
pub type RequestParams = BTreeMap<String, serde_json::Value>;

/// Status shared by runs and steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Completed or failed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = popmetrics_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(RunStatus::InProgress),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(popmetrics_common::Error::InvalidInput(format!(
                "Unknown run status: {}",
                other
            ))),
        }
    }
}

/// One execution of the daily job (or of the identity-resolution job)
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    /// Logical day (`YYYY-MM-DD`) or a job label such as `identity_retrieval`
    pub run_day: String,
    pub build_version: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub status: RunStatus,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

/// One logical phase of a run
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_run_id: String,
    pub run_id: String,
    pub step_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    /// `None` means no per-item accounting was performed
    pub success_count: Option<i64>,
    /// Always `None` exactly when `success_count` is
    pub error_count: Option<i64>,
    pub status: RunStatus,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

/// One outbound call to an external platform for one artist
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    pub request_id: String,
    pub run_id: String,
    /// `None` for identity-resolution calls
    pub step_run_id: Option<String>,
    pub source: Platform,
    pub local_artist_id: String,
    pub platform_id: String,
    pub endpoint: Option<String>,
    pub request_params: Option<RequestParams>,
    pub requested_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub http_status: Option<u16>,
    pub ok: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_roundtrip() {
        for status in [RunStatus::InProgress, RunStatus::Completed, RunStatus::Failed] {
            assert_eq!(status.as_str().parse::<RunStatus>().unwrap(), status);
        }
        assert!("done".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!RunStatus::InProgress.is_terminal());
        assert!(RunStatus::Completed.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
    }
}
