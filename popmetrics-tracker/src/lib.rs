//! popmetrics-tracker library interface
//!
//! Daily artist-popularity collection with full lineage: every stored
//! metric traces back to the run, step and HTTP request that produced it.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod provenance;
pub mod registry;
pub mod services;
pub mod sources;
pub mod workflow;

pub use crate::error::{JobError, JobResult, SourceError, TracedError};
pub use crate::provenance::Provenance;
