//! # Popmetrics Common Library
//!
//! Shared code for the popmetrics workspace:
//! - Error and result types
//! - Configuration loading (TOML + environment)
//! - Timestamp formatting used by every persisted record
//! - Injectable id generation

pub mod config;
pub mod error;
pub mod ids;
pub mod time;

pub use error::{Error, Result};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
