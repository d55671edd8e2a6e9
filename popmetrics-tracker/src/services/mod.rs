//! Merge services over stored snapshots and reference records

pub mod consolidation;
pub mod reference_merge;

pub use consolidation::{consolidate, consolidate_artist, ConsolidationSummary};
pub use reference_merge::{merge_artist_info, merge_many};
