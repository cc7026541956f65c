//! Shared embargo-list domain primitives.
//!
//! This crate owns block-list reconciliation (entries, partitions, diffs) and
//! the request/response contracts of both handlers. It intentionally excludes
//! AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod diff;
pub mod entry;
pub mod list_file;
pub mod notification;
