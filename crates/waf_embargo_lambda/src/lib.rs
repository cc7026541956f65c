//! AWS-oriented adapters and handlers for the embargo block lists.
//!
//! This crate owns runtime integration details (Lambda handlers, WAF and S3
//! adapters, the custom-resource callback) on top of the pure reconciliation
//! and contract types in `waf_embargo_core`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
