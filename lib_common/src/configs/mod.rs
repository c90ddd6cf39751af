//! # Configuration Modules
//!
//! This module aggregates configuration providers for the frequency client:
//! JSON settings files with defaults, and access token resolution.

/// Newsfeed client settings and credential loading.
pub mod config_newsfeed;

pub use config_newsfeed::{read_token_file, ConfigError, NewsfeedSettings};
