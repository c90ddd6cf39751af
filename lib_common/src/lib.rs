//! # lib_common
//!
//! Shared library of the workspace: a batch HTTP engine and the VK newsfeed
//! frequency client built on it. Each top-level folder is a cargo feature.
//!
//! ```no_run
//! # async fn demo() -> Result<(), lib_common::retrieve::FetchError> {
//! use lib_common::social::vk::NewsfeedClient;
//!
//! let client = NewsfeedClient::new("service-token");
//! let per_hour = client.get_frequencies("#rust", 24).await?;
//! assert_eq!(per_hour.len(), 24);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Settings files and credential loading.
#[cfg(feature = "configs")]
pub mod configs;
/// Structured logging setup.
#[cfg(feature = "loggers")]
pub mod loggers;
/// Batch HTTP engine.
#[cfg(feature = "retrieve")]
pub mod retrieve;
/// Social network frequency clients.
#[cfg(feature = "social")]
pub mod social;
