//! # Social Network Search Module
//!
//! Clients that turn a hashtag and a number of hours into a per-hour series of
//! post counts, built on the batch engine in [`crate::retrieve`].
//!
//! ## Contained Modules:
//!
//! - **`windows`**: the clock abstraction and one-hour `[start, end)` windows.
//! - **`vk`**: the VK `newsfeed.search` client, its response extractor and the
//!   `PostsManager` facade.

/// Clock abstraction and hour-bucket arithmetic.
pub mod windows;
/// VK API clients.
pub mod vk;
