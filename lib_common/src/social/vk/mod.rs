//! # VK API Integration
//!
//! - **`newsfeed`**: the frequency client (`NewsfeedClient`), the
//!   `FrequencySource` trait and the `PostsManager` facade.
//! - **`extract`**: reads `response.count` out of search responses.

/// Reading counts out of response bodies.
pub mod extract;
/// Per-hour frequency queries against `newsfeed.search`.
pub mod newsfeed;

pub use extract::{extract_count, extract_counts};
pub use newsfeed::{
    FrequencySource, HourlyFrequency, NewsfeedClient, PostsManager, API_VERSION,
    NEWSFEED_SEARCH_ROUTE, VK_API_HOST, VK_API_PORT,
};
