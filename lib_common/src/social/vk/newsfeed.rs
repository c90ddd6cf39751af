//! # VK Newsfeed Frequency Client
//!
//! Answers "how many posts matched this tag during each of the last N hours?"
//! by issuing one `newsfeed.search` request per hour-bucket and reducing the
//! responses to an ordered series of counts.
//!
//! ## Logic:
//! 1. Read the clock once and compute the windows `1..=hours` hours before now.
//! 2. Build one request per window: shared `access_token`, `v` and `q`, plus the
//!    window's own `start_time` / `end_time`.
//! 3. Dispatch the batch (sequential by default).
//! 4. Extract `response.count` from every body, keeping order.
//!
//! Element `i` of the result belongs to the window `i + 1` hours before now.
//! Any failure aborts the whole query; no partial series is returned.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::{error, info};

use crate::retrieve::{
    build_batch, dispatch, DispatchMode, Endpoint, FetchError, Params, TransportSettings,
};
use crate::social::vk::extract::extract_counts;
use crate::social::windows::{windows_with, Clock, SystemClock, TimeWindow, WindowAnchoring};

/// Public VK API host.
pub const VK_API_HOST: &str = "api.vk.com";
/// HTTPS port of the public API.
pub const VK_API_PORT: u16 = 443;
/// API version sent as `v`.
pub const API_VERSION: &str = "5.131";
/// Route of the search method.
pub const NEWSFEED_SEARCH_ROUTE: &str = "/method/newsfeed.search/";

/// One point of the series: the window and how many posts fell into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyFrequency {
    /// How many hours before the anchor this window starts.
    pub hours_before: u32,
    /// The queried interval.
    pub window: TimeWindow,
    /// Posts counted by the API for this interval.
    pub count: i64,
}

/// Anything that can produce per-hour counts for a tag.
pub trait FrequencySource {
    /// Counts for the windows `1..=hours` hours before now, in that order.
    fn get_frequencies(
        &self,
        tag: &str,
        hours: u32,
    ) -> impl Future<Output = Result<Vec<i64>, FetchError>> + Send;
}

/// Frequency client for the `newsfeed.search` method.
pub struct NewsfeedClient<C = SystemClock> {
    endpoint: Endpoint,
    token: String,
    api_version: String,
    route: String,
    transport: TransportSettings,
    mode: DispatchMode,
    anchoring: WindowAnchoring,
    clock: C,
}

impl NewsfeedClient<SystemClock> {
    /// A client for the public API with the system clock and sequential dispatch.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            endpoint: Endpoint::new(VK_API_HOST, VK_API_PORT, true),
            token: token.into(),
            api_version: API_VERSION.to_string(),
            route: NEWSFEED_SEARCH_ROUTE.to_string(),
            transport: TransportSettings::default(),
            mode: DispatchMode::Sequential,
            anchoring: WindowAnchoring::Batch,
            clock: SystemClock,
        }
    }
}

impl<C: Clock> NewsfeedClient<C> {
    /// Replaces the wall-clock source.
    pub fn with_clock<D: Clock>(self, clock: D) -> NewsfeedClient<D> {
        NewsfeedClient {
            endpoint: self.endpoint,
            token: self.token,
            api_version: self.api_version,
            route: self.route,
            transport: self.transport,
            mode: self.mode,
            anchoring: self.anchoring,
            clock,
        }
    }

    /// Targets another host/port/TLS mode.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Overrides the route of the search method.
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Overrides the API version sent as `v`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Sets timeout and retry behavior.
    pub fn with_transport(mut self, transport: TransportSettings) -> Self {
        self.transport = transport;
        self
    }

    /// Chooses sequential or bounded-concurrency dispatch.
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Chooses how window anchors are read from the clock.
    pub fn with_anchoring(mut self, anchoring: WindowAnchoring) -> Self {
        self.anchoring = anchoring;
        self
    }

    /// Target endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Dispatch mode in use.
    pub fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    /// Per-hour counts for `tag` over the last `hours` hours.
    ///
    /// # Errors
    /// - `InvalidArgument` when `hours` is zero or `tag` is blank; nothing is sent.
    /// - `Transport` / `Parse` naming the first failing request.
    pub async fn get_frequencies(&self, tag: &str, hours: u32) -> Result<Vec<i64>, FetchError> {
        let series = self.get_frequency_series(tag, hours).await?;
        Ok(series.into_iter().map(|point| point.count).collect())
    }

    /// Like [`NewsfeedClient::get_frequencies`], keeping each window next to its count.
    pub async fn get_frequency_series(
        &self,
        tag: &str,
        hours: u32,
    ) -> Result<Vec<HourlyFrequency>, FetchError> {
        if hours == 0 {
            return Err(FetchError::invalid("hours must be at least 1"));
        }
        if tag.trim().is_empty() {
            return Err(FetchError::invalid("tag must not be blank"));
        }

        let windows = windows_with(&self.clock, hours, self.anchoring);
        let variable_sets: Vec<Params> = windows.iter().map(window_params).collect();
        let requests = build_batch(&self.route, &self.base_params(tag), &variable_sets)?;

        let counts = dispatch(&self.endpoint, &self.transport, self.mode, &requests)
            .await
            .and_then(|responses| extract_counts(&responses))
            .inspect_err(|e| report_failure(tag, e))?;

        info!(tag, hours, total = counts.iter().sum::<i64>(), "frequencies collected");

        Ok(windows
            .into_iter()
            .zip(counts)
            .zip(1..=hours)
            .map(|((window, count), hours_before)| HourlyFrequency {
                hours_before,
                window,
                count,
            })
            .collect())
    }

    fn base_params(&self, tag: &str) -> Params {
        Params::from([
            ("access_token".to_string(), self.token.clone()),
            ("v".to_string(), self.api_version.clone()),
            ("q".to_string(), tag.to_string()),
        ])
    }
}

impl<C: Clock + Sync> FrequencySource for NewsfeedClient<C> {
    fn get_frequencies(
        &self,
        tag: &str,
        hours: u32,
    ) -> impl Future<Output = Result<Vec<i64>, FetchError>> + Send {
        NewsfeedClient::get_frequencies(self, tag, hours)
    }
}

impl<C> fmt::Debug for NewsfeedClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsfeedClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"***")
            .field("api_version", &self.api_version)
            .field("route", &self.route)
            .field("mode", &self.mode)
            .field("anchoring", &self.anchoring)
            .finish_non_exhaustive()
    }
}

fn window_params(window: &TimeWindow) -> Params {
    Params::from([
        ("start_time".to_string(), window.start().to_string()),
        ("end_time".to_string(), window.end().to_string()),
    ])
}

fn report_failure(tag: &str, err: &FetchError) {
    match err.index() {
        Some(index) => error!(
            tag,
            kind = err.kind(),
            index,
            hours_before = index + 1,
            "frequency query failed: {err}"
        ),
        None => error!(tag, kind = err.kind(), "frequency query rejected: {err}"),
    }
}

/// Thin facade over any [`FrequencySource`].
#[derive(Debug)]
pub struct PostsManager<S> {
    source: S,
}

impl<S: FrequencySource> PostsManager<S> {
    /// Wraps `source`.
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Delegates to the wrapped source.
    pub async fn get_frequencies(&self, tag: &str, hours: u32) -> Result<Vec<i64>, FetchError> {
        self.source.get_frequencies(tag, hours).await
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::windows::FixedClock;

    struct CannedSource(Vec<i64>);

    impl FrequencySource for CannedSource {
        async fn get_frequencies(&self, _tag: &str, hours: u32) -> Result<Vec<i64>, FetchError> {
            Ok(self.0.iter().copied().take(hours as usize).collect())
        }
    }

    #[tokio::test]
    async fn manager_delegates_to_its_source() {
        let manager = PostsManager::new(CannedSource(vec![3, 1, 4, 1, 5]));
        let freqs = manager.get_frequencies("#итмо", 5).await.unwrap();
        assert_eq!(freqs, vec![3, 1, 4, 1, 5]);
    }

    #[tokio::test]
    async fn zero_hours_is_rejected_before_any_request() {
        // Port 9 is never contacted: validation happens first.
        let client = NewsfeedClient::new("token")
            .with_endpoint(Endpoint::new("127.0.0.1", 9, false))
            .with_clock(FixedClock(1_000_000));

        let err = client.get_frequencies("#test", 0).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn blank_tag_is_rejected() {
        let client = NewsfeedClient::new("token").with_clock(FixedClock(1_000_000));
        let err = client.get_frequencies("   ", 3).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidArgument(_)));
    }

    #[test]
    fn base_params_carry_token_version_and_raw_tag() {
        let client = NewsfeedClient::new("secret");
        let base = client.base_params("#test&x=1");
        assert_eq!(base["access_token"], "secret");
        assert_eq!(base["v"], API_VERSION);
        assert_eq!(base["q"], "#test&x=1");
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn concurrent_queries_are_send() {
        let client = NewsfeedClient::new("token")
            .with_dispatch_mode(DispatchMode::concurrent(4).unwrap())
            .with_clock(FixedClock(1_000_000));

        assert_send(client.get_frequencies("#test", 3));
        assert_send(FrequencySource::get_frequencies(&client, "#test", 3));

        let manager = PostsManager::new(client);
        assert_send(manager.get_frequencies("#test", 3));
    }

    #[test]
    fn debug_output_hides_the_token() {
        let shown = format!("{:?}", NewsfeedClient::new("secret"));
        assert!(!shown.contains("secret"));
    }
}
