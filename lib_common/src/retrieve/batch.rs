//! # Batch Dispatcher
//!
//! Executes an ordered list of [`LogicalRequest`]s against one endpoint and
//! hands back the bodies in the same order.
//!
//! The batch is all-or-nothing. The first failing request aborts the batch and
//! the caller receives one error naming that request's index; no partial list
//! is ever returned.
//!
//! Two modes are available:
//! - [`DispatchMode::Sequential`] (default): request `i + 1` is not sent until
//!   the body of request `i` has been fully received.
//! - [`DispatchMode::Concurrent`]: up to `max_in_flight` requests run at once.
//!   Results are put back in input order before they are returned. When one
//!   request fails, the requests still in flight are dropped, not awaited.

use std::num::NonZeroUsize;
use std::time::Instant;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::errors::FetchError;
use super::ky_http::{ApiClient, Endpoint, RawResponse, TransportSettings};
use super::params::LogicalRequest;

/// How the requests of one batch are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DispatchMode {
    /// One request at a time, in input order.
    #[default]
    Sequential,
    /// Bounded parallelism.
    Concurrent {
        /// Maximum number of requests in flight.
        max_in_flight: NonZeroUsize,
    },
}

impl DispatchMode {
    /// Concurrent mode with `limit` requests in flight.
    ///
    /// # Errors
    /// `InvalidArgument` when `limit` is zero.
    pub fn concurrent(limit: usize) -> Result<Self, FetchError> {
        NonZeroUsize::new(limit)
            .map(|max_in_flight| DispatchMode::Concurrent { max_in_flight })
            .ok_or_else(|| FetchError::invalid("concurrency limit must be at least 1"))
    }
}

/// Runs one batch with a freshly built client, then releases it.
///
/// The output has one [`RawResponse`] per request, index for index. An empty
/// batch returns an empty list without touching the network.
///
/// # Errors
/// - `InvalidArgument` if the endpoint is malformed (nothing is sent).
/// - `Transport { index, .. }` for the first request that fails.
pub async fn dispatch(
    endpoint: &Endpoint,
    settings: &TransportSettings,
    mode: DispatchMode,
    requests: &[LogicalRequest],
) -> Result<Vec<RawResponse>, FetchError> {
    let client = ApiClient::new(endpoint, settings)?;
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    info!(
        base = %client.base_url(),
        requests = requests.len(),
        ?mode,
        "dispatching batch"
    );

    let result = match mode {
        DispatchMode::Sequential => run_sequential(&client, requests).await,
        DispatchMode::Concurrent { max_in_flight } => {
            run_concurrent(&client, requests, max_in_flight.get()).await
        }
    };

    match &result {
        Ok(responses) => info!(
            responses = responses.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch complete"
        ),
        Err(e) => warn!(
            kind = e.kind(),
            index = ?e.index(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch aborted: {e}"
        ),
    }
    result
}

async fn run_sequential(
    client: &ApiClient,
    requests: &[LogicalRequest],
) -> Result<Vec<RawResponse>, FetchError> {
    let mut responses = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let response = fetch_one(client, index, request).await?;
        responses.push(response);
    }
    Ok(responses)
}

async fn run_concurrent(
    client: &ApiClient,
    requests: &[LogicalRequest],
    max_in_flight: usize,
) -> Result<Vec<RawResponse>, FetchError> {
    // Keep these eager: the returned future must stay Send.
    let pending: Vec<_> = requests
        .iter()
        .enumerate()
        .map(|(index, request)| async move {
            fetch_one(client, index, request)
                .await
                .map(|response| (index, response))
        })
        .collect();

    // try_collect returns on the first error; dropping the stream cancels the rest.
    let mut indexed: Vec<(usize, RawResponse)> = stream::iter(pending)
        .buffer_unordered(max_in_flight)
        .try_collect()
        .await?;

    indexed.sort_unstable_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, response)| response).collect())
}

async fn fetch_one(
    client: &ApiClient,
    index: usize,
    request: &LogicalRequest,
) -> Result<RawResponse, FetchError> {
    let response = client
        .get(request)
        .await
        .map_err(|source| FetchError::Transport { index, source })?;
    debug!(index, status = response.status, bytes = response.body.len(), "response received");
    Ok(response)
}
