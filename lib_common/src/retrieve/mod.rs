//! # Data Retrieval Module
//!
//! The batch HTTP engine. A batch starts as one route, one shared parameter
//! set and an ordered list of per-call parameter sets; it ends as an ordered
//! list of response bodies, or a single error naming the request that failed.
//!
//! ## Contained Modules:
//!
//! - **`params`**: parameter composition (per-call values override shared
//!   ones) and batch building, including the one-time query encoding.
//! - **`ky_http`**: a batch-scoped `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with optional exponential backoff retries.
//! - **`batch`**: sequential or bounded-concurrency dispatch with fail-fast
//!   semantics and order-preserving reassembly.
//! - **`errors`**: the `FetchError` taxonomy shared by every stage.

/// Error taxonomy for batch operations.
pub mod errors;
/// Parameter composition and batch building.
pub mod params;
/// Batch-scoped HTTP client.
pub mod ky_http;
/// Ordered, fail-fast batch dispatch.
pub mod batch;

pub use batch::{dispatch, DispatchMode};
pub use errors::{ExtractError, FetchError, TransportError};
pub use ky_http::{ApiClient, Endpoint, RawResponse, TransportSettings};
pub use params::{build_batch, compose, params, BatchSpec, LogicalRequest, Params};
