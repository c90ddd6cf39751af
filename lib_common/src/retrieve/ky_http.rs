//! # HTTP Retrieval Utilities
//!
//! This module provides the asynchronous client wrapper around `reqwest` used by
//! the batch dispatcher. It knows how to put a [`LogicalRequest`] on the wire
//! against a fixed [`Endpoint`], and it can optionally stack the exponential
//! backoff retry middleware from `reqwest-retry`.
//!
//! A client is meant to live for exactly one batch: build it, run the batch,
//! drop it. Dropping releases the pooled connections on every exit path.

use std::time::Duration;

use reqwest::Url;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::{FetchError, TransportError};
use super::params::LogicalRequest;

/// Where requests are sent: `scheme://host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// `https` when true, `http` otherwise.
    pub use_tls: bool,
}

impl Endpoint {
    /// Creates an endpoint. Nothing is validated until [`Endpoint::base_url`].
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls,
        }
    }

    /// URL scheme implied by `use_tls`.
    pub fn scheme(&self) -> &'static str {
        if self.use_tls {
            "https"
        } else {
            "http"
        }
    }

    /// Parses `scheme://host:port` into a base URL.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty host, port 0, or a host that does not parse.
    pub fn base_url(&self) -> Result<Url, FetchError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(FetchError::invalid("host must not be empty"));
        }
        if self.port == 0 {
            return Err(FetchError::invalid("port must be non-zero"));
        }
        if host.contains(['/', '?', '#', '@']) {
            return Err(FetchError::invalid(format!("malformed host: {host:?}")));
        }

        let raw = format!("{}://{}:{}", self.scheme(), host, self.port);
        Url::parse(&raw).map_err(|e| FetchError::invalid(format!("malformed endpoint {raw}: {e}")))
    }
}

/// Per-batch transport knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Upper bound for one request, connect to last body byte.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Retries for transient failures. `0` installs no retry middleware at all.
    pub max_retries: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Status and body of one completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code (always 2xx for responses handed back by the client).
    pub status: u16,
    /// Body decoded as text.
    pub body: String,
}

/// A batch-scoped asynchronous HTTP client.
pub struct ApiClient {
    /// The underlying middleware-enabled client.
    inner: ClientWithMiddleware,
    /// Base URL every route is resolved against.
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    /// `InvalidArgument` when the endpoint is malformed or the client cannot be built.
    pub fn new(endpoint: &Endpoint, settings: &TransportSettings) -> Result<Self, FetchError> {
        let base_url = endpoint.base_url()?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| FetchError::invalid(format!("cannot build HTTP client: {e}")))?;

        let mut builder = ClientBuilder::new(http);
        if settings.max_retries > 0 {
            // Configure an exponential backoff policy for transient failures
            let retry_policy =
                ExponentialBackoff::builder().build_with_max_retries(settings.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(Self {
            inner: builder.build(),
            base_url,
        })
    }

    /// Base URL this client targets.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Serializes `request` into an absolute URL.
    ///
    /// The query string is taken verbatim from the request; it was encoded when
    /// the request was built.
    pub fn url_for(&self, request: &LogicalRequest) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(request.route());
        if request.query().is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(request.query()));
        }
        url
    }

    /// Sends one GET and waits for the whole body.
    ///
    /// # Errors
    /// A [`TransportError`] for connection failures, timeouts, non-2xx statuses
    /// and unreadable bodies.
    pub async fn get(&self, request: &LogicalRequest) -> Result<RawResponse, TransportError> {
        let url = self.url_for(request);
        debug!(route = request.route(), "GET {}", redact(&url));

        let response = self.inner.get(url).send().await.map_err(classify)?;
        let status = response.status();

        if !status.is_success() {
            // Capture the error body as a string for debugging
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(status = status.as_u16(), error = %e, "could not read error body");
                String::new()
            });
            warn!(status = status.as_u16(), route = request.route(), "non-success status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Body(e)
            }
        })?;

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn classify(err: reqwest_middleware::Error) -> TransportError {
    match &err {
        reqwest_middleware::Error::Reqwest(e) if e.is_timeout() => TransportError::Timeout,
        _ => TransportError::Request(err),
    }
}

/// Masks the credential so URLs can be logged.
fn redact(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    if !pairs.is_empty() {
        shown.query_pairs_mut().clear().extend_pairs(pairs);
    }
    shown.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::params::params;

    #[test]
    fn base_url_uses_scheme_host_and_port() {
        let url = Endpoint::new("api.vk.com", 443, true).base_url().unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.host_str(), Some("api.vk.com"));

        let url = Endpoint::new("127.0.0.1", 8080, false).base_url().unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn malformed_endpoints_are_invalid_arguments() {
        for endpoint in [
            Endpoint::new("", 443, true),
            Endpoint::new("api.vk.com", 0, true),
            Endpoint::new("api.vk.com/path", 443, true),
            Endpoint::new("bad host", 443, true),
        ] {
            assert!(
                matches!(endpoint.base_url(), Err(FetchError::InvalidArgument(_))),
                "{endpoint:?} should be rejected"
            );
        }
    }

    #[test]
    fn url_for_keeps_the_encoded_query_verbatim() {
        let client = ApiClient::new(
            &Endpoint::new("localhost", 9000, false),
            &TransportSettings::default(),
        )
        .unwrap();
        let request = LogicalRequest::new("/method/newsfeed.search/", params([("q", "#a b")])).unwrap();

        let url = client.url_for(&request);

        assert_eq!(url.path(), "/method/newsfeed.search/");
        assert_eq!(url.query(), Some("q=%23a+b"));
        let (_, q) = url.query_pairs().next().unwrap();
        assert_eq!(q, "#a b");
    }

    #[test]
    fn redact_hides_the_access_token() {
        let url = Url::parse("https://h/p?access_token=secret&q=x").unwrap();
        let shown = redact(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("q=x"));
    }

    #[test]
    fn transport_settings_deserialize_with_defaults() {
        let settings: TransportSettings = serde_json::from_str(r#"{"max_retries": 2}"#).unwrap();
        assert_eq!(settings.max_retries, 2);
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn truncated_error_body_still_reports_the_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            // Promises 100 bytes, sends 5, then hangs up.
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nshort")
                .await;
        });

        let client = ApiClient::new(
            &Endpoint::new("127.0.0.1", port, false),
            &TransportSettings::default(),
        )
        .unwrap();
        let request = LogicalRequest::new("/broken", Default::default()).unwrap();

        let err = client.get(&request).await.unwrap_err();
        assert!(
            matches!(err, TransportError::Status { status: 500, ref body } if body.is_empty()),
            "{err:?}"
        );
    }
}
