//! Frequency extraction from `newsfeed.search` response bodies.

use serde::de::Error as _;
use serde::Deserialize;

use crate::retrieve::{ExtractError, FetchError, RawResponse};

#[derive(Debug, Deserialize)]
struct Envelope {
    response: Option<CountSection>,
    error: Option<ApiErrorSection>,
}

#[derive(Debug, Deserialize)]
struct CountSection {
    count: i64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorSection {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// Reads the integer at `response.count` from one response body.
///
/// A body carrying the API's `error` envelope instead of `response` is
/// reported as [`ExtractError::Api`].
pub fn extract_count(body: &str) -> Result<i64, ExtractError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    match (envelope.response, envelope.error) {
        (Some(section), _) => Ok(section.count),
        (None, Some(err)) => Err(ExtractError::Api {
            code: err.error_code,
            message: err.error_msg,
        }),
        (None, None) => Err(ExtractError::Json(serde_json::Error::missing_field(
            "response",
        ))),
    }
}

/// Applies [`extract_count`] to every response, keeping order.
///
/// # Errors
/// `Parse { index, .. }` for the first body that does not hold a count.
pub fn extract_counts(responses: &[RawResponse]) -> Result<Vec<i64>, FetchError> {
    responses
        .iter()
        .enumerate()
        .map(|(index, response)| {
            extract_count(&response.body).map_err(|source| FetchError::Parse { index, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(body: &str) -> RawResponse {
        RawResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn reads_the_nested_count() {
        let body = r#"{"response":{"count":42,"items":[],"total_count":1000}}"#;
        assert_eq!(extract_count(body).unwrap(), 42);
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(extract_count("<html>"), Err(ExtractError::Json(_))));
    }

    #[test]
    fn rejects_missing_or_non_integer_count() {
        for body in [
            r#"{}"#,
            r#"{"response":{}}"#,
            r#"{"response":{"count":"5"}}"#,
            r#"{"response":{"count":5.5}}"#,
            r#"{"response":null}"#,
        ] {
            assert!(
                matches!(extract_count(body), Err(ExtractError::Json(_))),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn surfaces_api_error_envelopes() {
        let body = r#"{"error":{"error_code":5,"error_msg":"User authorization failed"}}"#;
        match extract_count(body) {
            Err(ExtractError::Api { code, message }) => {
                assert_eq!(code, 5);
                assert_eq!(message, "User authorization failed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn counts_keep_order_and_report_the_failing_index() {
        let ok = [raw(r#"{"response":{"count":1}}"#), raw(r#"{"response":{"count":2}}"#)];
        assert_eq!(extract_counts(&ok).unwrap(), vec![1, 2]);

        let bad = [
            raw(r#"{"response":{"count":1}}"#),
            raw(r#"{"response":{"count":2}}"#),
            raw("oops"),
        ];
        let err = extract_counts(&bad).unwrap_err();
        assert!(matches!(err, FetchError::Parse { index: 2, .. }));
    }
}
