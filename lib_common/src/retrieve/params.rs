//! # Request Composition
//!
//! Turns one route, one shared parameter set and an ordered list of per-call
//! parameter sets into an ordered list of [`LogicalRequest`]s.
//!
//! ## Precedence
//! When the shared (base) set and a per-call (variable) set both define a key,
//! the **variable value wins**. This holds for every request of every batch.
//!
//! ## Encoding
//! The query string of a request is percent-encoded exactly once, when the
//! request is built. The dispatcher puts it on the wire as is.

use std::collections::BTreeMap;

use url::form_urlencoded;

use super::errors::FetchError;

/// Flat key → value query parameters. Keys are unique; iteration is sorted,
/// which keeps serialized query strings stable.
pub type Params = BTreeMap<String, String>;

/// Builds a [`Params`] from borrowed pairs.
pub fn params<'a, I>(pairs: I) -> Params
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Merges `variable` over `base`. On key collision the value from `variable` is kept.
pub fn compose(base: &Params, variable: &Params) -> Params {
    let mut merged = base.clone();
    for (key, value) in variable {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// A route plus its fully merged parameters, before wire serialization.
///
/// Immutable once built. The encoded query string is computed in [`LogicalRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRequest {
    route: String,
    parameters: Params,
    query: String,
}

impl LogicalRequest {
    /// Creates a request for `route`, encoding `parameters` into a query string.
    ///
    /// # Errors
    /// `InvalidArgument` when `route` is empty or not an absolute path.
    pub fn new(route: &str, parameters: Params) -> Result<Self, FetchError> {
        if route.trim().is_empty() {
            return Err(FetchError::invalid("route must not be empty"));
        }
        if !route.starts_with('/') {
            return Err(FetchError::invalid(format!(
                "route must start with '/': {route:?}"
            )));
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(parameters.iter())
            .finish();

        Ok(Self {
            route: route.to_string(),
            parameters,
            query,
        })
    }

    /// Path component, e.g. `/method/newsfeed.search/`.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Decoded parameters.
    pub fn parameters(&self) -> &Params {
        &self.parameters
    }

    /// `application/x-www-form-urlencoded` query string, without the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }
}

/// Inputs to [`build_batch`], bundled for callers that pass batches around.
#[derive(Debug, Clone, Default)]
pub struct BatchSpec {
    /// Route shared by every request.
    pub route: String,
    /// Parameters shared by every request.
    pub base: Params,
    /// One entry per request, in order.
    pub variable_sets: Vec<Params>,
}

impl BatchSpec {
    /// Expands into requests. See [`build_batch`].
    pub fn build(&self) -> Result<Vec<LogicalRequest>, FetchError> {
        build_batch(&self.route, &self.base, &self.variable_sets)
    }
}

/// Produces one request per entry of `variable_sets`, index for index.
///
/// Request `i` carries `compose(base, &variable_sets[i])`. An empty
/// `variable_sets` yields an empty batch.
///
/// # Errors
/// `InvalidArgument` when `route` is empty or relative.
pub fn build_batch(
    route: &str,
    base: &Params,
    variable_sets: &[Params],
) -> Result<Vec<LogicalRequest>, FetchError> {
    variable_sets
        .iter()
        .map(|variable| LogicalRequest::new(route, compose(base, variable)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_overrides_base() {
        let merged = compose(&params([("q", "a")]), &params([("q", "b")]));
        assert_eq!(merged, params([("q", "b")]));
    }

    #[test]
    fn compose_is_a_union() {
        let merged = compose(
            &params([("access_token", "t"), ("v", "5.131")]),
            &params([("start_time", "10"), ("end_time", "3610")]),
        );
        assert_eq!(merged.len(), 4);
        assert_eq!(merged["v"], "5.131");
        assert_eq!(merged["end_time"], "3610");
    }

    #[test]
    fn batch_preserves_length_and_order() {
        let base = params([("q", "rust")]);
        let sets: Vec<Params> = (0..5)
            .map(|i| params([("start_time", i.to_string().as_str())]))
            .collect();

        let batch = build_batch("/search", &base, &sets).unwrap();

        assert_eq!(batch.len(), sets.len());
        for (i, request) in batch.iter().enumerate() {
            assert_eq!(request.route(), "/search");
            assert_eq!(request.parameters()["start_time"], i.to_string());
            assert_eq!(request.parameters()["q"], "rust");
        }
    }

    #[test]
    fn empty_variable_sets_build_an_empty_batch() {
        let batch = build_batch("/search", &params([("q", "x")]), &[]).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn empty_or_relative_route_is_rejected() {
        let sets = vec![Params::new()];
        assert!(matches!(
            build_batch("", &Params::new(), &sets),
            Err(FetchError::InvalidArgument(_))
        ));
        assert!(matches!(
            build_batch("method/search", &Params::new(), &sets),
            Err(FetchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn reserved_characters_survive_a_round_trip() {
        let request = LogicalRequest::new("/s", params([("q", "#test&x=1")])).unwrap();

        assert!(!request.query().contains('#'));
        let decoded: Params = form_urlencoded::parse(request.query().as_bytes())
            .into_owned()
            .collect();
        assert_eq!(decoded["q"], "#test&x=1");
        assert_eq!(decoded.len(), 1);
    }

    #[test]
    fn non_ascii_terms_are_encoded_once() {
        let request = LogicalRequest::new("/s", params([("q", "#тест")])).unwrap();
        let decoded: Params = form_urlencoded::parse(request.query().as_bytes())
            .into_owned()
            .collect();
        assert_eq!(decoded["q"], "#тест");
        assert!(!request.query().contains("%25"));
    }

    #[test]
    fn batch_spec_builds_like_build_batch() {
        let spec = BatchSpec {
            route: "/r".into(),
            base: params([("v", "1")]),
            variable_sets: vec![params([("v", "2")]), Params::new()],
        };
        let batch = spec.build().unwrap();
        assert_eq!(batch[0].parameters()["v"], "2");
        assert_eq!(batch[1].parameters()["v"], "1");
    }
}
