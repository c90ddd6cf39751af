//! # Newsfeed Client Settings
//!
//! Settings for the frequency client plus credential loading. Settings can be
//! read from a JSON file; every field is optional and falls back to the public
//! VK API defaults.
//!
//! The access token is opaque. It is looked up, in order, from an explicit
//! value, the `VK_ACCESS_TOKEN` environment variable and a token file. It is
//! never validated here.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::retrieve::{DispatchMode, Endpoint, TransportSettings};
use crate::social::vk::{NewsfeedClient, API_VERSION, NEWSFEED_SEARCH_ROUTE, VK_API_HOST, VK_API_PORT};
use crate::social::windows::WindowAnchoring;

/// Environment variable holding the access token.
pub const TOKEN_ENV_VAR: &str = "VK_ACCESS_TOKEN";
/// Token file used when nothing else is configured.
pub const DEFAULT_TOKEN_FILE: &str = "vkservicetoken.txt";

/// Failure to load settings or credentials.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("I/O error reading {}: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A settings file is not valid JSON for [`NewsfeedSettings`].
    #[error("invalid settings file {}: {source}", .path.display())]
    Json {
        /// Offending settings file.
        path: PathBuf,
        /// Parser diagnostics.
        #[source]
        source: serde_json::Error,
    },

    /// The token file holds only whitespace.
    #[error("token file {} is empty", .0.display())]
    EmptyToken(PathBuf),

    /// No token in the arguments, the environment or on disk.
    #[error("no access token: set VK_ACCESS_TOKEN or provide a token file")]
    MissingToken,
}

/// Everything needed to build a [`NewsfeedClient`] except the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsfeedSettings {
    /// API host.
    pub host: String,
    /// API port.
    pub port: u16,
    /// HTTPS when true.
    pub use_tls: bool,
    /// Value sent as `v`.
    pub api_version: String,
    /// Path of the search method.
    pub route: String,
    /// Sequential or bounded-concurrency dispatch.
    pub dispatch: DispatchMode,
    /// Timeout and retry knobs.
    pub transport: TransportSettings,
    /// Clock reads per batch or per window.
    pub anchoring: WindowAnchoring,
    /// Token file; `vkservicetoken.txt` when unset.
    pub token_file: Option<PathBuf>,
}

impl Default for NewsfeedSettings {
    fn default() -> Self {
        Self {
            host: VK_API_HOST.to_string(),
            port: VK_API_PORT,
            use_tls: true,
            api_version: API_VERSION.to_string(),
            route: NEWSFEED_SEARCH_ROUTE.to_string(),
            dispatch: DispatchMode::Sequential,
            transport: TransportSettings::default(),
            anchoring: WindowAnchoring::Batch,
            token_file: None,
        }
    }
}

impl NewsfeedSettings {
    /// Loads settings from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port, self.use_tls)
    }

    /// Builds a client using the system clock.
    pub fn client(&self, token: impl Into<String>) -> NewsfeedClient {
        NewsfeedClient::new(token)
            .with_endpoint(self.endpoint())
            .with_api_version(self.api_version.clone())
            .with_route(self.route.clone())
            .with_transport(self.transport.clone())
            .with_dispatch_mode(self.dispatch)
            .with_anchoring(self.anchoring)
    }

    /// Resolves the token: `explicit`, then the environment, then the token file.
    pub fn resolve_token(&self, explicit: Option<&str>) -> Result<String, ConfigError> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }
        if let Ok(token) = env::var(TOKEN_ENV_VAR) {
            if !token.trim().is_empty() {
                debug!("access token taken from {}", TOKEN_ENV_VAR);
                return Ok(token.trim().to_string());
            }
        }

        let path = self
            .token_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
        match read_token_file(&path) {
            Ok(token) => Ok(token),
            Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::MissingToken)
            }
            Err(e) => Err(e),
        }
    }
}

/// Reads a token file and strips surrounding whitespace.
pub fn read_token_file(path: &Path) -> Result<String, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::EmptyToken(path.to_path_buf()));
    }
    debug!(path = %path.display(), "access token read from file");
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_target_the_public_api() {
        let settings = NewsfeedSettings::default();
        assert_eq!(settings.endpoint(), Endpoint::new("api.vk.com", 443, true));
        assert_eq!(settings.api_version, "5.131");
        assert_eq!(settings.route, "/method/newsfeed.search/");
        assert_eq!(settings.dispatch, DispatchMode::Sequential);
        assert_eq!(settings.transport.max_retries, 0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"host":"127.0.0.1","port":8080,"use_tls":false,
                "dispatch":{{"mode":"concurrent","max_in_flight":4}}}}"#
        )
        .unwrap();

        let settings = NewsfeedSettings::from_json_file(file.path()).unwrap();

        assert_eq!(settings.endpoint(), Endpoint::new("127.0.0.1", 8080, false));
        assert_eq!(settings.dispatch, DispatchMode::concurrent(4).unwrap());
        assert_eq!(settings.api_version, API_VERSION);
    }

    #[test]
    fn broken_json_is_reported_with_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let err = NewsfeedSettings::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn missing_settings_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = NewsfeedSettings::from_json_file(&path).unwrap_err();
        match err {
            ConfigError::Io { path: ref reported, ref source } => {
                assert_eq!(reported, &path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn token_file_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  abc123  ").unwrap();
        assert_eq!(read_token_file(file.path()).unwrap(), "abc123");
    }

    #[test]
    fn empty_token_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_token_file(file.path()),
            Err(ConfigError::EmptyToken(_))
        ));
    }

    #[test]
    fn explicit_token_wins() {
        let settings = NewsfeedSettings {
            token_file: Some(PathBuf::from("/nonexistent/token")),
            ..Default::default()
        };
        assert_eq!(settings.resolve_token(Some(" tok ")).unwrap(), "tok");
    }

    #[test]
    fn client_inherits_settings() {
        let settings = NewsfeedSettings {
            host: "localhost".into(),
            port: 1234,
            use_tls: false,
            dispatch: DispatchMode::concurrent(2).unwrap(),
            ..Default::default()
        };
        let client = settings.client("t");
        assert_eq!(client.endpoint(), &Endpoint::new("localhost", 1234, false));
        assert_eq!(client.dispatch_mode(), DispatchMode::concurrent(2).unwrap());
    }
}
