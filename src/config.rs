//! Deployment configuration: the static secrets file and runtime settings.

use crate::agent::DEFAULT_MODEL_ID;
use crate::analysis::{AnalysisSettings, DEFAULT_ENGINE_ID};
use crate::errors::ConfigError;
use crate::upload::DEFAULT_PREVIEW_WIDTH;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default location of the secrets file.
pub const DEFAULT_SECRETS_PATH: &str = "secrets.toml";

/// Uploads above this size are refused by the shell.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Sessions idle longer than this are evicted.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// Contents of the static secrets file.
///
/// ```toml
/// SEARCH_API_KEY = "..."
/// SEARCH_ENGINE_ID = "..."   # optional
/// ```
///
/// `SERPER_API_KEY` is accepted as an alias of `SEARCH_API_KEY`.
#[derive(Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(rename = "SEARCH_API_KEY", alias = "SERPER_API_KEY")]
    pub search_api_key: Option<String>,
    #[serde(rename = "SEARCH_ENGINE_ID")]
    pub search_engine_id: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "***"))
            .field("search_engine_id", &self.search_engine_id)
            .finish()
    }
}

impl Secrets {
    /// Reads `path`. A missing file yields empty secrets, so the page can
    /// report the missing key instead of the process refusing to start.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Secrets file '{}' not found", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies non-empty overrides (typically from the environment).
    #[must_use]
    pub fn with_overrides(
        mut self,
        search_api_key: Option<String>,
        search_engine_id: Option<String>,
    ) -> Self {
        if let Some(key) = search_api_key.filter(|v| !v.trim().is_empty()) {
            self.search_api_key = Some(key);
        }
        if let Some(id) = search_engine_id.filter(|v| !v.trim().is_empty()) {
            self.search_engine_id = Some(id);
        }
        self
    }
}

/// Settings shared by every session of a running server.
#[derive(Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub search_api_key: Option<Arc<str>>,
    pub search_engine_id: String,
    pub model_id: String,
    pub preview_width: u32,
    pub max_upload_bytes: usize,
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub session_ttl: Duration,
    pub secrets_path: PathBuf,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("search_api_key", &self.search_api_key.as_ref().map(|_| "***"))
            .field("search_engine_id", &self.search_engine_id)
            .field("model_id", &self.model_id)
            .field("preview_width", &self.preview_width)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("session_ttl", &self.session_ttl)
            .field("secrets_path", &self.secrets_path)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
            search_api_key: None,
            search_engine_id: DEFAULT_ENGINE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            preview_width: DEFAULT_PREVIEW_WIDTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            request_timeout: None,
            connect_timeout: None,
            session_ttl: DEFAULT_SESSION_TTL,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_PATH),
        }
    }
}

impl AppConfig {
    /// Takes the search key and engine id from `secrets`.
    #[must_use]
    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.search_api_key = secrets
            .search_api_key
            .filter(|key| !key.trim().is_empty())
            .map(Arc::from);
        if let Some(engine_id) = secrets.search_engine_id {
            self.search_engine_id = engine_id;
        }
        self
    }

    #[must_use]
    pub const fn has_search_key(&self) -> bool {
        self.search_api_key.is_some()
    }

    /// Analysis settings derived from this configuration.
    #[must_use]
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            engine_id: self.search_engine_id.clone(),
            ..AnalysisSettings::default()
        }
    }
}
