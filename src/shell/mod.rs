//! The browser-facing web shell.
//!
//! One page, driven by plain HTML forms. Every mutating route answers with a
//! `303 See Other` back to `/`, and each browser is tied to its own
//! [`Session`](crate::session::Session) through a cookie.

mod handlers;
pub mod render;
pub mod sessions;

pub use sessions::{ResolvedSession, SESSION_COOKIE, SessionRegistry, session_id_from_headers};

use crate::agent::{AgentFactory, GeminiAgentFactory};
use crate::analysis::AnalysisSettings;
use crate::config::AppConfig;
use crate::errors::ApiError;
use crate::search::{LiteratureSearch, SearchClient};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state of the running server.
#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    sessions: Arc<SessionRegistry>,
    agents: Arc<dyn AgentFactory>,
    search: Arc<dyn LiteratureSearch>,
    settings: Arc<AnalysisSettings>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        agents: Arc<dyn AgentFactory>,
        search: Arc<dyn LiteratureSearch>,
    ) -> Self {
        let sessions = SessionRegistry::new(config.search_api_key.clone(), config.session_ttl);
        let settings = config.analysis_settings();
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            agents,
            search,
            settings: Arc::new(settings),
        }
    }

    /// State backed by the real Gemini and search endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the search HTTP client cannot be
    /// built with the configured timeouts.
    pub fn from_config(config: AppConfig) -> Result<Self, ApiError> {
        let agents = GeminiAgentFactory::new(config.model_id.clone())
            .with_timeout(config.request_timeout)
            .with_connect_timeout(config.connect_timeout);

        let mut http = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            http = http.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout {
            http = http.connect_timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Self::new(
            config,
            Arc::new(agents),
            Arc::new(SearchClient::new(http)),
        ))
    }

    /// Replaces the analysis settings derived from the configuration.
    #[must_use]
    pub fn with_analysis_settings(mut self, settings: AnalysisSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub(crate) fn agents(&self) -> &dyn AgentFactory {
        self.agents.as_ref()
    }

    pub(crate) fn search(&self) -> &dyn LiteratureSearch {
        self.search.as_ref()
    }

    #[must_use]
    pub fn analysis_settings(&self) -> &AnalysisSettings {
        &self.settings
    }
}

/// Builds the router with every route of the page.
pub fn create_app(state: AppState) -> Router {
    let body_limit = state.config().max_upload_bytes;

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/credentials", post(handlers::set_credentials))
        .route("/credentials/reset", post(handlers::reset_credentials))
        .route("/upload", post(handlers::upload))
        .route("/image/remove", post(handlers::remove_image))
        .route("/analyze", post(handlers::analyze))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
