//! Per-session context and its state machine.

use crate::agent::{AgentFactory, ReportGenerator};
use crate::analysis::{AnalysisReport, AnalysisSettings, run_analysis};
use crate::credentials::CredentialStore;
use crate::errors::{AnalysisError, ErrorKind};
use crate::search::LiteratureSearch;
use crate::upload::UploadedImage;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unconfigured,
    ConfiguredNoImage,
    ImageReady,
    Analyzing,
    Complete,
    Error,
}

/// A user-visible error, detached from its source so it can be kept around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorNotice {
    fn from(error: &AnalysisError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Complete(AnalysisReport),
    Failed(ErrorNotice),
}

/// Holds a session in `Analyzing` and puts the previous state back when
/// dropped, including when the analysis future is cancelled.
struct AnalyzingGuard<'a> {
    state: &'a mut SessionState,
    previous: SessionState,
}

impl<'a> AnalyzingGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        let previous = std::mem::replace(state, SessionState::Analyzing);
        Self { state, previous }
    }
}

impl Drop for AnalyzingGuard<'_> {
    fn drop(&mut self) {
        *self.state = self.previous;
    }
}

/// Everything one browser session owns.
pub struct Session {
    id: Uuid,
    credentials: CredentialStore,
    agent: Option<Arc<dyn ReportGenerator>>,
    image: Option<UploadedImage>,
    state: SessionState,
    outcome: Option<AnalysisOutcome>,
    notice: Option<ErrorNotice>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("credentials", &self.credentials)
            .field("has_agent", &self.agent.is_some())
            .field("image", &self.image)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(id: Uuid, search_api_key: Option<Arc<str>>) -> Self {
        Self {
            id,
            credentials: CredentialStore::new(search_api_key),
            agent: None,
            image: None,
            state: SessionState::Unconfigured,
            outcome: None,
            notice: None,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Whether a report agent has been built for this session.
    #[must_use]
    pub const fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    #[must_use]
    pub const fn image(&self) -> Option<&UploadedImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<&AnalysisOutcome> {
        self.outcome.as_ref()
    }

    /// Inline error from the last configuration or upload action.
    #[must_use]
    pub const fn notice(&self) -> Option<&ErrorNotice> {
        self.notice.as_ref()
    }

    /// Stores the user's model key and builds the report agent once both
    /// keys are present. Blank input is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::ModelCall`] if the agent cannot be built; the
    /// key is kept and the session stays unconfigured.
    pub fn set_model_key(
        &mut self,
        key: &str,
        factory: &dyn AgentFactory,
    ) -> Result<(), AnalysisError> {
        self.notice = None;
        if !self.credentials.set_model_key(key) {
            return Ok(());
        }

        self.agent = None;
        let result = match (self.credentials.model_key(), self.credentials.search_key()) {
            (Some(model_key), Some(_)) => match factory.build(model_key) {
                Ok(agent) => {
                    tracing::info!("Session {}: report agent ready", self.id);
                    self.agent = Some(agent);
                    Ok(())
                }
                Err(e) => Err(AnalysisError::ModelCall(e)),
            },
            _ => {
                tracing::warn!(
                    "Session {}: model key saved but the search key is not configured",
                    self.id
                );
                Ok(())
            }
        };

        if let Err(e) = &result {
            self.notice = Some(e.into());
        }
        self.settle();
        result
    }

    /// Forgets the model key and drops the agent.
    pub fn clear_model_key(&mut self) {
        self.credentials.clear_model_key();
        self.agent = None;
        self.notice = None;
        tracing::info!("Session {}: model key cleared", self.id);
        self.settle();
    }

    /// Accepts a new upload, replacing any previous image and outcome.
    ///
    /// # Errors
    ///
    /// Returns the upload error when the extension is not allowed or the
    /// bytes do not decode; the previous image is discarded either way.
    pub fn upload(
        &mut self,
        file_name: &str,
        bytes: Bytes,
        preview_width: u32,
    ) -> Result<(), AnalysisError> {
        self.notice = None;
        self.outcome = None;
        self.image = None;

        let result = UploadedImage::decode(file_name, bytes, preview_width).map(|image| {
            self.image = Some(image);
        });

        if let Err(e) = &result {
            tracing::warn!("Session {}: upload rejected: {e}", self.id);
            self.notice = Some(e.into());
        }
        self.settle();
        result
    }

    pub fn remove_image(&mut self) {
        self.image = None;
        self.outcome = None;
        self.notice = None;
        self.settle();
    }

    /// Records an upload that failed before its bytes could be decoded. Like
    /// any failed upload it discards the previous image and outcome.
    pub fn reject_upload(&mut self, error: &AnalysisError) {
        self.image = None;
        self.outcome = None;
        self.notice = Some(error.into());
        self.settle();
    }

    /// Runs an analysis of the current image.
    ///
    /// Missing keys or a missing image are reported inline and leave the state
    /// alone. Otherwise the session passes through `Analyzing` and ends in
    /// `Complete` or `Error`.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped or failed the analysis.
    pub async fn analyze(
        &mut self,
        search: &dyn LiteratureSearch,
        settings: &AnalysisSettings,
    ) -> Result<(), AnalysisError> {
        self.notice = None;

        let (agent, search_key) = match self.ready_agent() {
            Ok(ready) => ready,
            Err(e) => {
                self.notice = Some((&e).into());
                return Err(e);
            }
        };
        let Some(image) = self.image.as_ref() else {
            let e = AnalysisError::UploadDecode("no image has been uploaded".to_string());
            self.notice = Some((&e).into());
            return Err(e);
        };

        tracing::info!("Session {}: analyzing '{}'", self.id, image.file_name());

        let result = {
            let _analyzing = AnalyzingGuard::enter(&mut self.state);
            run_analysis(agent.as_ref(), search, &search_key, image, settings).await
        };

        let result = match result {
            Ok(report) => {
                self.outcome = Some(AnalysisOutcome::Complete(report));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Session {}: analysis failed: {e}", self.id);
                self.outcome = Some(AnalysisOutcome::Failed((&e).into()));
                Err(e)
            }
        };
        self.settle();
        result
    }

    fn ready_agent(&self) -> Result<(Arc<dyn ReportGenerator>, String), AnalysisError> {
        let Some(search_key) = self.credentials.search_key() else {
            return Err(AnalysisError::MissingConfiguration(
                "the search API key is not configured for this deployment".to_string(),
            ));
        };
        if !self.credentials.has_model_key() {
            return Err(AnalysisError::MissingConfiguration(
                "enter your Gemini API key to continue".to_string(),
            ));
        }
        let agent = self.agent.clone().ok_or_else(|| {
            AnalysisError::MissingConfiguration("the report agent is not available".to_string())
        })?;
        Ok((agent, search_key.to_string()))
    }

    fn settle(&mut self) {
        self.state = match (&self.agent, &self.image, &self.outcome) {
            (None, _, _) => SessionState::Unconfigured,
            (Some(_), None, _) => SessionState::ConfiguredNoImage,
            (Some(_), Some(_), None) => SessionState::ImageReady,
            (Some(_), Some(_), Some(AnalysisOutcome::Complete(_))) => SessionState::Complete,
            (Some(_), Some(_), Some(AnalysisOutcome::Failed(_))) => SessionState::Error,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RunResponse;
    use crate::errors::ApiError;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoAgent;

    #[async_trait]
    impl ReportGenerator for EchoAgent {
        async fn run(&self, _prompt: &str, _images: &[PathBuf]) -> Result<RunResponse, ApiError> {
            Ok(RunResponse {
                content: "ok".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        builds: AtomicUsize,
    }

    impl AgentFactory for CountingFactory {
        fn build(&self, _key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EchoAgent))
        }
    }

    struct BrokenFactory;

    impl AgentFactory for BrokenFactory {
        fn build(&self, _key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError> {
            Err(ApiError::ClientBuild("tls".to_string()))
        }
    }

    fn session(search_key: Option<&str>) -> Session {
        Session::new(Uuid::new_v4(), search_key.map(Arc::from))
    }

    #[test]
    fn test_new_session_is_unconfigured() {
        let session = session(Some("S"));
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(!session.has_agent());
        assert!(session.outcome().is_none());
    }

    #[test]
    fn test_agent_built_only_with_both_keys() {
        let factory = CountingFactory::default();

        let mut with_search = session(Some("S"));
        with_search.set_model_key("K1", &factory).unwrap();
        assert!(with_search.has_agent());
        assert_eq!(with_search.state(), SessionState::ConfiguredNoImage);

        let mut without_search = session(None);
        without_search.set_model_key("K1", &factory).unwrap();
        assert!(!without_search.has_agent());
        assert_eq!(without_search.state(), SessionState::Unconfigured);

        let mut blank_key = session(Some("S"));
        blank_key.set_model_key("   ", &factory).unwrap();
        assert!(!blank_key.has_agent());

        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_model_key_returns_to_unconfigured() {
        let factory = CountingFactory::default();
        let mut session = session(Some("S"));
        session.set_model_key("K1", &factory).unwrap();

        session.clear_model_key();
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(!session.has_agent());
        assert!(session.credentials().model_key().is_none());
    }

    #[test]
    fn test_factory_failure_is_reported_inline() {
        let mut session = session(Some("S"));
        let err = session.set_model_key("K1", &BrokenFactory).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ModelCallFailure);
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(session.notice().is_some());
    }

    #[test]
    fn test_rejected_upload_clears_previous_image() {
        let mut session = session(Some("S"));
        session.set_model_key("K1", &CountingFactory::default()).unwrap();

        let err = session
            .upload("scan.gif", Bytes::from_static(b"GIF89a"), 500)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UploadDecodeFailure);
        assert!(session.image().is_none());
        assert_eq!(session.state(), SessionState::ConfiguredNoImage);
        assert_eq!(
            session.notice().map(|n| n.kind),
            Some(ErrorKind::UploadDecodeFailure)
        );
    }

    fn png(width: u32, height: u32) -> Bytes {
        let img = image::ImageBuffer::from_pixel(width, height, image::Rgb([90u8, 90, 90]));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Bytes::from(buf)
    }

    struct StalledAgent;

    #[async_trait]
    impl ReportGenerator for StalledAgent {
        async fn run(&self, _prompt: &str, _images: &[PathBuf]) -> Result<RunResponse, ApiError> {
            std::future::pending().await
        }
    }

    struct StalledFactory;

    impl AgentFactory for StalledFactory {
        fn build(&self, _key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError> {
            Ok(Arc::new(StalledAgent))
        }
    }

    struct EmptySearch;

    #[async_trait]
    impl LiteratureSearch for EmptySearch {
        async fn search(
            &self,
            _query: &str,
            _api_key: &str,
            _engine_id: &str,
            _num_results: u32,
        ) -> Result<Vec<crate::search::SearchResultItem>, ApiError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_failed_upload_read_clears_previous_image() {
        let mut session = session(Some("S"));
        session.set_model_key("K1", &CountingFactory::default()).unwrap();
        session.upload("scan.png", png(8, 8), 500).unwrap();
        assert_eq!(session.state(), SessionState::ImageReady);

        session.reject_upload(&AnalysisError::UploadDecode("body too large".to_string()));

        assert!(session.image().is_none());
        assert!(session.outcome().is_none());
        assert_eq!(session.state(), SessionState::ConfiguredNoImage);
        assert_eq!(
            session.notice().map(|n| n.kind),
            Some(ErrorKind::UploadDecodeFailure)
        );
    }

    #[tokio::test]
    async fn test_cancelled_analysis_restores_state() {
        let scratch = tempfile::TempDir::new().unwrap();
        let settings = AnalysisSettings {
            scratch_dir: Some(scratch.path().to_path_buf()),
            ..AnalysisSettings::default()
        };
        let mut session = session(Some("S"));
        session.set_model_key("K1", &StalledFactory).unwrap();
        session.upload("scan.png", png(8, 8), 500).unwrap();

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            session.analyze(&EmptySearch, &settings),
        )
        .await;

        assert!(cancelled.is_err());
        assert_eq!(session.state(), SessionState::ImageReady);
        assert!(session.outcome().is_none());
        assert!(std::fs::read_dir(scratch.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_analyze_without_keys_is_blocked() {
        struct NoSearch;

        #[async_trait]
        impl LiteratureSearch for NoSearch {
            async fn search(
                &self,
                _query: &str,
                _api_key: &str,
                _engine_id: &str,
                _num_results: u32,
            ) -> Result<Vec<crate::search::SearchResultItem>, ApiError> {
                panic!("search must not be called");
            }
        }

        let mut session = session(None);
        let err = session
            .analyze(&NoSearch, &AnalysisSettings::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingConfiguration);
        assert!(err.to_string().contains("search API key"));
        assert_eq!(session.state(), SessionState::Unconfigured);
        assert!(session.outcome().is_none());
    }
}
