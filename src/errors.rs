use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the HTTP clients for the model and search endpoints.
///
/// # Example: Handling API Errors
///
/// ```ignore
/// match search_client.search(query, key, engine_id, 3).await {
///     Err(ApiError::Api { status_code: 403, request_id, .. }) => {
///         tracing::warn!("Search key rejected, request_id: {:?}", request_id);
///     }
///     Err(ApiError::Api { status_code, message, .. }) => {
///         tracing::error!("Search failed {}: {}", status_code, message);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Non-success HTTP status with the (truncated) response body.
    #[error("API error (HTTP {status_code}): {message}")]
    Api {
        /// HTTP status code (e.g., 400, 403, 429, 500)
        status_code: u16,
        /// Error message from the API response body, truncated for display
        message: String,
        /// Request ID from `x-goog-request-id` header, if available
        request_id: Option<String>,
    },
    /// The API answered with a success status but the body did not contain
    /// what we asked for (no candidates, no text, blocked prompt, ...).
    #[error("Malformed API response: {0}")]
    MalformedResponse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Request exceeded the timeout configured on the client builder.
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure categories surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingConfiguration,
    UploadDecodeFailure,
    ModelCallFailure,
    SearchCallFailure,
    ScratchFile,
}

/// Errors produced while configuring a session, accepting an upload or
/// running an analysis.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),
    #[error("Unsupported file type '{extension}'. Supported formats: JPG, JPEG, PNG, DICOM")]
    UnsupportedFormat { extension: String },
    #[error("Could not decode the uploaded image: {0}")]
    UploadDecode(String),
    #[error("Report generation failed: {0}")]
    ModelCall(#[source] ApiError),
    #[error("Literature search failed: {0}")]
    SearchCall(#[source] ApiError),
    #[error("Could not stage the image for analysis: {0}")]
    ScratchFile(#[source] std::io::Error),
}

impl AnalysisError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingConfiguration(_) => ErrorKind::MissingConfiguration,
            Self::UnsupportedFormat { .. } | Self::UploadDecode(_) => {
                ErrorKind::UploadDecodeFailure
            }
            Self::ModelCall(_) => ErrorKind::ModelCallFailure,
            Self::SearchCall(_) => ErrorKind::SearchCallFailure,
            Self::ScratchFile(_) => ErrorKind::ScratchFile,
        }
    }

    /// Returns `true` for errors that stop the user before an analysis starts.
    ///
    /// These are shown inline and leave the previous analysis outcome alone.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingConfiguration | ErrorKind::UploadDecodeFailure
        )
    }
}

/// Errors raised while loading the static secrets file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read secrets file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse secrets file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
