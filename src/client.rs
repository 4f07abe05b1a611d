use crate::errors::ApiError;
use crate::http::common::MODEL_BASE_URL;
use crate::wire::{Content, GenerateContentRequest, Part};
use reqwest::Client as ReqwestClient;
use std::fmt;
use std::time::Duration;

/// Minimal client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct Client {
    pub(crate) api_key: String,
    #[allow(clippy::struct_field_names)]
    pub(crate) http_client: ReqwestClient,
    pub(crate) base_url: String,
    pub(crate) timeout: Option<Duration>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for `Client` instances.
///
/// # Example
///
/// ```
/// use medscan_agent::Client;
/// use std::time::Duration;
///
/// let client = Client::builder("api_key".to_string())
///     .timeout(Duration::from_secs(120))
///     .connect_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct ClientBuilder {
    api_key: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Sets the total request timeout.
    ///
    /// Image analysis can take a while; if not set, reqwest's default (no
    /// timeout) applies.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Points the client at a different host, e.g. a local mock server.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Builds the `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built
    /// (for example when the TLS backend fails to initialize).
    pub fn build(self) -> Result<Client, ApiError> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;

        Ok(Client {
            api_key: self.api_key,
            http_client,
            base_url: self.base_url.unwrap_or_else(|| MODEL_BASE_URL.to_string()),
            timeout: self.timeout,
        })
    }
}

impl Client {
    /// Creates a new builder for `Client` instances.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Your Google AI API key.
    #[must_use]
    pub const fn builder(api_key: String) -> ClientBuilder {
        ClientBuilder {
            api_key,
            base_url: None,
            timeout: None,
            connect_timeout: None,
        }
    }

    /// Sends `parts` as a single user message to `model` and returns the
    /// generated text.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The HTTP request fails or times out
    /// - The API returns a non-success status
    /// - The response holds no candidate text (including blocked prompts)
    pub async fn generate_content(&self, model: &str, parts: Vec<Part>) -> Result<String, ApiError> {
        if parts.is_empty() {
            return Err(ApiError::InvalidInput(
                "generateContent needs at least one part".to_string(),
            ));
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts,
                role: Some("user".to_string()),
            }],
        };

        tracing::debug!("Generating content with model {model}");

        let response = crate::http::generate::generate_content(
            &self.http_client,
            &self.base_url,
            &self.api_key,
            model,
            &request,
            self.timeout,
        )
        .await?;

        if let Some(text) = response.text() {
            tracing::debug!("Model returned {} characters", text.len());
            return Ok(text);
        }

        Err(match response.block_reason() {
            Some(reason) => ApiError::MalformedResponse(format!("Prompt was blocked: {reason}")),
            None => ApiError::MalformedResponse(
                "Response contained no candidate text".to_string(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builder_default() {
        let client = Client::builder("test_key".to_string()).build().unwrap();
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.base_url, MODEL_BASE_URL);
        assert!(client.timeout.is_none());
    }

    #[test]
    fn test_client_builder_with_timeouts() {
        let client = Client::builder("test_key".to_string())
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap();
        assert_eq!(client.timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_client_builder_base_url() {
        let client = Client::builder("test_key".to_string())
            .base_url("http://127.0.0.1:9")
            .build()
            .unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn test_client_debug_masks_key() {
        let client = Client::builder("super-secret".to_string()).build().unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("***"));
    }

    #[tokio::test]
    async fn test_generate_content_rejects_empty_parts() {
        let client = Client::builder("k".to_string()).build().unwrap();
        let err = client.generate_content("m", Vec::new()).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
