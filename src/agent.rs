//! The report agent: one multimodal generation request per analysis.

use crate::client::Client;
use crate::errors::ApiError;
use crate::multimodal::image_part_from_file;
use crate::wire::Part;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default model used for analyses.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash-exp";

/// Text produced by a report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResponse {
    pub content: String,
}

/// Something that turns an instruction plus images into a markdown report.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn run(&self, prompt: &str, images: &[PathBuf]) -> Result<RunResponse, ApiError>;
}

/// Builds a [`ReportGenerator`] from the user's model key.
pub trait AgentFactory: Send + Sync {
    fn build(&self, model_api_key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError>;
}

/// Gemini-backed report agent. No tools are attached.
#[derive(Debug, Clone)]
pub struct ReportAgent {
    client: Client,
    model_id: String,
}

impl ReportAgent {
    #[must_use]
    pub fn new(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[async_trait]
impl ReportGenerator for ReportAgent {
    async fn run(&self, prompt: &str, images: &[PathBuf]) -> Result<RunResponse, ApiError> {
        if images.is_empty() {
            return Err(ApiError::InvalidInput(
                "A report needs at least one image".to_string(),
            ));
        }

        let mut parts = Vec::with_capacity(images.len() + 1);
        parts.push(Part::text(prompt));
        for image in images {
            parts.push(image_part_from_file(image).await?);
        }

        let content = self.client.generate_content(&self.model_id, parts).await?;
        Ok(RunResponse { content })
    }
}

/// Factory producing [`ReportAgent`]s that share the same model settings.
#[derive(Debug, Clone)]
pub struct GeminiAgentFactory {
    model_id: String,
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl Default for GeminiAgentFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_ID)
    }
}

impl GeminiAgentFactory {
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            base_url: None,
            timeout: None,
            connect_timeout: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl AgentFactory for GeminiAgentFactory {
    fn build(&self, model_api_key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError> {
        let mut builder = Client::builder(model_api_key.to_string());
        if let Some(base_url) = &self.base_url {
            builder = builder.base_url(base_url.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        tracing::debug!("Building report agent for model {}", self.model_id);
        Ok(Arc::new(ReportAgent::new(builder.build()?, &self.model_id)))
    }
}
