//! Common test utilities shared across all integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageBuffer, ImageFormat, Rgb};
use medscan_agent::agent::{AgentFactory, ReportGenerator, RunResponse};
use medscan_agent::errors::ApiError;
use medscan_agent::search::{LiteratureSearch, SearchResultItem};
use medscan_agent::Client;
use std::env;
use std::future::Future;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Creates a client from the GEMINI_API_KEY environment variable.
/// Returns None if the API key is not set.
pub fn get_client() -> Option<Client> {
    env::var("GEMINI_API_KEY")
        .ok()
        .and_then(|key| Client::builder(key).build().ok())
}

/// Default timeout for tests that talk to external APIs (60 seconds).
pub const TEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Wraps a future with a timeout, panicking if the timeout is exceeded.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| panic!("Test timed out after {duration:?}"))
}

// =============================================================================
// Images
// =============================================================================

/// Encodes a `width` x `height` gradient as PNG.
pub fn tiny_png(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("PNG encoding should not fail");
    out.into_inner()
}

// =============================================================================
// Fake report agents
// =============================================================================

/// What a [`ScriptedAgent`] saw when it was called.
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    /// Whether every image path existed while the call ran.
    pub images_existed: bool,
    /// Contents of the first image at call time.
    pub first_image_bytes: Option<Vec<u8>>,
}

/// Report agent returning a fixed result and recording its calls.
pub struct ScriptedAgent {
    reply: Result<String, fn() -> ApiError>,
    calls: Mutex<Vec<AgentCall>>,
}

impl ScriptedAgent {
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            reply: Ok(content.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: fn() -> ApiError) -> Self {
        Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails the way a model call that ran past its deadline does.
    pub fn timing_out() -> Self {
        Self::failing(|| ApiError::Timeout(Duration::from_secs(30)))
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportGenerator for ScriptedAgent {
    async fn run(&self, prompt: &str, images: &[PathBuf]) -> Result<RunResponse, ApiError> {
        self.calls.lock().unwrap().push(AgentCall {
            prompt: prompt.to_string(),
            images: images.to_vec(),
            images_existed: images.iter().all(|path| path.exists()),
            first_image_bytes: images.first().and_then(|path| std::fs::read(path).ok()),
        });
        match &self.reply {
            Ok(content) => Ok(RunResponse {
                content: content.clone(),
            }),
            Err(error) => Err(error()),
        }
    }
}

/// Factory handing out one shared [`ScriptedAgent`].
pub struct ScriptedFactory {
    pub agent: Arc<ScriptedAgent>,
    keys: Mutex<Vec<String>>,
}

impl ScriptedFactory {
    pub fn new(agent: ScriptedAgent) -> Self {
        Self {
            agent: Arc::new(agent),
            keys: Mutex::new(Vec::new()),
        }
    }

    /// Model keys the factory was asked to build agents for.
    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().unwrap().clone()
    }
}

impl AgentFactory for ScriptedFactory {
    fn build(&self, model_api_key: &str) -> Result<Arc<dyn ReportGenerator>, ApiError> {
        self.keys.lock().unwrap().push(model_api_key.to_string());
        let agent: Arc<dyn ReportGenerator> = self.agent.clone();
        Ok(agent)
    }
}

// =============================================================================
// Fake literature search
// =============================================================================

/// Arguments of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub api_key: String,
    pub engine_id: String,
    pub num_results: u32,
}

/// Literature search returning fixed items and counting its calls.
pub struct CountingSearch {
    items: Result<Vec<SearchResultItem>, u16>,
    calls: Mutex<Vec<SearchCall>>,
    count: AtomicUsize,
}

impl CountingSearch {
    pub fn returning(items: Vec<SearchResultItem>) -> Self {
        Self {
            items: Ok(items),
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    /// Fails every call with an API error carrying `status_code`.
    pub fn failing(status_code: u16) -> Self {
        Self {
            items: Err(status_code),
            calls: Mutex::new(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiteratureSearch for CountingSearch {
    async fn search(
        &self,
        query: &str,
        api_key: &str,
        engine_id: &str,
        num_results: u32,
    ) -> Result<Vec<SearchResultItem>, ApiError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
            num_results,
        });
        match &self.items {
            Ok(items) => Ok(items.clone()),
            Err(status_code) => Err(ApiError::Api {
                status_code: *status_code,
                message: "quota exceeded".to_string(),
                request_id: None,
            }),
        }
    }
}

pub fn literature_item(title: &str, link: &str, snippet: &str) -> SearchResultItem {
    SearchResultItem {
        title: title.to_string(),
        link: link.to_string(),
        snippet: snippet.to_string(),
    }
}

/// The two results used by the happy-path scenarios.
pub fn two_literature_items() -> Vec<SearchResultItem> {
    vec![
        literature_item(
            "Chest radiograph patterns",
            "https://example.org/chest",
            "Common opacity patterns.",
        ),
        literature_item(
            "Pleural effusion review",
            "http://example.org/effusion",
            "Small effusions in adults.",
        ),
    ]
}
