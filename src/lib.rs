//! Medical image analysis service.
//!
//! A user uploads a medical image through a small web page, supplies a Gemini
//! API key, and receives a structured markdown report produced by a
//! multimodal model, followed by a handful of related web search results.
//!
//! The library is split into:
//! - [`client`] and [`agent`]: the `generateContent` client and the report agent
//! - [`search`]: the custom search client
//! - [`upload`] and [`scratch`]: upload validation, preview, and the scratch copy
//! - [`analysis`]: one report-then-search run
//! - [`session`]: the per-browser state machine
//! - [`shell`]: the axum router serving the page

pub mod agent;
pub mod analysis;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
mod http;
pub mod multimodal;
pub mod prompt;
pub mod scratch;
pub mod search;
pub mod session;
pub mod shell;
pub mod upload;
pub mod wire;

pub use agent::{AgentFactory, GeminiAgentFactory, ReportAgent, ReportGenerator, RunResponse};
pub use analysis::{AnalysisReport, AnalysisSettings, run_analysis};
pub use client::{Client, ClientBuilder};
pub use config::{AppConfig, Secrets};
pub use credentials::CredentialStore;
pub use errors::{AnalysisError, ApiError, ConfigError, ErrorKind};
pub use multimodal::{detect_mime_type, image_part_from_file};
pub use search::{LiteratureSearch, SearchClient, SearchResultItem};
pub use session::{AnalysisOutcome, ErrorNotice, Session, SessionState};
pub use shell::{AppState, create_app};
pub use upload::{UploadFormat, UploadedImage};
