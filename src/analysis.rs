//! One analysis: stage the upload, generate the report, fetch literature.

use crate::agent::ReportGenerator;
use crate::errors::AnalysisError;
use crate::prompt::{LITERATURE_QUERY, LITERATURE_RESULTS, analysis_prompt};
use crate::scratch::ScratchImage;
use crate::search::{LiteratureSearch, SearchResultItem};
use crate::upload::UploadedImage;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Instant;

/// Engine id used when the deployment does not configure one.
pub const DEFAULT_ENGINE_ID: &str = "custom-search-engine-id";

/// Inputs of an analysis that do not change between runs.
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub prompt: String,
    pub literature_query: String,
    pub engine_id: String,
    pub num_results: u32,
    /// Where scratch copies are written; the system temp directory if `None`.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            prompt: analysis_prompt(),
            literature_query: LITERATURE_QUERY.to_string(),
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            num_results: LITERATURE_RESULTS,
            scratch_dir: None,
        }
    }
}

/// Result of a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    /// Model output, verbatim.
    pub markdown: String,
    /// Search results in the order returned.
    pub literature: Vec<SearchResultItem>,
    pub generated_at: DateTime<Utc>,
}

/// Runs the report call then the search call against a scratch copy of
/// `image`.
///
/// The search is skipped when the report call fails. The scratch file is
/// removed before this returns, and also if the future is dropped early.
///
/// # Errors
///
/// - [`AnalysisError::ScratchFile`] if the upload cannot be staged
/// - [`AnalysisError::ModelCall`] if report generation fails
/// - [`AnalysisError::SearchCall`] if the literature search fails
pub async fn run_analysis(
    agent: &dyn ReportGenerator,
    search: &dyn LiteratureSearch,
    search_api_key: &str,
    image: &UploadedImage,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, AnalysisError> {
    let scratch = match &settings.scratch_dir {
        Some(dir) => ScratchImage::write_in(dir, image.bytes(), image.format()),
        None => ScratchImage::write(image.bytes(), image.format()),
    }
    .map_err(AnalysisError::ScratchFile)?;

    let result = generate_and_search(agent, search, search_api_key, &scratch, settings).await;

    if let Err(e) = scratch.close() {
        tracing::warn!("Failed to remove scratch image: {e}");
    }

    result
}

async fn generate_and_search(
    agent: &dyn ReportGenerator,
    search: &dyn LiteratureSearch,
    search_api_key: &str,
    scratch: &ScratchImage,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, AnalysisError> {
    let started = Instant::now();
    let response = agent
        .run(&settings.prompt, &[scratch.path_buf()])
        .await
        .map_err(AnalysisError::ModelCall)?;
    tracing::info!(
        "Report generated in {:?} ({} chars)",
        started.elapsed(),
        response.content.len()
    );

    let started = Instant::now();
    let literature = search
        .search(
            &settings.literature_query,
            search_api_key,
            &settings.engine_id,
            settings.num_results,
        )
        .await
        .map_err(AnalysisError::SearchCall)?;
    tracing::info!(
        "Literature search returned {} result(s) in {:?}",
        literature.len(),
        started.elapsed()
    );

    Ok(AnalysisReport {
        markdown: response.content,
        literature,
        generated_at: Utc::now(),
    })
}
