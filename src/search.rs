//! Client for the Custom Search JSON API used for literature links.

use crate::errors::ApiError;
use crate::http::common::{Endpoint, SEARCH_BASE_URL, construct_endpoint_url};
use crate::http::error_helpers::{check_response, deserialize_with_context};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};

/// The endpoint rejects `num` above this value.
pub const MAX_RESULTS: u32 = 10;

/// One search hit, in the order the service ranked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchResultItem>,
}

/// A source of literature links.
#[async_trait]
pub trait LiteratureSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        api_key: &str,
        engine_id: &str,
        num_results: u32,
    ) -> Result<Vec<SearchResultItem>, ApiError>;
}

/// Stateless client: one GET per call, no retries, no caching.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http_client: ReqwestClient,
    base_url: String,
}

impl Default for SearchClient {
    fn default() -> Self {
        Self::new(ReqwestClient::new())
    }
}

impl SearchClient {
    #[must_use]
    pub fn new(http_client: ReqwestClient) -> Self {
        Self {
            http_client,
            base_url: SEARCH_BASE_URL.to_string(),
        }
    }

    /// Points the client at a different host, e.g. a local mock server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn validate(api_key: &str, engine_id: &str, num_results: u32) -> Result<(), ApiError> {
    if api_key.trim().is_empty() {
        return Err(ApiError::InvalidInput("Search API key is empty".to_string()));
    }
    if engine_id.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "Search engine id is empty".to_string(),
        ));
    }
    if !(1..=MAX_RESULTS).contains(&num_results) {
        return Err(ApiError::InvalidInput(format!(
            "num_results must be between 1 and {MAX_RESULTS}, got {num_results}"
        )));
    }
    Ok(())
}

#[async_trait]
impl LiteratureSearch for SearchClient {
    /// Issues one GET with `q`, `key`, `cx` and `num` and returns the
    /// `items` of the response (empty when the field is absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid, the request fails, the
    /// status is not a success, or the body is not the expected JSON.
    async fn search(
        &self,
        query: &str,
        api_key: &str,
        engine_id: &str,
        num_results: u32,
    ) -> Result<Vec<SearchResultItem>, ApiError> {
        validate(api_key, engine_id, num_results)?;

        let url = construct_endpoint_url(&self.base_url, &Endpoint::CustomSearch);
        tracing::debug!("GET {url} q={query:?} num={num_results}");

        let num = num_results.to_string();
        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("key", api_key),
                ("cx", engine_id),
                ("num", num.as_str()),
            ])
            .send()
            .await?;

        let response = check_response(response).await?;
        let body = response.text().await?;
        let parsed: SearchResponse = deserialize_with_context(&body, "SearchResponse")?;

        tracing::debug!("Search returned {} item(s)", parsed.items.len());
        Ok(parsed.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_key() {
        assert!(matches!(
            validate("", "cx", 3),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            validate("   ", "cx", 3),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_engine() {
        assert!(matches!(
            validate("key", "", 3),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_result_bounds() {
        assert!(validate("key", "cx", 0).is_err());
        assert!(validate("key", "cx", 1).is_ok());
        assert!(validate("key", "cx", MAX_RESULTS).is_ok());
        assert!(validate("key", "cx", MAX_RESULTS + 1).is_err());
    }

    #[test]
    fn test_item_without_snippet() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"items": [{"title": "A", "link": "http://x"}]}"#,
        )
        .unwrap();
        assert_eq!(response.items[0].snippet, "");
    }

    #[test]
    fn test_missing_items_is_empty() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(response.items.is_empty());
    }
}
