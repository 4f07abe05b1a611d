use super::common::{API_KEY_HEADER, Endpoint, construct_endpoint_url};
use super::error_helpers::{check_response, deserialize_with_context};
use crate::errors::ApiError;
use crate::wire::{GenerateContentRequest, GenerateContentResponse};
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::debug;

/// Sends one `generateContent` request and returns the parsed response.
///
/// `timeout` is the request timeout configured on the client, if any. It is
/// only used to report [`ApiError::Timeout`] with the configured duration.
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP request fails or times out
/// - The response status is not successful
/// - The response cannot be parsed as JSON
pub async fn generate_content(
    http_client: &ReqwestClient,
    base_url: &str,
    api_key: &str,
    model: &str,
    request: &GenerateContentRequest,
    timeout: Option<Duration>,
) -> Result<GenerateContentResponse, ApiError> {
    let url = construct_endpoint_url(base_url, &Endpoint::GenerateContent { model });
    debug!("POST {url} ({} content block(s))", request.contents.len());

    let response = http_client
        .post(&url)
        .header(API_KEY_HEADER, api_key)
        .json(request)
        .send()
        .await
        .map_err(|e| map_send_error(e, timeout))?;

    debug!("generateContent responded with HTTP {}", response.status());

    let response = check_response(response).await?;
    let response_text = response
        .text()
        .await
        .map_err(|e| map_send_error(e, timeout))?;

    deserialize_with_context(&response_text, "GenerateContentResponse")
}

fn map_send_error(error: reqwest::Error, timeout: Option<Duration>) -> ApiError {
    match timeout {
        Some(duration) if error.is_timeout() => ApiError::Timeout(duration),
        _ => ApiError::Http(error),
    }
}
