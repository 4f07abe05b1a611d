//! Error handling utilities for HTTP responses and error context formatting.

use crate::errors::ApiError;
use reqwest::Response;
use serde::de::DeserializeOwned;

/// Maximum characters to include from error body in context messages
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// Google's request ID header name.
const REQUEST_ID_HEADER: &str = "x-goog-request-id";

/// Returns the response unchanged when its status is a success, or an
/// [`ApiError::Api`] carrying the status and a body preview otherwise.
///
/// # Errors
///
/// Returns an error with status code and body preview on non-success status.
pub async fn check_response(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(read_error_with_context(response).await)
    }
}

/// Reads an error response body and builds a structured [`ApiError::Api`].
///
/// The request ID header is captured before the body is consumed. If the body
/// cannot be read, the message describes the read failure instead.
pub async fn read_error_with_context(response: Response) -> ApiError {
    let status_code = response.status().as_u16();

    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let error_body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error body: {}", e));

    ApiError::Api {
        status_code,
        message: truncate_for_context(&error_body, ERROR_BODY_PREVIEW_LENGTH),
        request_id,
    }
}

/// Deserializes a JSON response body, reporting parse failures as
/// [`ApiError::MalformedResponse`] with a preview of the offending body.
///
/// # Errors
///
/// Returns an error if `body` is not valid JSON for `T`.
pub fn deserialize_with_context<T: DeserializeOwned>(
    body: &str,
    what: &str,
) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        ApiError::MalformedResponse(format!("{what}: {}", format_json_parse_error(body, e)))
    })
}

/// Formats JSON parsing context by including a preview of the raw JSON.
pub fn format_json_parse_error(json_str: &str, error: serde_json::Error) -> String {
    let preview = truncate_for_context(json_str, ERROR_BODY_PREVIEW_LENGTH);
    format!("JSON parse error: {} | Context: {}", error, preview)
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Slices on a character boundary so multi-byte UTF-8 never panics.
pub(crate) fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
