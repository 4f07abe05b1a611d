/// Represents the model API version to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    /// V1 Beta API version (current)
    V1Beta,
}

impl ApiVersion {
    const fn as_str(self) -> &'static str {
        match self {
            Self::V1Beta => "v1beta",
        }
    }
}

// --- URL Construction ---
pub const MODEL_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const SEARCH_BASE_URL: &str = "https://www.googleapis.com";

/// Header name for model API key authentication. The key never goes in a URL.
pub const API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Endpoints this crate talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// Multimodal content generation for a model
    GenerateContent { model: &'a str },
    /// Custom Search JSON API
    CustomSearch,
}

impl Endpoint<'_> {
    fn to_path(&self, version: ApiVersion) -> String {
        match self {
            Self::GenerateContent { model } => {
                format!("/{}/models/{}:generateContent", version.as_str(), model)
            }
            Self::CustomSearch => "/customsearch/v1".to_string(),
        }
    }
}

/// Constructs the URL for an endpoint relative to `base_url`.
///
/// Trailing slashes on `base_url` are ignored so overrides such as
/// `http://127.0.0.1:4010/` work the same as the defaults.
#[must_use]
pub fn construct_endpoint_url(base_url: &str, endpoint: &Endpoint) -> String {
    let path = endpoint.to_path(ApiVersion::V1Beta);
    format!("{}{path}", base_url.trim_end_matches('/'))
}
