use super::defaults::{default_request_timeout, default_stream_timeout};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub stream_timeout: Option<u64>,
    #[serde(default)]
    pub request_timeout: Option<u64>,
}

impl ApiConfig {
    pub fn stream_timeout(&self) -> u64 {
        self.stream_timeout.unwrap_or_else(default_stream_timeout)
    }

    pub fn request_timeout(&self) -> u64 {
        self.request_timeout.unwrap_or_else(default_request_timeout)
    }
}

/// Turns a base URL into a full chat completions URL.
pub fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with("/chat/completions") {
        endpoint.to_string()
    } else if endpoint.ends_with("/v1") {
        format!("{}/chat/completions", endpoint)
    } else if endpoint.ends_with("/v1/") {
        format!("{}chat/completions", endpoint)
    } else {
        // Assume it's a base URL without /v1
        format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'))
    }
}
