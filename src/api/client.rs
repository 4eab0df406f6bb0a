use crate::api::models::{Generation, GenerationRequest};
use crate::api::response::parse_completion;
use crate::api::streaming::process_streaming_response;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// The hosted language model, as seen by the reply loop.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generates a reply, handing text deltas to `on_token` as they arrive.
    async fn stream(
        &self,
        request: &GenerationRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Generation, ApiError>;

    /// Generates a reply in one piece.
    async fn complete(&self, request: &GenerationRequest) -> Result<Generation, ApiError>;
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    request_timeout: u64,
    stream_timeout: u64,
}

impl OpenAiClient {
    pub fn new(
        api_key: &str,
        endpoint: impl Into<String>,
        request_timeout: u64,
        stream_timeout: u64,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| ApiError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(request_timeout))
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            request_timeout,
            stream_timeout,
        })
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(
            model = %request.params.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            stream,
            "sending model request"
        );

        let pending = self
            .http
            .post(&self.endpoint)
            .json(&request.body(stream))
            .send();

        let response = tokio::time::timeout(Duration::from_secs(self.request_timeout), pending)
            .await
            .map_err(|_| ApiError::Timeout {
                secs: self.request_timeout,
            })??;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Status { status, message });
        }

        Ok(response)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn stream(
        &self,
        request: &GenerationRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Generation, ApiError> {
        let response = self.send(request, true).await?;
        process_streaming_response(response, self.stream_timeout, on_token).await
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Generation, ApiError> {
        let response = self.send(request, false).await?;
        let body = tokio::time::timeout(Duration::from_secs(self.request_timeout), response.text())
            .await
            .map_err(|_| ApiError::Timeout {
                secs: self.request_timeout,
            })??;
        debug!(raw = %body, "model response");

        let response_json: Value = serde_json::from_str(&body)?;
        parse_completion(&response_json)
    }
}
