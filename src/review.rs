//! Review pre-fetch: a side call to the model, made before each turn is
//! answered, that decides whether critic reviews should be injected into
//! the conversation.
//!
//! Nothing here can fail a turn. Bad decisions, model errors and collaborator
//! errors are logged and the turn continues without reviews.

use crate::api::{Generation, GenerationParams, GenerationRequest, ModelClient};
use crate::error::ExtractionError;
use crate::functions::{review_tool_definition, MovieService};
use crate::intent::Encoding;
use crate::models::{Message, Session, REVIEW_CONTEXT_PREFIX};
use crate::prompts;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStrategy {
    /// `tool` for the structured encoding, `json` for the text encodings.
    #[default]
    Auto,
    Json,
    Tool,
    Off,
}

impl ReviewStrategy {
    pub fn resolve(self, encoding: Encoding) -> Self {
        match self {
            ReviewStrategy::Auto if encoding == Encoding::Structured => ReviewStrategy::Tool,
            ReviewStrategy::Auto => ReviewStrategy::Json,
            other => other,
        }
    }
}

impl FromStr for ReviewStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ReviewStrategy::Auto),
            "json" => Ok(ReviewStrategy::Json),
            "tool" | "tools" => Ok(ReviewStrategy::Tool),
            "off" | "none" | "disabled" => Ok(ReviewStrategy::Off),
            other => Err(format!("unknown review strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReviewDecision {
    pub movie_title: Option<String>,
    pub movie_id: Option<u64>,
    pub fetch_reviews: bool,
    pub rationale: Option<String>,
}

impl ReviewDecision {
    /// Reads the JSON decision document. Ids may be numbers or numeric strings.
    pub fn from_json(text: &str) -> Result<Self, ExtractionError> {
        let value: Value = serde_json::from_str(text.trim())
            .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?;
        let Value::Object(object) = value else {
            return Err(ExtractionError::InvalidEnvelope(
                "review decision must be a JSON object".to_string(),
            ));
        };

        Ok(Self {
            movie_title: object
                .get("movie")
                .or_else(|| object.get("movie_title"))
                .and_then(Value::as_str)
                .map(str::to_string),
            movie_id: object
                .get("id")
                .or_else(|| object.get("movie_id"))
                .and_then(parse_movie_id),
            fetch_reviews: match object.get("fetch_reviews") {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
                _ => false,
            },
            rationale: object
                .get("rationale")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// Reads a decision from a tool-strategy response: a `get_reviews` call
    /// means fetch, anything else means don't.
    pub fn from_tool_response(generation: &Generation) -> Result<Self, ExtractionError> {
        let Some(call) = generation
            .tool_calls
            .iter()
            .find(|call| call.name == "get_reviews")
        else {
            return Ok(Self {
                rationale: Some(generation.content.trim().to_string()).filter(|r| !r.is_empty()),
                ..Default::default()
            });
        };

        let arguments: Value = if call.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.arguments)
                .map_err(|e| ExtractionError::InvalidJson(e.to_string()))?
        };

        Ok(Self {
            movie_title: arguments
                .get("movie_title")
                .and_then(Value::as_str)
                .map(str::to_string),
            movie_id: arguments.get("movie_id").and_then(parse_movie_id),
            fetch_reviews: true,
            rationale: Some(generation.content.trim().to_string()).filter(|r| !r.is_empty()),
        })
    }
}

fn parse_movie_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn format_review_context(title: Option<&str>, movie_id: u64, reviews: &str) -> String {
    format!(
        "{}{} (ID: {}):\n\n{}",
        REVIEW_CONTEXT_PREFIX,
        title.unwrap_or("movie"),
        movie_id,
        reviews
    )
}

pub struct ReviewPrefetch {
    client: Arc<dyn ModelClient>,
    service: Arc<dyn MovieService>,
    strategy: ReviewStrategy,
    params: GenerationParams,
    call_timeout: Duration,
}

impl ReviewPrefetch {
    /// `strategy` must already be resolved; `Auto` behaves like `Json`.
    pub fn new(
        client: Arc<dyn ModelClient>,
        service: Arc<dyn MovieService>,
        strategy: ReviewStrategy,
        params: GenerationParams,
        call_timeout: Duration,
    ) -> Self {
        Self {
            client,
            service,
            strategy,
            params,
            call_timeout,
        }
    }

    fn request(&self, session: &Session) -> GenerationRequest {
        let (prompt, tools) = match self.strategy {
            ReviewStrategy::Tool => (prompts::review_tool_prompt(), Some(vec![review_tool_definition()])),
            _ => (prompts::review_json_prompt(), None),
        };

        let mut messages = Vec::with_capacity(session.len());
        messages.push(Message::system(prompt));
        messages.extend_from_slice(session.history());

        GenerationRequest {
            messages,
            tools,
            params: self.params.clone(),
        }
    }

    fn decide(&self, generation: &Generation) -> Result<ReviewDecision, ExtractionError> {
        match self.strategy {
            ReviewStrategy::Tool => ReviewDecision::from_tool_response(generation),
            _ => ReviewDecision::from_json(&generation.content),
        }
    }

    /// Decides whether reviews are needed and, if so, appends them to the
    /// session as a context message. Returns the decision when one was made.
    pub async fn run(&self, session: &mut Session) -> Option<ReviewDecision> {
        if self.strategy == ReviewStrategy::Off {
            return None;
        }

        let generation = match self.client.complete(&self.request(session)).await {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "review decision request failed");
                return None;
            }
        };
        debug!(content = %generation.content, "review decision response");

        let mut decision = match self.decide(&generation) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, response = %generation.content, "could not parse review decision");
                return None;
            }
        };

        if !decision.fetch_reviews {
            return Some(decision);
        }

        let Some(movie_id) = decision.movie_id else {
            warn!(?decision, "review fetch requested without a movie id");
            decision.fetch_reviews = false;
            return Some(decision);
        };

        if session.has_review_context(movie_id) {
            debug!(movie_id, "reviews already in context, skipping fetch");
            decision.fetch_reviews = false;
            return Some(decision);
        }

        match tokio::time::timeout(self.call_timeout, self.service.reviews(movie_id)).await {
            Ok(Ok(reviews)) => {
                info!(movie_id, title = ?decision.movie_title, "injecting review context");
                session.push_context(format_review_context(
                    decision.movie_title.as_deref(),
                    movie_id,
                    &reviews,
                ));
            }
            Ok(Err(e)) => warn!(movie_id, error = %e, "review lookup failed"),
            Err(_) => warn!(
                movie_id,
                secs = self.call_timeout.as_secs(),
                "review lookup timed out"
            ),
        }

        Some(decision)
    }
}
