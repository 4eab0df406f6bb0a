#![allow(dead_code)]

use async_trait::async_trait;
use moviebot::api::{FinishReason, Generation, GenerationRequest, ModelClient, ToolCallRequest};
use moviebot::error::{ApiError, ServiceError};
use moviebot::functions::{CatalogService, Dispatcher, MovieService};
use moviebot::intent::{extractor_for, Encoding};
use moviebot::models::SessionId;
use moviebot::orchestrator::{LoopSettings, ReplyLoop, ReplySink};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A model that replays canned generations and records what it was sent.
#[derive(Default)]
pub struct ScriptedModel {
    streamed: Mutex<VecDeque<Generation>>,
    completed: Mutex<VecDeque<Generation>>,
    stream_requests: Mutex<Vec<GenerationRequest>>,
    complete_requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_stream(self, generation: Generation) -> Self {
        self.streamed.lock().unwrap().push_back(generation);
        self
    }

    pub fn then_say(self, text: &str) -> Self {
        self.then_stream(Generation::text(text))
    }

    pub fn then_complete(self, generation: Generation) -> Self {
        self.completed.lock().unwrap().push_back(generation);
        self
    }

    pub fn stream_requests(&self) -> Vec<GenerationRequest> {
        self.stream_requests.lock().unwrap().clone()
    }

    pub fn complete_requests(&self) -> Vec<GenerationRequest> {
        self.complete_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn stream(
        &self,
        request: &GenerationRequest,
        on_token: &mut (dyn for<'t> FnMut(&'t str) + Send),
    ) -> Result<Generation, ApiError> {
        self.stream_requests.lock().unwrap().push(request.clone());
        let generation = self
            .streamed
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::InvalidResponse("script exhausted".to_string()))?;

        // Deliver the text a few characters at a time, like a real stream.
        let chars: Vec<char> = generation.content.chars().collect();
        for piece in chars.chunks(4) {
            let piece: String = piece.iter().collect();
            on_token(&piece);
        }
        Ok(generation)
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<Generation, ApiError> {
        self.complete_requests.lock().unwrap().push(request.clone());
        self.completed
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::InvalidResponse("script exhausted".to_string()))
    }
}

pub fn tool_call(name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: Some(format!("call_{}", name)),
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

pub fn tool_generation(content: &str, calls: Vec<ToolCallRequest>) -> Generation {
    Generation {
        content: content.to_string(),
        tool_calls: calls,
        finish_reason: FinishReason::ToolCalls,
    }
}

/// The bundled catalog, with a log of every call made to it.
pub struct RecordingService {
    inner: CatalogService,
    calls: Mutex<Vec<String>>,
    fail_showtimes: Option<ServiceError>,
}

impl RecordingService {
    pub fn new() -> Self {
        Self {
            inner: CatalogService::builtin(),
            calls: Mutex::new(Vec::new()),
            fail_showtimes: None,
        }
    }

    pub fn failing_showtimes(error: ServiceError) -> Self {
        Self {
            fail_showtimes: Some(error),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl MovieService for RecordingService {
    async fn now_playing(&self) -> Result<String, ServiceError> {
        self.record("now_playing".to_string());
        self.inner.now_playing().await
    }

    async fn showtimes(&self, title: &str, location: &str) -> Result<String, ServiceError> {
        self.record(format!("showtimes({}, {})", title, location));
        if let Some(error) = &self.fail_showtimes {
            return Err(error.clone());
        }
        self.inner.showtimes(title, location).await
    }

    async fn buy_ticket(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError> {
        self.record(format!("buy_ticket({}, {}, {})", theater, movie, showtime));
        self.inner.buy_ticket(session, theater, movie, showtime).await
    }

    async fn confirm_ticket_purchase(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError> {
        self.record(format!("confirm({}, {}, {})", theater, movie, showtime));
        self.inner
            .confirm_ticket_purchase(session, theater, movie, showtime)
            .await
    }

    async fn reviews(&self, movie_id: u64) -> Result<String, ServiceError> {
        self.record(format!("reviews({})", movie_id));
        self.inner.reviews(movie_id).await
    }

    async fn end_session(&self, session: SessionId) {
        self.record("end_session".to_string());
        self.inner.end_session(session).await
    }
}

/// Captures everything a turn shows the user.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub tokens: Vec<String>,
    pub notices: Vec<String>,
    pub replies_started: usize,
    pub replies_ended: usize,
}

impl CollectingSink {
    pub fn visible(&self) -> String {
        self.tokens.concat()
    }
}

impl ReplySink for CollectingSink {
    fn begin_reply(&mut self) {
        self.replies_started += 1;
    }

    fn token(&mut self, text: &str) {
        self.tokens.push(text.to_string());
    }

    fn end_reply(&mut self) {
        self.replies_ended += 1;
    }

    fn notice(&mut self, text: &str) {
        self.notices.push(text.to_string());
    }
}

pub fn settings(encoding: Encoding) -> LoopSettings {
    LoopSettings::new(encoding)
}

pub fn reply_loop(
    model: Arc<ScriptedModel>,
    service: Arc<RecordingService>,
    settings: LoopSettings,
) -> ReplyLoop {
    ReplyLoop::new(
        model,
        extractor_for(settings.encoding),
        Dispatcher::new(service, Duration::from_secs(5)),
        settings,
    )
}
