use crate::api::{GenerationParams, GenerationRequest, ModelClient};
use crate::error::TurnError;
use crate::functions::Dispatcher;
use crate::intent::{Encoding, IntentExtractor};
use crate::models::{Message, Session, SessionId};
use crate::review::{ReviewDecision, ReviewPrefetch};
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_GENERATIONS: usize = 6;

/// Where the user-visible side of a turn goes: streamed reply text and
/// out-of-band notices such as parse errors.
pub trait ReplySink: Send {
    /// Called once before the first visible token of a generation.
    fn begin_reply(&mut self) {}

    fn token(&mut self, text: &str);

    /// Called once after the last visible token of a generation.
    fn end_reply(&mut self) {}

    fn notice(&mut self, text: &str);
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub encoding: Encoding,
    pub max_generations: usize,
    /// `None` picks the encoding default: shown for structured, hidden otherwise.
    pub surface_call_content: Option<bool>,
    pub params: GenerationParams,
}

impl LoopSettings {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            max_generations: DEFAULT_MAX_GENERATIONS,
            surface_call_content: None,
            params: GenerationParams::default(),
        }
    }

    pub fn surfaces_call_content(&self) -> bool {
        self.surface_call_content
            .unwrap_or(self.encoding == Encoding::Structured)
    }
}

/// What happened during one user turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The final plain reply, if the turn produced one.
    pub reply: Option<String>,
    /// Names of every function requested during the turn, in order.
    pub calls: Vec<String>,
    pub generations: usize,
    pub review: Option<ReviewDecision>,
}

/// Forwards streamed text to the sink, holding back whatever might be the
/// start of a function request.
struct VisibilityGate<'a> {
    extractor: &'a dyn IntentExtractor,
    hold_all: bool,
    text: String,
    emitted: usize,
    started: bool,
}

impl<'a> VisibilityGate<'a> {
    fn new(extractor: &'a dyn IntentExtractor, hold_all: bool) -> Self {
        Self {
            extractor,
            hold_all,
            text: String::new(),
            emitted: 0,
            started: false,
        }
    }

    fn push(&mut self, token: &str, sink: &mut dyn ReplySink) {
        self.text.push_str(token);
        if self.hold_all {
            return;
        }
        let visible = self.extractor.visible_prefix_len(&self.text);
        if visible > self.emitted && self.text.is_char_boundary(visible) {
            let chunk = self.text[self.emitted..visible].to_string();
            self.emit(&chunk, visible, sink);
        }
    }

    fn emit(&mut self, chunk: &str, upto: usize, sink: &mut dyn ReplySink) {
        if chunk.is_empty() {
            return;
        }
        if !self.started {
            sink.begin_reply();
            self.started = true;
        }
        sink.token(chunk);
        self.emitted = upto;
    }

    /// Shows `source` up to `end`, then closes the reply.
    fn flush_through(mut self, source: &str, end: usize, sink: &mut dyn ReplySink) {
        if end > self.emitted && source.is_char_boundary(self.emitted) && source.is_char_boundary(end)
        {
            let chunk = source[self.emitted..end].to_string();
            self.emit(&chunk, end, sink);
        }
        self.close(sink);
    }

    fn close(self, sink: &mut dyn ReplySink) {
        if self.started {
            sink.end_reply();
        }
    }
}

/// Drives one user turn: generate, look for a function request, dispatch it,
/// and regenerate until the model produces a plain reply.
pub struct ReplyLoop {
    client: Arc<dyn ModelClient>,
    extractor: Box<dyn IntentExtractor>,
    dispatcher: Dispatcher,
    review: Option<ReviewPrefetch>,
    settings: LoopSettings,
}

impl ReplyLoop {
    pub fn new(
        client: Arc<dyn ModelClient>,
        extractor: Box<dyn IntentExtractor>,
        dispatcher: Dispatcher,
        settings: LoopSettings,
    ) -> Self {
        Self {
            client,
            extractor,
            dispatcher,
            review: None,
            settings,
        }
    }

    pub fn with_review(mut self, review: ReviewPrefetch) -> Self {
        self.review = Some(review);
        self
    }

    pub fn encoding(&self) -> Encoding {
        self.extractor.encoding()
    }

    /// Releases collaborator state tied to a finished session.
    pub async fn end_session(&self, id: SessionId) {
        self.dispatcher.end_session(id).await;
    }

    pub async fn run_turn(
        &self,
        session: &mut Session,
        user_input: &str,
        sink: &mut dyn ReplySink,
    ) -> Result<TurnOutcome, TurnError> {
        session.push_user(user_input);

        let mut outcome = TurnOutcome::default();
        if let Some(review) = &self.review {
            outcome.review = review.run(session).await;
        }

        let tools = self.extractor.tools();
        let surface = self.settings.surfaces_call_content();
        // A call can show up anywhere in a generation, so hidden call content
        // means nothing is shown until the generation is complete.
        let hold_all = !surface;

        loop {
            if outcome.generations >= self.settings.max_generations {
                let error = TurnError::LoopLimitExceeded {
                    limit: self.settings.max_generations,
                };
                warn!(session = %session.id(), calls = ?outcome.calls, "{}", error);
                sink.notice(&error.to_string());
                return Err(error);
            }
            outcome.generations += 1;

            let request = GenerationRequest {
                messages: session.messages().to_vec(),
                tools: tools.clone(),
                params: self.settings.params.clone(),
            };
            debug!(
                generation = outcome.generations,
                messages = request.messages.len(),
                "requesting generation"
            );

            let mut gate = VisibilityGate::new(self.extractor.as_ref(), hold_all);
            let streamed = {
                let mut on_token = |token: &str| gate.push(token, &mut *sink);
                self.client.stream(&request, &mut on_token).await
            };

            let generation = match streamed {
                Ok(generation) => generation,
                Err(e) => {
                    gate.close(sink);
                    warn!(error = %e, "model request failed");
                    sink.notice(&format!("Model request failed: {}", e));
                    return Err(TurnError::Model(e));
                }
            };

            let calls = match self.extractor.extract(&generation) {
                Ok(calls) => calls,
                Err(e) => {
                    gate.close(sink);
                    warn!(error = %e, content = %generation.content, "could not read function call");
                    if !generation.content.trim().is_empty() {
                        session.push_assistant(generation.content.as_str());
                    }
                    let message = e.to_string();
                    sink.notice(&message);
                    session.push_context(message);
                    continue;
                }
            };

            if calls.is_empty() {
                let content = generation.content;
                gate.flush_through(&content, content.len(), sink);
                session.push_assistant(content.as_str());
                outcome.reply = Some(content);
                return Ok(outcome);
            }

            if surface {
                let preamble = self.extractor.call_preamble(&generation.content);
                gate.flush_through(preamble, preamble.len(), sink);
            } else {
                gate.close(sink);
            }
            if !generation.content.trim().is_empty() {
                session.push_assistant(generation.content.as_str());
            }

            let mut any_known = false;
            for call in &calls {
                outcome.calls.push(call.name.clone());
                match self.dispatcher.dispatch(session.id(), call).await {
                    Ok(result) => {
                        any_known = true;
                        session.push_context(result);
                    }
                    Err(e) => {
                        warn!(function = %call.name, error = %e, "function call failed");
                        if e.is_unknown_function() {
                            sink.notice(&e.to_string());
                        } else {
                            any_known = true;
                        }
                        session.push_context(e.to_string());
                    }
                }
            }

            if !any_known {
                info!(calls = ?outcome.calls, "only unknown functions requested, ending turn");
                return Ok(outcome);
            }
        }
    }
}

/// The session-facing surface: one reply loop shared by every session in
/// the store.
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    reply_loop: ReplyLoop,
    system_prompt: String,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        reply_loop: ReplyLoop,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            store,
            reply_loop,
            system_prompt: system_prompt.into(),
        }
    }

    pub async fn start_session(&self) -> SessionId {
        let id = self.store.create(&self.system_prompt).await;
        info!(session = %id, encoding = %self.reply_loop.encoding(), "chat started");
        id
    }

    pub async fn handle_message(
        &self,
        id: SessionId,
        text: &str,
        sink: &mut dyn ReplySink,
    ) -> Result<TurnOutcome, TurnError> {
        let session = self
            .store
            .get(id)
            .await
            .ok_or_else(|| TurnError::SessionNotFound(id.to_string()))?;
        let mut session = session.lock().await;
        self.reply_loop.run_turn(&mut session, text, sink).await
    }

    pub async fn end_session(&self, id: SessionId) -> bool {
        let removed = self.store.remove(id).await;
        if removed {
            self.reply_loop.end_session(id).await;
            info!(session = %id, "chat ended");
        }
        removed
    }

    pub async fn transcript(&self, id: SessionId) -> Option<Vec<Message>> {
        let session = self.store.get(id).await?;
        let session = session.lock().await;
        Some(session.messages().to_vec())
    }
}
