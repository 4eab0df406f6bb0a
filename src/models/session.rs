use super::message::{Message, Role};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix of every injected review context message.
pub const REVIEW_CONTEXT_PREFIX: &str = "CONTEXT: Reviews for ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One conversation's history.
///
/// The message list always starts with exactly one system message (the
/// instruction prompt) and only grows by appending, so replaying it
/// reconstructs the context of every generation in the conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: SessionId,
    pub created_at: DateTime<Local>,
    pub last_updated: DateTime<Local>,
    messages: Vec<Message>,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_id(SessionId::new(), system_prompt)
    }

    pub fn with_id(id: SessionId, system_prompt: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id,
            created_at: now,
            last_updated: now,
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Everything after the instruction prompt.
    pub fn history(&self) -> &[Message] {
        &self.messages[1..]
    }

    pub fn system_prompt(&self) -> &str {
        &self.messages[0].content
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        // The instruction prompt is always present.
        false
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Injects external data (function results, reviews, error notices) into
    /// the conversation as a system message.
    pub fn push_context(&mut self, content: impl Into<String>) {
        self.push(Message::system(content));
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.last_updated = Local::now();
    }

    /// Whether review context for the given movie id has already been injected.
    pub fn has_review_context(&self, movie_id: u64) -> bool {
        let marker = format!("(ID: {}):", movie_id);
        self.history().iter().any(|m| {
            m.role == Role::System
                && m.content.starts_with(REVIEW_CONTEXT_PREFIX)
                && m.content.lines().next().is_some_and(|l| l.contains(&marker))
        })
    }
}
