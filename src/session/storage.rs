use crate::models::{Session, SessionId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A live session. Turns lock it for their whole duration, so two messages
/// for the same session never interleave.
pub type SharedSession = Arc<Mutex<Session>>;

/// Trait for session storage backends
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session whose history opens with `system_prompt`
    async fn create(&self, system_prompt: &str) -> SessionId;

    /// Look up a live session
    async fn get(&self, id: SessionId) -> Option<SharedSession>;

    /// Discard a session. Returns false if it did not exist.
    async fn remove(&self, id: SessionId) -> bool;

    /// Number of live sessions
    async fn len(&self) -> usize;
}
