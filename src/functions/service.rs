use crate::error::ServiceError;
use crate::models::SessionId;
use async_trait::async_trait;

/// External movie data and ticketing operations.
///
/// Implementations are opaque to the reply loop: every method returns text
/// meant for the model, or an error the dispatcher turns into text. Ticket
/// operations are scoped to the session that made them.
#[async_trait]
pub trait MovieService: Send + Sync {
    async fn now_playing(&self) -> Result<String, ServiceError>;

    async fn showtimes(&self, title: &str, location: &str) -> Result<String, ServiceError>;

    async fn buy_ticket(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError>;

    async fn confirm_ticket_purchase(
        &self,
        session: SessionId,
        theater: &str,
        movie: &str,
        showtime: &str,
    ) -> Result<String, ServiceError>;

    async fn reviews(&self, movie_id: u64) -> Result<String, ServiceError>;

    /// Drops whatever the service holds for a finished session.
    async fn end_session(&self, _session: SessionId) {}
}
