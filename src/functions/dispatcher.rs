use super::definitions::KnownFunction;
use super::service::MovieService;
use crate::error::{DispatchError, ServiceError};
use crate::intent::FunctionCall;
use crate::models::SessionId;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Routes extracted function calls to the movie collaborators.
///
/// The dispatcher only marshals arguments and wraps failures; every failure
/// comes back as a [`DispatchError`] whose text is safe to put in history.
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn MovieService>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn MovieService>, call_timeout: Duration) -> Self {
        Self {
            service,
            call_timeout,
        }
    }

    pub async fn dispatch(
        &self,
        session: SessionId,
        call: &FunctionCall,
    ) -> Result<String, DispatchError> {
        let function = KnownFunction::from_name(&call.name)
            .ok_or_else(|| DispatchError::UnknownFunction(call.name.clone()))?;

        function
            .validate_arguments(&call.arguments)
            .map_err(|detail| DispatchError::InvalidArguments {
                function: function.name().to_string(),
                detail,
            })?;

        info!(
            session = %session,
            function = %function,
            arguments = ?call.arguments,
            "dispatching function call"
        );

        let arg = |name: &str| call.arguments.get(name).map(String::as_str).unwrap_or_default();
        let service = self.service.as_ref();

        match function {
            KnownFunction::GetNowPlayingMovies => {
                self.run(function, service.now_playing()).await
            }
            KnownFunction::GetShowtimes => {
                self.run(function, service.showtimes(arg("title"), arg("location")))
                    .await
            }
            KnownFunction::BuyTicket => {
                self.run(
                    function,
                    service.buy_ticket(session, arg("theater"), arg("movie"), arg("showtime")),
                )
                .await
            }
            KnownFunction::ConfirmTicketPurchase => {
                self.run(
                    function,
                    service.confirm_ticket_purchase(
                        session,
                        arg("theater"),
                        arg("movie"),
                        arg("showtime"),
                    ),
                )
                .await
            }
        }
    }

    /// Releases collaborator state held for a finished session.
    pub async fn end_session(&self, session: SessionId) {
        self.service.end_session(session).await;
    }

    async fn run<F>(&self, function: KnownFunction, pending: F) -> Result<String, DispatchError>
    where
        F: Future<Output = Result<String, ServiceError>>,
    {
        match tokio::time::timeout(self.call_timeout, pending).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(source)) => Err(DispatchError::Service {
                function: function.name().to_string(),
                source,
            }),
            Err(_) => Err(DispatchError::Timeout {
                function: function.name().to_string(),
                secs: self.call_timeout.as_secs(),
            }),
        }
    }
}
