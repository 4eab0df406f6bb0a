use async_trait::async_trait;
use moviebot::error::{DispatchError, ServiceError};
use moviebot::functions::{format_tools_for_llm, CatalogService, Dispatcher, KnownFunction, MovieService};
use moviebot::intent::FunctionCall;
use moviebot::models::SessionId;
use std::sync::Arc;
use std::time::Duration;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(Arc::new(CatalogService::builtin()), Duration::from_secs(5))
}

/// A collaborator that never answers.
struct StalledService;

#[async_trait]
impl MovieService for StalledService {
    async fn now_playing(&self) -> Result<String, ServiceError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(String::new())
    }

    async fn showtimes(&self, _title: &str, _location: &str) -> Result<String, ServiceError> {
        Ok(String::new())
    }

    async fn buy_ticket(
        &self,
        _: SessionId,
        _: &str,
        _: &str,
        _: &str,
    ) -> Result<String, ServiceError> {
        Ok(String::new())
    }

    async fn confirm_ticket_purchase(
        &self,
        _: SessionId,
        _: &str,
        _: &str,
        _: &str,
    ) -> Result<String, ServiceError> {
        Ok(String::new())
    }

    async fn reviews(&self, _movie_id: u64) -> Result<String, ServiceError> {
        Ok(String::new())
    }
}

#[tokio::test]
async fn test_dispatch_now_playing() {
    let result = dispatcher()
        .dispatch(SessionId::new(), &FunctionCall::new("get_now_playing_movies"))
        .await
        .unwrap();
    assert!(result.starts_with("Movies playing now:"));
    assert!(result.contains("Dune (ID: 438631)"));
}

#[tokio::test]
async fn test_dispatch_unknown_function() {
    let err = dispatcher()
        .dispatch(SessionId::new(), &FunctionCall::new("get_weather"))
        .await
        .unwrap_err();
    assert_eq!(err, DispatchError::UnknownFunction("get_weather".to_string()));
    assert_eq!(err.to_string(), "Unknown function: get_weather");
    assert!(err.is_unknown_function());
}

#[tokio::test]
async fn test_dispatch_missing_argument() {
    let call = FunctionCall::new("get_showtimes").with_argument("title", "Dune");
    let err = dispatcher().dispatch(SessionId::new(), &call).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidArguments { .. }));
    let text = err.to_string();
    assert!(text.starts_with("Error processing get_showtimes:"));
    assert!(text.contains("location"));
}

#[tokio::test]
async fn test_dispatch_unexpected_argument() {
    let call = FunctionCall::new("get_now_playing_movies").with_argument("genre", "horror");
    let err = dispatcher().dispatch(SessionId::new(), &call).await.unwrap_err();
    assert!(matches!(err, DispatchError::InvalidArguments { .. }));
}

#[tokio::test]
async fn test_dispatch_service_error_message() {
    let call = FunctionCall::new("get_showtimes")
        .with_argument("title", "Dune")
        .with_argument("location", "Atlantis");
    let err = dispatcher()
        .dispatch(SessionId::new(), &call)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Service { .. }));
    assert_eq!(
        err.to_string(),
        "Error processing get_showtimes: no theaters found near 'Atlantis'"
    );
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_times_out() {
    let dispatcher = Dispatcher::new(Arc::new(StalledService), Duration::from_secs(2));
    let err = dispatcher
        .dispatch(SessionId::new(), &FunctionCall::new("get_now_playing_movies"))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error processing get_now_playing_movies: timed out after 2s"
    );
}

#[tokio::test]
async fn test_quote_then_confirm() {
    let dispatcher = dispatcher();
    let session = SessionId::new();
    let args = |name: &str| {
        FunctionCall::new(name)
            .with_argument("theater", "Cinerama Seattle")
            .with_argument("movie", "dune")
            .with_argument("showtime", "8:00 pm")
    };

    let quote = dispatcher.dispatch(session, &args("buy_ticket")).await.unwrap();
    assert!(quote.contains("Dune at Cinerama Seattle at 8:00 PM, $19.00"));

    let confirmed = dispatcher
        .dispatch(session, &args("confirm_ticket_purchase"))
        .await
        .unwrap();
    assert!(confirmed.starts_with("Purchase confirmed:"));
    assert!(confirmed.contains("Confirmation number:"));

    // The quote is consumed by the purchase.
    let again = dispatcher
        .dispatch(session, &args("confirm_ticket_purchase"))
        .await
        .unwrap_err();
    assert!(again.to_string().contains("call buy_ticket first"));
}

#[test]
fn test_tool_definitions() {
    let tools = format_tools_for_llm();
    assert_eq!(tools.len(), KnownFunction::ALL.len());
    let showtimes = tools
        .iter()
        .find(|t| t["function"]["name"] == "get_showtimes")
        .unwrap();
    assert_eq!(
        showtimes["function"]["parameters"]["required"],
        serde_json::json!(["title", "location"])
    );
    assert_eq!(
        KnownFunction::BuyTicket.signature(),
        "buy_ticket(theater, movie, showtime)"
    );
}
