mod common;

use common::{reply_loop, settings, tool_call, tool_generation, CollectingSink, RecordingService, ScriptedModel};
use moviebot::error::{ServiceError, TurnError};
use moviebot::intent::Encoding;
use moviebot::models::{Role, Session};
use std::sync::Arc;

fn session() -> Session {
    Session::new("You are a movie chatbot.")
}

fn system_messages(session: &Session) -> Vec<String> {
    session
        .history()
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.clone())
        .collect()
}

#[tokio::test]
async fn test_pseudo_call_is_dispatched_and_hidden_from_user() {
    let reply = "Dune: Part Two and Inside Out 2 are both playing right now.";
    let model = Arc::new(
        ScriptedModel::new()
            .then_say("get_now_playing_movies()")
            .then_say(reply),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model.clone(), service.clone(), settings(Encoding::Pseudo));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let outcome = chat
        .run_turn(&mut session, "What movies are playing?", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.reply.as_deref(), Some(reply));
    assert_eq!(outcome.calls, vec!["get_now_playing_movies"]);
    assert_eq!(outcome.generations, 2);
    assert_eq!(service.calls(), vec!["now_playing"]);

    assert_eq!(sink.visible(), reply);
    assert_eq!(sink.replies_started, 1);
    assert_eq!(sink.replies_ended, 1);
    assert!(sink.notices.is_empty());

    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].content, "get_now_playing_movies()");
    assert!(history[2].content.starts_with("Movies playing now:"));
    assert_eq!(history[3].role, Role::Assistant);
    assert_eq!(history[3].content, reply);
}

#[tokio::test]
async fn test_second_generation_sees_function_result() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say("get_now_playing_movies()")
            .then_say("Plenty to pick from."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model.clone(), service, settings(Encoding::Pseudo));

    let mut session = session();
    chat.run_turn(&mut session, "What's on?", &mut CollectingSink::default())
        .await
        .unwrap();

    let requests = model.stream_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 2);
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.role, Role::System);
    assert!(last.content.contains("Inside Out 2"));
    assert!(requests[0].tools.is_none());
}

#[tokio::test]
async fn test_json_envelope_fetches_showtimes() {
    let envelope = r#"{"function_name": "get_showtimes", "rationale": "The user wants showtimes", "title": "Dune", "location": "Seattle"}"#;
    let reply = "Dune is showing at AMC Pacific Place 11 at 6:00 PM.";
    let model = Arc::new(ScriptedModel::new().then_say(envelope).then_say(reply));
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service.clone(), settings(Encoding::Json));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let outcome = chat
        .run_turn(&mut session, "When is Dune playing in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.calls, vec!["get_showtimes"]);
    assert_eq!(service.calls(), vec!["showtimes(Dune, Seattle)"]);
    assert_eq!(sink.visible(), reply);
    assert!(!sink.visible().contains("function_name"));

    let context = system_messages(&session);
    assert_eq!(context.len(), 1);
    assert!(context[0].starts_with("Showtimes for Dune near Seattle"));
    assert!(context[0].contains("AMC Pacific Place 11: 6:00 PM"));
    assert!(context[0].contains("Cinerama Seattle: 3:00 PM, 8:00 PM"));
}

#[tokio::test]
async fn test_malformed_json_is_reported_and_regenerated() {
    let broken = r#"{"function_name": "get_now_playing_movies", "rationale": "list movies",}"#;
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(broken)
            .then_say("Sorry about that. Let me know what you'd like to see."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model.clone(), service.clone(), settings(Encoding::Json));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let outcome = chat
        .run_turn(&mut session, "What's playing?", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.generations, 2);
    assert!(outcome.calls.is_empty());
    assert!(service.calls().is_empty());

    assert_eq!(sink.notices.len(), 1);
    assert!(sink.notices[0].starts_with("Invalid JSON format:"));
    assert!(!sink.visible().contains("function_name"));

    let context = system_messages(&session);
    assert_eq!(context.len(), 1);
    assert!(context[0].starts_with("Invalid JSON format:"));
    assert_eq!(model.stream_requests().len(), 2);
}

#[tokio::test]
async fn test_envelope_without_rationale_is_rejected() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"{"function_name": "get_now_playing_movies"}"#)
            .then_say("Here you go."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service.clone(), settings(Encoding::Json));

    let mut session = session();
    let mut sink = CollectingSink::default();
    chat.run_turn(&mut session, "What's playing?", &mut sink)
        .await
        .unwrap();

    assert!(service.calls().is_empty());
    assert_eq!(sink.notices.len(), 1);
    assert!(sink.notices[0].contains("rationale"));
}

#[tokio::test]
async fn test_loop_limit_ends_the_turn() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say("get_now_playing_movies()")
            .then_say("get_now_playing_movies()")
            .then_say("get_now_playing_movies()")
            .then_say("never reached"),
    );
    let service = Arc::new(RecordingService::new());
    let mut loop_settings = settings(Encoding::Pseudo);
    loop_settings.max_generations = 3;
    let chat = reply_loop(model.clone(), service.clone(), loop_settings);

    let mut session = session();
    let mut sink = CollectingSink::default();
    let result = chat.run_turn(&mut session, "What's playing?", &mut sink).await;

    assert!(matches!(result, Err(TurnError::LoopLimitExceeded { limit: 3 })));
    assert_eq!(model.stream_requests().len(), 3);
    assert_eq!(service.calls().len(), 3);
    assert_eq!(sink.notices.len(), 1);
    assert!(sink.notices[0].starts_with("Loop limit exceeded"));
    assert!(sink.tokens.is_empty());
    assert!(result.unwrap_err().shown_as_notice());
}

#[tokio::test]
async fn test_collaborator_error_becomes_context() {
    let reply = "I couldn't find that movie. Anything else?";
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"get_showtimes("Oppenheimer", "Seattle")"#)
            .then_say(reply),
    );
    let service = Arc::new(RecordingService::failing_showtimes(
        ServiceError::UnknownMovie("Oppenheimer".to_string()),
    ));
    let chat = reply_loop(model, service, settings(Encoding::Pseudo));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let outcome = chat
        .run_turn(&mut session, "Oppenheimer times in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.reply.as_deref(), Some(reply));
    assert!(sink.notices.is_empty());
    assert_eq!(
        system_messages(&session),
        vec!["Error processing get_showtimes: no movie matching 'Oppenheimer'"]
    );
}

#[tokio::test]
async fn test_unknown_function_is_reported_without_retry() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"lookup_movie("Dune")"#)
            .then_say("unused"),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model.clone(), service.clone(), settings(Encoding::Pseudo));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let outcome = chat
        .run_turn(&mut session, "Tell me about Dune", &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.reply, None);
    assert_eq!(outcome.generations, 1);
    assert_eq!(outcome.calls, vec!["lookup_movie"]);
    assert!(service.calls().is_empty());
    assert_eq!(sink.notices, vec!["Unknown function: lookup_movie"]);
    assert_eq!(model.stream_requests().len(), 1);
    assert_eq!(system_messages(&session), vec!["Unknown function: lookup_movie"]);
}

#[tokio::test]
async fn test_structured_call_content_is_shown_by_default() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_stream(tool_generation(
                "Let me check the showtimes.",
                vec![tool_call(
                    "get_showtimes",
                    r#"{"title": "Dune", "location": "Seattle"}"#,
                )],
            ))
            .then_say("Dune plays at 6:00 PM at AMC Pacific Place 11."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model.clone(), service.clone(), settings(Encoding::Structured));

    let mut session = session();
    let mut sink = CollectingSink::default();
    chat.run_turn(&mut session, "Dune in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(service.calls(), vec!["showtimes(Dune, Seattle)"]);
    assert_eq!(sink.replies_started, 2);
    assert!(sink.visible().starts_with("Let me check the showtimes."));
    assert!(sink.visible().ends_with("AMC Pacific Place 11."));
    assert!(model.stream_requests()[0].tools.is_some());
}

#[tokio::test]
async fn test_structured_call_content_can_be_hidden() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_stream(tool_generation(
                "Let me check the showtimes.",
                vec![tool_call(
                    "get_showtimes",
                    r#"{"title": "Dune", "location": "Seattle"}"#,
                )],
            ))
            .then_say("Dune plays at 6:00 PM."),
    );
    let service = Arc::new(RecordingService::new());
    let mut loop_settings = settings(Encoding::Structured);
    loop_settings.surface_call_content = Some(false);
    let chat = reply_loop(model, service, loop_settings);

    let mut session = session();
    let mut sink = CollectingSink::default();
    chat.run_turn(&mut session, "Dune in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(sink.visible(), "Dune plays at 6:00 PM.");
    assert_eq!(sink.replies_started, 1);
}

#[tokio::test]
async fn test_pseudo_preamble_is_hidden_by_default() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"One moment. get_showtimes("Dune", "Seattle")"#)
            .then_say("Found them."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service.clone(), settings(Encoding::Pseudo));

    let mut session = session();
    let mut sink = CollectingSink::default();
    chat.run_turn(&mut session, "Dune in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(service.calls(), vec!["showtimes(Dune, Seattle)"]);
    assert_eq!(sink.visible(), "Found them.");
    assert_eq!(sink.replies_started, 1);
    assert_eq!(sink.replies_ended, 1);
    assert_eq!(
        session.history()[1].content,
        r#"One moment. get_showtimes("Dune", "Seattle")"#
    );
}

#[tokio::test]
async fn test_pseudo_preamble_is_shown_when_enabled() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"One moment. get_showtimes("Dune", "Seattle")"#)
            .then_say("Found them."),
    );
    let service = Arc::new(RecordingService::new());
    let mut loop_settings = settings(Encoding::Pseudo);
    loop_settings.surface_call_content = Some(true);
    let chat = reply_loop(model, service.clone(), loop_settings);

    let mut session = session();
    let mut sink = CollectingSink::default();
    chat.run_turn(&mut session, "Dune in Seattle?", &mut sink)
        .await
        .unwrap();

    assert_eq!(service.calls(), vec!["showtimes(Dune, Seattle)"]);
    assert!(sink.visible().starts_with("One moment."));
    assert!(!sink.visible().contains("get_showtimes"));
    assert!(sink.visible().ends_with("Found them."));
}

#[tokio::test]
async fn test_multiple_structured_calls_run_in_order() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_stream(tool_generation(
                "",
                vec![
                    tool_call("get_now_playing_movies", "{}"),
                    tool_call("get_showtimes", r#"{"title": "Dune", "location": "Seattle"}"#),
                ],
            ))
            .then_say("Done."),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service.clone(), settings(Encoding::Structured));

    let mut session = session();
    let outcome = chat
        .run_turn(&mut session, "What's on, and Dune in Seattle?", &mut CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(outcome.calls, vec!["get_now_playing_movies", "get_showtimes"]);
    assert_eq!(service.calls(), vec!["now_playing", "showtimes(Dune, Seattle)"]);
    let context = system_messages(&session);
    assert!(context[0].starts_with("Movies playing now:"));
    assert!(context[1].starts_with("Showtimes for Dune"));
}

#[tokio::test]
async fn test_ticket_purchase_needs_a_quote_first() {
    let model = Arc::new(
        ScriptedModel::new()
            .then_say(r#"confirm_ticket_purchase("AMC Metreon 16", "Dune: Part Two", "7:00 PM")"#)
            .then_say(r#"buy_ticket("AMC Metreon 16", "Dune: Part Two", "7:00 PM")"#)
            .then_say("That's $15.00. Shall I confirm?"),
    );
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service, settings(Encoding::Pseudo));

    let mut session = session();
    chat.run_turn(&mut session, "Buy me a ticket", &mut CollectingSink::default())
        .await
        .unwrap();

    let context = system_messages(&session);
    assert_eq!(context.len(), 2);
    assert!(context[0].starts_with("Error processing confirm_ticket_purchase:"));
    assert!(context[1].starts_with("Ticket quote:"));
    assert!(context[1].contains("$15.00"));
}

#[tokio::test]
async fn test_model_failure_is_surfaced() {
    let model = Arc::new(ScriptedModel::new());
    let service = Arc::new(RecordingService::new());
    let chat = reply_loop(model, service, settings(Encoding::Pseudo));

    let mut session = session();
    let mut sink = CollectingSink::default();
    let result = chat.run_turn(&mut session, "Hello", &mut sink).await;

    assert!(matches!(result, Err(TurnError::Model(_))));
    assert!(result.unwrap_err().shown_as_notice());
    assert_eq!(sink.notices.len(), 1);
    assert!(sink.notices[0].starts_with("Model request failed"));
    assert_eq!(session.history().len(), 1);
}
