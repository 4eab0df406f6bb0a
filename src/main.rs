use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use moviebot::api::{GenerationParams, ModelClient, OpenAiClient};
use moviebot::cli::Args;
use moviebot::config::{Config, FileConfig};
use moviebot::functions::{CatalogService, Dispatcher, MovieService};
use moviebot::intent::extractor_for;
use moviebot::logging;
use moviebot::models::SessionId;
use moviebot::orchestrator::{ChatService, LoopSettings, ReplyLoop};
use moviebot::prompts::system_prompt;
use moviebot::review::{ReviewPrefetch, ReviewStrategy};
use moviebot::session::InMemorySessionStore;
use moviebot::ui::{display_turn_error, print_banner, TerminalSink};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.config_init {
        init_config();
        return;
    }

    let config = match Config::from_env_and_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };
    logging::init(config.verbose);

    let chat = match build_chat_service(&config) {
        Ok(chat) => chat,
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    };

    let session = chat.start_session().await;

    if args.message.is_empty() {
        print_banner(config.encoding.as_str(), &config.model);
        run_repl(&chat, session).await;
        chat.end_session(session).await;
    } else {
        let message = args.message.join(" ");
        let mut sink = TerminalSink::new();
        let result = chat.handle_message(session, &message, &mut sink).await;
        chat.end_session(session).await;
        if let Err(e) = result {
            if !e.shown_as_notice() {
                display_turn_error(&e);
            }
            process::exit(1);
        }
    }
}

fn init_config() {
    let Some(path) = FileConfig::user_config_path() else {
        eprintln!("{} could not determine home directory", "Error:".red());
        process::exit(1);
    };
    match FileConfig::write_example(&path) {
        Ok(()) => println!(
            "{}",
            format!("Wrote example config to {}", path.display()).green()
        ),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            process::exit(1);
        }
    }
}

fn build_chat_service(config: &Config) -> moviebot::Result<ChatService> {
    let client: Arc<dyn ModelClient> = Arc::new(OpenAiClient::new(
        &config.api_key,
        config.api_endpoint.clone(),
        config.request_timeout,
        config.stream_timeout,
    )?);

    let service: Arc<dyn MovieService> = Arc::new(match &config.catalog_path {
        Some(path) => CatalogService::from_path(path)?,
        None => CatalogService::builtin(),
    });
    let call_timeout = Duration::from_secs(config.call_timeout);

    let settings = LoopSettings {
        encoding: config.encoding,
        max_generations: config.max_generations,
        surface_call_content: config.surface_call_content,
        params: GenerationParams {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
    };

    let mut reply_loop = ReplyLoop::new(
        client.clone(),
        extractor_for(config.encoding),
        Dispatcher::new(service.clone(), call_timeout),
        settings,
    );

    let strategy = config.review_strategy.resolve(config.encoding);
    if strategy != ReviewStrategy::Off {
        let params = GenerationParams {
            model: config.review_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };
        reply_loop = reply_loop.with_review(ReviewPrefetch::new(
            client,
            service,
            strategy,
            params,
            call_timeout,
        ));
    }

    let prompt = system_prompt(config.encoding, &Config::get_current_date());
    Ok(ChatService::new(
        Arc::new(InMemorySessionStore::new()),
        reply_loop,
        prompt,
    ))
}

async fn run_repl(chat: &ChatService, session: SessionId) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "you>".blue().bold());
        let _ = io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                println!();
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "Error reading input:".red(), e);
                break;
            }
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let mut sink = TerminalSink::new();
        if let Err(e) = chat.handle_message(session, message, &mut sink).await {
            if !e.shown_as_notice() {
                display_turn_error(&e);
            }
        }
    }
}
