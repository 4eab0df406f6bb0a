use crate::intent::Encoding;
use crate::review::ReviewStrategy;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "moviebot")]
#[command(about = "Movie chatbot: what's playing, showtimes, tickets and reviews", long_about = None)]
pub struct Args {
    #[arg(
        short = 'e',
        long = "encoding",
        help = "How the model requests functions (structured, json, pseudo)"
    )]
    pub encoding: Option<Encoding>,

    #[arg(short = 'm', long = "model", help = "Model used for replies")]
    pub model: Option<String>,

    #[arg(
        long = "max-generations",
        help = "Maximum model generations per user message"
    )]
    pub max_generations: Option<usize>,

    #[arg(
        long = "show-call-content",
        conflicts_with = "hide_call_content",
        help = "Show text the model writes alongside a function call"
    )]
    pub show_call_content: bool,

    #[arg(
        long = "hide-call-content",
        help = "Hide text the model writes alongside a function call"
    )]
    pub hide_call_content: bool,

    #[arg(long = "no-reviews", help = "Disable the review pre-fetch")]
    pub no_reviews: bool,

    #[arg(
        long = "review-strategy",
        help = "How the review decision is requested (auto, json, tool, off)"
    )]
    pub review_strategy: Option<ReviewStrategy>,

    #[arg(long = "catalog", help = "Catalog file (YAML or JSON) to serve movies from")]
    pub catalog: Option<PathBuf>,

    #[arg(
        long = "api-endpoint",
        help = "Custom API base URL (e.g., http://localhost:11434/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(short = 'v', long = "verbose", help = "Log diagnostics to stderr")]
    pub verbose: bool,

    #[arg(
        long = "config-init",
        help = "Write an example config file to ~/.config/moviebot/moviebot.yaml"
    )]
    pub config_init: bool,

    #[arg(help = "Message to send; starts an interactive chat when omitted")]
    pub message: Vec<String>,
}
