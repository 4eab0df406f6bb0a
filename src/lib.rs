pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod functions;
pub mod intent;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod review;
pub mod session;
pub mod ui;

pub use error::{MovieBotError, Result};
