use crate::error::TurnError;
use crate::orchestrator::ReplySink;
use colored::*;
use std::io::{self, Write};

/// Streams reply text to stdout and notices to stderr.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl TerminalSink {
    pub fn new() -> Self {
        Self
    }
}

impl ReplySink for TerminalSink {
    fn begin_reply(&mut self) {
        print!("{} ", "bot>".green().bold());
        let _ = io::stdout().flush();
    }

    fn token(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }

    fn end_reply(&mut self) {
        println!();
    }

    fn notice(&mut self, text: &str) {
        display_notice(text);
    }
}

/// Display a notice in a boxed format
pub fn display_notice(text: &str) {
    // Avoid double newline if the text already ends with one
    let sep = if text.ends_with('\n') { "" } else { "\n" };
    eprint!("{}\n{}{}", "[notice]".yellow().bold(), text.yellow(), sep);
}

pub fn display_turn_error(error: &TurnError) {
    eprintln!("{} {}", "Error:".red(), error);
}

pub fn print_banner(encoding: &str, model: &str) {
    println!(
        "{}",
        format!(
            "moviebot ({} calls, model {}). Ask about movies in theaters; type 'exit' to quit.",
            encoding, model
        )
        .cyan()
    );
}
