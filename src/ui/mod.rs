mod output;

pub use output::{display_notice, display_turn_error, print_banner, TerminalSink};
