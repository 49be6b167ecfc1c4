//! Terminal output helpers: styled notices and spinners for long waits.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while the connect handshake retries and while the
/// retrospective watch waits for a follow-up proposal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("progress bar template is a valid static string"),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

pub fn failure(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}
