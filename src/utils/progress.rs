//! Terminal spinners for long-running CLI steps.
//!
//! Spinners draw to stderr and are hidden when progress is disabled (`--no-progress`)
//! or when stderr is not a terminal, so piped and CI output stays clean.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// A spinner for an operation of unknown length.
#[derive(Debug, Clone)]
pub struct Spinner {
    inner: IndicatifBar,
}

impl Spinner {
    /// Starts a spinner showing `message`, or a hidden one when `enabled` is false.
    #[must_use]
    pub fn start(message: impl Into<String>, enabled: bool) -> Self {
        let bar = if enabled && std::io::stderr().is_terminal() {
            let bar = IndicatifBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
            }
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            IndicatifBar::hidden()
        };
        bar.set_message(message.into());
        Self { inner: bar }
    }

    /// Replaces the message.
    pub fn set_message(&self, message: impl Into<String>) {
        self.inner.set_message(message.into());
    }

    /// Removes the spinner from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}
