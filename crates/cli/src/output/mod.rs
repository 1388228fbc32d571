//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles progress bars and colored output.

mod formatter;
mod progress;

use futures::StreamExt;
use s3ops_core::{EventStream, ProgressEvent};

use crate::exit_code::ExitCode;

pub use formatter::{Channel, Formatter, json_line};
pub use progress::ProgressBar;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

enum Step {
    Next(Option<s3ops_core::Result<ProgressEvent>>),
    Interrupted,
}

/// Print every event of an operation and pick the exit code.
///
/// Ctrl-C drops the stream, which stops any further work, and exits with
/// [`ExitCode::Interrupted`].
pub async fn render_events(mut events: EventStream, formatter: &Formatter) -> ExitCode {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut bar: Option<ProgressBar> = None;
    let mut failures = 0usize;

    loop {
        let step = tokio::select! {
            next = events.next() => Step::Next(next),
            _ = &mut ctrl_c => Step::Interrupted,
        };

        let event = match step {
            Step::Next(Some(Ok(event))) => event,
            Step::Next(Some(Err(e))) => {
                clear(&bar);
                formatter.error(&e.to_string());
                return ExitCode::from(&e);
            }
            Step::Next(None) => break,
            Step::Interrupted => {
                drop(events);
                clear(&bar);
                formatter.error("Interrupted");
                return ExitCode::Interrupted;
            }
        };

        if event.is_failure() {
            failures += 1;
        }

        if let ProgressEvent::Progress { done, total, .. } = &event {
            let bar = bar.get_or_insert_with(|| ProgressBar::new(formatter.config(), *total));
            if bar.is_visible() {
                bar.set_position(*done);
                continue;
            }
        }

        match &bar {
            Some(bar) => bar.suspend(|| formatter.event(&event)),
            None => formatter.event(&event),
        }
    }

    clear(&bar);
    if failures > 0 {
        tracing::debug!(failures, "operation finished with failures");
        ExitCode::PartialFailure
    } else {
        ExitCode::Success
    }
}

fn clear(bar: &Option<ProgressBar>) {
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
}
