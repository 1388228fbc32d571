//! rm command - Delete a prefix
//!
//! Lists everything under the prefix, then deletes it in batches. Without
//! `--force` the user must confirm on the terminal first.

use std::io::IsTerminal;

use clap::Args;
use console::Term;
use s3ops_core::{BatchDeleter, join_prefix};

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, render_events};

/// Delete objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Key prefix below the storage prefix
    #[arg(default_value = "")]
    pub prefix: String,

    /// Bucket directory the objects live under
    #[arg(long, default_value = "")]
    pub storage_prefix: String,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, session: Session, formatter: &Formatter) -> ExitCode {
    let scope = join_prefix(&args.storage_prefix, &args.prefix);

    if !args.force && !scope.is_empty() {
        if formatter.is_json() || !std::io::stdin().is_terminal() {
            formatter.error("Refusing to delete without --force in non-interactive mode");
            return ExitCode::UsageError;
        }

        match confirm(&scope) {
            Ok(true) => {}
            Ok(false) => {
                formatter.warning("Aborted");
                return ExitCode::Success;
            }
            Err(e) => {
                formatter.error(&format!("Failed to read confirmation: {e}"));
                return ExitCode::GeneralError;
            }
        }
    }

    let deleter = BatchDeleter::new(session.store, session.options);
    render_events(deleter.delete(&args.prefix, &args.storage_prefix), formatter).await
}

fn confirm(scope: &str) -> std::io::Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("Delete every object under '{scope}'? [y/N] "))?;
    let answer = term.read_line()?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
