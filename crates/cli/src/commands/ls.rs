//! ls command - List objects
//!
//! Prints every object under an optional prefix followed by the total count
//! and size.

use clap::Args;
use s3ops_core::Enumerator;

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, render_events};

/// List objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only objects whose key starts with this prefix
    pub prefix: Option<String>,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, session: Session, formatter: &Formatter) -> ExitCode {
    let enumerator = Enumerator::new(session.store, session.options);
    render_events(enumerator.list(args.prefix.as_deref()), formatter).await
}
