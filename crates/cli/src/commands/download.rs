//! download command - Download a prefix
//!
//! Objects are written below the local directory with their storage prefix
//! removed. Keys that would land outside the directory are refused.

use std::path::PathBuf;

use clap::Args;
use s3ops_core::TransferEngine;

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, render_events};

/// Download objects
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Key prefix below the storage prefix (empty for everything)
    #[arg(default_value = "")]
    pub prefix: String,

    /// Bucket directory the objects live under
    #[arg(long, default_value = "")]
    pub storage_prefix: String,

    /// Local directory to write into (created when missing)
    #[arg(long, value_name = "DIR")]
    pub local_dir: PathBuf,
}

/// Execute the download command
pub async fn execute(args: DownloadArgs, session: Session, formatter: &Formatter) -> ExitCode {
    let engine = TransferEngine::new(session.store, session.options);
    let events = engine.download(&args.prefix, &args.storage_prefix, args.local_dir);
    render_events(events, formatter).await
}
