//! upload command - Upload a directory tree
//!
//! Every regular file below the local root becomes one object under the
//! storage prefix, keyed by its relative path.

use std::path::PathBuf;

use clap::Args;
use s3ops_core::{PrefixFilter, TransferEngine};

use super::Session;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, render_events};

/// Upload a local directory
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Local directory to upload
    pub local_root: PathBuf,

    /// Bucket directory the files are placed under
    #[arg(long, default_value = "")]
    pub storage_prefix: String,

    /// Only upload files whose name starts with this
    #[arg(long)]
    pub filename_prefix: Option<String>,
}

/// Execute the upload command
pub async fn execute(args: UploadArgs, session: Session, formatter: &Formatter) -> ExitCode {
    let mut filter = PrefixFilter::new(args.storage_prefix);
    if let Some(prefix) = args.filename_prefix {
        filter = filter.with_filename_prefix(prefix);
    }

    let engine = TransferEngine::new(session.store, session.options);
    let events = engine.upload(args.local_root, filter, session.track_progress);
    render_events(events, formatter).await
}
