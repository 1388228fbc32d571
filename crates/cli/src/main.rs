//! s3ops - batch operations for S3-compatible object storage
//!
//! Lists, uploads, downloads and deletes whole prefixes of one bucket.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use s3ops_cli::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with JSON on stdout
    let filter = if cli.debug {
        EnvFilter::new("s3ops_core=debug,s3ops_s3=debug,s3ops_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
