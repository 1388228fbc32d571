//! CLI command definitions and execution
//!
//! Storage commands share one connection setup: the config file provides
//! defaults, global flags (or their environment variables) override the
//! storage settings, and the resulting engine stream is rendered by
//! [`render_events`](crate::output::render_events).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use s3ops_core::{Config, ConfigManager, EngineOptions, Error, ObjectStore, StorageConfig};
use s3ops_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod config;
mod download;
mod ls;
mod rm;
mod upload;

/// s3ops - batch operations for one S3-compatible bucket
///
/// Lists, uploads, downloads and deletes whole prefixes, reporting
/// progress as it goes.
#[derive(Parser, Debug)]
#[command(name = "s3ops")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress reporting
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub storage: StorageArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection settings that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct StorageArgs {
    /// S3 endpoint URL
    #[arg(long, global = true, env = "S3OPS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bucket to operate on
    #[arg(long, global = true, env = "S3OPS_BUCKET")]
    pub bucket: Option<String>,

    /// Access key ID
    #[arg(long, global = true, env = "S3OPS_ACCESS_KEY", hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(long, global = true, env = "S3OPS_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Region
    #[arg(long, global = true, env = "S3OPS_REGION")]
    pub region: Option<String>,
}

impl StorageArgs {
    /// Merge the flags over the stored settings
    pub fn merge(&self, stored: Option<StorageConfig>) -> StorageConfig {
        let mut storage = stored.unwrap_or_else(|| StorageConfig::new("", "", "", ""));
        if let Some(endpoint) = &self.endpoint {
            storage.endpoint = endpoint.clone();
        }
        if let Some(bucket) = &self.bucket {
            storage.bucket = bucket.clone();
        }
        if let Some(access_key) = &self.access_key {
            storage.access_key = access_key.clone();
        }
        if let Some(secret_key) = &self.secret_key {
            storage.secret_key = secret_key.clone();
        }
        if let Some(region) = &self.region {
            storage.region = region.clone();
        }
        storage
    }

    /// Merged settings, checked for completeness
    pub fn resolve(&self, stored: Option<StorageConfig>) -> s3ops_core::Result<StorageConfig> {
        let storage = self.merge(stored);
        if storage.endpoint.is_empty() || storage.bucket.is_empty() {
            return Err(Error::Config(
                "no endpoint or bucket configured; run `s3ops config set` or pass --endpoint and --bucket".into(),
            ));
        }
        if storage.access_key.is_empty() || storage.secret_key.is_empty() {
            return Err(Error::Config(
                "no credentials configured; set S3OPS_ACCESS_KEY and S3OPS_SECRET_KEY or run `s3ops config set`".into(),
            ));
        }
        storage.validate()?;
        Ok(storage)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List objects and their total size
    Ls(ls::LsArgs),

    /// Upload a local directory tree
    Upload(upload::UploadArgs),

    /// Download every object under a prefix
    Download(download::DownloadArgs),

    /// Delete every object under a prefix
    Rm(rm::RmArgs),

    /// Show or change the configuration file
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completion scripts
    Completions(completions::CompletionsArgs),
}

/// An open connection plus the limits operations run with
pub struct Session {
    pub store: Arc<dyn ObjectStore>,
    pub options: EngineOptions,
    pub track_progress: bool,
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    if let Commands::Completions(args) = cli.command {
        return completions::execute(args);
    }

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => match ConfigManager::new() {
            Ok(manager) => manager,
            Err(e) => {
                Formatter::new(flag_output_config(&cli)).error(&e.to_string());
                return ExitCode::from(&e);
            }
        },
    };

    let config = match manager.load() {
        Ok(config) => config,
        Err(e) => {
            Formatter::new(flag_output_config(&cli)).error(&format!(
                "Failed to load {}: {e}",
                manager.config_path().display()
            ));
            return ExitCode::from(&e);
        }
    };

    let formatter = Formatter::new(output_config(&cli, &config));

    match cli.command {
        Commands::Config(cmd) => config::execute(cmd, &cli.storage, &manager, &formatter),
        Commands::Completions(_) => ExitCode::Success,
        command => {
            let session = match open_session(&cli.storage, cli.no_progress, config).await {
                Ok(session) => session,
                Err(e) => {
                    formatter.error(&e.to_string());
                    return ExitCode::from(&e);
                }
            };

            match command {
                Commands::Ls(args) => ls::execute(args, session, &formatter).await,
                Commands::Upload(args) => upload::execute(args, session, &formatter).await,
                Commands::Download(args) => download::execute(args, session, &formatter).await,
                Commands::Rm(args) => rm::execute(args, session, &formatter).await,
                Commands::Config(_) | Commands::Completions(_) => ExitCode::Success,
            }
        }
    }
}

async fn open_session(
    overrides: &StorageArgs,
    no_progress: bool,
    config: Config,
) -> s3ops_core::Result<Session> {
    let storage = overrides.resolve(config.storage)?;
    let client = S3Client::new(&storage).await?;
    Ok(Session {
        store: Arc::new(client),
        options: config.defaults.engine_options(),
        track_progress: config.defaults.progress && !no_progress,
    })
}

fn flag_output_config(cli: &Cli) -> OutputConfig {
    OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    }
}

/// Flags win over configured defaults; the bar needs an interactive stdout
fn output_config(cli: &Cli, config: &Config) -> OutputConfig {
    let json = cli.json || config.defaults.output == "json";
    let no_color = cli.no_color
        || config.defaults.color == "never"
        || (config.defaults.color == "auto" && !console::colors_enabled());
    let interactive = console::Term::stdout().is_term();

    OutputConfig {
        json,
        no_color,
        no_progress: cli.no_progress || !config.defaults.progress || !interactive,
        quiet: cli.quiet,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "s3ops",
            "upload",
            "/data/logs",
            "--storage-prefix",
            "backup",
            "--filename-prefix",
            "ops-",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Upload(args) => {
                assert_eq!(args.local_root, PathBuf::from("/data/logs"));
                assert_eq!(args.storage_prefix, "backup");
                assert_eq!(args.filename_prefix.as_deref(), Some("ops-"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_storage_overrides() {
        let cli = Cli::try_parse_from([
            "s3ops",
            "ls",
            "logs/",
            "--endpoint",
            "http://localhost:9000",
            "--bucket",
            "archive",
        ])
        .unwrap();

        assert_eq!(cli.storage.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(cli.storage.bucket.as_deref(), Some("archive"));
    }

    #[test]
    fn test_merge_prefers_flags() {
        let stored = StorageConfig::new("http://stored:9000", "stored", "ak", "sk");
        let flags = StorageArgs {
            bucket: Some("override".into()),
            ..Default::default()
        };

        let storage = flags.resolve(Some(stored)).unwrap();

        assert_eq!(storage.endpoint, "http://stored:9000");
        assert_eq!(storage.bucket, "override");
        assert_eq!(storage.access_key, "ak");
    }

    #[test]
    fn test_resolve_requires_credentials() {
        let flags = StorageArgs {
            endpoint: Some("http://localhost:9000".into()),
            bucket: Some("b".into()),
            ..Default::default()
        };

        assert!(matches!(flags.resolve(None), Err(Error::Config(_))));
    }

    #[test]
    fn test_resolve_rejects_bad_endpoint() {
        let stored = StorageConfig::new("not a url", "b", "ak", "sk");
        assert!(matches!(
            StorageArgs::default().resolve(Some(stored)),
            Err(Error::InvalidUrl(_))
        ));
    }
}
