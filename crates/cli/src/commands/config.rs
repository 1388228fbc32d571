//! config command - Show and change the configuration file
//!
//! `config set` persists the global connection flags (`--endpoint`,
//! `--bucket`, `--access-key`, `--secret-key`, `--region`) together with its
//! own engine limits.

use anyhow::Context;
use clap::{Args, Subcommand};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use s3ops_core::{Config, ConfigManager, StorageConfig};
use serde::Serialize;

use super::StorageArgs;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (secrets masked)
    Show,

    /// Save connection settings and engine limits
    Set(SetArgs),
}

/// Arguments for the `config set` command
#[derive(Args, Debug, Default)]
pub struct SetArgs {
    /// Bucket lookup style: auto, path, or dns
    #[arg(long)]
    pub bucket_lookup: Option<String>,

    /// Keys requested per listing page (1-1000)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Keys per delete call (1-1000)
    #[arg(long)]
    pub delete_batch_size: Option<usize>,

    /// Transfers in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    path: String,
    schema_version: u32,
    output: String,
    color: String,
    progress: bool,
    page_size: usize,
    delete_batch_size: usize,
    concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageView>,
}

#[derive(Debug, Serialize)]
struct StorageView {
    endpoint: String,
    bucket: String,
    access_key: String,
    secret_key: String,
    region: String,
    bucket_lookup: String,
}

impl From<&StorageConfig> for StorageView {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            endpoint: storage.endpoint.clone(),
            bucket: storage.bucket.clone(),
            access_key: storage.access_key.clone(),
            secret_key: mask(&storage.secret_key),
            region: storage.region.clone(),
            bucket_lookup: storage.bucket_lookup.clone(),
        }
    }
}

/// Execute a config subcommand
pub fn execute(
    cmd: ConfigCommands,
    storage: &StorageArgs,
    manager: &ConfigManager,
    formatter: &Formatter,
) -> ExitCode {
    let result = match cmd {
        ConfigCommands::Show => show(storage, manager, formatter),
        ConfigCommands::Set(args) => set(args, storage, manager, formatter),
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            e.downcast_ref::<s3ops_core::Error>()
                .map_or(ExitCode::GeneralError, ExitCode::from)
        }
    }
}

fn show(storage: &StorageArgs, manager: &ConfigManager, formatter: &Formatter) -> anyhow::Result<()> {
    let config = manager
        .load()
        .with_context(|| format!("reading {}", manager.config_path().display()))?;
    let view = view(manager, config, storage);

    if formatter.is_json() {
        formatter.json(&view);
    } else {
        formatter.println(&config_table(&view, formatter.colors_enabled()).to_string());
    }
    Ok(())
}

fn set(
    args: SetArgs,
    storage: &StorageArgs,
    manager: &ConfigManager,
    formatter: &Formatter,
) -> anyhow::Result<()> {
    let mut config = manager
        .load()
        .with_context(|| format!("reading {}", manager.config_path().display()))?;
    apply(&mut config, args, storage).context("invalid settings")?;
    manager
        .save(&config)
        .with_context(|| format!("writing {}", manager.config_path().display()))?;

    if formatter.is_json() {
        formatter.json(&serde_json::json!({
            "success": true,
            "path": manager.config_path().display().to_string(),
        }));
    } else {
        formatter.success(&format!(
            "Configuration saved to {}",
            manager.config_path().display()
        ));
    }
    Ok(())
}

/// Merge flags and limits into `config`, validating any storage section
fn apply(config: &mut Config, args: SetArgs, storage: &StorageArgs) -> s3ops_core::Result<()> {
    let touches_storage = storage.endpoint.is_some()
        || storage.bucket.is_some()
        || storage.access_key.is_some()
        || storage.secret_key.is_some()
        || storage.region.is_some()
        || args.bucket_lookup.is_some();

    if touches_storage {
        let mut merged = storage.merge(config.storage.take());
        if let Some(lookup) = args.bucket_lookup {
            merged.bucket_lookup = lookup;
        }
        merged.validate()?;
        config.storage = Some(merged);
    }

    if let Some(page_size) = args.page_size {
        config.defaults.page_size = page_size.clamp(1, s3ops_core::MAX_BACKEND_BATCH);
    }
    if let Some(batch) = args.delete_batch_size {
        config.defaults.delete_batch_size = batch.clamp(1, s3ops_core::MAX_BACKEND_BATCH);
    }
    if let Some(concurrency) = args.concurrency {
        config.defaults.concurrency = concurrency.max(1);
    }
    Ok(())
}

fn view(manager: &ConfigManager, config: Config, storage: &StorageArgs) -> ConfigView {
    let has_overrides = storage.endpoint.is_some() || storage.bucket.is_some();
    let effective = match config.storage {
        Some(stored) => Some(storage.merge(Some(stored))),
        None if has_overrides => Some(storage.merge(None)),
        None => None,
    };

    ConfigView {
        path: manager.config_path().display().to_string(),
        schema_version: config.schema_version,
        output: config.defaults.output,
        color: config.defaults.color,
        progress: config.defaults.progress,
        page_size: config.defaults.page_size,
        delete_batch_size: config.defaults.delete_batch_size,
        concurrency: config.defaults.concurrency,
        storage: effective.as_ref().map(StorageView::from),
    }
}

fn config_table(view: &ConfigView, colored: bool) -> Table {
    let mut rows = vec![
        ("Config file", view.path.clone()),
        ("Output", view.output.clone()),
        ("Color", view.color.clone()),
        ("Progress", view.progress.to_string()),
        ("Page size", view.page_size.to_string()),
        ("Delete batch size", view.delete_batch_size.to_string()),
        ("Concurrency", view.concurrency.to_string()),
    ];
    match &view.storage {
        Some(storage) => rows.extend([
            ("Endpoint", storage.endpoint.clone()),
            ("Bucket", storage.bucket.clone()),
            ("Access key", storage.access_key.clone()),
            ("Secret key", storage.secret_key.clone()),
            ("Region", storage.region.clone()),
            ("Bucket lookup", storage.bucket_lookup.clone()),
        ]),
        None => rows.push(("Storage", "(not configured)".to_string())),
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if !colored {
        table.force_no_tty();
    }
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key).fg(Color::Cyan), Cell::new(value)]);
    }
    table
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        "********".to_string()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn flags() -> StorageArgs {
        StorageArgs {
            endpoint: Some("http://localhost:9000".into()),
            bucket: Some("archive".into()),
            access_key: Some("AKIAEXAMPLE".into()),
            secret_key: Some("super-secret".into()),
            region: None,
        }
    }

    #[test]
    fn test_apply_persists_storage_flags() {
        let mut config = Config::default();
        let args = SetArgs {
            bucket_lookup: Some("path".into()),
            page_size: Some(5000),
            concurrency: Some(0),
            ..Default::default()
        };

        apply(&mut config, args, &flags()).unwrap();

        let storage = config.storage.unwrap();
        assert_eq!(storage.bucket, "archive");
        assert_eq!(storage.bucket_lookup, "path");
        assert_eq!(storage.region, "us-east-1");
        assert_eq!(config.defaults.page_size, 1000);
        assert_eq!(config.defaults.concurrency, 1);
    }

    #[test]
    fn test_apply_rejects_invalid_lookup() {
        let mut config = Config::default();
        let args = SetArgs {
            bucket_lookup: Some("virtual".into()),
            ..Default::default()
        };

        assert!(apply(&mut config, args, &flags()).is_err());
        assert!(config.storage.is_none());
    }

    #[test]
    fn test_limits_only_leave_storage_alone() {
        let mut config = Config::default();
        let args = SetArgs {
            delete_batch_size: Some(250),
            ..Default::default()
        };

        apply(&mut config, args, &StorageArgs::default()).unwrap();

        assert!(config.storage.is_none());
        assert_eq!(config.defaults.delete_batch_size, 250);
    }

    #[test]
    fn test_set_then_show_masks_secret() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));
        let formatter = Formatter::new(crate::output::OutputConfig {
            quiet: true,
            ..Default::default()
        });

        let code = execute(
            ConfigCommands::Set(SetArgs::default()),
            &flags(),
            &manager,
            &formatter,
        );
        assert_eq!(code, ExitCode::Success);

        let config = manager.load().unwrap();
        let view = view(&manager, config, &StorageArgs::default());
        let rendered = config_table(&view, false).to_string();

        assert!(rendered.contains("archive"));
        assert!(rendered.contains("********"));
        assert!(!rendered.contains("super-secret"));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["storage"]["secret_key"], "********");
    }

    #[test]
    fn test_show_without_storage() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));

        let view = view(&manager, Config::default(), &StorageArgs::default());

        assert!(view.storage.is_none());
        assert!(config_table(&view, false).to_string().contains("(not configured)"));
    }
}
