//! Directory upload and prefix download
//!
//! Each file or object is one unit of work. A unit that fails is reported as
//! a `TransferFailed` event and the remaining units still run; only failures
//! that make the whole operation meaningless (missing upload root, target
//! directory that cannot be created, listing failure) end the stream with an
//! error.
//!
//! Units run as spawned tasks. Dropping the event stream stops new units from
//! starting, but a unit already started still completes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};
use walkdir::WalkDir;

use crate::config::EngineOptions;
use crate::error::{Error, Result};
use crate::listing::list_objects;
use crate::path::{PrefixFilter, join_prefix, to_key, to_local_path};
use crate::progress::{Direction, EventStream, ProgressEvent};
use crate::traits::{ObjectStore, ObjectSummary};

/// Moves files between a local directory tree and a bucket prefix
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn ObjectStore>, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// Upload every file below `local_root` whose name passes `filter`.
    ///
    /// Files are discovered before the first upload so that, with
    /// `track_progress`, each `Progress` event carries a fixed total.
    pub fn upload(
        &self,
        local_root: impl Into<PathBuf>,
        filter: PrefixFilter,
        track_progress: bool,
    ) -> EventStream {
        upload_events(
            self.store.clone(),
            self.options,
            local_root.into(),
            filter,
            track_progress,
        )
        .boxed()
    }

    /// Download every object under `storage_prefix/prefix` into `local_dir`.
    pub fn download(
        &self,
        prefix: &str,
        storage_prefix: &str,
        local_dir: impl Into<PathBuf>,
    ) -> EventStream {
        download_events(
            self.store.clone(),
            self.options,
            join_prefix(storage_prefix, prefix),
            local_dir.into(),
        )
        .boxed()
    }
}

#[derive(Debug)]
struct LocalFile {
    path: PathBuf,
    relative: PathBuf,
    size_bytes: u64,
}

#[derive(Debug, Default)]
struct LocalScan {
    files: Vec<LocalFile>,
    /// Entries the walk could not read: (path, message)
    unreadable: Vec<(String, String)>,
}

fn upload_events(
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
    local_root: PathBuf,
    filter: PrefixFilter,
    track_progress: bool,
) -> impl Stream<Item = Result<ProgressEvent>> + Send + 'static {
    try_stream! {
        let scan = scan_local_files(local_root.clone(), filter.clone()).await?;
        let total = scan.files.len() as u64;
        tracing::info!(
            root = %local_root.display(),
            storage_prefix = %filter.storage_prefix,
            files = total,
            "starting upload"
        );

        let mut succeeded = 0u64;
        let mut failed = 0u64;

        for (source, message) in scan.unreadable {
            failed += 1;
            yield ProgressEvent::TransferFailed {
                direction: Direction::Upload,
                source,
                message,
            };
        }

        let storage_prefix = filter.storage_prefix;
        let uploads = futures::stream::iter(scan.files)
            .map(move |file| {
                let store = store.clone();
                let storage_prefix = storage_prefix.clone();
                run_unit(async move { upload_one(store.as_ref(), file, &storage_prefix).await })
            })
            .buffered(options.concurrency);

        let mut done = 0u64;
        for await event in uploads {
            let event = event?;
            done += 1;
            if event.is_failure() {
                failed += 1;
            } else {
                succeeded += 1;
            }
            yield event;
            if track_progress {
                yield ProgressEvent::progress(done, total);
            }
        }

        tracing::info!(succeeded, failed, "upload finished");
        yield ProgressEvent::TransferSummary {
            direction: Direction::Upload,
            succeeded,
            failed,
        };
    }
}

/// Start a unit on the runtime; dropping the returned future detaches it
fn run_unit<F>(unit: F) -> impl Future<Output = Result<ProgressEvent>> + Send + 'static
where
    F: Future<Output = ProgressEvent> + Send + 'static,
{
    let handle = tokio::spawn(unit);
    async move {
        handle
            .await
            .map_err(|e| Error::General(format!("transfer task failed: {e}")))
    }
}

async fn upload_one(store: &dyn ObjectStore, file: LocalFile, storage_prefix: &str) -> ProgressEvent {
    let source = file.path.display().to_string();
    let failed = |message: String| ProgressEvent::TransferFailed {
        direction: Direction::Upload,
        source: source.clone(),
        message,
    };

    let key = match to_key(&file.relative, storage_prefix) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(path = %source, "skipping file: {e}");
            return failed(e.to_string());
        }
    };

    match store.put_object(&key, &file.path).await {
        Ok(()) => {
            tracing::debug!(path = %source, key = %key, "uploaded");
            ProgressEvent::TransferSucceeded {
                direction: Direction::Upload,
                source: source.clone(),
                target: key.to_string(),
                size_bytes: file.size_bytes,
            }
        }
        Err(e) => {
            tracing::warn!(path = %source, key = %key, "upload failed: {e}");
            failed(e.to_string())
        }
    }
}

async fn scan_local_files(root: PathBuf, filter: PrefixFilter) -> Result<LocalScan> {
    let is_dir = tokio::fs::metadata(&root)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    tokio::task::spawn_blocking(move || walk_local_files(&root, &filter))
        .await
        .map_err(|e| Error::General(format!("directory walk failed: {e}")))
}

fn walk_local_files(root: &Path, filter: &PrefixFilter) -> LocalScan {
    let mut scan = LocalScan::default();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .unwrap_or(root)
                    .display()
                    .to_string();
                tracing::warn!(path = %path, "cannot read entry: {e}");
                scan.unreadable.push((path, e.to_string()));
                continue;
            }
        };

        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && entry.path().is_file());
        if !is_file || !filter.matches_file_name(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let size_bytes = entry
            .path()
            .metadata()
            .map(|metadata| metadata.len())
            .unwrap_or(0);

        scan.files.push(LocalFile {
            relative: relative.to_path_buf(),
            path: entry.into_path(),
            size_bytes,
        });
    }

    scan
}

fn download_events(
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
    scope: String,
    local_dir: PathBuf,
) -> impl Stream<Item = Result<ProgressEvent>> + Send + 'static {
    try_stream! {
        tokio::fs::create_dir_all(&local_dir).await?;
        tracing::info!(prefix = %scope, target = %local_dir.display(), "starting download");

        let objects = list_objects(store.clone(), Some(scope.clone()), options.page_size);
        let downloads = objects
            .map(move |object| {
                let store = store.clone();
                let local_dir = local_dir.clone();
                async move {
                    let object = object?;
                    run_unit(async move {
                        download_one(store.as_ref(), object, &local_dir).await
                    })
                    .await
                }
            })
            .buffered(options.concurrency);

        let mut succeeded = 0u64;
        let mut failed = 0u64;
        for await event in downloads {
            let event = event?;
            if event.is_failure() {
                failed += 1;
            } else {
                succeeded += 1;
            }
            yield event;
        }

        if succeeded + failed == 0 {
            tracing::info!(prefix = %scope, "no objects found");
            yield ProgressEvent::no_objects_found(scope);
        } else {
            tracing::info!(succeeded, failed, "download finished");
            yield ProgressEvent::TransferSummary {
                direction: Direction::Download,
                succeeded,
                failed,
            };
        }
    }
}

async fn download_one(
    store: &dyn ObjectStore,
    object: ObjectSummary,
    local_dir: &Path,
) -> ProgressEvent {
    let failed = |message: String| ProgressEvent::TransferFailed {
        direction: Direction::Download,
        source: object.key.clone(),
        message,
    };

    let destination = match to_local_path(&object.key, local_dir) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(key = %object.key, "refusing to download: {e}");
            return failed(e.to_string());
        }
    };

    if let Some(parent) = destination.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        tracing::warn!(key = %object.key, "cannot create {}: {e}", parent.display());
        return failed(Error::from(e).to_string());
    }

    match store.get_object(&object.key, &destination).await {
        Ok(()) => {
            tracing::debug!(key = %object.key, path = %destination.display(), "downloaded");
            ProgressEvent::TransferSucceeded {
                direction: Direction::Download,
                source: object.key.clone(),
                target: destination.display().to_string(),
                size_bytes: object.size_bytes,
            }
        }
        Err(e) => {
            tracing::warn!(key = %object.key, "download failed: {e}");
            failed(e.to_string())
        }
    }
}
