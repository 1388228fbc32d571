//! Prefix deletion in bounded batches

use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};

use crate::config::EngineOptions;
use crate::error::Result;
use crate::listing::list_objects;
use crate::path::join_prefix;
use crate::progress::{EventStream, ProgressEvent};
use crate::traits::{DeleteFailure, DeleteOutcome, ObjectStore};

/// Deletes every object under a prefix using delete-many calls
#[derive(Clone)]
pub struct BatchDeleter {
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
}

impl BatchDeleter {
    pub fn new(store: Arc<dyn ObjectStore>, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// Delete everything under `storage_prefix/prefix`.
    ///
    /// All matching keys are listed (one `DeleteQueued` each) before the first
    /// delete call. Batches never exceed the configured batch size. A batch the
    /// backend rejects outright marks each of its keys as failed and the
    /// remaining batches still run. An empty scope deletes nothing.
    pub fn delete(&self, prefix: &str, storage_prefix: &str) -> EventStream {
        delete_events(
            self.store.clone(),
            self.options,
            join_prefix(storage_prefix, prefix),
        )
        .boxed()
    }
}

fn delete_events(
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
    scope: String,
) -> impl Stream<Item = Result<ProgressEvent>> + Send + 'static {
    try_stream! {
        if scope.is_empty() {
            tracing::warn!("refusing to delete with an empty prefix");
            yield ProgressEvent::no_objects_found(scope);
            return;
        }

        let mut keys = Vec::new();
        for await object in list_objects(store.clone(), Some(scope.clone()), options.page_size) {
            let object = object?;
            yield ProgressEvent::DeleteQueued { key: object.key.clone() };
            keys.push(object.key);
        }

        if keys.is_empty() {
            tracing::info!(prefix = %scope, "no objects to delete");
            yield ProgressEvent::no_objects_found(scope);
            return;
        }

        let batch_size = options.delete_batch_size;
        let batches = keys.len().div_ceil(batch_size);
        tracing::info!(prefix = %scope, keys = keys.len(), batches, "deleting");

        let mut deleted = 0usize;
        let mut failures: Vec<DeleteFailure> = Vec::new();
        for (index, chunk) in keys.chunks(batch_size).enumerate() {
            let outcome = match store.delete_objects(chunk).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(batch = index + 1, keys = chunk.len(), "delete call failed: {e}");
                    rejected_batch(chunk, &e.to_string())
                }
            };
            tracing::debug!(
                batch = index + 1,
                deleted = outcome.deleted,
                failed = outcome.errors.len(),
                "batch done"
            );

            deleted += outcome.deleted;
            yield ProgressEvent::BatchDeleted {
                batch: index + 1,
                batches,
                deleted: outcome.deleted,
                failed: outcome.errors.len(),
            };
            failures.extend(outcome.errors);
        }

        yield ProgressEvent::DeleteSucceeded { count: deleted };
        for failure in failures {
            yield ProgressEvent::DeleteFailed {
                key: failure.key,
                message: failure.message,
            };
        }
    }
}

fn rejected_batch(keys: &[String], message: &str) -> DeleteOutcome {
    DeleteOutcome {
        deleted: 0,
        errors: keys
            .iter()
            .map(|key| DeleteFailure {
                key: key.clone(),
                message: message.to_string(),
            })
            .collect(),
    }
}
