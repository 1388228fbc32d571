//! In-memory ObjectStore for engine tests

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{Error, Result};
use crate::path::ObjectKey;
use crate::progress::{EventStream, ProgressEvent};
use crate::traits::{
    DeleteFailure, DeleteOutcome, ListPage, ListRequest, MAX_BACKEND_BATCH, ObjectStore,
    ObjectSummary,
};

/// Bucket held in a sorted map, with the backend's page and batch limits
#[derive(Default)]
pub(crate) struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_puts: Mutex<HashSet<String>>,
    failing_gets: Mutex<HashSet<String>>,
    protected: Mutex<HashSet<String>>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    get_delay: Mutex<Option<Duration>>,
    delete_batches: Mutex<Vec<usize>>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, key: impl Into<String>, data: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.into(), data);
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn fail_put(&self, key: impl Into<String>) {
        self.failing_puts.lock().unwrap().insert(key.into());
    }

    pub(crate) fn fail_get(&self, key: impl Into<String>) {
        self.failing_gets.lock().unwrap().insert(key.into());
    }

    /// Gets write a partial file, wait `delay`, then write the whole object
    pub(crate) fn slow_gets(&self, delay: Duration) {
        *self.get_delay.lock().unwrap() = Some(delay);
    }

    /// Deletes of `key` are reported back as per-key errors
    pub(crate) fn protect(&self, key: impl Into<String>) {
        self.protected.lock().unwrap().insert(key.into());
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn delete_batches(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(&self, request: ListRequest) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let prefix = request.prefix.unwrap_or_default();
        let limit = usize::try_from(request.max_keys)
            .unwrap_or(1)
            .clamp(1, MAX_BACKEND_BATCH);
        let start = match request.continuation_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };

        let objects = self.objects.lock().unwrap();
        let mut matching = objects
            .range::<String, _>((start, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(&prefix));
        let page: Vec<ObjectSummary> = matching
            .by_ref()
            .take(limit)
            .map(|(key, data)| ObjectSummary::new(key.clone(), data.len() as u64))
            .collect();
        let next_token = match matching.next() {
            Some(_) => page.last().map(|object| object.key.clone()),
            None => None,
        };

        Ok(ListPage {
            objects: page,
            next_token,
        })
    }

    async fn put_object(&self, key: &ObjectKey, source: &Path) -> Result<()> {
        if self.failing_puts.lock().unwrap().contains(key.as_str()) {
            return Err(Error::StorageUnavailable(format!("put {key} refused")));
        }
        let data = tokio::fs::read(source).await?;
        self.insert(key.as_str(), data);
        Ok(())
    }

    async fn get_object(&self, key: &str, destination: &Path) -> Result<()> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_gets.lock().unwrap().contains(key) {
            return Err(Error::StorageUnavailable(format!("get {key} refused")));
        }
        let data = self
            .get(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        let delay = *self.get_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::fs::write(destination, b"part").await?;
            tokio::time::sleep(delay).await;
        }
        tokio::fs::write(destination, data).await?;
        Ok(())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<DeleteOutcome> {
        if keys.len() > MAX_BACKEND_BATCH {
            return Err(Error::General(format!(
                "{} keys exceed the batch limit",
                keys.len()
            )));
        }
        self.delete_batches.lock().unwrap().push(keys.len());

        let protected = self.protected.lock().unwrap().clone();
        let mut objects = self.objects.lock().unwrap();
        let mut outcome = DeleteOutcome::default();
        for key in keys {
            if protected.contains(key) {
                outcome.errors.push(DeleteFailure {
                    key: key.clone(),
                    message: "AccessDenied".into(),
                });
            } else if objects.remove(key).is_some() {
                outcome.deleted += 1;
            }
        }
        Ok(outcome)
    }
}

/// Drain a stream that is expected to succeed
pub(crate) async fn collect_events(stream: EventStream) -> Vec<ProgressEvent> {
    stream
        .map(|event| event.expect("operation failed"))
        .collect()
        .await
}
