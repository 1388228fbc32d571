//! Paginated object enumeration
//!
//! [`list_objects`] chains continuation tokens until the backend reports the
//! last page, so callers see every object under a prefix no matter how many
//! pages it spans. [`Enumerator`] turns that into progress events with a
//! running total.

use std::collections::HashSet;
use std::sync::Arc;

use async_stream::try_stream;
use futures::{Stream, StreamExt};

use crate::config::EngineOptions;
use crate::error::{Error, Result};
use crate::progress::{EventStream, ProgressEvent};
use crate::traits::{ListRequest, ObjectStore, ObjectSummary};

/// Lazily list every object whose key starts with `prefix`.
///
/// Pages are fetched on demand; a failed page ends the stream with an error
/// after all earlier objects have been yielded.
pub fn list_objects(
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
    page_size: usize,
) -> impl Stream<Item = Result<ObjectSummary>> + Send + 'static {
    let prefix = prefix.filter(|p| !p.is_empty());
    let max_keys = i32::try_from(page_size).unwrap_or(i32::MAX);

    try_stream! {
        let mut continuation_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut page_number = 0usize;

        loop {
            let request = ListRequest {
                prefix: prefix.clone(),
                continuation_token: continuation_token.clone(),
                max_keys,
            };
            let page = store.list_objects(request).await?;
            page_number += 1;
            tracing::debug!(
                page = page_number,
                objects = page.objects.len(),
                more = page.next_token.is_some(),
                "listed page"
            );

            for object in page.objects {
                yield object;
            }

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    Err::<(), _>(Error::StorageUnavailable(format!(
                        "listing returned continuation token '{token}' twice"
                    )))?;
                }
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }
    }
}

/// Lists objects and reports each one plus a final total
#[derive(Clone)]
pub struct Enumerator {
    store: Arc<dyn ObjectStore>,
    options: EngineOptions,
}

impl Enumerator {
    pub fn new(store: Arc<dyn ObjectStore>, options: EngineOptions) -> Self {
        Self { store, options }
    }

    /// Raw object summaries under `prefix`
    pub fn objects(
        &self,
        prefix: Option<&str>,
    ) -> impl Stream<Item = Result<ObjectSummary>> + Send + use<> {
        list_objects(
            self.store.clone(),
            prefix.map(str::to_string),
            self.options.page_size,
        )
    }

    /// One `ObjectFound` per object, then `SummaryTotal`.
    ///
    /// When nothing matches, the only event is `NoObjectsFound`.
    pub fn list(&self, prefix: Option<&str>) -> EventStream {
        let scope = prefix.unwrap_or_default().to_string();
        list_events(self.objects(prefix), scope).boxed()
    }
}

fn list_events(
    objects: impl Stream<Item = Result<ObjectSummary>> + Send + 'static,
    scope: String,
) -> impl Stream<Item = Result<ProgressEvent>> + Send + 'static {
    try_stream! {
        let mut count = 0u64;
        let mut total_bytes = 0u64;

        for await object in objects {
            let object = object?;
            count += 1;
            total_bytes += object.size_bytes;
            yield ProgressEvent::found(object);
        }

        if count == 0 {
            tracing::info!(prefix = %scope, "no objects found");
            yield ProgressEvent::no_objects_found(scope);
        } else {
            tracing::info!(prefix = %scope, count, total_bytes, "listing complete");
            yield ProgressEvent::summary_total(count, total_bytes);
        }
    }
}
