//! ObjectStore trait definition
//!
//! This trait defines the storage capability the engine drives: paginated
//! listing, file upload, file download and bounded batch deletion against a
//! single bucket. It keeps the engine independent of the S3 SDK and can be
//! mocked for testing.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::path::ObjectKey;

/// Largest page the S3 listing API returns and largest batch it deletes
pub const MAX_BACKEND_BATCH: usize = 1000;

/// One object reported by a listing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSummary {
    /// Object key
    pub key: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,
}

impl ObjectSummary {
    /// Create a summary without a timestamp
    pub fn new(key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            size_bytes,
            last_modified: None,
        }
    }
}

/// Parameters of a single listing request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListRequest {
    /// Only keys starting with this prefix (all keys when `None`)
    pub prefix: Option<String>,

    /// Continuation token returned by the previous page
    pub continuation_token: Option<String>,

    /// Maximum number of keys to return
    pub max_keys: i32,
}

/// One page of listing results
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects on this page
    pub objects: Vec<ObjectSummary>,

    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// A key the backend refused to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub key: String,
    pub message: String,
}

/// Result of one delete-many call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Number of keys the backend reports as deleted
    pub deleted: usize,

    /// Keys the backend reports as not deleted
    pub errors: Vec<DeleteFailure>,
}

/// Trait for S3-compatible storage operations on one bucket
///
/// This trait is implemented by the S3 adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch one page of objects
    async fn list_objects(&self, request: ListRequest) -> Result<ListPage>;

    /// Upload a local file to `key`
    async fn put_object(&self, key: &ObjectKey, source: &Path) -> Result<()>;

    /// Download `key` into `destination`, creating or truncating the file
    async fn get_object(&self, key: &str, destination: &Path) -> Result<()>;

    /// Delete up to [`MAX_BACKEND_BATCH`] keys in one call
    async fn delete_objects(&self, keys: &[String]) -> Result<DeleteOutcome>;
}
