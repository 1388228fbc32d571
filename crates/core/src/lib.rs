//! s3ops-core: batch operations engine for a single S3 bucket
//!
//! This crate provides:
//! - Human-readable size formatting
//! - Translation between object keys and local paths
//! - Paginated enumeration of a prefix
//! - Directory upload and prefix download
//! - Bounded batch deletion
//! - Progress events streamed to the caller
//! - Configuration management
//!
//! Storage access goes through the [`ObjectStore`] trait, so the engine does
//! not depend on any specific S3 SDK.

pub mod config;
pub mod delete;
pub mod error;
pub mod listing;
pub mod path;
pub mod progress;
pub mod size;
pub mod traits;
pub mod transfer;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigManager, Defaults, EngineOptions, StorageConfig};
pub use delete::BatchDeleter;
pub use error::{Error, Result};
pub use listing::{Enumerator, list_objects};
pub use path::{ObjectKey, PrefixFilter, join_prefix, to_key, to_local_path};
pub use progress::{Direction, EventStream, ProgressEvent};
pub use size::format_size;
pub use traits::{
    DeleteFailure, DeleteOutcome, ListPage, ListRequest, MAX_BACKEND_BATCH, ObjectStore,
    ObjectSummary,
};
pub use transfer::TransferEngine;
