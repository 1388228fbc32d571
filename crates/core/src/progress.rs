//! Progress events emitted by engine operations
//!
//! Every operation hands its caller a lazy [`EventStream`]. Events are
//! emitted in the order work completes and are never revised afterwards.

use std::fmt;

use futures::stream::BoxStream;
use serde::Serialize;

use crate::error::Result;
use crate::size::format_size;
use crate::traits::ObjectSummary;

/// Lazy sequence of progress events; an `Err` item ends the operation
pub type EventStream = BoxStream<'static, Result<ProgressEvent>>;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Direction::Upload => "Uploaded",
            Direction::Download => "Downloaded",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Direction::Upload => "Upload",
            Direction::Download => "Download",
        }
    }
}

/// One unit of reported progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// An object was listed
    ObjectFound {
        key: String,
        size_bytes: u64,
        size: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_modified: Option<jiff::Timestamp>,
    },

    /// Listing finished
    SummaryTotal {
        count: u64,
        total_bytes: u64,
        total_size: String,
    },

    /// Nothing matched the prefix; the operation did nothing
    NoObjectsFound { prefix: String },

    /// One file or object was transferred
    TransferSucceeded {
        direction: Direction,
        source: String,
        target: String,
        size_bytes: u64,
    },

    /// One file or object could not be transferred
    TransferFailed {
        direction: Direction,
        source: String,
        message: String,
    },

    /// Files done out of the total discovered before the transfer started
    Progress { done: u64, total: u64, percent: u8 },

    /// A transfer operation finished
    TransferSummary {
        direction: Direction,
        succeeded: u64,
        failed: u64,
    },

    /// A key will be deleted
    DeleteQueued { key: String },

    /// A delete-many call returned
    BatchDeleted {
        batch: usize,
        batches: usize,
        deleted: usize,
        failed: usize,
    },

    /// All delete-many calls returned
    DeleteSucceeded { count: usize },

    /// The backend did not delete a key
    DeleteFailed { key: String, message: String },
}

impl ProgressEvent {
    pub fn object_found(key: impl Into<String>, size_bytes: u64) -> Self {
        ProgressEvent::ObjectFound {
            key: key.into(),
            size_bytes,
            size: format_size(size_bytes),
            last_modified: None,
        }
    }

    /// `ObjectFound` for a listed object, keeping its timestamp
    pub fn found(object: ObjectSummary) -> Self {
        ProgressEvent::ObjectFound {
            size: format_size(object.size_bytes),
            key: object.key,
            size_bytes: object.size_bytes,
            last_modified: object.last_modified,
        }
    }

    pub fn summary_total(count: u64, total_bytes: u64) -> Self {
        ProgressEvent::SummaryTotal {
            count,
            total_bytes,
            total_size: format_size(total_bytes),
        }
    }

    pub fn no_objects_found(prefix: impl Into<String>) -> Self {
        ProgressEvent::NoObjectsFound {
            prefix: prefix.into(),
        }
    }

    /// Progress after `done` of `total` units; `total` of zero counts as complete
    pub fn progress(done: u64, total: u64) -> Self {
        let percent = if total == 0 {
            100
        } else {
            (done.min(total) * 100 / total) as u8
        };
        ProgressEvent::Progress {
            done,
            total,
            percent,
        }
    }

    /// Whether this event reports a unit that did not complete
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProgressEvent::TransferFailed { .. } | ProgressEvent::DeleteFailed { .. }
        )
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::ObjectFound { key, size, .. } => {
                write!(f, "Found object: {key}, {size}")
            }
            ProgressEvent::SummaryTotal {
                count, total_size, ..
            } => write!(f, "Found {count} object(s), total size {total_size}"),
            ProgressEvent::NoObjectsFound { prefix } if prefix.is_empty() => {
                write!(f, "No objects found in bucket")
            }
            ProgressEvent::NoObjectsFound { prefix } => {
                write!(f, "No objects found with prefix '{prefix}'")
            }
            ProgressEvent::TransferSucceeded {
                direction,
                source,
                target,
                size_bytes,
            } => write!(
                f,
                "{}: {source} -> {target} ({})",
                direction.verb(),
                format_size(*size_bytes)
            ),
            ProgressEvent::TransferFailed {
                direction,
                source,
                message,
            } => write!(f, "{} failed: {source}: {message}", direction.noun()),
            ProgressEvent::Progress {
                done,
                total,
                percent,
            } => write!(f, "{done}/{total} ({percent}%)"),
            ProgressEvent::TransferSummary {
                direction,
                succeeded,
                failed: 0,
            } => write!(f, "{} {succeeded} file(s)", direction.verb()),
            ProgressEvent::TransferSummary {
                direction,
                succeeded,
                failed,
            } => write!(
                f,
                "{} {succeeded} file(s), {failed} failed",
                direction.verb()
            ),
            ProgressEvent::DeleteQueued { key } => write!(f, "Queued for deletion: {key}"),
            ProgressEvent::BatchDeleted {
                batch,
                batches,
                deleted,
                failed,
            } => write!(
                f,
                "Delete batch {batch}/{batches}: {deleted} deleted, {failed} failed"
            ),
            ProgressEvent::DeleteSucceeded { count } => write!(f, "Deleted {count} object(s)"),
            ProgressEvent::DeleteFailed { key, message } => {
                write!(f, "Delete failed: {key} - {message}")
            }
        }
    }
}
