//! Core types for the document store.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default number of entries per time index bucket.
pub const DEFAULT_BUCKET_SIZE: usize = 50;

/// Milliseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Convert a file system time; times before the epoch map to 0.
    pub fn from_system_time(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp(millis)
    }

    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Timestamp shifted by `millis` (saturating).
    pub fn plus_millis(self, millis: i64) -> Self {
        Timestamp(self.0.saturating_add(millis))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of registration timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock that only moves when told to. Useful for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.0),
        }
    }

    pub fn set(&self, time: Timestamp) {
        self.millis.store(time.0, Ordering::SeqCst);
    }

    /// Move the clock forward and return the new time.
    pub fn advance(&self, millis: i64) -> Timestamp {
        Timestamp(self.millis.fetch_add(millis, Ordering::SeqCst) + millis)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

/// Secondary indexing maintained by a collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Documents are only reachable by id.
    #[default]
    None,
    /// Registrations are appended to a bucketed time index.
    Time,
}

/// Per-collection configuration, persisted as the collection's sidecar.
///
/// Serialized as `{ "index": "none" | "time", "indexBucketSize": n }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOptions {
    #[serde(default)]
    pub index: IndexMode,

    #[serde(default = "default_bucket_size")]
    pub index_bucket_size: usize,
}

fn default_bucket_size() -> usize {
    DEFAULT_BUCKET_SIZE
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            index: IndexMode::None,
            index_bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl CollectionOptions {
    /// Options for a collection with a time index of default bucket size.
    pub fn time_indexed() -> Self {
        Self {
            index: IndexMode::Time,
            ..Default::default()
        }
    }

    pub fn with_bucket_size(mut self, size: usize) -> Self {
        self.index_bucket_size = size;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.index_bucket_size == 0 {
            return Err(StoreError::InvalidOptions(
                "indexBucketSize must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Shape of a collection's time index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexStats {
    /// Total entries across all buckets.
    pub entry_count: usize,
    /// Entry count of each bucket, oldest first.
    pub bucket_sizes: Vec<usize>,
}

/// Check that `name` can be used as a single path component.
pub(crate) fn validate_name(name: &str, what: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidName(format!("{} {:?}", what, name)));
    }
    Ok(())
}
