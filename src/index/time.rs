//! Bucketed append-only index over registration time.

use crate::types::{IndexStats, Timestamp, DEFAULT_BUCKET_SIZE};

/// A single registration: when it happened and which document it named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub timestamp: Timestamp,
    pub id: String,
}

/// Fixed-capacity run of consecutive index entries.
#[derive(Clone, Debug)]
pub struct IndexBucket {
    /// Timestamp of the first entry.
    min_timestamp: Timestamp,

    /// Timestamp of the most recent entry.
    max_timestamp: Timestamp,

    /// Entries in registration order.
    entries: Vec<IndexEntry>,
}

impl IndexBucket {
    fn new(timestamp: Timestamp) -> Self {
        Self {
            min_timestamp: timestamp,
            max_timestamp: timestamp,
            entries: Vec::new(),
        }
    }

    pub fn min_timestamp(&self) -> Timestamp {
        self.min_timestamp
    }

    pub fn max_timestamp(&self) -> Timestamp {
        self.max_timestamp
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry could be at or after `from`.
    ///
    /// `max_timestamp` tracks the latest append, so a bucket whose max is
    /// below `from` holds nothing the query wants, open or full.
    fn may_contain_from(&self, from: Timestamp) -> bool {
        self.max_timestamp >= from
    }
}

/// Append log of `(timestamp, id)` pairs split into buckets of
/// `bucket_capacity` entries.
///
/// Only the last bucket is ever open. Callers must append timestamps in
/// non-decreasing order; the index does not sort, and an out-of-order
/// append makes range queries over its bucket unreliable.
#[derive(Clone, Debug)]
pub struct TimeIndex {
    bucket_capacity: usize,
    buckets: Vec<IndexBucket>,
}

impl Default for TimeIndex {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_SIZE)
    }
}

impl TimeIndex {
    /// Create an empty index. A capacity of 0 is treated as 1.
    pub fn new(bucket_capacity: usize) -> Self {
        Self {
            bucket_capacity: bucket_capacity.max(1),
            buckets: Vec::new(),
        }
    }

    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity
    }

    /// Record a registration. O(1) amortized.
    pub fn append(&mut self, timestamp: Timestamp, id: impl Into<String>) {
        let needs_bucket = self
            .buckets
            .last()
            .map_or(true, |bucket| bucket.len() >= self.bucket_capacity);

        if needs_bucket {
            self.buckets.push(IndexBucket::new(timestamp));
        }

        if let Some(bucket) = self.buckets.last_mut() {
            bucket.max_timestamp = timestamp;
            bucket.entries.push(IndexEntry {
                timestamp,
                id: id.into(),
            });
        }
    }

    /// Ids of every entry with `timestamp >= from`, oldest first.
    ///
    /// Buckets that ended before `from` are skipped without looking at
    /// their entries.
    pub fn query_from(&self, from: Timestamp) -> Vec<String> {
        let mut ids = Vec::new();

        for bucket in self.buckets.iter().filter(|b| b.may_contain_from(from)) {
            if bucket.min_timestamp >= from {
                ids.extend(bucket.entries.iter().map(|e| e.id.clone()));
            } else {
                ids.extend(
                    bucket
                        .entries
                        .iter()
                        .filter(|e| e.timestamp >= from)
                        .map(|e| e.id.clone()),
                );
            }
        }

        ids
    }

    /// Timestamp of the most recent append.
    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.buckets.last().map(|b| b.max_timestamp)
    }

    pub fn buckets(&self) -> &[IndexBucket] {
        &self.buckets
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(IndexBucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let bucket_sizes: Vec<usize> = self.buckets.iter().map(IndexBucket::len).collect();
        IndexStats {
            entry_count: bucket_sizes.iter().sum(),
            bucket_sizes,
        }
    }
}
