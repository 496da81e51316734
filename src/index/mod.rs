//! Secondary indices over collection contents.
//!
//! The time index is derived state: it is kept in memory only and
//! starts empty whenever a collection is loaded, unless it is rebuilt
//! from file modification times.

mod time;

pub use time::{IndexBucket, IndexEntry, TimeIndex};
