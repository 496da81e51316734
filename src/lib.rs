//! # Datason
//!
//! A minimal file-backed document store. Every collection is a directory
//! of pretty-printed JSON files, one per document, and may keep an
//! in-memory index over registration time.
//!
//! ## Core Concepts
//!
//! - **Catalog**: the registry of collections under one storage root
//! - **Collections**: named directories of documents plus a `datason.json`
//!   sidecar holding their options
//! - **Documents**: an id and an opaque JSON payload, saved explicitly
//! - **Time index**: fixed-capacity buckets of `(timestamp, id)` entries
//!   answering "everything registered since T" without a full scan
//!
//! ## Example
//!
//! ```ignore
//! use datason::{Catalog, CatalogConfig, CollectionOptions, Timestamp};
//! use serde_json::json;
//!
//! let catalog = Catalog::open_and_load(CatalogConfig::new("./data"))?;
//! let events = catalog.create_collection("events", CollectionOptions::time_indexed())?;
//!
//! let since = Timestamp::now();
//! let doc = events.register("first", json!({"kind": "signup"}))?;
//!
//! doc.write().payload_mut()["kind"] = json!("login");
//! doc.read().save()?;
//!
//! let recent = events.get_from(since)?;
//! ```

pub mod catalog;
pub mod collections;
pub mod documents;
pub mod error;
pub mod index;
pub mod types;

// Re-exports
pub use catalog::{Catalog, CatalogConfig};
pub use collections::{Collection, METADATA_FILE};
pub use documents::{Document, SharedDocument};
pub use error::{Result, StoreError};
pub use index::{IndexBucket, IndexEntry, TimeIndex};
pub use types::*;
