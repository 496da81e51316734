//! Collections: named directories of documents.
//!
//! A collection directory holds one `<id>.json` file per document plus
//! the `datason.json` sidecar recording its options. The sidecar is
//! written once, when the collection is first created, and is the
//! source of truth on every later open.

mod collection;
mod metadata;

pub use collection::Collection;
pub use metadata::METADATA_FILE;
