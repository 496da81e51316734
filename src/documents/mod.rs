//! Document persistence.
//!
//! Each document is one pretty-printed JSON file named `<id>.json` inside
//! its collection's directory.

mod document;

pub use document::{Document, SharedDocument};
