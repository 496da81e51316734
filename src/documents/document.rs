//! Single-document persistence.

use crate::error::{Result, StoreError};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A document handle shared between its collection and callers.
pub type SharedDocument = Arc<RwLock<Document>>;

/// An identified JSON payload bound to its backing file.
///
/// Mutating the payload only changes the in-memory copy; call
/// [`Document::save`] to persist it.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Identifier, unique within a collection.
    id: String,

    /// Backing file.
    path: PathBuf,

    /// Opaque payload.
    payload: Value,
}

impl Document {
    /// Create an in-memory handle. Nothing is written until `save`.
    pub fn new(path: impl AsRef<Path>, id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            path: path.as_ref().to_path_buf(),
            payload,
        }
    }

    /// Read and parse a document from its backing file.
    pub fn load(path: impl AsRef<Path>, id: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        let payload: Value =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(&path, e))?;

        let id = id.into();
        debug!(id = %id, path = %path.display(), "loaded document");

        Ok(Self { id, path, payload })
    }

    /// Write the payload as pretty-printed JSON, replacing any previous content.
    pub fn save(&self) -> Result<&Self> {
        let content = serde_json::to_vec_pretty(&self.payload)?;

        let mut file = File::create(&self.path)?;
        file.write_all(&content)?;
        file.sync_all()?;

        debug!(id = %self.id, bytes = content.len(), "saved document");
        Ok(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Value {
        &mut self.payload
    }

    /// Replace the payload, returning the previous one.
    pub fn set_payload(&mut self, payload: Value) -> Value {
        std::mem::replace(&mut self.payload, payload)
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    /// Decode the payload into a typed value.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
