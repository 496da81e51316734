//! A named directory of documents with an optional time index.

use super::metadata::{self, METADATA_FILE, RESERVED_ID};
use crate::documents::{Document, SharedDocument};
use crate::error::{Result, StoreError};
use crate::index::TimeIndex;
use crate::types::{
    validate_name, Clock, CollectionOptions, IndexMode, IndexStats, SystemClock, Timestamp,
};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Extension of document files.
const DOCUMENT_EXTENSION: &str = "json";

/// A set of documents sharing one directory and one indexing configuration.
///
/// Registrations and loads on the same collection are serialized, so the
/// time index always sees non-decreasing timestamps. Two registrations of
/// the same id race only in the sense that whichever takes the lock last
/// wins. A caller still holding the handle returned by the first one can
/// overwrite the file again with `save`.
pub struct Collection {
    /// Collection name.
    name: String,

    /// Directory holding the documents and the sidecar.
    path: PathBuf,

    /// Options recovered from (or written to) the sidecar.
    options: CollectionOptions,

    /// Source of registration timestamps.
    clock: Arc<dyn Clock>,

    /// Documents by id.
    documents: RwLock<HashMap<String, SharedDocument>>,

    /// Present only when `options.index` is `IndexMode::Time`.
    index: Option<RwLock<TimeIndex>>,

    /// Lock for register/load to keep file, index and map in step.
    write_lock: Mutex<()>,
}

impl Collection {
    /// Open the collection stored at `path`, creating the directory and
    /// sidecar if needed. An existing sidecar overrides `options`.
    pub fn create(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        options: CollectionOptions,
    ) -> Result<Self> {
        Self::create_with_clock(path, name, options, Arc::new(SystemClock))
    }

    /// Like [`Collection::create`], stamping registrations with `clock`.
    pub fn create_with_clock(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        options: CollectionOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let name = name.into();
        validate_name(&name, "collection")?;

        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let options = metadata::load_or_init(&path, &options)?;
        let index = match options.index {
            IndexMode::Time => Some(RwLock::new(TimeIndex::new(options.index_bucket_size))),
            IndexMode::None => None,
        };

        Ok(Self {
            name,
            path,
            options,
            clock,
            documents: RwLock::new(HashMap::new()),
            index,
            write_lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    pub fn index_mode(&self) -> IndexMode {
        self.options.index
    }

    // --- Registration ---

    /// Persist `payload` as document `id` and make it retrievable.
    ///
    /// Replaces any document already registered under `id`. On a
    /// time-indexed collection the registration time is appended to the
    /// index. Nothing changes in memory if the write fails.
    pub fn register(&self, id: &str, payload: Value) -> Result<SharedDocument> {
        validate_id(id)?;

        let _lock = self.write_lock.lock();

        let document = Document::new(self.document_path(id), id, payload);
        document.save()?;

        if let Some(index) = &self.index {
            let mut index = index.write();
            let timestamp = monotonic(&index, self.clock.now());
            index.append(timestamp, id);
            debug!(collection = %self.name, id, %timestamp, "indexed registration");
        }

        let shared = Arc::new(RwLock::new(document));
        self.documents
            .write()
            .insert(id.to_string(), Arc::clone(&shared));

        debug!(collection = %self.name, id, "registered document");
        Ok(shared)
    }

    // --- Lookup ---

    /// Get a document by id.
    pub fn get(&self, id: &str) -> Result<SharedDocument> {
        self.documents
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.read().contains_key(id)
    }

    /// All document ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.documents.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Documents registered at or after `from`, in registration order.
    ///
    /// Fails with `UnsupportedOperation` unless the collection is time-indexed.
    pub fn get_from(&self, from: Timestamp) -> Result<Vec<SharedDocument>> {
        let ids = self.ids_from(from)?;
        let documents = self.documents.read();
        Ok(ids
            .iter()
            .filter_map(|id| documents.get(id).cloned())
            .collect())
    }

    /// Ids registered at or after `from`, in registration order.
    ///
    /// An id registered more than once is reported once, at the position
    /// of its latest registration.
    pub fn ids_from(&self, from: Timestamp) -> Result<Vec<String>> {
        let index = self.index.as_ref().ok_or_else(|| {
            StoreError::UnsupportedOperation(format!(
                "collection {} has no time index",
                self.name
            ))
        })?;

        let matches = index.read().query_from(from);

        let mut latest: HashMap<&str, usize> = HashMap::with_capacity(matches.len());
        for (pos, id) in matches.iter().enumerate() {
            latest.insert(id.as_str(), pos);
        }

        Ok(matches
            .iter()
            .enumerate()
            .filter(|(pos, id)| latest.get(id.as_str()) == Some(pos))
            .map(|(_, id)| id.clone())
            .collect())
    }

    /// Shape of the time index, if there is one.
    pub fn index_stats(&self) -> Option<IndexStats> {
        self.index.as_ref().map(|index| index.read().stats())
    }

    // --- Loading ---

    /// Load every persisted document into memory.
    ///
    /// The time index is left as it is, so after a fresh open it only
    /// covers registrations made since. The load is all-or-nothing: the
    /// first unreadable or corrupt document fails it and nothing from
    /// this pass is kept. Returns the number of documents loaded.
    pub fn load(&self) -> Result<usize> {
        self.load_documents(false)
    }

    /// Load like [`Collection::load`], then append the loaded documents to
    /// the time index ordered by file modification time (ties by id).
    ///
    /// Fails with `UnsupportedOperation`, before reading anything, if the
    /// time index already has entries. A no-op for the index on
    /// collections without one.
    pub fn load_and_reindex(&self) -> Result<usize> {
        self.load_documents(true)
    }

    fn load_documents(&self, reindex: bool) -> Result<usize> {
        let _lock = self.write_lock.lock();

        if reindex {
            if let Some(index) = &self.index {
                if !index.read().is_empty() {
                    return Err(StoreError::UnsupportedOperation(format!(
                        "collection {} already has indexed registrations; \
                         rebuild only runs on an empty time index",
                        self.name
                    )));
                }
            }
        }

        let mut loaded: Vec<(Timestamp, Document)> = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();

            let file_name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    warn!(collection = %self.name, ?name, "skipping non UTF-8 file name");
                    continue;
                }
            };

            if file_name == METADATA_FILE {
                continue;
            }

            if !entry.file_type()?.is_file() {
                warn!(collection = %self.name, file = %file_name, "skipping non-file entry");
                continue;
            }

            let id = match document_id(&file_name) {
                Some(id) => id,
                None => {
                    warn!(collection = %self.name, file = %file_name, "skipping non-document file");
                    continue;
                }
            };

            let modified = if reindex {
                Timestamp::from_system_time(entry.metadata()?.modified()?)
            } else {
                Timestamp::default()
            };

            loaded.push((modified, Document::load(&path, id)?));
        }

        if reindex {
            if let Some(index) = &self.index {
                loaded.sort_by(|a, b| (a.0, a.1.id()).cmp(&(b.0, b.1.id())));

                let mut index = index.write();
                for (modified, document) in &loaded {
                    index.append(*modified, document.id());
                }
            }
        }

        let count = loaded.len();
        let mut documents = self.documents.write();
        for (_, document) in loaded {
            documents.insert(document.id().to_string(), Arc::new(RwLock::new(document)));
        }

        info!(collection = %self.name, count, reindex, "loaded collection");
        Ok(count)
    }

    fn document_path(&self, id: &str) -> PathBuf {
        self.path.join(format!("{}.{}", id, DOCUMENT_EXTENSION))
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("options", &self.options)
            .field("documents", &self.len())
            .finish()
    }
}

/// Check that `id` can name a document file.
fn validate_id(id: &str) -> Result<()> {
    validate_name(id, "document id")?;
    if id == RESERVED_ID {
        return Err(StoreError::InvalidName(format!(
            "document id {:?} is reserved for collection metadata",
            id
        )));
    }
    Ok(())
}

/// Document id for a file name, if it names a document.
fn document_id(file_name: &str) -> Option<&str> {
    let id = file_name.strip_suffix(DOCUMENT_EXTENSION)?.strip_suffix('.')?;
    validate_id(id).ok().map(|_| id)
}

/// Clamp `candidate` so the index never sees time go backwards.
fn monotonic(index: &TimeIndex, candidate: Timestamp) -> Timestamp {
    index
        .last_timestamp()
        .map_or(candidate, |last| candidate.max(last))
}
