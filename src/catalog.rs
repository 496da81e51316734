//! Catalog tying collections under one storage root together.

use crate::collections::Collection;
use crate::error::{Result, StoreError};
use crate::types::{validate_name, Clock, CollectionOptions, SystemClock};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Catalog configuration.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    /// Storage root; one subdirectory per collection.
    pub path: PathBuf,

    /// Rebuild time indices from file modification times on load.
    pub reindex_on_load: bool,

    /// Options for collections discovered on disk without a sidecar.
    pub default_options: CollectionOptions,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data"),
            reindex_on_load: false,
            default_options: CollectionOptions::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Registry of the collections stored under one root directory.
pub struct Catalog {
    /// Catalog configuration.
    config: CatalogConfig,

    /// Clock handed to every collection.
    clock: Arc<dyn Clock>,

    /// Collections by name.
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Catalog {
    /// Open a catalog, creating the root and any missing ancestors.
    ///
    /// Opening an existing root never touches what is already there.
    /// Collections are not loaded; see [`Catalog::load`].
    pub fn open(config: CatalogConfig) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open a catalog whose collections stamp registrations with `clock`.
    pub fn open_with_clock(config: CatalogConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        info!(path = %config.path.display(), "opened catalog");

        Ok(Self {
            config,
            clock,
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Open a catalog and load every collection found under its root.
    pub fn open_and_load(config: CatalogConfig) -> Result<Self> {
        let catalog = Self::open(config)?;
        catalog.load()?;
        Ok(catalog)
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    // --- Collection Operations ---

    /// Create (or reopen) the collection `name` and register it.
    ///
    /// The directory is created only if absent, and an existing sidecar
    /// overrides `options`. A fresh, empty in-memory collection always
    /// replaces whatever was registered under `name` before.
    pub fn create_collection(
        &self,
        name: &str,
        options: CollectionOptions,
    ) -> Result<Arc<Collection>> {
        validate_name(name, "collection")?;

        let collection = Arc::new(Collection::create_with_clock(
            self.config.path.join(name),
            name,
            options,
            Arc::clone(&self.clock),
        )?);

        self.collections
            .write()
            .insert(name.to_string(), Arc::clone(&collection));

        Ok(collection)
    }

    /// Get a collection by name.
    pub fn get(&self, name: &str) -> Result<Arc<Collection>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections.read().contains_key(name)
    }

    /// Names of all registered collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Register and load every collection directory under the root.
    ///
    /// Stops at the first collection that fails to load; collections
    /// loaded before it stay registered. Returns the number of
    /// collections loaded.
    pub fn load(&self) -> Result<usize> {
        let mut count = 0;

        for entry in fs::read_dir(&self.config.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    warn!(?name, "skipping non UTF-8 collection directory");
                    continue;
                }
            };

            if validate_name(&name, "collection").is_err() {
                warn!(name = %name, "skipping directory with unusable collection name");
                continue;
            }

            let collection = self.create_collection(&name, self.config.default_options.clone())?;
            if self.config.reindex_on_load {
                collection.load_and_reindex()?;
            } else {
                collection.load()?;
            }
            count += 1;
        }

        info!(path = %self.config.path.display(), collections = count, "loaded catalog");
        Ok(count)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("config", &self.config)
            .field("collections", &self.collection_names())
            .finish()
    }
}
