//! Collection metadata sidecar.

use crate::error::{Result, StoreError};
use crate::types::CollectionOptions;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// File name of the sidecar inside a collection directory.
pub const METADATA_FILE: &str = "datason.json";

/// Document id that would collide with the sidecar.
pub(crate) const RESERVED_ID: &str = "datason";

/// Read the sidecar in `dir`, or write `options` there if it is absent.
///
/// An existing sidecar always wins over the supplied options.
pub(crate) fn load_or_init(dir: &Path, options: &CollectionOptions) -> Result<CollectionOptions> {
    let path = dir.join(METADATA_FILE);

    if path.exists() {
        let bytes = fs::read(&path)?;
        let stored: CollectionOptions =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(&path, e))?;
        stored
            .validate()
            .map_err(|e| StoreError::corrupt(&path, e))?;

        debug!(path = %path.display(), ?stored, "loaded collection metadata");
        return Ok(stored);
    }

    options.validate()?;

    let content = serde_json::to_vec_pretty(options)?;
    let mut file = File::create(&path)?;
    file.write_all(&content)?;
    file.sync_all()?;

    debug!(path = %path.display(), ?options, "wrote collection metadata");
    Ok(options.clone())
}
