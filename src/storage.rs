//! Local persistence for the tracking store, runtime store, and zone registry.
//!
//! Everything lives as pretty-printed JSON under the storage root:
//!
//! ```text
//! <root>/
//!   jobs.json        # Tracking store: ordered list of TrackedJob records
//!   state.json       # Runtime store: last fix, resolved timezone, geofence state
//!   locations.json   # Zone registry (externally authored, read-only here)
//! ```
//!
//! Store writes go through a sibling temp file and a rename, so a
//! concurrently-starting process never reads a truncated file.

mod runtime;
mod tracking;
mod zones;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use zones::load_registry;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// File-based storage rooted at the data directory.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Creates a storage instance rooted at the given directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn jobs_path(&self) -> PathBuf {
        self.root.join("jobs.json")
    }

    fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Serialize a value and replace the file at `path` atomically:
    /// write a sibling temp file, then rename over the target.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read and parse a JSON store file. A missing file yields `None`.
    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        let json = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&json)?))
    }
}
