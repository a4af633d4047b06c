//! The persisted form of the store index.
//!
//! The whole index is one JSON document under the store root, rewritten in
//! full after every mutation through a temporary file and an atomic rename,
//! so a crash at any point leaves either the old or the new snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use eternity_types::ContentHash;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;

/// File name of the snapshot under the store root.
pub const SNAPSHOT_FILE: &str = "index.json";
/// Directory name of the object files under the store root.
pub const OBJECTS_DIR: &str = "objects";

/// Locations and passthrough configuration saved alongside the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    pub root_dir: PathBuf,
    pub objects_dir: PathBuf,
    /// Peer identifiers. Carried through untouched; the store never contacts them.
    #[serde(default)]
    pub peers: Vec<String>,
}

impl StoreOptions {
    pub fn for_root(root_dir: &Path) -> Self {
        Self {
            root_dir: root_dir.to_path_buf(),
            objects_dir: root_dir.join(OBJECTS_DIR),
            peers: Vec::new(),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root_dir.join(SNAPSHOT_FILE)
    }

    /// Canonical location of an object's file.
    pub fn object_path(&self, hash: &ContentHash) -> PathBuf {
        self.objects_dir.join(hash.to_hex())
    }
}

/// Index plus options, exactly as persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub opts: StoreOptions,
    #[serde(default)]
    pub objects: BTreeMap<ContentHash, StoredObject>,
}

impl StoreSnapshot {
    pub fn empty(opts: StoreOptions) -> Self {
        Self {
            opts,
            objects: BTreeMap::new(),
        }
    }

    /// Load the snapshot at `path`. Returns `Ok(None)` if no file exists.
    pub fn load(path: &Path) -> StoreResult<Option<Self>> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StoreError::Snapshot {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Write the snapshot to `path`, replacing any previous one atomically.
    pub fn persist(&self, path: &Path) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(self).map_err(|e| StoreError::Snapshot {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &data)?;
        Ok(())
    }
}

/// Write `data` to `path` via a temporary file in the same directory.
///
/// The temporary lives next to the destination so the final rename never
/// crosses a filesystem boundary.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
