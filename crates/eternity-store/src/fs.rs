use std::fs;
use std::io;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use eternity_crypto::{ContentHasher, Signature};
use eternity_types::ContentHash;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{Publisher, StoredObject};
use crate::reconcile::{ReconcileReport, Repair};
use crate::snapshot::{write_atomic, StoreOptions, StoreSnapshot};
use crate::traits::ContentStore;

/// Suffix given to a snapshot that could not be parsed at open time.
const QUARANTINE_SUFFIX: &str = "corrupt";

/// Filesystem-backed content store.
///
/// Objects live one per file under `<root>/objects/`, named by hex hash. The
/// index lives in memory behind a `RwLock` and is mirrored to
/// `<root>/index.json`. Every mutating operation holds the write lock across
/// both the in-memory change and the snapshot write, so readers never see an
/// index that disagrees with what was last persisted.
pub struct FsContentStore {
    index: RwLock<StoreSnapshot>,
}

impl FsContentStore {
    /// Open (or create) the store rooted at `root`, then reconcile it.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_report(root).map(|(store, _)| store)
    }

    /// Like [`open`](Self::open), also returning what the opening reconcile repaired.
    pub fn open_with_report(root: impl AsRef<Path>) -> StoreResult<(Self, ReconcileReport)> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = fs::canonicalize(root)?;
        let opts = StoreOptions::for_root(&root);
        fs::create_dir_all(&opts.objects_dir)?;

        let snapshot = Self::load_or_init(opts)?;
        let store = Self {
            index: RwLock::new(snapshot),
        };

        let report = store.reconcile()?;
        info!(
            root = %root.display(),
            objects = store.len(),
            verified = report.verified,
            adopted = report.adopted(),
            removed = report.removed(),
            unreadable = report.unreadable.len(),
            "content store opened"
        );
        Ok((store, report))
    }

    fn load_or_init(opts: StoreOptions) -> StoreResult<StoreSnapshot> {
        let path = opts.snapshot_path();
        match StoreSnapshot::load(&path) {
            Ok(Some(mut snapshot)) => {
                if snapshot.opts.root_dir != opts.root_dir
                    || snapshot.opts.objects_dir != opts.objects_dir
                {
                    info!(
                        from = %snapshot.opts.root_dir.display(),
                        to = %opts.root_dir.display(),
                        "store root relocated"
                    );
                    snapshot.opts.root_dir = opts.root_dir;
                    snapshot.opts.objects_dir = opts.objects_dir;
                    snapshot.persist(&path)?;
                }
                Ok(snapshot)
            }
            Ok(None) => {
                let snapshot = StoreSnapshot::empty(opts);
                snapshot.persist(&path)?;
                Ok(snapshot)
            }
            Err(StoreError::Snapshot { reason, .. }) => {
                let mut quarantined = path.clone().into_os_string();
                quarantined.push(".");
                quarantined.push(QUARANTINE_SUFFIX);
                warn!(
                    %reason,
                    moved_to = %Path::new(&quarantined).display(),
                    "unreadable index snapshot; rebuilding from objects directory"
                );
                fs::rename(&path, &quarantined)?;
                let snapshot = StoreSnapshot::empty(opts);
                snapshot.persist(&path)?;
                Ok(snapshot)
            }
            Err(e) => Err(e),
        }
    }

    fn read_index(&self) -> RwLockReadGuard<'_, StoreSnapshot> {
        self.index.read().expect("store index lock poisoned")
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, StoreSnapshot> {
        self.index.write().expect("store index lock poisoned")
    }

    /// Number of indexed objects.
    pub fn len(&self) -> usize {
        self.read_index().objects.len()
    }

    /// Returns `true` if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.read_index().objects.is_empty()
    }

    /// The index entry for `hash`, if any.
    pub fn get(&self, hash: &ContentHash) -> Option<StoredObject> {
        self.read_index().objects.get(hash).cloned()
    }

    /// All indexed hashes, in sorted order.
    pub fn hashes(&self) -> Vec<ContentHash> {
        self.read_index().objects.keys().copied().collect()
    }

    pub fn options(&self) -> StoreOptions {
        self.read_index().opts.clone()
    }

    /// Replace the configured peer list and persist it.
    pub fn set_peers(&self, peers: Vec<String>) -> StoreResult<()> {
        let mut index = self.write_index();
        if index.opts.peers == peers {
            return Ok(());
        }
        let previous = std::mem::replace(&mut index.opts.peers, peers);
        if let Err(e) = index.persist(&index.opts.snapshot_path()) {
            index.opts.peers = previous;
            return Err(e);
        }
        Ok(())
    }
}

impl ContentStore for FsContentStore {
    fn store(&self, contents: &[u8], publisher: Option<Publisher>) -> StoreResult<ContentHash> {
        let hash = ContentHasher::hash(contents);
        if let Some(p) = &publisher {
            p.public_key
                .verify(contents, &p.signature)
                .map_err(|_| StoreError::unauthorized(hash, "store signature does not verify"))?;
        }

        let mut index = self.write_index();
        let path = index.opts.object_path(&hash);
        write_atomic(&path, contents)?;

        // The first recorded publisher keeps the object; a later store of the
        // same bytes cannot claim or strip deletion rights.
        if index.objects.contains_key(&hash) {
            debug!(%hash, "object already indexed; contents rewritten");
            return Ok(hash);
        }
        let size = contents.len() as u64;
        let entry = match publisher {
            Some(p) => StoredObject::published(hash, path, size, p),
            None => StoredObject::anonymous(hash, path, size),
        };
        index.objects.insert(hash, entry);
        if let Err(e) = index.persist(&index.opts.snapshot_path()) {
            // Not recorded, so the file must not outlive the failed store.
            index.objects.remove(&hash);
            remove_file_if_present(&index.opts.object_path(&hash))?;
            return Err(e);
        }
        debug!(%hash, size, "object stored");
        Ok(hash)
    }

    fn exists(&self, hash: &ContentHash) -> bool {
        self.read_index().objects.contains_key(hash)
    }

    fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        let index = self.read_index();
        let entry = index.objects.get(hash).ok_or(StoreError::NotFound(*hash))?;
        Ok(fs::read(&entry.path)?)
    }

    fn delete(&self, hash: &ContentHash, signature: &Signature) -> StoreResult<()> {
        let mut index = self.write_index();
        let path = {
            let entry = index.objects.get(hash).ok_or(StoreError::NotFound(*hash))?;
            let key = entry.public_key.as_ref().ok_or_else(|| {
                StoreError::unauthorized(*hash, "object has no recorded publisher key")
            })?;
            key.verify(hash.as_bytes(), signature)
                .map_err(|_| StoreError::unauthorized(*hash, "delete signature does not verify"))?;
            entry.path.clone()
        };

        // File first: if the snapshot write then fails, the entry is restored
        // so memory matches disk, and the next reconcile drops it as missing.
        remove_file_if_present(&path)?;
        let removed = index.objects.remove(hash);
        if let Err(e) = index.persist(&index.opts.snapshot_path()) {
            if let Some(entry) = removed {
                index.objects.insert(*hash, entry);
            }
            return Err(e);
        }
        debug!(%hash, "object deleted");
        Ok(())
    }

    fn reconcile(&self) -> StoreResult<ReconcileReport> {
        let mut index = self.write_index();
        reconcile_index(&mut index)
    }
}

/// Bring `index` and the objects directory back into agreement.
///
/// Every index change is persisted before the next file is examined, so an
/// interrupted pass leaves a snapshot that is consistent up to that point.
fn reconcile_index(index: &mut StoreSnapshot) -> StoreResult<ReconcileReport> {
    let snapshot_path = index.opts.snapshot_path();
    let mut report = ReconcileReport::default();

    let indexed: Vec<ContentHash> = index.objects.keys().copied().collect();
    for hash in indexed {
        let canonical = index.opts.object_path(&hash);
        match ContentHasher::hash_file(&canonical) {
            Ok(computed) if computed == hash => {
                report.verified += 1;
                if let Some(entry) = index.objects.get_mut(&hash) {
                    if entry.path != canonical {
                        entry.path = canonical;
                        index.persist(&snapshot_path)?;
                    }
                }
            }
            Ok(computed) => {
                warn!(%hash, %computed, "object contents changed on disk; removing");
                remove_file_if_present(&canonical)?;
                index.objects.remove(&hash);
                index.persist(&snapshot_path)?;
                report.repairs.push(Repair::RemovedCorrupt { hash, computed });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(%hash, "object file missing; dropping index entry");
                index.objects.remove(&hash);
                index.persist(&snapshot_path)?;
                report.repairs.push(Repair::DroppedMissing(hash));
            }
            Err(e) => {
                warn!(%hash, error = %e, "object file unreadable; leaving entry in place");
                report.unreadable.push(canonical);
            }
        }
    }

    for dirent in fs::read_dir(&index.opts.objects_dir)? {
        let dirent = dirent?;
        if !dirent.file_type()?.is_file() {
            debug!(path = %dirent.path().display(), "skipping non-file in objects directory");
            continue;
        }
        let name = dirent.file_name();
        let claimed = name.to_str().and_then(|s| ContentHash::from_hex(s).ok());
        if claimed.is_some_and(|h| index.objects.contains_key(&h)) {
            continue;
        }

        let path = dirent.path();
        let adopted = match claimed {
            Some(hash) => match ContentHasher::hash_file(&path) {
                Ok(computed) if computed == hash => Some(hash),
                Ok(_) => None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unindexed file unreadable; skipping");
                    report.unreadable.push(path);
                    continue;
                }
            },
            None => None,
        };
        match adopted {
            Some(hash) => {
                let size = dirent.metadata()?.len();
                index
                    .objects
                    .insert(hash, StoredObject::anonymous(hash, path, size));
                index.persist(&snapshot_path)?;
                info!(%hash, "adopted unindexed object");
                report.repairs.push(Repair::Adopted(hash));
            }
            None => {
                warn!(path = %path.display(), "file name does not match contents; removing");
                remove_file_if_present(&path)?;
                report.repairs.push(Repair::RemovedUntrusted(name));
            }
        }
    }

    Ok(report)
}

fn remove_file_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
