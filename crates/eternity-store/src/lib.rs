//! Self-healing content-addressed file store for Eternity.
//!
//! Objects are stored one per file under `<root>/objects/`, named by the
//! lowercase hex SHA-256 of their contents. An in-memory index of every
//! object is mirrored to `<root>/index.json` after each mutation.
//!
//! # Storage Backends
//!
//! All backends implement the [`ContentStore`] trait:
//!
//! - [`FsContentStore`] -- filesystem store with an atomic JSON snapshot
//!
//! # Design Rules
//!
//! 1. A file's name is its own integrity check: `name == sha256(contents)`.
//! 2. Write-then-index: the object file is durable before its entry exists.
//! 3. Index mutation and snapshot persist happen under one write lock.
//! 4. Reconcile is the only path that adopts or discards files it did not write.
//! 5. Deletion requires the key recorded at store time; anonymous objects stay.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod object;
pub mod reconcile;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsContentStore;
pub use object::{Publisher, StoredObject};
pub use reconcile::{ReconcileReport, Repair};
pub use snapshot::{StoreOptions, StoreSnapshot, OBJECTS_DIR, SNAPSHOT_FILE};
pub use traits::ContentStore;
