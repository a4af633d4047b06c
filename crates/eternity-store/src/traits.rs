use eternity_crypto::Signature;
use eternity_types::ContentHash;

use crate::error::StoreResult;
use crate::object::Publisher;
use crate::reconcile::ReconcileReport;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - The same bytes always produce the same hash; storing them again is a
///   no-op apart from rewriting identical contents.
/// - An index mutation and the persisted snapshot that records it are one
///   critical section: no caller observes one without the other.
/// - `exists` answers from the index alone and never touches the filesystem.
/// - All I/O errors are propagated, never silently ignored.
pub trait ContentStore: Send + Sync {
    /// Store `contents` and return their hash.
    ///
    /// With a publisher, the signature must verify over `contents`; the key
    /// is then recorded and later authorizes deletion.
    fn store(&self, contents: &[u8], publisher: Option<Publisher>) -> StoreResult<ContentHash>;

    /// Check index membership.
    fn exists(&self, hash: &ContentHash) -> bool;

    /// Read an object's bytes.
    fn fetch(&self, hash: &ContentHash) -> StoreResult<Vec<u8>>;

    /// Delete an object, authorized by a signature over the raw hash bytes.
    fn delete(&self, hash: &ContentHash, signature: &Signature) -> StoreResult<()>;

    /// Re-verify the index against the filesystem and repair divergence.
    fn reconcile(&self) -> StoreResult<ReconcileReport>;
}
