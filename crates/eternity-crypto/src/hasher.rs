use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use eternity_types::ContentHash;
use sha2::{Digest, Sha256};

const READ_CHUNK: usize = 64 * 1024;

/// SHA-256 content hasher.
///
/// Unlike a domain-separated hasher, this computes the plain digest of the
/// bytes: an object's hash must equal `sha256sum` of its file so that the
/// file name alone proves what the file should contain.
pub struct ContentHasher;

impl ContentHasher {
    /// Hash bytes held in memory.
    pub fn hash(data: &[u8]) -> ContentHash {
        ContentHash::compute(data)
    }

    /// Hash everything a reader yields, in fixed-size chunks.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<ContentHash> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(ContentHash::from_digest(hasher.finalize().into()))
    }

    /// Hash a file on disk without loading it whole.
    pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
        let file = File::open(path)?;
        Self::hash_reader(BufReader::new(file))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(data: &[u8], expected: &ContentHash) -> bool {
        Self::hash(data) == *expected
    }
}
