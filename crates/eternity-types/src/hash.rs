use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Length of a SHA-256 digest in bytes.
pub const HASH_LEN: usize = 32;

/// Content hash of a stored object.
///
/// A `ContentHash` is the SHA-256 digest of an object's bytes. It is the
/// object's only identifier: the key of the store index, the name of the
/// object's file on disk, and the 32 raw bytes carried on the wire.
///
/// The canonical text form is lowercase hex. It is used for file names and
/// for serialization, so a snapshot written by one process is always
/// readable and reconcilable by another.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; HASH_LEN]);

impl ContentHash {
    /// Hash raw bytes.
    pub fn compute(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Wrap a pre-computed digest.
    pub const fn from_digest(digest: [u8; HASH_LEN]) -> Self {
        Self(digest)
    }

    /// Parse from a wire slice; the slice must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Canonical lowercase hex (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from canonical hex.
    ///
    /// Uppercase hex is rejected: two spellings of one hash would let two
    /// file names claim the same object.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != HASH_LEN * 2 {
            return Err(TypeError::InvalidLength {
                expected: HASH_LEN * 2,
                actual: s.len(),
            });
        }
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(TypeError::InvalidHex(format!("non-canonical hex: {s}")));
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; HASH_LEN]> for ContentHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<ContentHash> for [u8; HASH_LEN] {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let h1 = ContentHash::compute(b"hello world");
        let h2 = ContentHash::compute(b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn compute_matches_sha256_test_vector() {
        let h = ContentHash::compute(b"abc");
        assert_eq!(
            h.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn different_data_produces_different_hashes() {
        assert_ne!(ContentHash::compute(b"hello"), ContentHash::compute(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let h = ContentHash::compute(b"test");
        let parsed = ContentHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn uppercase_hex_is_rejected() {
        let upper = ContentHash::compute(b"test").to_hex().to_uppercase();
        assert!(matches!(
            ContentHash::from_hex(&upper),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn wrong_length_hex_is_rejected() {
        let err = ContentHash::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 64, actual: 4 });
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(ContentHash::from_slice(&[0u8; 31]).is_err());
        assert!(ContentHash::from_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn short_hex_is_8_chars() {
        assert_eq!(ContentHash::compute(b"test").short_hex().len(), 8);
    }

    #[test]
    fn display_is_full_hex() {
        let h = ContentHash::compute(b"test");
        assert_eq!(format!("{h}"), h.to_hex());
    }

    #[test]
    fn serde_uses_hex_string() {
        let h = ContentHash::compute(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let parsed: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn usable_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(ContentHash::compute(b"k"), 1u8);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<ContentHash, u8> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
