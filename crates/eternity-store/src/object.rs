use std::path::PathBuf;

use eternity_crypto::{Signature, VerifyingKey};
use eternity_types::ContentHash;
use serde::{Deserialize, Serialize};

/// Key material a publisher attaches to a Store request.
///
/// The signature must verify over the object contents under `public_key`.
/// The same key later authorizes deletion, with a signature over the raw
/// hash bytes instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publisher {
    pub public_key: VerifyingKey,
    pub signature: Signature,
}

impl Publisher {
    pub fn new(public_key: VerifyingKey, signature: Signature) -> Self {
        Self {
            public_key,
            signature,
        }
    }
}

/// One entry of the store index.
///
/// Invariant while the entry is live: `hash == SHA-256(contents at path)`.
/// Reconcile removes any entry for which this no longer holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub hash: ContentHash,
    pub path: PathBuf,
    pub size: u64,
    /// Recorded at store time; objects without one cannot be deleted remotely.
    #[serde(default, rename = "pubkey", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<VerifyingKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

impl StoredObject {
    /// An entry whose publisher is unknown (anonymous store or adopted by reconcile).
    pub fn anonymous(hash: ContentHash, path: PathBuf, size: u64) -> Self {
        Self {
            hash,
            path,
            size,
            public_key: None,
            signature: None,
        }
    }

    /// An entry carrying the publisher's key and store-time signature.
    pub fn published(hash: ContentHash, path: PathBuf, size: u64, publisher: Publisher) -> Self {
        Self {
            hash,
            path,
            size,
            public_key: Some(publisher.public_key),
            signature: Some(publisher.signature),
        }
    }

    /// Returns `true` if deletion through the wire protocol is possible.
    pub fn is_deletable(&self) -> bool {
        self.public_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eternity_crypto::SigningKey;

    #[test]
    fn anonymous_entry_is_not_deletable() {
        let hash = ContentHash::compute(b"x");
        let obj = StoredObject::anonymous(hash, PathBuf::from("objects/x"), 1);
        assert!(!obj.is_deletable());
    }

    #[test]
    fn published_entry_records_key() {
        let sk = SigningKey::generate();
        let hash = ContentHash::compute(b"x");
        let publisher = Publisher::new(sk.verifying_key(), sk.sign(b"x"));
        let obj = StoredObject::published(hash, PathBuf::from("objects/x"), 1, publisher);
        assert!(obj.is_deletable());
        assert_eq!(obj.public_key, Some(sk.verifying_key()));
    }

    #[test]
    fn anonymous_entry_serializes_without_key_fields() {
        let hash = ContentHash::compute(b"x");
        let obj = StoredObject::anonymous(hash, PathBuf::from("objects/x"), 1);
        let json = serde_json::to_string(&obj).unwrap();
        assert!(!json.contains("pubkey"));
        assert!(!json.contains("signature"));
        let back: StoredObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obj);
    }

    #[test]
    fn published_entry_json_roundtrip() {
        let sk = SigningKey::generate();
        let hash = ContentHash::compute(b"payload");
        let publisher = Publisher::new(sk.verifying_key(), sk.sign(b"payload"));
        let obj = StoredObject::published(hash, PathBuf::from("objects/p"), 7, publisher);
        let json = serde_json::to_string(&obj).unwrap();
        assert!(json.contains(&sk.verifying_key().to_hex()));
        let back: StoredObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obj);
    }
}
