//! Storage requests carried inside Received payloads, and their replies.

use bytes::BufMut;
use eternity_crypto::{Signature, SigningKey, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use eternity_types::{ContentHash, ReplyToken, HASH_LEN};

use crate::error::{ProtocolError, ProtocolResult};
use crate::wire::{take_array, take_u8};

/// Largest frame accepted from the transport.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Fixed-field prefix of a Store body: reserved byte, public key, signature.
pub const STORE_HEADER_LEN: usize = 1 + PUBLIC_KEY_LEN + SIGNATURE_LEN;

pub mod actions {
    pub const SEARCH: u8 = 0x00;
    pub const STORE: u8 = 0x01;
    pub const SERVE: u8 = 0x02;
    pub const DELETE: u8 = 0x03;
}

/// One storage operation, as encoded after the action byte.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Search(ContentHash),
    /// An all-zero key and signature mark an anonymous publisher.
    Store {
        public_key: [u8; PUBLIC_KEY_LEN],
        signature: Signature,
        contents: Vec<u8>,
    },
    Serve(ContentHash),
    /// The signature covers the raw 32 hash bytes.
    Delete {
        hash: ContentHash,
        signature: Signature,
    },
}

impl Action {
    /// Store `contents` signed by `key`.
    pub fn signed_store(key: &SigningKey, contents: Vec<u8>) -> Self {
        Self::Store {
            public_key: key.verifying_key().to_bytes(),
            signature: key.sign(&contents),
            contents,
        }
    }

    /// Store `contents` with no publisher. The object can never be deleted remotely.
    pub fn anonymous_store(contents: Vec<u8>) -> Self {
        Self::Store {
            public_key: [0u8; PUBLIC_KEY_LEN],
            signature: Signature::from_bytes(&[0u8; SIGNATURE_LEN]),
            contents,
        }
    }

    /// Delete `hash`, authorized by the key that stored it.
    pub fn signed_delete(key: &SigningKey, hash: ContentHash) -> Self {
        Self::Delete {
            signature: key.sign(hash.as_bytes()),
            hash,
        }
    }

    pub fn type_tag(&self) -> u8 {
        match self {
            Self::Search(_) => actions::SEARCH,
            Self::Store { .. } => actions::STORE,
            Self::Serve(_) => actions::SERVE,
            Self::Delete { .. } => actions::DELETE,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Search(_) => "Search",
            Self::Store { .. } => "Store",
            Self::Serve(_) => "Serve",
            Self::Delete { .. } => "Delete",
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.put_u8(self.type_tag());
        match self {
            Self::Search(hash) | Self::Serve(hash) => out.put_slice(hash.as_bytes()),
            Self::Store {
                public_key,
                signature,
                contents,
            } => {
                out.reserve(STORE_HEADER_LEN + contents.len());
                out.put_u8(0);
                out.put_slice(public_key);
                out.put_slice(&signature.to_bytes());
                out.put_slice(contents);
            }
            Self::Delete { hash, signature } => {
                out.put_slice(hash.as_bytes());
                out.put_slice(&signature.to_bytes());
            }
        }
        out
    }

    /// Decode an action from a Received payload.
    ///
    /// Hash-carrying actions must be exactly as long as their fields; a Store
    /// must carry at least its fixed header, everything after it is contents.
    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let mut buf = payload;
        let action = take_u8(&mut buf, "action")?;
        let decoded = match action {
            actions::SEARCH => Self::Search(take_hash(&mut buf)?),
            actions::SERVE => Self::Serve(take_hash(&mut buf)?),
            actions::STORE => {
                if buf.len() < STORE_HEADER_LEN {
                    return Err(ProtocolError::Framing(format!(
                        "store body needs at least {STORE_HEADER_LEN} bytes, got {}",
                        buf.len()
                    )));
                }
                let _reserved = take_u8(&mut buf, "reserved")?;
                let public_key = take_array::<PUBLIC_KEY_LEN>(&mut buf, "public key")?;
                let signature = Signature::from_bytes(&take_array::<SIGNATURE_LEN>(&mut buf, "signature")?);
                let contents = std::mem::take(&mut buf).to_vec();
                Self::Store {
                    public_key,
                    signature,
                    contents,
                }
            }
            actions::DELETE => {
                let hash = take_hash(&mut buf)?;
                let signature = Signature::from_bytes(&take_array::<SIGNATURE_LEN>(&mut buf, "signature")?);
                Self::Delete { hash, signature }
            }
            other => return Err(ProtocolError::UnknownAction(other)),
        };
        if !buf.is_empty() {
            return Err(ProtocolError::Framing(format!(
                "{} body has {} trailing bytes",
                decoded.type_name(),
                buf.len()
            )));
        }
        Ok(decoded)
    }
}

fn take_hash(buf: &mut &[u8]) -> ProtocolResult<ContentHash> {
    Ok(ContentHash::from(take_array::<HASH_LEN>(buf, "content hash")?))
}

/// A decoded inbound request paired with the only route back to its sender.
#[derive(Debug)]
pub struct Request {
    pub reply_token: ReplyToken,
    pub action: Action,
}

/// First byte of every reply payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Not found, or the operation failed.
    NotFound = 0x00,
    Ok = 0x01,
    Unauthorized = 0x02,
}

impl Status {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::NotFound),
            0x01 => Some(Self::Ok),
            0x02 => Some(Self::Unauthorized),
            _ => None,
        }
    }
}

/// Reply payload: a status byte, then any result bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub status: Status,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn status(status: Status) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn ok(body: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self::status(Status::NotFound)
    }

    /// Store acknowledgment: `0x01` followed by the raw hash bytes.
    pub fn stored(hash: &ContentHash) -> Self {
        Self::ok(hash.as_bytes().to_vec())
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.body.len());
        out.put_u8(self.status.as_byte());
        out.put_slice(&self.body);
        out
    }

    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let (&byte, body) = payload
            .split_first()
            .ok_or_else(|| ProtocolError::truncated("reply status"))?;
        let status = Status::from_byte(byte)
            .ok_or_else(|| ProtocolError::Framing(format!("unknown reply status {byte:#04x}")))?;
        Ok(Self {
            status,
            body: body.to_vec(),
        })
    }

    /// Interpret the body of a Store acknowledgment.
    pub fn stored_hash(&self) -> Option<ContentHash> {
        if !self.is_ok() {
            return None;
        }
        ContentHash::from_slice(&self.body).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_layout() {
        let hash = ContentHash::compute(b"x");
        let bytes = Action::Search(hash).encode();
        assert_eq!(bytes.len(), 33);
        assert_eq!(bytes[0], actions::SEARCH);
        assert_eq!(&bytes[1..], hash.as_bytes());
    }

    #[test]
    fn store_layout_puts_contents_after_header() {
        let key = SigningKey::from_bytes([3u8; 32]);
        let bytes = Action::signed_store(&key, b"ten bytes!".to_vec()).encode();
        assert_eq!(bytes.len(), 1 + STORE_HEADER_LEN + 10);
        assert_eq!(bytes[1], 0, "reserved byte");
        assert_eq!(&bytes[2..34], &key.verifying_key().to_bytes());
        assert_eq!(&bytes[98..], b"ten bytes!");
    }

    #[test]
    fn every_action_decodes_back() {
        let key = SigningKey::generate();
        let hash = ContentHash::compute(b"object");
        let all = vec![
            Action::Search(hash),
            Action::Serve(hash),
            Action::signed_store(&key, b"object".to_vec()),
            Action::anonymous_store(Vec::new()),
            Action::signed_delete(&key, hash),
        ];
        for action in all {
            assert_eq!(Action::decode(&action.encode()).unwrap(), action);
        }
    }

    #[test]
    fn short_store_is_framing_error() {
        let mut payload = vec![actions::STORE];
        payload.extend_from_slice(&[0u8; STORE_HEADER_LEN - 1]);
        assert!(matches!(
            Action::decode(&payload),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn store_with_only_header_has_empty_contents() {
        let mut payload = vec![actions::STORE];
        payload.extend_from_slice(&[0u8; STORE_HEADER_LEN]);
        match Action::decode(&payload).unwrap() {
            Action::Store { contents, .. } => assert!(contents.is_empty()),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn short_delete_is_framing_error() {
        let mut payload = vec![actions::DELETE];
        payload.extend_from_slice(&[0u8; HASH_LEN + SIGNATURE_LEN - 1]);
        assert!(matches!(
            Action::decode(&payload),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn search_with_trailing_bytes_is_framing_error() {
        let mut payload = Action::Search(ContentHash::compute(b"t")).encode();
        payload.push(0);
        assert!(matches!(
            Action::decode(&payload),
            Err(ProtocolError::Framing(_))
        ));
    }

    #[test]
    fn unknown_action() {
        assert!(matches!(
            Action::decode(&[0x04]),
            Err(ProtocolError::UnknownAction(0x04))
        ));
        assert!(matches!(Action::decode(&[]), Err(ProtocolError::Framing(_))));
    }

    #[test]
    fn type_names_correct() {
        let hash = ContentHash::compute(b"n");
        assert_eq!(Action::Search(hash).type_name(), "Search");
        assert_eq!(Action::anonymous_store(vec![]).type_name(), "Store");
    }

    #[test]
    fn reply_encoding() {
        assert_eq!(Reply::not_found().encode(), vec![0x00]);
        assert_eq!(Reply::status(Status::Unauthorized).encode(), vec![0x02]);
        assert_eq!(Reply::ok(b"data".to_vec()).encode(), b"\x01data".to_vec());
    }

    #[test]
    fn store_ack_carries_hash() {
        let hash = ContentHash::compute(b"ack");
        let reply = Reply::decode(&Reply::stored(&hash).encode()).unwrap();
        assert_eq!(reply.stored_hash(), Some(hash));
        assert_eq!(Reply::not_found().stored_hash(), None);
    }

    #[test]
    fn reply_decode_rejects_empty_and_unknown_status() {
        assert!(Reply::decode(&[]).is_err());
        assert!(Reply::decode(&[0x07]).is_err());
    }
}
