use std::fmt;

use crate::error::TypeError;

/// Length of a node address issued by the anonymizing client.
pub const RECIPIENT_LEN: usize = 96;

/// Single-use reply token (SURB) attached to an inbound request.
///
/// The bytes are opaque to this system; the anonymizing client alone knows
/// how to route them. A token is moved, never cloned, from the request that
/// carried it into the one response that consumes it.
#[derive(PartialEq, Eq)]
pub struct ReplyToken(Vec<u8>);

impl ReplyToken {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for ReplyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReplyToken({} bytes)", self.0.len())
    }
}

/// Routable address of a node on the anonymizing network.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Recipient([u8; RECIPIENT_LEN]);

impl Recipient {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; RECIPIENT_LEN] =
            bytes.try_into().map_err(|_| TypeError::InvalidLength {
                expected: RECIPIENT_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; RECIPIENT_LEN] {
        &self.0
    }
}

impl From<[u8; RECIPIENT_LEN]> for Recipient {
    fn from(bytes: [u8; RECIPIENT_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipient({}..)", hex::encode(&self.0[..8]))
    }
}
