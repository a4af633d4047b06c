//! Wire protocol for Eternity.
//!
//! Two layers share one duplex link to the anonymizing-network client:
//!
//! - the **envelope** ([`ClientRequest`] / [`ClientEvent`]): tag byte,
//!   optional reply token, u64-length-prefixed payload;
//! - the **storage message** inside a Received payload ([`Action`]) and the
//!   status-prefixed [`Reply`] routed back through the reply token.
//!
//! Decoding never indexes past the end of a frame; every short or
//! inconsistent frame is a [`ProtocolError::Framing`].

pub mod codec;
pub mod envelope;
pub mod error;
pub mod message;
mod wire;

pub use codec::EternityCodec;
pub use envelope::{tags, ClientEvent, ClientRequest};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    actions, Action, Reply, Request, Status, MAX_FRAME_SIZE, STORE_HEADER_LEN,
};
