//! Foundation types for Eternity.
//!
//! Every other Eternity crate depends on `eternity-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- SHA-256 digest identifying a stored object
//! - [`ReplyToken`] -- opaque single-use reply route attached to a request
//! - [`Recipient`] -- 96-byte address of a node on the anonymizing network

pub mod error;
pub mod hash;
pub mod route;

pub use error::TypeError;
pub use hash::{ContentHash, HASH_LEN};
pub use route::{Recipient, ReplyToken, RECIPIENT_LEN};
