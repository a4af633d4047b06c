//! Cryptographic primitives for Eternity.
//!
//! Provides SHA-256 content hashing (in memory and streamed from disk) and
//! Ed25519 signing/verification for publisher-authenticated objects.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{
    Signature, SignatureError, SigningKey, VerifyingKey, PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
