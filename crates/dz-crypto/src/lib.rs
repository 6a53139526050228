//! Cryptographic primitives for Dropzone.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification,
//! and derivation of network-scoped addresses from public keys.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::ContentHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
