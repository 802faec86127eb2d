//! # Shared Crypto - Hashing and Signature Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | BLAKE3 | Content addresses, account identities |
//! | `signatures` | Ed25519 | Voucher signing, address derivation |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency when signing
//! - **BLAKE3**: Domain-separated derivation for content addresses so a
//!   voucher digest can never collide with a state blob digest

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{blake3_hash, content_digest, Blake3Hasher, Hash};
pub use signatures::{
    derive_address, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, ADDRESS_LEN,
    SIGNATURE_LEN,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
