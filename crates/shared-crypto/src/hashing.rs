//! # BLAKE3 Hashing
//!
//! Content addresses for everything the broker persists or signs.
//!
//! Each kind of content is hashed under its own derivation context, so the
//! digest of an account blob can never equal the digest of a channel table
//! or a voucher body, even for identical bytes.

use blake3::Hasher;

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Stateful BLAKE3 hasher.
pub struct Blake3Hasher {
    inner: Hasher,
}

impl Blake3Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    /// Create a hasher bound to a derivation context.
    pub fn new_domain(context: &str) -> Self {
        Self {
            inner: Hasher::new_derive_key(context),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Domain-separated content digest.
///
/// `context` should be a hardcoded, globally unique string such as
/// `"payment-broker 2024 account"`.
pub fn content_digest(context: &str, data: &[u8]) -> Hash {
    Blake3Hasher::new_domain(context).update(data).finalize()
}
