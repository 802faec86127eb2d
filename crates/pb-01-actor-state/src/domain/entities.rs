//! # Domain Entities for the Actor Model
//!
//! ## Type Decisions
//!
//! - `TokenAmount = u128` - covers any practical supply without pulling in a
//!   big-integer crate. Every mutation is checked; nothing wraps.
//! - `Cid` is a bare 32-byte BLAKE3 digest. The all-zero digest is reserved
//!   to encode "absent" in the fixed account layout.

use serde::{Deserialize, Serialize};
use shared_crypto::{content_digest, Ed25519PublicKey, ADDRESS_LEN};
use std::fmt;

use crate::domain::codec;
use crate::domain::errors::StateError;

/// Value held by an account, in base units.
pub type TokenAmount = u128;

/// Position in the external block ordering.
pub type BlockHeight = u64;

/// Derivation context for account identities.
pub const ACCOUNT_IDENTITY_CONTEXT: &str = "payment-broker 2024 account identity";

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// The zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Address controlled by an Ed25519 public key.
    #[must_use]
    pub fn from_public_key(key: &Ed25519PublicKey) -> Self {
        Self(key.address())
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}...{}", hex::encode(&self.0[..4]), hex::encode(&self.0[18..]))
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// CID (32 bytes)
// =============================================================================

/// Content address: the BLAKE3 digest naming an immutable blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cid(pub [u8; 32]);

impl Cid {
    /// Reserved digest meaning "no content".
    pub const UNDEF: Self = Self([0u8; 32]);

    /// Creates a CID from a raw digest.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Computes the CID of `data` under a derivation context.
    #[must_use]
    pub fn of(context: &str, data: &[u8]) -> Self {
        Self(content_digest(context, data))
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the reserved all-zero digest.
    #[must_use]
    pub fn is_undef(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid:{}", hex::encode(self.0))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cid:{}", hex::encode(&self.0[..6]))
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

/// Account state kept for every address, actors included.
///
/// Value sent to an unknown address creates a code-less account that only
/// tracks a balance. `code` and `head` are set when an actor of a specific
/// kind is instantiated. Check `code` for `None` before comparing it.
///
/// Not safe for concurrent mutation; the dispatch boundary serializes access.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Identity of the behavior governing this account.
    pub code: Option<Cid>,
    /// Content address of the actor's private state blob.
    pub head: Option<Cid>,
    /// Replay-protection counter. Increments by exactly 1 per accepted message.
    pub nonce: u64,
    /// Balance in base units.
    pub balance: TokenAmount,
}

impl Account {
    /// Constructs an actor account governed by `code`.
    #[must_use]
    pub fn new(code: Cid, balance: TokenAmount) -> Self {
        Self {
            code: Some(code),
            head: None,
            nonce: 0,
            balance,
        }
    }

    /// Constructs a value-only account.
    #[must_use]
    pub fn with_balance(balance: TokenAmount) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// Builder method to set nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// True if the account carries nothing worth persisting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.head.is_none() && self.nonce == 0 && self.balance == 0
    }

    /// True if the account is governed by `code`.
    #[must_use]
    pub fn has_code(&self, code: &Cid) -> bool {
        self.code.as_ref() == Some(code)
    }

    /// Increments the nonce by one, saturating at `u64::MAX`.
    ///
    /// The dispatcher checks the submitted nonce before calling this and
    /// refuses senders whose nonce is already exhausted.
    pub fn increment_nonce(&mut self) {
        self.nonce = self.nonce.saturating_add(1);
    }

    /// Adds `amount` to the balance.
    pub fn credit(&mut self, amount: TokenAmount) -> Result<(), StateError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow {
                balance: self.balance,
                amount,
            })?;
        Ok(())
    }

    /// Removes `amount` from the balance, leaving it untouched on failure.
    pub fn debit(&mut self, amount: TokenAmount) -> Result<(), StateError> {
        if amount > self.balance {
            return Err(StateError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Canonical bytes of this account.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        codec::encode_account(self).to_vec()
    }

    /// Parses canonical bytes; see [`codec::decode_account`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, StateError> {
        codec::decode_account(bytes)
    }

    /// Content address of the canonical encoding.
    ///
    /// Field order is fixed by the layout, so two accounts with equal fields
    /// always share an identity regardless of how they were built.
    #[must_use]
    pub fn compute_identity(&self) -> Cid {
        Cid::of(ACCOUNT_IDENTITY_CONTEXT, &codec::encode_account(self))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.code {
            Some(code) => code.to_string(),
            None => "account".to_string(),
        };
        write!(
            f,
            "<{kind}; balance: {}; nonce: {}>",
            self.balance, self.nonce
        )
    }
}
