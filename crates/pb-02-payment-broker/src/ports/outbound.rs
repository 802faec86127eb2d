//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the broker depends on. Account and content storage come from
//! `pb-01-actor-state`; the rest are defined here.
//!
//! Every port is synchronous and infallible from the broker's point of view:
//! a verifier that cannot decide must answer `false`.

use pb_01_actor_state::{Address, BlockHeight};

use crate::domain::value_objects::Condition;

// =============================================================================
// BLOCK HEIGHT
// =============================================================================

/// Source of the current block height.
///
/// Ordering and finality are the host's concern; the broker only compares
/// heights against channel EOLs and voucher windows.
pub trait ChainClock: Send + Sync {
    fn block_height(&self) -> BlockHeight;
}

// =============================================================================
// SIGNATURES
// =============================================================================

/// Checks a signature against an account address.
pub trait SignatureVerifier: Send + Sync {
    /// True only if `signature` over `message` was produced by the key
    /// controlling `signer`.
    fn verify(&self, message: &[u8], signature: &[u8], signer: &Address) -> bool;
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Evaluates redemption conditions attached to channels and vouchers.
pub trait ConditionChecker: Send + Sync {
    fn is_satisfied(&self, condition: &Condition, redeemer: &Address, height: BlockHeight)
        -> bool;
}
