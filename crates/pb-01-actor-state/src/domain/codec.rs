//! # Canonical Account Encoding
//!
//! Fixed-size, fixed-order layout. Not self-describing: a decoder knows
//! every offset up front, so any length mismatch means truncation or
//! corruption.
//!
//! ```text
//! offset  size  field
//!      0    32  code     (all zero = absent)
//!     32    32  head     (all zero = absent)
//!     64     8  nonce    (big endian)
//!     72    16  balance  (big endian)
//! ```

use crate::domain::entities::{Account, Cid};
use crate::domain::errors::StateError;

/// Exact byte length of an encoded account.
pub const ACCOUNT_ENCODED_LEN: usize = 88;

const CODE: std::ops::Range<usize> = 0..32;
const HEAD: std::ops::Range<usize> = 32..64;
const NONCE: std::ops::Range<usize> = 64..72;
const BALANCE: std::ops::Range<usize> = 72..88;

/// Encodes an account into its canonical layout.
#[must_use]
pub fn encode_account(account: &Account) -> [u8; ACCOUNT_ENCODED_LEN] {
    let mut out = [0u8; ACCOUNT_ENCODED_LEN];
    if let Some(code) = &account.code {
        out[CODE].copy_from_slice(code.as_bytes());
    }
    if let Some(head) = &account.head {
        out[HEAD].copy_from_slice(head.as_bytes());
    }
    out[NONCE].copy_from_slice(&account.nonce.to_be_bytes());
    out[BALANCE].copy_from_slice(&account.balance.to_be_bytes());
    out
}

/// Decodes an account, failing with `MalformedAccount` on a length mismatch
/// or on a head without code.
pub fn decode_account(bytes: &[u8]) -> Result<Account, StateError> {
    let bytes: &[u8; ACCOUNT_ENCODED_LEN] = bytes.try_into().map_err(|_| {
        StateError::MalformedAccount(format!(
            "expected {ACCOUNT_ENCODED_LEN} bytes, got {}",
            bytes.len()
        ))
    })?;

    let mut nonce = [0u8; 8];
    nonce.copy_from_slice(&bytes[NONCE]);
    let mut balance = [0u8; 16];
    balance.copy_from_slice(&bytes[BALANCE]);

    let code = optional_cid(&bytes[CODE]);
    let head = optional_cid(&bytes[HEAD]);
    // Only actors carry state
    if code.is_none() && head.is_some() {
        return Err(StateError::MalformedAccount(
            "state head on an account without code".into(),
        ));
    }

    Ok(Account {
        code,
        head,
        nonce: u64::from_be_bytes(nonce),
        balance: u128::from_be_bytes(balance),
    })
}

fn optional_cid(slice: &[u8]) -> Option<Cid> {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(slice);
    let cid = Cid::new(digest);
    (!cid.is_undef()).then_some(cid)
}
