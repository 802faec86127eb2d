//! Canonical binary encoding shared by vouchers, call parameters and the
//! channel table.
//!
//! Fixed-width big-endian integers, no trailing bytes, and an explicit size
//! bound on anything decoded from untrusted input.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::BrokerError;

fn canonical() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .reject_trailing_bytes()
}

/// Encodes `value` canonically.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, BrokerError> {
    Ok(canonical().serialize(value)?)
}

/// Strictly decodes `bytes`, rejecting inputs over `limit` bytes and any
/// trailing data.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], limit: u64) -> Result<T, BrokerError> {
    if bytes.len() as u64 > limit {
        return Err(BrokerError::DecodeError(format!(
            "input of {} bytes exceeds limit of {limit}",
            bytes.len()
        )));
    }
    Ok(canonical().with_limit(limit).deserialize(bytes)?)
}
