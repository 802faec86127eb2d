//! # Value Objects

use pb_01_actor_state::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel identifier, unique within one payer's table.
///
/// Allocated from a per-payer counter that never goes backwards, so an id is
/// never handed out twice even after its channel is closed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl ChannelId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChannelId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Opaque redemption predicate.
///
/// Names an actor method whose approval a redeemer needs. The broker only
/// carries it; a `ConditionChecker` decides whether it holds.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// Actor that evaluates the condition.
    pub to: Address,
    /// Method on that actor.
    pub method: String,
    /// Encoded arguments, opaque to the broker.
    pub params: Vec<u8>,
}

impl Condition {
    #[must_use]
    pub fn new(to: Address, method: impl Into<String>, params: Vec<u8>) -> Self {
        Self {
            to,
            method: method.into(),
            params,
        }
    }
}
