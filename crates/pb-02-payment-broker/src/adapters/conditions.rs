//! Condition checkers.
//!
//! Conditions name another actor's method. With no second actor in this
//! workspace, the host decides up front which conditions hold.

use parking_lot::RwLock;
use pb_01_actor_state::{Address, BlockHeight};
use std::collections::HashSet;

use crate::domain::value_objects::Condition;
use crate::ports::outbound::ConditionChecker;

/// Satisfies exactly the conditions it has been told to allow.
#[derive(Debug, Default)]
pub struct AllowListConditions {
    allowed: RwLock<HashSet<Condition>>,
}

impl AllowListConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, condition: Condition) {
        self.allowed.write().insert(condition);
    }

    /// Returns true if the condition was allowed before.
    pub fn revoke(&self, condition: &Condition) -> bool {
        self.allowed.write().remove(condition)
    }
}

impl ConditionChecker for AllowListConditions {
    fn is_satisfied(&self, condition: &Condition, _redeemer: &Address, _height: BlockHeight) -> bool {
        self.allowed.read().contains(condition)
    }
}

/// Never satisfied: any channel or voucher carrying a condition is
/// unredeemable.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAllConditions;

impl ConditionChecker for RejectAllConditions {
    fn is_satisfied(&self, _condition: &Condition, _redeemer: &Address, _height: BlockHeight) -> bool {
        false
    }
}
