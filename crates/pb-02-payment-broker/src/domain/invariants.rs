//! # Domain Invariants
//!
//! Checked after every operation and before anything is committed. A
//! violation here is a bug in the broker or its host, never a user error.

use pb_01_actor_state::TokenAmount;

use crate::domain::channel::ChannelTable;
use crate::errors::BrokerError;

/// Escrow conservation.
///
/// The broker's balance equals the sum over open channels of
/// `amount - amount_redeemed`. Value is never created or lost inside it.
pub fn check_escrow_invariant(
    broker_balance: TokenAmount,
    table: &ChannelTable,
) -> Result<(), BrokerError> {
    let owed = table.total_owed().ok_or(BrokerError::Overflow)?;
    if owed != broker_balance {
        return Err(BrokerError::EscrowMismatch {
            balance: broker_balance,
            owed,
        });
    }
    Ok(())
}

/// Bounded redemption.
///
/// No open channel has paid out more than it was funded with.
#[must_use]
pub fn check_redeemed_within_amount(table: &ChannelTable) -> bool {
    table
        .iter()
        .all(|(_, _, channel)| channel.amount_redeemed <= channel.amount)
}
