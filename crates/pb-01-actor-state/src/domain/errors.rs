use super::{Cid, TokenAmount};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Malformed account: {0}")]
    MalformedAccount(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: TokenAmount,
        available: TokenAmount,
    },

    #[error("Balance overflow: {balance} + {amount}")]
    BalanceOverflow {
        balance: TokenAmount,
        amount: TokenAmount,
    },

    #[error("Content not found: {0:?}")]
    ContentNotFound(Cid),

    #[error("Lock poisoned")]
    LockPoisoned,
}
