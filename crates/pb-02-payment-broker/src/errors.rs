//! # Error Types
//!
//! Every error here is terminal for the triggering message: nothing the
//! message touched is committed, and the core never retries.

use pb_01_actor_state::{Address, StateError, TokenAmount};
use thiserror::Error;

// =============================================================================
// BROKER ERRORS
// =============================================================================

/// Errors raised by the broker state machine and voucher codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Payer cannot cover the requested amount.
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: TokenAmount,
        available: TokenAmount,
    },

    /// EOL is not strictly in the future (Create) or not past the current EOL (Extend).
    #[error("invalid expiry: eol {eol} must be greater than {floor}")]
    InvalidExpiry { eol: u64, floor: u64 },

    /// Voucher failed signature, window, condition or channel lookup checks.
    #[error("invalid voucher: {0}")]
    InvalidVoucher(String),

    /// Channel target is an actor rather than a plain account.
    #[error("invalid channel target {0}")]
    InvalidTarget(Address),

    /// Voucher does not advance the cumulative redeemed amount.
    #[error("stale voucher: amount {amount} does not exceed redeemed {redeemed}")]
    StaleVoucher {
        amount: TokenAmount,
        redeemed: TokenAmount,
    },

    /// Voucher authorizes more than the channel holds.
    #[error("voucher amount {amount} exceeds channel amount {channel_amount}")]
    ExceedsChannelAmount {
        amount: TokenAmount,
        channel_amount: TokenAmount,
    },

    /// Caller has no right to act on this channel.
    #[error("unauthorized caller {0}")]
    Unauthorized(Address),

    /// Channel absent or already closed.
    #[error("no such channel {channel} for payer {payer}")]
    NoSuchChannel { payer: Address, channel: u64 },

    /// Reclaim attempted before the channel's EOL.
    #[error("channel not yet expired: eol {eol}, height {height}")]
    NotYetExpired { eol: u64, height: u64 },

    /// Account bytes did not match the fixed layout.
    #[error("malformed account: {0}")]
    MalformedAccount(String),

    /// Voucher, parameters or channel table failed strict decoding.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Payer already holds the configured maximum of open channels.
    #[error("payer {payer} already has {limit} open channels")]
    TooManyChannels { payer: Address, limit: usize },

    /// Checked arithmetic would overflow.
    #[error("amount overflow")]
    Overflow,

    /// Freshly allocated channel id already present. Host uniqueness bug.
    #[error("channel id collision: payer {payer}, id {channel}")]
    ChannelIdCollision { payer: Address, channel: u64 },

    /// Escrow balance no longer matches the open channels. Host bug.
    #[error("escrow mismatch: broker holds {balance}, channels owe {owed}")]
    EscrowMismatch {
        balance: TokenAmount,
        owed: TokenAmount,
    },

    /// Underlying state access failed.
    #[error("state error: {0}")]
    State(StateError),
}

impl BrokerError {
    /// True for internal invariant violations, as opposed to user errors.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ChannelIdCollision { .. } | Self::EscrowMismatch { .. } | Self::State(_)
        )
    }

    /// Stable label for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::InvalidExpiry { .. } => "invalid_expiry",
            Self::InvalidVoucher(_) => "invalid_voucher",
            Self::InvalidTarget(_) => "invalid_target",
            Self::StaleVoucher { .. } => "stale_voucher",
            Self::ExceedsChannelAmount { .. } => "exceeds_channel_amount",
            Self::Unauthorized(_) => "unauthorized",
            Self::NoSuchChannel { .. } => "no_such_channel",
            Self::NotYetExpired { .. } => "not_yet_expired",
            Self::MalformedAccount(_) => "malformed_account",
            Self::DecodeError(_) => "decode_error",
            Self::TooManyChannels { .. } => "too_many_channels",
            Self::Overflow => "overflow",
            Self::ChannelIdCollision { .. } => "channel_id_collision",
            Self::EscrowMismatch { .. } => "escrow_mismatch",
            Self::State(_) => "state",
        }
    }
}

impl From<StateError> for BrokerError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::MalformedAccount(reason) => Self::MalformedAccount(reason),
            StateError::InsufficientFunds {
                required,
                available,
            } => Self::InsufficientFunds {
                required,
                available,
            },
            StateError::BalanceOverflow { .. } => Self::Overflow,
            other => Self::State(other),
        }
    }
}

impl From<bincode::Error> for BrokerError {
    fn from(err: bincode::Error) -> Self {
        Self::DecodeError(err.to_string())
    }
}

// =============================================================================
// DISPATCH ERRORS
// =============================================================================

/// Errors raised at the message boundary, before or around the state machine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Message nonce does not match the sender's account nonce.
    #[error("invalid nonce: expected {expected}, got {actual}")]
    InvalidNonce { expected: u64, actual: u64 },

    /// Sender's nonce reached its maximum; the account can send no more.
    #[error("nonce exhausted for {0}")]
    NonceExhausted(Address),

    /// Target address is not an installed payment broker.
    #[error("address {0} is not a payment broker")]
    NotABroker(Address),

    /// Method name is not one of the broker's operations.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// Address already holds state and cannot host a new broker.
    #[error("address {0} is already in use")]
    AddressInUse(Address),

    /// Plain transfers into escrow would break the escrow invariant.
    #[error("value cannot be sent directly to broker escrow {0}")]
    DirectEscrowDeposit(Address),

    /// Account or content store failure.
    #[error("store error: {0}")]
    Store(#[from] StateError),

    /// The broker rejected the call.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl DispatchError {
    /// Stable label for metrics and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidNonce { .. } => "invalid_nonce",
            Self::NonceExhausted(_) => "nonce_exhausted",
            Self::NotABroker(_) => "not_a_broker",
            Self::UnknownMethod(_) => "unknown_method",
            Self::AddressInUse(_) => "address_in_use",
            Self::DirectEscrowDeposit(_) => "direct_escrow_deposit",
            Self::Store(_) => "store",
            Self::Broker(err) => err.kind(),
        }
    }

    /// True when the failure points at a bug rather than a bad message.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Store(_) => true,
            Self::Broker(err) => err.is_fatal(),
            _ => false,
        }
    }
}
