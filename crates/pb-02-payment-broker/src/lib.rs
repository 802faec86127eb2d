//! # pb-02-payment-broker
//!
//! On-chain payment-channel broker. Two parties transact off-chain through
//! a funded channel and settle on-chain only when a channel is created,
//! redeemed against, extended or closed.
//!
//! ## Role in System
//!
//! - **Escrow**: the broker actor's balance holds every open channel's
//!   unredeemed funds
//! - **Vouchers**: signed, cumulative payment promises validated purely from
//!   data the counterparties submit
//! - **Dispatch**: nonce-checked, atomic application of one message at a
//!   time on top of the `pb-01-actor-state` account model
//!
//! ```text
//!  payer ──createChannel──► broker escrow ──redeem(voucher)──► target
//!    ▲                            │
//!    └────reclaim / close─────────┘
//! ```
//!
//! ## Invariants
//!
//! - Broker balance equals the sum of `amount - amount_redeemed` over open
//!   channels after every committed message
//! - `amount_redeemed` only grows and never exceeds `amount`
//! - A rejected message commits nothing, not even its nonce
//! - Channel ids come from a per-payer counter and are never reused
//!
//! ## Usage
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::new(BrokerConfig::from_env(), ports);
//! dispatcher.install_broker(broker)?;
//! let receipt = dispatcher.apply(Message {
//!     from: payer,
//!     to: broker,
//!     nonce: 0,
//!     call: BrokerCall::Create(CreateParams { target, eol: 100, amount: 1000, conditions: None }),
//! })?;
//! ```

pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod ports;

pub use adapters::{AllowListConditions, KeyDirectory, ManualClock, RejectAllConditions};
pub use config::{BrokerConfig, ConfigError};
pub use dispatch::{broker_code, BrokerPorts, Dispatcher, ACTOR_CODE_CONTEXT};
pub use domain::{
    check_escrow_invariant, draft_voucher, list_channels, BrokerContext, Channel, ChannelId,
    ChannelTable, Condition, Ledger, PaymentBroker, Voucher, VoucherBody,
    VOUCHER_SIGNING_CONTEXT,
};
pub use errors::{BrokerError, DispatchError};
pub use ports::{
    BrokerCall, CallResult, ChainClock, CloseParams, ConditionChecker, CreateParams,
    ExtendParams, Message, Method, PaymentBrokerApi, Receipt, ReclaimParams, SignatureVerifier,
};
