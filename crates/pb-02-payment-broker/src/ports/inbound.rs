//! # Driving Ports (API - Inbound)
//!
//! The message surface of the broker actor. Hosts either build a typed
//! [`BrokerCall`] directly or hand over a method name and encoded
//! parameters, which go through [`BrokerCall::decode`].

use pb_01_actor_state::{Account, Address, BlockHeight, Cid, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::BrokerConfig;
use crate::domain::channel::Channel;
use crate::domain::codec;
use crate::domain::value_objects::{ChannelId, Condition};
use crate::domain::voucher::{Voucher, VoucherBody};
use crate::errors::{BrokerError, DispatchError};

// =============================================================================
// METHODS
// =============================================================================

/// The closed set of broker methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Create,
    Redeem,
    Reclaim,
    Close,
    Extend,
}

impl Method {
    pub const ALL: [Method; 5] = [
        Method::Create,
        Method::Redeem,
        Method::Reclaim,
        Method::Close,
        Method::Extend,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Create => "createChannel",
            Method::Redeem => "redeem",
            Method::Reclaim => "reclaim",
            Method::Close => "close",
            Method::Extend => "extend",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = DispatchError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == name)
            .ok_or_else(|| DispatchError::UnknownMethod(name.to_string()))
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateParams {
    pub target: Address,
    pub eol: BlockHeight,
    pub amount: TokenAmount,
    pub conditions: Option<Condition>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimParams {
    pub channel_id: ChannelId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseParams {
    pub payer: Address,
    pub channel_id: ChannelId,
    pub voucher: Option<Voucher>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendParams {
    pub channel_id: ChannelId,
    pub eol: BlockHeight,
    /// Extra funding added on top of the current amount.
    pub amount: TokenAmount,
}

/// A broker call with typed parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BrokerCall {
    Create(CreateParams),
    Redeem(Voucher),
    Reclaim(ReclaimParams),
    Close(CloseParams),
    Extend(ExtendParams),
}

impl BrokerCall {
    #[must_use]
    pub fn method(&self) -> Method {
        match self {
            BrokerCall::Create(_) => Method::Create,
            BrokerCall::Redeem(_) => Method::Redeem,
            BrokerCall::Reclaim(_) => Method::Reclaim,
            BrokerCall::Close(_) => Method::Close,
            BrokerCall::Extend(_) => Method::Extend,
        }
    }

    /// Strictly decodes raw parameters for `method`.
    ///
    /// Vouchers are bounded by `max_voucher_bytes`; everything else by
    /// `max_params_bytes`.
    pub fn decode(method: Method, params: &[u8], config: &BrokerConfig) -> Result<Self, BrokerError> {
        let limit = config.max_params_bytes;
        let call = match method {
            Method::Create => BrokerCall::Create(codec::decode(params, limit)?),
            Method::Redeem => BrokerCall::Redeem(Voucher::decode(params, config.max_voucher_bytes)?),
            Method::Reclaim => BrokerCall::Reclaim(codec::decode(params, limit)?),
            Method::Close => {
                let close: CloseParams = codec::decode(params, limit)?;
                if let Some(voucher) = &close.voucher {
                    voucher.check_shape()?;
                }
                BrokerCall::Close(close)
            }
            Method::Extend => BrokerCall::Extend(codec::decode(params, limit)?),
        };
        Ok(call)
    }

    /// Canonical parameter bytes, the inverse of [`BrokerCall::decode`].
    pub fn encode_params(&self) -> Result<Vec<u8>, BrokerError> {
        match self {
            BrokerCall::Create(params) => codec::encode(params),
            BrokerCall::Redeem(voucher) => voucher.encode(),
            BrokerCall::Reclaim(params) => codec::encode(params),
            BrokerCall::Close(params) => codec::encode(params),
            BrokerCall::Extend(params) => codec::encode(params),
        }
    }
}

// =============================================================================
// MESSAGES AND RECEIPTS
// =============================================================================

/// A message addressed to a broker actor.
///
/// `from` is taken as authenticated; checking the envelope signature is the
/// host's job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub nonce: u64,
    pub call: BrokerCall,
}

/// What a successful call returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallResult {
    ChannelCreated(ChannelId),
    Done,
}

/// Proof of a committed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Nonce the message was accepted under.
    pub nonce: u64,
    pub result: CallResult,
    /// Broker state root after the message.
    pub head: Cid,
}

// =============================================================================
// API
// =============================================================================

/// Primary API of the payment broker.
pub trait PaymentBrokerApi {
    /// Applies one message atomically.
    fn apply(&self, message: Message) -> Result<Receipt, DispatchError>;

    /// Applies a message given as a wire method name and encoded params.
    fn apply_raw(
        &self,
        from: Address,
        to: Address,
        nonce: u64,
        method: &str,
        params: &[u8],
    ) -> Result<Receipt, DispatchError>;

    /// Open channels `payer` holds on `broker`.
    fn ls(&self, broker: &Address, payer: &Address)
        -> Result<BTreeMap<ChannelId, Channel>, DispatchError>;

    /// Unsigned voucher body for `amount` on an open channel.
    fn voucher(
        &self,
        broker: &Address,
        payer: Address,
        channel_id: ChannelId,
        amount: TokenAmount,
    ) -> Result<VoucherBody, DispatchError>;

    /// Current state of any account.
    fn account(&self, address: &Address) -> Result<Account, DispatchError>;
}
