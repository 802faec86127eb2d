//! # Vouchers
//!
//! A voucher is the payer's signed promise that the channel target may draw
//! up to `amount` in total. Amounts are cumulative: each voucher supersedes
//! the previous one, and the broker pays out only the difference to what was
//! already redeemed.
//!
//! ## Wire Form
//!
//! ```text
//! Voucher = canonical(VoucherBody) ++ u64 len ++ signature[64]
//! signature = ed25519(payer, derive_key(VOUCHER_SIGNING_CONTEXT, canonical(VoucherBody)))
//! ```
//!
//! The body names the broker it was issued on, so the signature never
//! carries over to a same-numbered channel on another broker.
//!
//! The hex string form is what travels off-chain between payer and target.

use pb_01_actor_state::{Address, BlockHeight, TokenAmount};
use serde::{Deserialize, Serialize};
use shared_crypto::{content_digest, Ed25519KeyPair, SIGNATURE_LEN};

use crate::domain::channel::Channel;
use crate::domain::codec;
use crate::domain::value_objects::{ChannelId, Condition};
use crate::errors::BrokerError;
use crate::ports::outbound::SignatureVerifier;

/// Derivation context for the digest a payer signs.
pub const VOUCHER_SIGNING_CONTEXT: &str = "payment-broker 2024 voucher signature";

/// Every signed field of a voucher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherBody {
    /// Broker actor the channel lives on. Channel ids are only unique per
    /// broker, so a voucher is bound to one.
    pub broker: Address,
    pub channel_id: ChannelId,
    pub payer: Address,
    /// Cumulative amount authorized, not a delta.
    pub amount: TokenAmount,
    /// First height at which the voucher may be redeemed.
    pub valid_at: Option<BlockHeight>,
    /// Last height at which the voucher may be redeemed.
    pub valid_until: Option<BlockHeight>,
    pub condition: Option<Condition>,
}

impl VoucherBody {
    #[must_use]
    pub fn new(
        broker: Address,
        channel_id: ChannelId,
        payer: Address,
        amount: TokenAmount,
    ) -> Self {
        Self {
            broker,
            channel_id,
            payer,
            amount,
            valid_at: None,
            valid_until: None,
            condition: None,
        }
    }

    /// Builder method to restrict redemption to `[valid_at, valid_until]`.
    #[must_use]
    pub fn with_window(
        mut self,
        valid_at: Option<BlockHeight>,
        valid_until: Option<BlockHeight>,
    ) -> Self {
        self.valid_at = valid_at;
        self.valid_until = valid_until;
        self
    }

    /// Builder method to attach a redemption condition.
    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Digest the payer signs.
    pub fn signing_digest(&self) -> Result<[u8; 32], BrokerError> {
        Ok(content_digest(VOUCHER_SIGNING_CONTEXT, &codec::encode(self)?))
    }

    /// Signs the body with the payer's key.
    ///
    /// Does not check that `keypair` controls `payer`; a mismatched key
    /// simply yields a voucher that never verifies.
    pub fn sign(self, keypair: &Ed25519KeyPair) -> Result<Voucher, BrokerError> {
        let signature = keypair.sign(&self.signing_digest()?);
        Ok(Voucher {
            body: self,
            signature: signature.as_bytes().to_vec(),
        })
    }
}

/// A signed voucher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub body: VoucherBody,
    pub signature: Vec<u8>,
}

impl Voucher {
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.body.channel_id
    }

    #[must_use]
    pub fn broker(&self) -> Address {
        self.body.broker
    }

    #[must_use]
    pub fn payer(&self) -> Address {
        self.body.payer
    }

    #[must_use]
    pub fn amount(&self) -> TokenAmount {
        self.body.amount
    }

    pub fn encode(&self) -> Result<Vec<u8>, BrokerError> {
        codec::encode(self)
    }

    /// Strict decode: canonical encoding, nothing trailing, at most `limit`
    /// bytes, and a signature of the right length.
    pub fn decode(bytes: &[u8], limit: u64) -> Result<Self, BrokerError> {
        let voucher: Self = codec::decode(bytes, limit)?;
        voucher.check_shape()?;
        Ok(voucher)
    }

    /// Rejects structurally impossible vouchers that still decoded.
    pub fn check_shape(&self) -> Result<(), BrokerError> {
        if self.signature.len() != SIGNATURE_LEN {
            return Err(BrokerError::DecodeError(format!(
                "voucher signature is {} bytes, expected {SIGNATURE_LEN}",
                self.signature.len()
            )));
        }
        Ok(())
    }

    /// Opaque string form handed from payer to target.
    pub fn to_hex(&self) -> Result<String, BrokerError> {
        Ok(hex::encode(self.encode()?))
    }

    pub fn from_hex(text: &str, limit: u64) -> Result<Self, BrokerError> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| BrokerError::DecodeError(format!("voucher hex: {e}")))?;
        Self::decode(&bytes, limit)
    }

    /// True only if the voucher names `expected_payer` and carries that
    /// payer's signature over every other field. Never errors.
    #[must_use]
    pub fn verify(&self, expected_payer: &Address, verifier: &dyn SignatureVerifier) -> bool {
        if self.body.payer != *expected_payer || self.signature.len() != SIGNATURE_LEN {
            return false;
        }
        match self.body.signing_digest() {
            Ok(digest) => verifier.verify(&digest, &self.signature, expected_payer),
            Err(_) => false,
        }
    }

    /// True if redeeming would move the channel forward.
    #[must_use]
    pub fn is_cumulative_advance(&self, channel: &Channel) -> bool {
        self.body.amount > channel.amount_redeemed
    }

    /// True if `height` falls inside the validity window. Missing bounds
    /// are open-ended.
    #[must_use]
    pub fn in_window(&self, height: BlockHeight) -> bool {
        let after_start = self.body.valid_at.map_or(true, |at| height >= at);
        let before_end = self.body.valid_until.map_or(true, |until| height <= until);
        after_start && before_end
    }
}
