//! # Payment-Channel Table
//!
//! The broker's private state: every payer's open channels, keyed by
//! channel id. Stored as one immutable blob behind the broker account's
//! `head`; each mutation produces a new blob and a new CID.
//!
//! Ordered maps keep the encoding deterministic, so two equal tables always
//! share a content address.

use pb_01_actor_state::{Address, BlockHeight, Cid, ContentStore, TokenAmount};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::codec;
use crate::domain::value_objects::{ChannelId, Condition};
use crate::errors::BrokerError;

/// Upper bound on a stored table blob. The table is written by the broker
/// itself, so this only guards against a corrupted store.
const MAX_TABLE_BYTES: u64 = 256 * 1024 * 1024;

/// An open payment channel.
///
/// Closed channels are removed from the table, so every `Channel` that can
/// be looked up is Open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Address entitled to redeem vouchers.
    pub target: Address,
    /// Funding ceiling.
    pub amount: TokenAmount,
    /// Highest cumulative amount redeemed so far. Never exceeds `amount`.
    pub amount_redeemed: TokenAmount,
    /// Height from which the payer may reclaim.
    pub eol: BlockHeight,
    /// Extra predicate every redemption must satisfy.
    pub conditions: Option<Condition>,
}

impl Channel {
    #[must_use]
    pub fn new(
        target: Address,
        amount: TokenAmount,
        eol: BlockHeight,
        conditions: Option<Condition>,
    ) -> Self {
        Self {
            target,
            amount,
            amount_redeemed: 0,
            eol,
            conditions,
        }
    }

    /// Escrow still owed to either party.
    #[must_use]
    pub fn remaining(&self) -> TokenAmount {
        self.amount.saturating_sub(self.amount_redeemed)
    }
}

/// One payer's channels plus the id counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerChannels {
    /// Next id to hand out. Kept even when `channels` empties.
    next_id: u64,
    channels: BTreeMap<ChannelId, Channel>,
}

impl PayerChannels {
    /// Open channels of this payer.
    #[must_use]
    pub fn channels(&self) -> &BTreeMap<ChannelId, Channel> {
        &self.channels
    }
}

/// Payer address → that payer's channels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTable {
    payers: BTreeMap<Address, PayerChannels>,
}

impl ChannelTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, payer: &Address, id: ChannelId) -> Option<&Channel> {
        self.payers.get(payer)?.channels.get(&id)
    }

    pub fn get_mut(&mut self, payer: &Address, id: ChannelId) -> Option<&mut Channel> {
        self.payers.get_mut(payer)?.channels.get_mut(&id)
    }

    /// Looks up a channel, failing with `NoSuchChannel`.
    pub fn require(&self, payer: &Address, id: ChannelId) -> Result<&Channel, BrokerError> {
        self.get(payer, id).ok_or(BrokerError::NoSuchChannel {
            payer: *payer,
            channel: id.value(),
        })
    }

    /// Inserts `channel` under a freshly allocated id.
    ///
    /// A collision means the counter was rewound underneath us; that is an
    /// internal fault, not something a caller can fix.
    pub fn open(
        &mut self,
        payer: Address,
        channel: Channel,
        max_channels: usize,
    ) -> Result<ChannelId, BrokerError> {
        let entry = self.payers.entry(payer).or_default();
        if entry.channels.len() >= max_channels {
            return Err(BrokerError::TooManyChannels {
                payer,
                limit: max_channels,
            });
        }

        let id = ChannelId::new(entry.next_id);
        if entry.channels.contains_key(&id) {
            return Err(BrokerError::ChannelIdCollision {
                payer,
                channel: id.value(),
            });
        }
        entry.next_id = entry.next_id.checked_add(1).ok_or(BrokerError::Overflow)?;
        entry.channels.insert(id, channel);
        Ok(id)
    }

    /// Removes a channel, closing it for good.
    pub fn remove(&mut self, payer: &Address, id: ChannelId) -> Option<Channel> {
        self.payers.get_mut(payer)?.channels.remove(&id)
    }

    /// Snapshot of a payer's open channels. Empty for unknown payers.
    #[must_use]
    pub fn channels_of(&self, payer: &Address) -> BTreeMap<ChannelId, Channel> {
        self.payers
            .get(payer)
            .map(|p| p.channels.clone())
            .unwrap_or_default()
    }

    /// Iterates every open channel as `(payer, id, channel)`.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &ChannelId, &Channel)> {
        self.payers.iter().flat_map(|(payer, entry)| {
            entry
                .channels
                .iter()
                .map(move |(id, channel)| (payer, id, channel))
        })
    }

    #[must_use]
    pub fn open_channel_count(&self) -> usize {
        self.payers.values().map(|p| p.channels.len()).sum()
    }

    /// Total escrow owed across all open channels, `None` on overflow.
    #[must_use]
    pub fn total_owed(&self) -> Option<TokenAmount> {
        self.iter()
            .try_fold(0u128, |acc, (_, _, channel)| acc.checked_add(channel.remaining()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, BrokerError> {
        codec::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BrokerError> {
        codec::decode(bytes, MAX_TABLE_BYTES)
    }

    /// Loads the table stored at `head`.
    pub fn load(store: &dyn ContentStore, head: &Cid) -> Result<Self, BrokerError> {
        let bytes = store.get_required(head)?;
        let table = Self::decode(&bytes)?;
        debug!(%head, channels = table.open_channel_count(), "loaded channel table");
        Ok(table)
    }

    /// Writes the table as a new blob and returns its address.
    pub fn save(&self, store: &dyn ContentStore) -> Result<Cid, BrokerError> {
        let head = store.put(self.encode()?)?;
        debug!(%head, channels = self.open_channel_count(), "stored channel table");
        Ok(head)
    }
}
