//! # Broker State Machine
//!
//! ```text
//!   Create ──► Open ──(Redeem | Extend)──► Open
//!                │
//!                └──(Close | Reclaim)──► Closed (removed from the table)
//! ```
//!
//! Operations run against a [`PaymentBroker`] holding working copies of the
//! touched accounts and of the channel table. Nothing reaches the stores
//! until the caller takes the parts back out with
//! [`PaymentBroker::into_parts`] and commits them; dropping the broker after
//! an error discards every partial change.

use pb_01_actor_state::{Account, AccountStore, Address, BlockHeight, TokenAmount};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::channel::{Channel, ChannelTable};
use crate::domain::value_objects::{ChannelId, Condition};
use crate::domain::voucher::{Voucher, VoucherBody};
use crate::errors::BrokerError;
use crate::ports::outbound::{ConditionChecker, SignatureVerifier};

// =============================================================================
// LEDGER (working copies of accounts)
// =============================================================================

/// Copy-on-read overlay over an [`AccountStore`].
///
/// Accounts are loaded on first touch and mutated in place; the store is
/// never written.
pub struct Ledger<'s> {
    store: &'s dyn AccountStore,
    touched: BTreeMap<Address, Account>,
}

impl<'s> Ledger<'s> {
    pub fn new(store: &'s dyn AccountStore) -> Self {
        Self {
            store,
            touched: BTreeMap::new(),
        }
    }

    /// Working copy of `address`, loading it if untouched. Unknown addresses
    /// start out empty.
    pub fn account(&mut self, address: &Address) -> Result<&mut Account, BrokerError> {
        match self.touched.entry(*address) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let account = self.store.load_or_default(address)?;
                Ok(entry.insert(account))
            }
        }
    }

    /// True if `address` is governed by actor code. Does not touch the
    /// account.
    pub fn is_actor(&self, address: &Address) -> Result<bool, BrokerError> {
        let code = match self.touched.get(address) {
            Some(account) => account.code,
            None => self.store.load_or_default(address)?.code,
        };
        Ok(code.is_some())
    }

    pub fn balance(&mut self, address: &Address) -> Result<TokenAmount, BrokerError> {
        Ok(self.account(address)?.balance)
    }

    /// Moves `amount` between two accounts. Both are touched even when the
    /// amount is zero.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), BrokerError> {
        self.account(from)?.debit(amount)?;
        self.account(to)?.credit(amount)?;
        Ok(())
    }

    /// Every touched account, ready for an atomic commit.
    #[must_use]
    pub fn into_batch(self) -> Vec<(Address, Account)> {
        self.touched.into_iter().collect()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything an operation needs besides its arguments.
#[derive(Clone, Copy)]
pub struct BrokerContext<'a> {
    /// Address of the broker actor, which holds the escrow.
    pub broker: Address,
    /// Authenticated sender of the message.
    pub caller: Address,
    pub height: BlockHeight,
    pub verifier: &'a dyn SignatureVerifier,
    pub conditions: &'a dyn ConditionChecker,
    pub max_channels_per_payer: usize,
}

// =============================================================================
// PAYMENT BROKER
// =============================================================================

/// Broker operations over one message's working state.
pub struct PaymentBroker<'s> {
    ledger: Ledger<'s>,
    table: ChannelTable,
}

impl<'s> PaymentBroker<'s> {
    pub fn new(ledger: Ledger<'s>, table: ChannelTable) -> Self {
        Self { ledger, table }
    }

    #[must_use]
    pub fn table(&self) -> &ChannelTable {
        &self.table
    }

    pub fn into_parts(self) -> (Ledger<'s>, ChannelTable) {
        (self.ledger, self.table)
    }

    /// Opens a channel funded by the caller and returns its id.
    ///
    /// The target must be a plain account. Paying an actor out of escrow
    /// would credit it with funds no channel accounts for.
    pub fn create(
        &mut self,
        ctx: &BrokerContext<'_>,
        target: Address,
        eol: BlockHeight,
        amount: TokenAmount,
        conditions: Option<Condition>,
    ) -> Result<ChannelId, BrokerError> {
        let payer = ctx.caller;
        if target == ctx.broker || self.ledger.is_actor(&target)? {
            return Err(BrokerError::InvalidTarget(target));
        }
        let available = self.ledger.balance(&payer)?;
        if available < amount {
            return Err(BrokerError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        if eol <= ctx.height {
            return Err(BrokerError::InvalidExpiry {
                eol,
                floor: ctx.height,
            });
        }

        let channel = Channel::new(target, amount, eol, conditions);
        let id = self.table.open(payer, channel, ctx.max_channels_per_payer)?;
        self.ledger.transfer(&payer, &ctx.broker, amount)?;
        Ok(id)
    }

    /// Pays the caller the difference between the voucher and what the
    /// channel has already paid out.
    pub fn redeem(&mut self, ctx: &BrokerContext<'_>, voucher: &Voucher) -> Result<(), BrokerError> {
        let payer = voucher.payer();
        let id = voucher.channel_id();
        let channel = self
            .table
            .get(&payer, id)
            .ok_or_else(|| BrokerError::InvalidVoucher(format!("unknown channel {id}")))?;
        if ctx.caller != channel.target {
            return Err(BrokerError::Unauthorized(ctx.caller));
        }
        self.settle(ctx, &payer, id, voucher)
    }

    /// Returns the unredeemed escrow of an expired channel to its payer.
    pub fn reclaim(&mut self, ctx: &BrokerContext<'_>, id: ChannelId) -> Result<(), BrokerError> {
        let payer = ctx.caller;
        let channel = self.table.require(&payer, id)?;
        if ctx.height < channel.eol {
            return Err(BrokerError::NotYetExpired {
                eol: channel.eol,
                height: ctx.height,
            });
        }
        self.release(ctx, &payer, id)
    }

    /// Settles an optional final voucher, refunds the rest and closes the
    /// channel regardless of EOL.
    ///
    /// The payer may close with or without a voucher. The target may close
    /// only by presenting one.
    pub fn close(
        &mut self,
        ctx: &BrokerContext<'_>,
        payer: Address,
        id: ChannelId,
        voucher: Option<&Voucher>,
    ) -> Result<(), BrokerError> {
        let channel = self.table.require(&payer, id)?;
        let caller_is_target = ctx.caller == channel.target;
        if ctx.caller != payer && !(caller_is_target && voucher.is_some()) {
            return Err(BrokerError::Unauthorized(ctx.caller));
        }

        if let Some(voucher) = voucher {
            if voucher.payer() != payer || voucher.channel_id() != id {
                return Err(BrokerError::InvalidVoucher(format!(
                    "voucher names channel {} of {}, not {id} of {payer}",
                    voucher.channel_id(),
                    voucher.payer()
                )));
            }
            self.settle(ctx, &payer, id, voucher)?;
        }
        self.release(ctx, &payer, id)
    }

    /// Raises a channel's funding and pushes its EOL out.
    pub fn extend(
        &mut self,
        ctx: &BrokerContext<'_>,
        id: ChannelId,
        eol: BlockHeight,
        amount: TokenAmount,
    ) -> Result<(), BrokerError> {
        let payer = ctx.caller;
        let channel = self.table.require(&payer, id)?;
        if eol <= channel.eol {
            return Err(BrokerError::InvalidExpiry {
                eol,
                floor: channel.eol,
            });
        }
        let new_amount = channel
            .amount
            .checked_add(amount)
            .ok_or(BrokerError::Overflow)?;
        let available = self.ledger.balance(&payer)?;
        if amount > available {
            return Err(BrokerError::InsufficientFunds {
                required: amount,
                available,
            });
        }

        self.ledger.transfer(&payer, &ctx.broker, amount)?;
        let channel = self
            .table
            .get_mut(&payer, id)
            .ok_or(BrokerError::NoSuchChannel {
                payer,
                channel: id.value(),
            })?;
        channel.amount = new_amount;
        channel.eol = eol;
        Ok(())
    }

    /// Validates `voucher` against channel `(payer, id)` and pays its
    /// advance to the channel target.
    fn settle(
        &mut self,
        ctx: &BrokerContext<'_>,
        payer: &Address,
        id: ChannelId,
        voucher: &Voucher,
    ) -> Result<(), BrokerError> {
        let channel = self.table.require(payer, id)?;
        let target = channel.target;

        if voucher.broker() != ctx.broker {
            return Err(BrokerError::InvalidVoucher(format!(
                "issued for broker {}",
                voucher.broker()
            )));
        }
        if !voucher.verify(payer, ctx.verifier) {
            return Err(BrokerError::InvalidVoucher("bad signature".into()));
        }
        if !voucher.in_window(ctx.height) {
            return Err(BrokerError::InvalidVoucher(format!(
                "not valid at height {}",
                ctx.height
            )));
        }
        let conditions = channel.conditions.iter().chain(voucher.body.condition.iter());
        for condition in conditions {
            if !ctx.conditions.is_satisfied(condition, &target, ctx.height) {
                return Err(BrokerError::InvalidVoucher(format!(
                    "condition {}.{} not satisfied",
                    condition.to, condition.method
                )));
            }
        }
        if !voucher.is_cumulative_advance(channel) {
            return Err(BrokerError::StaleVoucher {
                amount: voucher.amount(),
                redeemed: channel.amount_redeemed,
            });
        }
        if voucher.amount() > channel.amount {
            return Err(BrokerError::ExceedsChannelAmount {
                amount: voucher.amount(),
                channel_amount: channel.amount,
            });
        }

        // An actor may have been installed at the target after the channel opened
        if self.ledger.is_actor(&target)? {
            return Err(BrokerError::InvalidTarget(target));
        }

        let delta = voucher.amount() - channel.amount_redeemed;
        self.ledger.transfer(&ctx.broker, &target, delta)?;
        let channel = self
            .table
            .get_mut(payer, id)
            .ok_or(BrokerError::NoSuchChannel {
                payer: *payer,
                channel: id.value(),
            })?;
        channel.amount_redeemed = voucher.amount();
        Ok(())
    }

    /// Refunds what the channel still holds to its payer and removes it.
    fn release(
        &mut self,
        ctx: &BrokerContext<'_>,
        payer: &Address,
        id: ChannelId,
    ) -> Result<(), BrokerError> {
        let channel = self
            .table
            .remove(payer, id)
            .ok_or(BrokerError::NoSuchChannel {
                payer: *payer,
                channel: id.value(),
            })?;
        self.ledger.transfer(&ctx.broker, payer, channel.remaining())
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// Open channels of `payer`.
#[must_use]
pub fn list_channels(table: &ChannelTable, payer: &Address) -> BTreeMap<ChannelId, Channel> {
    table.channels_of(payer)
}

/// Unsigned voucher body for `amount` on an open channel, ready for the
/// payer to sign.
pub fn draft_voucher(
    table: &ChannelTable,
    broker: Address,
    payer: Address,
    id: ChannelId,
    amount: TokenAmount,
) -> Result<VoucherBody, BrokerError> {
    let channel = table.require(&payer, id)?;
    if amount > channel.amount {
        return Err(BrokerError::ExceedsChannelAmount {
            amount,
            channel_amount: channel.amount,
        });
    }
    Ok(VoucherBody::new(broker, id, payer, amount))
}
