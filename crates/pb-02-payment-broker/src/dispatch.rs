//! # Message Dispatch
//!
//! Boundary between the host and the broker state machine. One message is
//! applied at a time:
//!
//! 1. check the sender's nonce
//! 2. check the target is an installed broker
//! 3. load the channel table from the broker's `head`
//! 4. run the operation on working copies at the current block height
//! 5. check escrow conservation, store the new table, bump the sender's
//!    nonce and commit every touched account in one batch
//!
//! Any failure before step 5 completes leaves the stores untouched,
//! including the nonce.

use parking_lot::Mutex;
use pb_01_actor_state::{Account, AccountStore, Address, Cid, ContentStore, TokenAmount};
use pb_telemetry::{record_operation, record_rejection, HistogramTimer, BROKER_APPLY_DURATION};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::config::BrokerConfig;
use crate::domain::channel::{Channel, ChannelTable};
use crate::domain::invariants::{check_escrow_invariant, check_redeemed_within_amount};
use crate::domain::state_machine::{draft_voucher, list_channels, BrokerContext, Ledger, PaymentBroker};
use crate::domain::value_objects::ChannelId;
use crate::domain::voucher::VoucherBody;
use crate::errors::{BrokerError, DispatchError};
use crate::ports::inbound::{BrokerCall, CallResult, Message, Method, PaymentBrokerApi, Receipt};
use crate::ports::outbound::{ChainClock, ConditionChecker, SignatureVerifier};

/// Derivation context for actor code identities.
pub const ACTOR_CODE_CONTEXT: &str = "payment-broker 2024 actor code";

/// Code identity of the payment broker actor.
#[must_use]
pub fn broker_code() -> Cid {
    Cid::of(ACTOR_CODE_CONTEXT, b"paymentbroker")
}

/// Collaborators the dispatcher drives.
#[derive(Clone)]
pub struct BrokerPorts {
    pub accounts: Arc<dyn AccountStore>,
    pub content: Arc<dyn ContentStore>,
    pub clock: Arc<dyn ChainClock>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub conditions: Arc<dyn ConditionChecker>,
}

/// Applies messages to broker actors.
pub struct Dispatcher {
    config: BrokerConfig,
    ports: BrokerPorts,
    /// Serializes every state-changing entry point.
    apply_lock: Mutex<()>,
}

impl Dispatcher {
    pub fn new(config: BrokerConfig, ports: BrokerPorts) -> Self {
        Self {
            config,
            ports,
            apply_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Instantiates a broker actor at `address` with an empty channel table.
    ///
    /// The address must not hold anything yet.
    #[instrument(skip(self))]
    pub fn install_broker(&self, address: Address) -> Result<Cid, DispatchError> {
        let _guard = self.apply_lock.lock();

        let existing = self.ports.accounts.load_or_default(&address)?;
        if !existing.is_empty() {
            warn!("address already in use");
            return Err(DispatchError::AddressInUse(address));
        }

        let head = ChannelTable::new().save(self.ports.content.as_ref())?;
        let mut account = Account::new(broker_code(), 0);
        account.head = Some(head);
        self.ports.accounts.commit(vec![(address, account)])?;

        info!(%head, "broker installed");
        Ok(head)
    }

    /// Plain value transfer between non-broker accounts. Creates the
    /// recipient on first use.
    #[instrument(skip(self))]
    pub fn transfer(
        &self,
        from: Address,
        to: Address,
        nonce: u64,
        amount: TokenAmount,
    ) -> Result<(), DispatchError> {
        let _timer = HistogramTimer::new(&BROKER_APPLY_DURATION);
        let _guard = self.apply_lock.lock();

        let result = self.transfer_locked(from, to, nonce, amount);
        match &result {
            Ok(()) => {
                record_operation("transfer");
                info!(%amount, "transfer committed");
            }
            Err(err) => Self::log_rejection("transfer", err),
        }
        result
    }

    fn transfer_locked(
        &self,
        from: Address,
        to: Address,
        nonce: u64,
        amount: TokenAmount,
    ) -> Result<(), DispatchError> {
        let code = broker_code();
        let mut ledger = Ledger::new(self.ports.accounts.as_ref());

        let sender = ledger.account(&from)?;
        Self::check_nonce(&from, sender, nonce)?;
        if sender.has_code(&code) {
            return Err(BrokerError::Unauthorized(from).into());
        }
        if ledger.account(&to)?.has_code(&code) {
            return Err(DispatchError::DirectEscrowDeposit(to));
        }

        ledger.transfer(&from, &to, amount)?;
        ledger.account(&from)?.increment_nonce();
        self.ports.accounts.commit(ledger.into_batch())?;
        Ok(())
    }

    fn apply_locked(&self, message: &Message) -> Result<Receipt, DispatchError> {
        let code = broker_code();
        let content = self.ports.content.as_ref();
        let mut ledger = Ledger::new(self.ports.accounts.as_ref());

        let sender = ledger.account(&message.from)?;
        Self::check_nonce(&message.from, sender, message.nonce)?;
        // The broker never sends; it would be paying itself out of escrow
        if sender.has_code(&code) {
            return Err(BrokerError::Unauthorized(message.from).into());
        }

        let broker_account = ledger.account(&message.to)?;
        if !broker_account.has_code(&code) {
            return Err(DispatchError::NotABroker(message.to));
        }
        let table = match broker_account.head {
            Some(head) => ChannelTable::load(content, &head)?,
            None => ChannelTable::new(),
        };

        let ctx = BrokerContext {
            broker: message.to,
            caller: message.from,
            height: self.ports.clock.block_height(),
            verifier: self.ports.verifier.as_ref(),
            conditions: self.ports.conditions.as_ref(),
            max_channels_per_payer: self.config.max_channels_per_payer,
        };

        let mut broker = PaymentBroker::new(ledger, table);
        let result = match &message.call {
            BrokerCall::Create(p) => CallResult::ChannelCreated(broker.create(
                &ctx,
                p.target,
                p.eol,
                p.amount,
                p.conditions.clone(),
            )?),
            BrokerCall::Redeem(voucher) => {
                broker.redeem(&ctx, voucher)?;
                CallResult::Done
            }
            BrokerCall::Reclaim(p) => {
                broker.reclaim(&ctx, p.channel_id)?;
                CallResult::Done
            }
            BrokerCall::Close(p) => {
                broker.close(&ctx, p.payer, p.channel_id, p.voucher.as_ref())?;
                CallResult::Done
            }
            BrokerCall::Extend(p) => {
                broker.extend(&ctx, p.channel_id, p.eol, p.amount)?;
                CallResult::Done
            }
        };

        let (mut ledger, table) = broker.into_parts();
        check_escrow_invariant(ledger.balance(&message.to)?, &table)?;
        debug_assert!(check_redeemed_within_amount(&table));

        let head = table.save(content)?;
        ledger.account(&message.to)?.head = Some(head);
        ledger.account(&message.from)?.increment_nonce();
        self.ports.accounts.commit(ledger.into_batch())?;

        Ok(Receipt {
            nonce: message.nonce,
            result,
            head,
        })
    }

    /// Loads the table of the broker at `address`.
    fn broker_table(&self, address: &Address) -> Result<ChannelTable, DispatchError> {
        let account = self.ports.accounts.load_or_default(address)?;
        if !account.has_code(&broker_code()) {
            return Err(DispatchError::NotABroker(*address));
        }
        match account.head {
            Some(head) => Ok(ChannelTable::load(self.ports.content.as_ref(), &head)?),
            None => Ok(ChannelTable::new()),
        }
    }

    fn check_nonce(from: &Address, sender: &Account, nonce: u64) -> Result<(), DispatchError> {
        if nonce != sender.nonce {
            return Err(DispatchError::InvalidNonce {
                expected: sender.nonce,
                actual: nonce,
            });
        }
        // Accepting it would leave the nonce unable to advance past this message
        if sender.nonce == u64::MAX {
            return Err(DispatchError::NonceExhausted(*from));
        }
        Ok(())
    }

    fn log_rejection(method: &str, err: &DispatchError) {
        record_rejection(method, err.kind());
        if err.is_fatal() {
            error!(error = %err, reason = err.kind(), "invariant violated, message dropped");
        } else {
            warn!(error = %err, reason = err.kind(), "message rejected");
        }
    }
}

impl PaymentBrokerApi for Dispatcher {
    #[instrument(
        skip(self, message),
        fields(from = %message.from, to = %message.to, nonce = message.nonce, method = %message.call.method())
    )]
    fn apply(&self, message: Message) -> Result<Receipt, DispatchError> {
        let method = message.call.method();
        let _timer = HistogramTimer::new(&BROKER_APPLY_DURATION);
        let _guard = self.apply_lock.lock();

        let result = self.apply_locked(&message);
        match &result {
            Ok(receipt) => {
                record_operation(method.as_str());
                info!(head = %receipt.head, result = ?receipt.result, "message applied");
            }
            Err(err) => Self::log_rejection(method.as_str(), err),
        }
        result
    }

    #[instrument(skip(self, params), fields(params_len = params.len()))]
    fn apply_raw(
        &self,
        from: Address,
        to: Address,
        nonce: u64,
        method: &str,
        params: &[u8],
    ) -> Result<Receipt, DispatchError> {
        let parsed = match method.parse::<Method>() {
            Ok(parsed) => parsed,
            Err(err) => {
                Self::log_rejection("unknown", &err);
                return Err(err);
            }
        };
        let call = match BrokerCall::decode(parsed, params, &self.config) {
            Ok(call) => call,
            Err(err) => {
                let err = DispatchError::from(err);
                Self::log_rejection(parsed.as_str(), &err);
                return Err(err);
            }
        };

        self.apply(Message {
            from,
            to,
            nonce,
            call,
        })
    }

    fn ls(
        &self,
        broker: &Address,
        payer: &Address,
    ) -> Result<BTreeMap<ChannelId, Channel>, DispatchError> {
        let table = self.broker_table(broker)?;
        Ok(list_channels(&table, payer))
    }

    fn voucher(
        &self,
        broker: &Address,
        payer: Address,
        channel_id: ChannelId,
        amount: TokenAmount,
    ) -> Result<VoucherBody, DispatchError> {
        let table = self.broker_table(broker)?;
        Ok(draft_voucher(&table, *broker, payer, channel_id, amount)?)
    }

    fn account(&self, address: &Address) -> Result<Account, DispatchError> {
        Ok(self.ports.accounts.load_or_default(address)?)
    }
}
