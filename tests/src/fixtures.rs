//! Shared test fixtures: an in-memory chain with one installed broker.

use pb_01_actor_state::{Account, AccountStore, Address, InMemoryAccountStore, InMemoryContentStore, TokenAmount};
use pb_02_payment_broker::{
    check_escrow_invariant, AllowListConditions, BrokerCall, BrokerConfig, BrokerPorts, CallResult,
    ChannelId, ChannelTable, CloseParams, CreateParams, DispatchError, Dispatcher, ExtendParams,
    KeyDirectory, ManualClock, Message, PaymentBrokerApi, Receipt, ReclaimParams, Voucher,
    VoucherBody,
};
use shared_crypto::Ed25519KeyPair;
use std::sync::Arc;

/// Address the broker is installed at.
pub const BROKER: Address = Address::new([0xB0; 20]);

/// A keyed account holder.
pub struct Participant {
    pub key: Ed25519KeyPair,
    pub address: Address,
}

impl Participant {
    /// Signs a cumulative voucher on one of this participant's channels at
    /// [`BROKER`].
    pub fn voucher(&self, channel_id: ChannelId, amount: TokenAmount) -> Voucher {
        self.voucher_on(BROKER, channel_id, amount)
    }

    pub fn voucher_on(
        &self,
        broker: Address,
        channel_id: ChannelId,
        amount: TokenAmount,
    ) -> Voucher {
        VoucherBody::new(broker, channel_id, self.address, amount)
            .sign(&self.key)
            .expect("voucher body encodes")
    }
}

/// Dispatcher wired to in-memory adapters.
pub struct Chain {
    pub dispatcher: Dispatcher,
    pub accounts: Arc<InMemoryAccountStore>,
    pub content: Arc<InMemoryContentStore>,
    pub clock: Arc<ManualClock>,
    pub keys: Arc<KeyDirectory>,
    pub conditions: Arc<AllowListConditions>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    pub fn with_config(config: BrokerConfig) -> Self {
        pb_telemetry::init_test_logging();

        let accounts = Arc::new(InMemoryAccountStore::new());
        let content = Arc::new(InMemoryContentStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let keys = Arc::new(KeyDirectory::new());
        let conditions = Arc::new(AllowListConditions::new());

        let dispatcher = Dispatcher::new(
            config,
            BrokerPorts {
                accounts: accounts.clone(),
                content: content.clone(),
                clock: clock.clone(),
                verifier: keys.clone(),
                conditions: conditions.clone(),
            },
        );
        dispatcher
            .install_broker(BROKER)
            .expect("fresh address accepts a broker");

        Self {
            dispatcher,
            accounts,
            content,
            clock,
            keys,
            conditions,
        }
    }

    /// Registers a deterministic key and funds its address at genesis.
    pub fn participant(&self, seed: u8, balance: TokenAmount) -> Participant {
        let key = Ed25519KeyPair::from_seed([seed; 32]);
        let address = self.keys.register(key.public_key());
        if balance > 0 {
            self.accounts
                .store(address, Account::with_balance(balance))
                .expect("in-memory store accepts accounts");
        }
        Participant { key, address }
    }

    pub fn account(&self, address: &Address) -> Account {
        self.dispatcher.account(address).expect("account loads")
    }

    pub fn balance(&self, address: &Address) -> TokenAmount {
        self.account(address).balance
    }

    pub fn nonce(&self, address: &Address) -> u64 {
        self.account(address).nonce
    }

    /// Sends `call` from `from` with its current nonce.
    pub fn send(&self, from: &Address, call: BrokerCall) -> Result<Receipt, DispatchError> {
        self.dispatcher.apply(Message {
            from: *from,
            to: BROKER,
            nonce: self.nonce(from),
            call,
        })
    }

    pub fn create(
        &self,
        payer: &Participant,
        target: &Address,
        eol: u64,
        amount: TokenAmount,
    ) -> Result<ChannelId, DispatchError> {
        let receipt = self.send(
            &payer.address,
            BrokerCall::Create(CreateParams {
                target: *target,
                eol,
                amount,
                conditions: None,
            }),
        )?;
        match receipt.result {
            CallResult::ChannelCreated(id) => Ok(id),
            CallResult::Done => panic!("create returned no channel id"),
        }
    }

    pub fn redeem(&self, caller: &Address, voucher: Voucher) -> Result<Receipt, DispatchError> {
        self.send(caller, BrokerCall::Redeem(voucher))
    }

    pub fn reclaim(&self, payer: &Address, channel_id: ChannelId) -> Result<Receipt, DispatchError> {
        self.send(payer, BrokerCall::Reclaim(ReclaimParams { channel_id }))
    }

    pub fn close(
        &self,
        caller: &Address,
        payer: &Address,
        channel_id: ChannelId,
        voucher: Option<Voucher>,
    ) -> Result<Receipt, DispatchError> {
        self.send(
            caller,
            BrokerCall::Close(CloseParams {
                payer: *payer,
                channel_id,
                voucher,
            }),
        )
    }

    pub fn extend(
        &self,
        payer: &Address,
        channel_id: ChannelId,
        eol: u64,
        amount: TokenAmount,
    ) -> Result<Receipt, DispatchError> {
        self.send(
            payer,
            BrokerCall::Extend(ExtendParams {
                channel_id,
                eol,
                amount,
            }),
        )
    }

    /// The broker's committed channel table.
    pub fn table(&self) -> ChannelTable {
        let head = self
            .account(&BROKER)
            .head
            .expect("installed broker has a head");
        ChannelTable::load(self.content.as_ref(), &head).expect("committed table loads")
    }

    /// True if the committed escrow matches the committed channels.
    pub fn escrow_balanced(&self) -> bool {
        check_escrow_invariant(self.balance(&BROKER), &self.table()).is_ok()
    }
}
