use crate::domain::{Account, Address, Cid, StateError};
use crate::ports::{AccountStore, ContentStore, STATE_BLOB_CONTEXT};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory arena of immutable blobs keyed by their digest.
pub struct InMemoryContentStore {
    blobs: RwLock<HashMap<Cid, Vec<u8>>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StateError> {
        let blobs = self.blobs.read().map_err(|_| StateError::LockPoisoned)?;
        Ok(blobs.get(cid).cloned())
    }

    fn put(&self, data: Vec<u8>) -> Result<Cid, StateError> {
        let cid = Cid::of(STATE_BLOB_CONTEXT, &data);
        let mut blobs = self.blobs.write().map_err(|_| StateError::LockPoisoned)?;
        // Same digest means same bytes; never overwrite.
        blobs.entry(cid).or_insert(data);
        Ok(cid)
    }
}

/// In-memory account table.
///
/// Accounts are held in their canonical encoding so that every load goes
/// through the strict decoder, same as a persistent backend would.
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Address, Vec<u8>>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Writes raw bytes for an address, bypassing the encoder.
    pub fn store_raw(&self, address: Address, bytes: Vec<u8>) -> Result<(), StateError> {
        let mut accounts = self.accounts.write().map_err(|_| StateError::LockPoisoned)?;
        accounts.insert(address, bytes);
        Ok(())
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore for InMemoryAccountStore {
    fn load(&self, address: &Address) -> Result<Option<Account>, StateError> {
        let accounts = self.accounts.read().map_err(|_| StateError::LockPoisoned)?;
        accounts
            .get(address)
            .map(|bytes| Account::deserialize(bytes))
            .transpose()
    }

    fn store(&self, address: Address, account: Account) -> Result<(), StateError> {
        let mut accounts = self.accounts.write().map_err(|_| StateError::LockPoisoned)?;
        accounts.insert(address, account.serialize());
        Ok(())
    }

    fn commit(&self, batch: Vec<(Address, Account)>) -> Result<(), StateError> {
        let encoded: Vec<(Address, Vec<u8>)> = batch
            .into_iter()
            .map(|(address, account)| (address, account.serialize()))
            .collect();

        let mut accounts = self.accounts.write().map_err(|_| StateError::LockPoisoned)?;
        tracing::trace!(accounts = encoded.len(), "committing account batch");
        for (address, bytes) in encoded {
            accounts.insert(address, bytes);
        }
        Ok(())
    }
}
