use crate::domain::{Account, Address, Cid, StateError};

/// Derivation context for blobs written to a [`ContentStore`].
pub const STATE_BLOB_CONTEXT: &str = "payment-broker 2024 state blob";

/// Content-addressed blob storage.
///
/// Blobs are immutable once written. Updating actor state means putting a
/// new blob and moving the actor's `head` to the returned CID; the previous
/// CID keeps resolving to the previous bytes.
pub trait ContentStore: Send + Sync {
    fn get(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StateError>;
    fn put(&self, data: Vec<u8>) -> Result<Cid, StateError>;

    /// Like `get`, but a missing blob is an error.
    fn get_required(&self, cid: &Cid) -> Result<Vec<u8>, StateError> {
        self.get(cid)?.ok_or(StateError::ContentNotFound(*cid))
    }
}

/// Address-keyed account persistence.
pub trait AccountStore: Send + Sync {
    /// Loads an account. `None` means the address has never held value.
    fn load(&self, address: &Address) -> Result<Option<Account>, StateError>;

    fn store(&self, address: Address, account: Account) -> Result<(), StateError>;

    /// Writes every account in `batch` or none of them.
    fn commit(&self, batch: Vec<(Address, Account)>) -> Result<(), StateError>;

    /// Loads an account, treating unknown addresses as empty.
    fn load_or_default(&self, address: &Address) -> Result<Account, StateError> {
        Ok(self.load(address)?.unwrap_or_default())
    }
}
