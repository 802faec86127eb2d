//! Ed25519 signature verification against account addresses.

use parking_lot::RwLock;
use pb_01_actor_state::Address;
use shared_crypto::{Ed25519PublicKey, Ed25519Signature};
use std::collections::HashMap;
use tracing::debug;

use crate::ports::outbound::SignatureVerifier;

/// Address → public key registry.
///
/// Addresses are derived from keys, never the other way round, so a key
/// must be registered before signatures from its address can verify.
#[derive(Debug, Default)]
pub struct KeyDirectory {
    keys: RwLock<HashMap<Address, Ed25519PublicKey>>,
}

impl KeyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` and returns the address it controls.
    pub fn register(&self, key: Ed25519PublicKey) -> Address {
        let address = Address::from_public_key(&key);
        self.keys.write().insert(address, key);
        address
    }

    pub fn lookup(&self, address: &Address) -> Option<Ed25519PublicKey> {
        self.keys.read().get(address).copied()
    }
}

impl SignatureVerifier for KeyDirectory {
    fn verify(&self, message: &[u8], signature: &[u8], signer: &Address) -> bool {
        let Some(key) = self.lookup(signer) else {
            debug!(%signer, "no key registered for signer");
            return false;
        };
        let Ok(signature) = Ed25519Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}
