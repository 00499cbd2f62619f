use std::collections::HashMap;
use std::sync::Mutex;

use rand::rngs::OsRng;
use secp256k1::Secp256k1;
use serde::Serialize;

use crate::error::MiningError;
use crate::ledger::MinerIdentity;

/// Generate a new secp256k1 keypair and return (priv_hex, pub_hex_compressed, address_hex).
/// Address is simply the hex of the compressed public key.
pub fn generate_keypair_hex() -> (String, String, String) {
    let secp = Secp256k1::new();
    let (sk, pk) = secp.generate_keypair(&mut OsRng);
    let sk_hex = hex::encode(sk.secret_bytes());
    let pk_hex = hex::encode(pk.serialize()); // compressed (33 bytes)
    let address = pk_hex.clone();
    (sk_hex, pk_hex, address)
}

/// Public half of a key owned by a mining node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinerKey {
    pub public_key: String,
    pub address: String,
}

/// Keys grouped by node number, oldest first.
#[derive(Debug, Default)]
pub struct KeyRing {
    keys: Mutex<HashMap<String, Vec<MinerKey>>>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh key for `node_number`. The secret is returned once and not kept.
    pub fn generate_for(&self, node_number: &str) -> Result<(MinerKey, String), MiningError> {
        let (secret_key, public_key, address) = generate_keypair_hex();
        let key = MinerKey {
            public_key,
            address,
        };
        let mut keys = self.keys.lock().map_err(|_| MiningError::Poisoned("key ring"))?;
        keys.entry(node_number.to_string())
            .or_default()
            .push(key.clone());
        Ok((key, secret_key))
    }
}

impl MinerIdentity for KeyRing {
    fn keys_for(&self, node_number: &str) -> Result<Vec<MinerKey>, MiningError> {
        let keys = self.keys.lock().map_err(|_| MiningError::Poisoned("key ring"))?;
        match keys.get(node_number) {
            Some(list) if !list.is_empty() => Ok(list.clone()),
            _ => Err(MiningError::Identity(format!(
                "node {node_number} has no keys"
            ))),
        }
    }
}
