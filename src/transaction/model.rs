use serde::{Deserialize, Serialize};

/// A transfer waiting to be included in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl PendingTx {
    /// Synthetic reward entry crediting the miner. It has no sender.
    pub fn coinbase(address: &str, amount: u64) -> Self {
        Self {
            from: String::new(),
            to: address.to_string(),
            amount,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        self.from.is_empty()
    }
}

/// Coinbase entry first, then the pending transactions in pool order.
pub fn with_coinbase(address: &str, reward: u64, pending: Vec<PendingTx>) -> Vec<PendingTx> {
    let mut txs = Vec::with_capacity(1 + pending.len());
    txs.push(PendingTx::coinbase(address, reward));
    txs.extend(pending);
    txs
}
