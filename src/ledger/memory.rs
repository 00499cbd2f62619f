use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};

use super::{ChainTip, Submission, TransactionPool};
use crate::blockchain::{Block, Blockchain, SealedBlock};
use crate::error::MiningError;
use crate::transaction::{PendingTx, TxPool};

/// Chain and pending pool kept in process memory.
#[derive(Debug)]
pub struct InMemoryLedger {
    chain: Mutex<Blockchain>,
    pool: Mutex<TxPool>,
}

impl InMemoryLedger {
    pub fn new(blockchain: Blockchain) -> Self {
        Self {
            chain: Mutex::new(blockchain),
            pool: Mutex::new(TxPool::new()),
        }
    }

    pub fn chain(&self) -> Result<MutexGuard<'_, Blockchain>, MiningError> {
        self.chain.lock().map_err(|_| MiningError::Poisoned("chain"))
    }

    pub fn pool(&self) -> Result<MutexGuard<'_, TxPool>, MiningError> {
        self.pool.lock().map_err(|_| MiningError::Poisoned("pool"))
    }

    pub fn add_transaction(&self, tx: PendingTx) -> Result<usize, MiningError> {
        let mut pool = self.pool()?;
        pool.push(tx);
        Ok(pool.len())
    }
}

impl ChainTip for InMemoryLedger {
    fn latest_block(&self) -> Result<Block, MiningError> {
        self.chain()?
            .last_block()
            .cloned()
            .ok_or_else(|| MiningError::Retrieval("no blocks exist yet".into()))
    }
}

impl TransactionPool for InMemoryLedger {
    fn pending_transactions(&self) -> Result<Vec<PendingTx>, MiningError> {
        Ok(self.pool()?.snapshot())
    }
}

impl Submission for InMemoryLedger {
    fn submit(&self, block: SealedBlock) -> Result<u64, MiningError> {
        let hash = block.hash().to_string();
        let height = match self.chain()?.append_sealed(block) {
            Ok(height) => height,
            Err(e) => {
                warn!("LEDGER - rejected block {hash}: {e}");
                return Err(e);
            }
        };

        let removed = self.pool()?.clear();
        debug!("LEDGER - pool cleared ({removed} txs included)");
        info!("LEDGER - accepted block #{height} hash={hash}");
        Ok(height)
    }
}
