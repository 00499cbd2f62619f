//! Collaborators the miner reads from and hands sealed blocks to.
//!
//! The mining core only ever reads the tip, the pending pool and the node's
//! keys; accepting a block is the submission collaborator's job.

pub mod memory;

pub use memory::InMemoryLedger;

use crate::blockchain::{Block, SealedBlock};
use crate::error::MiningError;
use crate::transaction::PendingTx;
use crate::wallet::MinerKey;

pub trait ChainTip {
    /// Latest accepted block. Fails with `Retrieval` when there is none.
    fn latest_block(&self) -> Result<Block, MiningError>;
}

pub trait TransactionPool {
    fn pending_transactions(&self) -> Result<Vec<PendingTx>, MiningError>;
}

pub trait MinerIdentity {
    /// Keys owned by `node_number`; the first one receives the reward by default.
    fn keys_for(&self, node_number: &str) -> Result<Vec<MinerKey>, MiningError>;
}

pub trait Submission {
    /// Offer a sealed block; returns the height it was accepted at.
    fn submit(&self, block: SealedBlock) -> Result<u64, MiningError>;
}
