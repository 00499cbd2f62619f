use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::blockchain::{Block, Blockchain};
use crate::config::MinerConfig;
use crate::error::MiningError;
use crate::ledger::InMemoryLedger;
use crate::mining::{MiningSession, SearchOutcome};
use crate::wallet::{KeyRing, MinerKey};

/// Shared application state: the in-memory ledger, this node's keys and
/// its single mining session.
pub struct AppState {
    pub config: MinerConfig,
    pub ledger: InMemoryLedger,
    pub keys: KeyRing,
    pub session: Mutex<MiningSession>,
}

impl AppState {
    pub fn new(config: MinerConfig) -> Self {
        let ledger = InMemoryLedger::new(Blockchain::new(
            &config.version,
            Block::genesis(&config.difficulty_prefix),
        ));
        Self {
            ledger,
            keys: KeyRing::new(),
            session: Mutex::new(MiningSession::new(&config)),
            config,
        }
    }

    pub fn session(&self) -> Result<MutexGuard<'_, MiningSession>, MiningError> {
        self.session
            .lock()
            .map_err(|_| MiningError::Poisoned("session"))
    }
}

/* ---------- Mining API Models ---------- */

#[derive(Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct CoinbaseRequest {
    pub session_id: String,
    pub address: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub message: String,
    #[serde(flatten)]
    pub outcome: SearchOutcome,
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled_height: u64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/* ---------- Chain API Models ---------- */

#[derive(Serialize)]
pub struct ChainResponse<'a> {
    pub length: usize,
    pub valid: bool,
    pub chain: &'a [Block],
}

#[derive(Serialize)]
pub struct DifficultyResponse {
    pub difficulty_prefix: String,
}

#[derive(Deserialize)]
pub struct SetDifficultyRequest {
    pub difficulty_prefix: String,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct NewTxRequest {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct MempoolResponse {
    pub size: usize,
    pub transactions: Vec<crate::transaction::PendingTx>,
}

/* ---------- Key API Models ---------- */

#[derive(Serialize)]
pub struct KeysResponse {
    pub node_number: String,
    pub keys: Vec<MinerKey>,
}

#[derive(Serialize)]
pub struct NewKeyResponse {
    pub private_key: String,
    pub public_key: String,
    pub address: String,
}
