use log::debug;

use crate::blockchain::{Block, hash_hex};
use crate::error::MiningError;

/// Who is mining: the node id and the address credited with the reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miner {
    pub node_number: String,
    pub address: String,
}

/// An unsealed header under construction or search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub(crate) block: Block,
}

impl Candidate {
    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub(crate) fn set_address(&mut self, address: &str) {
        self.block.address = address.to_string();
    }
}

/// Derive the next candidate header on top of `prev`.
///
/// Everything except `time` is a pure function of the inputs.
pub fn build_candidate(
    prev: &Block,
    miner: &Miner,
    version: &str,
    difficulty_prefix: &str,
    now_ms: u64,
) -> Result<Candidate, MiningError> {
    let height = prev
        .height
        .checked_add(1)
        .ok_or(MiningError::HeightOverflow(prev.height))?;

    let prev_hash = prev.compute_hash(version);
    let merkle_root = hash_hex(&format!("{height:x}"));

    debug!(
        "BUILDER - candidate #{height} prev_hash={prev_hash} merkle_root={merkle_root}"
    );

    Ok(Candidate {
        block: Block {
            height,
            node_number: miner.node_number.clone(),
            address: miner.address.clone(),
            prev_hash,
            merkle_root,
            time: format!("{now_ms:x}"),
            nbits: difficulty_prefix.to_string(),
            nonce: format!("{:x}", 0u64),
        },
    })
}
