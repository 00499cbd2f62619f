use super::{Block, SealedBlock, validate_hash};
use crate::error::MiningError;

/// Simple in-memory chain of accepted headers.
#[derive(Debug)]
pub struct Blockchain {
    pub chain: Vec<Block>,
    version: String,
}

impl Blockchain {
    /// Initialize a new chain holding only the genesis block.
    pub fn new(version: &str, genesis: Block) -> Self {
        Self {
            chain: vec![genesis],
            version: version.to_string(),
        }
    }

    /// Build a chain without any block. `last_block` fails until one is appended.
    #[cfg(test)]
    pub fn empty(version: &str) -> Self {
        Self {
            chain: Vec::new(),
            version: version.to_string(),
        }
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Accept a sealed block on top of the current tip and return its height.
    pub fn append_sealed(&mut self, sealed: SealedBlock) -> Result<u64, MiningError> {
        let tip = self
            .last_block()
            .ok_or_else(|| MiningError::Submission("ledger has no tip to extend".into()))?;

        let expected_height = tip.height + 1;
        if sealed.height() != expected_height {
            return Err(MiningError::Submission(format!(
                "stale height {} (expected {expected_height})",
                sealed.height()
            )));
        }
        if sealed.block().prev_hash != tip.compute_hash(&self.version) {
            return Err(MiningError::Submission(
                "prev_hash does not link to the current tip".into(),
            ));
        }
        if sealed.block().compute_hash(&self.version) != sealed.hash() {
            return Err(MiningError::Submission("hash mismatch".into()));
        }
        if !validate_hash(sealed.hash(), &sealed.block().nbits) {
            return Err(MiningError::Submission(
                "hash does not meet difficulty".into(),
            ));
        }

        let height = sealed.height();
        self.chain.push(sealed.into_block());
        Ok(height)
    }

    /// Validate linkage of the whole chain. Genesis is taken as given.
    pub fn is_valid_chain(&self) -> bool {
        self.chain.windows(2).all(|pair| {
            let (prev, current) = (&pair[0], &pair[1]);
            current.height == prev.height + 1
                && current.prev_hash == prev.compute_hash(&self.version)
                && validate_hash(&current.compute_hash(&self.version), &current.nbits)
        })
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::hash_hex;

    const VERSION: &str = "02000000";

    fn child_of(prev: &Block, nbits: &str) -> Block {
        Block {
            height: prev.height + 1,
            node_number: "n1".into(),
            address: "addr".into(),
            prev_hash: prev.compute_hash(VERSION),
            merkle_root: hash_hex(&format!("{:x}", prev.height + 1)),
            time: "18c".into(),
            nbits: nbits.into(),
            nonce: "0".into(),
        }
    }

    fn seal(block: Block) -> SealedBlock {
        let hash = block.compute_hash(VERSION);
        SealedBlock::new(block, hash)
    }

    #[test]
    fn accepts_linked_block() {
        let mut bc = Blockchain::new(VERSION, Block::genesis(""));
        let next = child_of(bc.last_block().unwrap(), "");
        assert_eq!(bc.append_sealed(seal(next)).unwrap(), 1);
        assert_eq!(bc.len(), 2);
        assert!(bc.is_valid_chain());
    }

    #[test]
    fn rejects_stale_height() {
        let mut bc = Blockchain::new(VERSION, Block::genesis(""));
        let mut next = child_of(bc.last_block().unwrap(), "");
        next.height = 7;
        let err = bc.append_sealed(seal(next)).unwrap_err();
        assert!(matches!(err, MiningError::Submission(msg) if msg.contains("stale height")));
    }

    #[test]
    fn rejects_broken_linkage() {
        let mut bc = Blockchain::new(VERSION, Block::genesis(""));
        let mut next = child_of(bc.last_block().unwrap(), "");
        next.prev_hash = "beef".into();
        assert!(bc.append_sealed(seal(next)).is_err());
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn rejects_tampered_hash() {
        let mut bc = Blockchain::new(VERSION, Block::genesis(""));
        let next = child_of(bc.last_block().unwrap(), "");
        let forged = SealedBlock::new(next, "0000".into());
        let err = bc.append_sealed(forged).unwrap_err();
        assert!(matches!(err, MiningError::Submission(msg) if msg == "hash mismatch"));
    }

    #[test]
    fn rejects_hash_below_difficulty() {
        let mut bc = Blockchain::new(VERSION, Block::genesis(""));
        // 64 chars of 'g' can never prefix a hex digest
        let next = child_of(bc.last_block().unwrap(), &"g".repeat(64));
        assert!(bc.append_sealed(seal(next)).is_err());
    }

    #[test]
    fn empty_chain_has_no_tip() {
        let mut bc = Blockchain::empty(VERSION);
        assert!(bc.last_block().is_none());
        let orphan = child_of(&Block::genesis(""), "");
        assert!(bc.append_sealed(seal(orphan)).is_err());
    }
}
