use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Millisecond timestamp stamped on the genesis block.
const GENESIS_TIME_MS: u64 = 1_640_995_200_000;

/// A block header plus the identity of the node that produced it.
///
/// `time` and `nonce` are lowercase hex without padding, `nbits` is the
/// literal hex prefix the header's hash had to start with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub height: u64,
    pub node_number: String,
    pub address: String,
    pub prev_hash: String,
    pub merkle_root: String,
    pub time: String,
    pub nbits: String,
    pub nonce: String,
}

impl Block {
    /// First block of a fresh ledger. Its `prev_hash` is empty.
    pub fn genesis(nbits: &str) -> Self {
        Self {
            height: 0,
            node_number: String::from("genesis"),
            address: String::new(),
            prev_hash: String::new(),
            merkle_root: hash_hex(&format!("{:x}", 0u64)),
            time: format!("{GENESIS_TIME_MS:x}"),
            nbits: nbits.to_string(),
            nonce: format!("{:x}", 0u64),
        }
    }

    /// Canonical serialization of this header under `version`.
    pub fn header_bytes(&self, version: &str) -> String {
        header_bytes(
            version,
            &self.prev_hash,
            &self.merkle_root,
            &self.time,
            &self.nbits,
            &self.nonce,
        )
    }

    /// SHA-256 of the serialized header, hex encoded.
    pub fn compute_hash(&self, version: &str) -> String {
        hash_hex(&self.header_bytes(version))
    }
}

/// A header whose hash satisfied its difficulty prefix. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealedBlock {
    #[serde(flatten)]
    block: Block,
    hash: String,
}

impl SealedBlock {
    pub(crate) fn new(block: Block, hash: String) -> Self {
        Self { block, hash }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn into_block(self) -> Block {
        self.block
    }
}

/// Concatenate header fields in their fixed order, without separators.
pub fn header_bytes(
    version: &str,
    prev_hash: &str,
    merkle_root: &str,
    time: &str,
    nbits: &str,
    nonce: &str,
) -> String {
    let mut out = String::with_capacity(
        version.len() + prev_hash.len() + merkle_root.len() + time.len() + nbits.len() + nonce.len(),
    );
    out.push_str(version);
    out.push_str(prev_hash);
    out.push_str(merkle_root);
    out.push_str(time);
    out.push_str(nbits);
    out.push_str(nonce);
    out
}

/// SHA-256 of the UTF-8 bytes of `data`, lowercase hex.
pub fn hash_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Difficulty predicate: `hash` begins with the literal `prefix`.
///
/// Plain ordinal comparison on the hex text, case-sensitive. A hash shorter
/// than the prefix never matches; the empty prefix always does.
pub fn validate_hash(hash: &str, prefix: &str) -> bool {
    hash.starts_with(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Block {
        Block {
            height: 5,
            node_number: "node-1".into(),
            address: "addr".into(),
            prev_hash: "abc".into(),
            merkle_root: "def".into(),
            time: "17f".into(),
            nbits: "0000".into(),
            nonce: "0".into(),
        }
    }

    #[test]
    fn header_fields_concatenate_in_order() {
        assert_eq!(sample().header_bytes("02000000"), "02000000abcdef17f00000");
    }

    #[test]
    fn hash_is_pure() {
        let b = sample();
        assert_eq!(b.compute_hash("02000000"), b.compute_hash("02000000"));
        assert_eq!(b.compute_hash("02000000"), hash_hex("02000000abcdef17f00000"));
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            hash_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn predicate_matches_prefix_only() {
        assert!(validate_hash("0000ab12", "0000"));
        assert!(!validate_hash("000ab120", "0000"));
        assert!(!validate_hash("a0000b12", "0000"));
    }

    #[test]
    fn predicate_is_case_sensitive() {
        assert!(validate_hash("ab12", "ab"));
        assert!(!validate_hash("ab12", "AB"));
    }

    #[test]
    fn predicate_rejects_hash_shorter_than_prefix() {
        assert!(!validate_hash("00", "0000"));
        assert!(!validate_hash("", "0"));
    }

    #[test]
    fn empty_prefix_is_vacuously_true() {
        assert!(validate_hash("", ""));
        assert!(validate_hash("ffff", ""));
    }

    #[test]
    fn genesis_has_no_predecessor_link() {
        let g = Block::genesis("0000");
        assert_eq!(g.height, 0);
        assert!(g.prev_hash.is_empty());
        assert_eq!(g.nonce, "0");
        assert_eq!(g.merkle_root, hash_hex("0"));
    }

    #[test]
    fn sealed_block_serializes_flat() {
        let sealed = SealedBlock::new(sample(), "00ff".into());
        let v = serde_json::to_value(&sealed).unwrap();
        assert_eq!(v["height"], 5);
        assert_eq!(v["hash"], "00ff");
        assert_eq!(v["nonce"], "0");
    }
}
