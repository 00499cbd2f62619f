use super::model::PendingTx;

/// Ordered list of transactions not yet in a block.
#[derive(Debug, Default)]
pub struct TxPool {
    pending: Vec<PendingTx>,
}

impl TxPool {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, tx: PendingTx) {
        self.pending.push(tx);
    }

    /// Clone of the pending list, oldest first.
    pub fn snapshot(&self) -> Vec<PendingTx> {
        self.pending.clone()
    }

    /// Drop everything; called once a block has been accepted.
    pub fn clear(&mut self) -> usize {
        let removed = self.pending.len();
        self.pending.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
