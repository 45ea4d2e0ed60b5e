use std::collections::HashMap;

use duskcoin_chain::{OutPoint, TransactionOutput};

/// `UtxoView` from spec.md §6: input-availability test used by template
/// assembly step 9 to drop transactions whose inputs vanished from the
/// pool's view of the chain (double-spends against already-confirmed
/// transactions, reorgs, etc).
pub trait UtxoView: Send + Sync {
    fn is_available(&self, outpoint: &OutPoint) -> bool;
}

/// Prevout value lookup, used by `verification::transaction_fee`. Kept
/// separate from `UtxoView` since the fee calculation needs the value,
/// while the assembler's own input-availability test does not.
pub trait TransactionOutputProvider: Send + Sync {
    fn transaction_output(&self, outpoint: &OutPoint) -> Option<TransactionOutput>;
}

/// In-memory reference implementation backed by the known-spendable
/// outpoints and their output values.
#[derive(Default)]
pub struct MemoryUtxoView {
    available: HashMap<OutPoint, TransactionOutput>,
}

impl MemoryUtxoView {
    pub fn new() -> Self {
        MemoryUtxoView {
            available: HashMap::new(),
        }
    }

    pub fn insert(&mut self, outpoint: OutPoint, output: TransactionOutput) {
        self.available.insert(outpoint, output);
    }

    pub fn spend(&mut self, outpoint: &OutPoint) {
        self.available.remove(outpoint);
    }
}

impl UtxoView for MemoryUtxoView {
    fn is_available(&self, outpoint: &OutPoint) -> bool {
        self.available.contains_key(outpoint)
    }
}

impl TransactionOutputProvider for MemoryUtxoView {
    fn transaction_output(&self, outpoint: &OutPoint) -> Option<TransactionOutput> {
        self.available.get(outpoint).cloned()
    }
}
