use std::fmt;

use duskcoin_primitives::hash::Hash256;

use crate::transaction::Transaction;

/// A transaction paired with its hash, computed once at construction so
/// the assembler never re-hashes the same transaction twice while building
/// a template. Mirrors the teacher's `IndexedBlockHeader` hash-on-construct
/// pattern, applied to transactions instead of headers.
#[derive(Clone)]
pub struct IndexedTransaction {
    pub hash: Hash256,
    pub raw: Transaction,
}

impl IndexedTransaction {
    pub fn new(hash: Hash256, transaction: Transaction) -> Self {
        IndexedTransaction {
            hash,
            raw: transaction,
        }
    }

    pub fn from_raw(transaction: Transaction) -> Self {
        let hash = transaction.hash();
        IndexedTransaction::new(hash, transaction)
    }
}

impl fmt::Debug for IndexedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexedTransaction")
            .field("hash", &self.hash)
            .field("raw", &self.raw)
            .finish()
    }
}

impl PartialEq for IndexedTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for IndexedTransaction {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{OutPoint, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_script::Script;

    #[test]
    fn from_raw_hashes_on_construction() {
        let tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::default(),
                sequence: 0,
            }],
            outputs: vec![TransactionOutput::empty()],
            lock_time: 0,
        };
        let indexed = IndexedTransaction::from_raw(tx.clone());
        assert_eq!(indexed.hash, tx.hash());
    }
}
