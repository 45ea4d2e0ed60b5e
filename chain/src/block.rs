use duskcoin_serialization::{Serializable, Stream};

use crate::block_header::BlockHeader;
use crate::merkle::{merkle_root, witness_merkle_root};
use crate::transaction::Transaction;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Block {
            header,
            transactions,
        }
    }

    /// Recomputes and installs both Merkle roots from the current
    /// transaction list, called after any change to the transaction
    /// sequence (duplicate removal, coinbase scriptsig rewrite for
    /// extra-nonce, etc).
    pub fn recompute_merkle_roots(&mut self) {
        let hashes: Vec<_> = self.transactions.iter().map(Transaction::hash).collect();
        self.header.merkle_root = merkle_root(&hashes);
        self.header.witness_merkle_root = witness_merkle_root(&hashes);
    }
}

impl Serializable for Block {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.header).append(&self.transactions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{OutPoint, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_script::Script;

    fn coinbase() -> Transaction {
        Transaction {
            version: 1,
            kind: TxKind::Coinbase,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::new(vec![0x03, 1, 2, 3]),
                sequence: u32::MAX,
            }],
            outputs: vec![TransactionOutput::empty()],
            lock_time: 0,
        }
    }

    #[test]
    fn recompute_merkle_roots_matches_coinbase_only_block() {
        let mut block = Block::new(BlockHeader::default(), vec![coinbase()]);
        block.recompute_merkle_roots();
        assert_eq!(block.header.merkle_root, coinbase().hash());
        assert_eq!(block.header.witness_merkle_root, crate::Hash256::zero());
    }
}
