use duskcoin_chain::{Block, BlockHeader, Transaction};

/// Accumulates transactions into a block fixture, following the
/// teacher's `ChainBuilder` convention.
#[derive(Debug, Default, Clone)]
pub struct ChainBuilder {
    pub transactions: Vec<Transaction>,
}

impl ChainBuilder {
    pub fn new() -> ChainBuilder {
        ChainBuilder {
            transactions: Vec::new(),
        }
    }

    pub fn push(&mut self, transaction: Transaction) -> &mut Self {
        self.transactions.push(transaction);
        self
    }

    pub fn at(&self, index: usize) -> Transaction {
        self.transactions[index].clone()
    }

    pub fn into_block(self, mut header: BlockHeader) -> Block {
        let mut block = Block::new(std::mem::take(&mut header), self.transactions);
        block.recompute_merkle_roots();
        block
    }
}
