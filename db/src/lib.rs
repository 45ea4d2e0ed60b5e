//! Persistence-collaborator boundary. A real node backs `ChainCollaborator`
//! with an on-disk database (RocksDB in the teacher codebase); that engine
//! is out of scope here. `ChainDatabase` composes the `storage` crate's
//! in-memory reference implementations behind one handle, which is all
//! the assembler's own tests need — it is deliberately not a second
//! implementation of those traits, to avoid the two drifting apart.

use duskcoin_chain::{Hash256, IndexedBlockHeader};
use duskcoin_storage::{
    BlockHeaderProvider, ChainIndexEntry, ChainIndexStore, MemoryBlockHeaderProvider,
    MemoryChainIndex, MemoryPrivacyTracker, MemoryUtxoView, PrivacyTracker, TransactionOutputProvider,
    UtxoView,
};

#[derive(Default)]
pub struct ChainDatabase {
    pub index: MemoryChainIndex,
    pub headers: MemoryBlockHeaderProvider,
    pub utxo: MemoryUtxoView,
    pub privacy: MemoryPrivacyTracker,
}

impl ChainDatabase {
    pub fn new() -> Self {
        ChainDatabase::default()
    }

    pub fn insert_header(&mut self, header: IndexedBlockHeader) {
        self.headers.insert(header);
    }
}

impl ChainIndexStore for ChainDatabase {
    fn tip(&self) -> ChainIndexEntry {
        self.index.tip()
    }

    fn best_header_time(&self) -> u32 {
        self.index.best_header_time()
    }

    fn index_by_hash(&self, hash: &Hash256) -> Option<ChainIndexEntry> {
        self.index.index_by_hash(hash)
    }

    fn median_time_past(&self, of: &ChainIndexEntry) -> u32 {
        self.index.median_time_past(of)
    }

    fn push(&mut self, entry: ChainIndexEntry) {
        self.index.push(entry);
    }
}

impl BlockHeaderProvider for ChainDatabase {
    fn block_header(&self, hash: &Hash256) -> Option<IndexedBlockHeader> {
        self.headers.block_header(hash)
    }
}

impl UtxoView for ChainDatabase {
    fn is_available(&self, outpoint: &duskcoin_chain::OutPoint) -> bool {
        self.utxo.is_available(outpoint)
    }
}

impl TransactionOutputProvider for ChainDatabase {
    fn transaction_output(
        &self,
        outpoint: &duskcoin_chain::OutPoint,
    ) -> Option<duskcoin_chain::TransactionOutput> {
        self.utxo.transaction_output(outpoint)
    }
}

impl PrivacyTracker for ChainDatabase {
    fn confirmed_serial_height(&self, serial: &Hash256) -> Option<u32> {
        self.privacy.confirmed_serial_height(serial)
    }

    fn confirmed_pubcoin_height(&self, pubcoin: &Hash256) -> Option<u32> {
        self.privacy.confirmed_pubcoin_height(pubcoin)
    }
}
