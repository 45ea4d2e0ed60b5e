use std::collections::HashMap;

use duskcoin_chain::{Hash256, IndexedBlockHeader};

/// Looks up a previously accepted header by hash, grounded on the
/// teacher's `BlockHeaderProvider`. Template assembly uses this for
/// ancestor walks (locktime cutoff, median-time-past); block propagation
/// and serving headers to peers are the hosting node's job, out of scope
/// here.
pub trait BlockHeaderProvider: Send + Sync {
    fn block_header(&self, hash: &Hash256) -> Option<IndexedBlockHeader>;
}

#[derive(Default)]
pub struct MemoryBlockHeaderProvider {
    headers: HashMap<Hash256, IndexedBlockHeader>,
}

impl MemoryBlockHeaderProvider {
    pub fn new() -> Self {
        MemoryBlockHeaderProvider {
            headers: HashMap::new(),
        }
    }

    pub fn insert(&mut self, header: IndexedBlockHeader) {
        self.headers.insert(header.hash, header);
    }
}

impl BlockHeaderProvider for MemoryBlockHeaderProvider {
    fn block_header(&self, hash: &Hash256) -> Option<IndexedBlockHeader> {
        self.headers.get(hash).cloned()
    }
}
