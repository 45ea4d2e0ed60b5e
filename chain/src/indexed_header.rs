use std::fmt;

use duskcoin_primitives::hash::Hash256;

use crate::block_header::{block_header_hash, BlockHeader};

/// A header paired with its hash, computed once at construction. Directly
/// grounded on the teacher's `IndexedBlockHeader`: the assembler finalizes
/// a header once per template and should never recompute its hash by
/// accident on a later read.
#[derive(Clone)]
pub struct IndexedBlockHeader {
    pub hash: Hash256,
    pub raw: BlockHeader,
}

impl IndexedBlockHeader {
    pub fn new(hash: Hash256, header: BlockHeader) -> Self {
        IndexedBlockHeader { hash, raw: header }
    }

    /// Explicit conversion from a raw header, hashing its contents.
    pub fn from_raw(header: BlockHeader) -> Self {
        IndexedBlockHeader::new(block_header_hash(&header), header)
    }
}

impl fmt::Debug for IndexedBlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IndexedBlockHeader")
            .field("hash", &self.hash)
            .field("raw", &self.raw)
            .finish()
    }
}

impl PartialEq for IndexedBlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_hashes_on_construction() {
        let header = BlockHeader::default();
        let indexed = IndexedBlockHeader::from_raw(header.clone());
        assert_eq!(indexed.hash, block_header_hash(&header));
    }
}
