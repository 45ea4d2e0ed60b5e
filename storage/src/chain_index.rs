use duskcoin_chain::Hash256;

/// A block-index entry: the data the assembler reads from the tip (or any
/// ancestor) without touching the full block body. Grounded on the
/// teacher's `BestBlock`/`BlockRef` pair, collapsed into one struct since
/// this spec never needs to distinguish "by height" from "by hash" lookup
/// results once resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainIndexEntry {
    pub height: u32,
    pub hash: Hash256,
    pub time: u32,
    /// Network-reward reserve carried forward from this block's coinbase,
    /// read by template assembly step 7 when building the next block.
    pub network_reward_reserve: u64,
}

/// `ChainCollaborator` from spec.md §6: tip lookup, best-header time, and
/// resolving a previous chain index by hash (to read its carried
/// network-reward reserve).
pub trait ChainIndexStore: Send + Sync {
    fn tip(&self) -> ChainIndexEntry;
    fn best_header_time(&self) -> u32;
    fn index_by_hash(&self, hash: &Hash256) -> Option<ChainIndexEntry>;
    /// Median time of the last 11 ancestors, used for the locktime cutoff
    /// and the `max(medianTimePast+1, adjustedNetworkTime)` header floor.
    fn median_time_past(&self, of: &ChainIndexEntry) -> u32;
    /// Appends a newly accepted block's index entry as the new tip. Real
    /// reorg handling (picking the best-work chain rather than just the
    /// most recent append) is the hosting node's job, out of scope here.
    fn push(&mut self, entry: ChainIndexEntry);
}

/// In-memory reference implementation, sufficient for the core's own
/// unit/integration tests.
#[derive(Default)]
pub struct MemoryChainIndex {
    entries: Vec<ChainIndexEntry>,
}

impl MemoryChainIndex {
    pub fn new() -> Self {
        MemoryChainIndex { entries: Vec::new() }
    }

    pub fn push(&mut self, entry: ChainIndexEntry) {
        self.entries.push(entry);
    }
}

impl ChainIndexStore for MemoryChainIndex {
    fn tip(&self) -> ChainIndexEntry {
        *self
            .entries
            .last()
            .expect("chain index must be seeded with a genesis entry before use")
    }

    fn best_header_time(&self) -> u32 {
        self.tip().time
    }

    fn index_by_hash(&self, hash: &Hash256) -> Option<ChainIndexEntry> {
        self.entries.iter().rev().find(|e| &e.hash == hash).copied()
    }

    fn median_time_past(&self, of: &ChainIndexEntry) -> u32 {
        let mut times: Vec<u32> = self
            .entries
            .iter()
            .filter(|e| e.height <= of.height)
            .rev()
            .take(11)
            .map(|e| e.time)
            .collect();
        times.sort_unstable();
        times[times.len() / 2]
    }

    fn push(&mut self, entry: ChainIndexEntry) {
        self.entries.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(height: u32, time: u32) -> ChainIndexEntry {
        ChainIndexEntry {
            height,
            hash: Hash256([height as u8; 32]),
            time,
            network_reward_reserve: 0,
        }
    }

    #[test]
    fn median_time_past_uses_up_to_eleven_ancestors() {
        let mut index = MemoryChainIndex::new();
        for h in 0..20u32 {
            index.push(entry(h, h * 10));
        }
        let tip = index.tip();
        let median = index.median_time_past(&tip);
        assert_eq!(median, 140);
    }

    #[test]
    fn index_by_hash_finds_a_known_ancestor() {
        let mut index = MemoryChainIndex::new();
        index.push(entry(0, 0));
        index.push(entry(1, 10));
        let found = index.index_by_hash(&Hash256([0u8; 32]));
        assert_eq!(found.map(|e| e.height), Some(0));
    }
}
