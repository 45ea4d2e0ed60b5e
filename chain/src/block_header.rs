use std::collections::BTreeMap;

use duskcoin_crypto::dhash256;
use duskcoin_primitives::compact::Compact;
use duskcoin_primitives::hash::Hash256;
use duskcoin_serialization::{Serializable, Stream};

/// Block header fields, as described in spec.md §6: version, previous
/// block hash, Merkle roots (transaction and witness), time, difficulty
/// bits, nonce, the accumulator-checkpoint map, an auxiliary-data hash, an
/// optional full-node-proof hash, and (for PoS blocks) a signature.
///
/// The accumulator checkpoint and PoS signature are carried on the header
/// itself rather than as a separate structure, matching the way the
/// teacher's `BlockHeader` carries Sapling/Equihash-specific fields
/// directly rather than through a side table.
#[derive(Clone, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub previous_header_hash: Hash256,
    pub merkle_root: Hash256,
    pub witness_merkle_root: Hash256,
    pub time: u32,
    pub bits: Compact,
    pub nonce: u32,
    /// Accumulator checkpoint, keyed by denomination/group id. Refreshed
    /// every 10 blocks per the template sequence's step 14.
    pub accumulator_checkpoint: BTreeMap<u32, Hash256>,
    pub auxiliary_data_hash: Hash256,
    /// Present only when the (out-of-scope) full-node proof extension is
    /// requested; the source logs but does not fail when this is set
    /// without PoS, a behavior this implementation preserves.
    pub full_node_proof_hash: Option<Hash256>,
    /// PoS block signature, appended after the rest of the header is
    /// otherwise final.
    pub signature: Option<Vec<u8>>,
}

impl Serializable for BlockHeader {
    fn serialize(&self, stream: &mut Stream) {
        stream
            .append(&self.version)
            .append(&self.previous_header_hash)
            .append(&self.merkle_root)
            .append(&self.witness_merkle_root)
            .append(&self.time)
            .append(&self.bits)
            .append(&self.nonce);
        stream.append_compact_size(self.accumulator_checkpoint.len() as u64);
        for (group, checkpoint) in &self.accumulator_checkpoint {
            stream.append(group).append(checkpoint);
        }
        stream.append(&self.auxiliary_data_hash);
        stream.append(&self.full_node_proof_hash);
        match &self.signature {
            Some(sig) => stream.append(sig),
            None => {
                stream.append_compact_size(0);
            }
        };
    }
}

/// Double-SHA256 over the serialized header, matching the teacher's
/// `block_header_hash` free function rather than a method on the type
/// (kept separate so `IndexedBlockHeader::from_raw` can call it without
/// borrowing through a method on the value it's about to move).
pub fn block_header_hash(header: &BlockHeader) -> Hash256 {
    let mut stream = Stream::new();
    header.serialize(&mut stream);
    dhash256(&stream.out())
}
