//! Wire messages the miner driver needs to hand off a mined block. The
//! full P2P message set (version handshake, inventory, getdata, ...) is
//! the network layer's concern and out of scope here — this crate only
//! carries the one message the assembler's submission path produces.

use duskcoin_chain::Block;
use duskcoin_serialization::{Serializable, Stream};

/// Announces a newly produced block to the rest of the network, sent by
/// the miner driver after `ConsensusCollaborator::process_new_block`
/// accepts a mined template.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockAnnouncement {
    pub block: Block,
}

impl Serializable for BlockAnnouncement {
    fn serialize(&self, stream: &mut Stream) {
        stream.append(&self.block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::BlockHeader;

    #[test]
    fn announcement_serializes_the_whole_block() {
        let announcement = BlockAnnouncement {
            block: Block::new(BlockHeader::default(), Vec::new()),
        };
        let mut stream = Stream::new();
        stream.append(&announcement);
        assert!(!stream.out().is_empty());
    }
}
