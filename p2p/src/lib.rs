//! Network-collaborator boundary: peer count (consulted by the PoS
//! driver's "at least one peer connected" precondition) and block
//! broadcast. The full connection manager, handshake, and message
//! dispatch are the hosting node's job and out of scope here.

use parking_lot::Mutex;

use duskcoin_message::BlockAnnouncement;

pub trait NetworkCollaborator: Send + Sync {
    fn peer_count(&self) -> usize;
    fn broadcast_block(&self, announcement: BlockAnnouncement);
}

/// In-memory mock sufficient for driver tests: a fixed peer count and a
/// log of every block handed to it for broadcast.
#[derive(Default)]
pub struct MockPeerSet {
    peer_count: usize,
    broadcasts: Mutex<Vec<BlockAnnouncement>>,
}

impl MockPeerSet {
    pub fn new(peer_count: usize) -> Self {
        MockPeerSet {
            peer_count,
            broadcasts: Mutex::new(Vec::new()),
        }
    }

    pub fn broadcasts(&self) -> Vec<BlockAnnouncement> {
        self.broadcasts.lock().clone()
    }
}

impl NetworkCollaborator for MockPeerSet {
    fn peer_count(&self) -> usize {
        self.peer_count
    }

    fn broadcast_block(&self, announcement: BlockAnnouncement) {
        self.broadcasts.lock().push(announcement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{Block, BlockHeader};

    #[test]
    fn broadcasting_records_the_block() {
        let peers = MockPeerSet::new(3);
        assert_eq!(peers.peer_count(), 3);
        peers.broadcast_block(BlockAnnouncement {
            block: Block::new(BlockHeader::default(), Vec::new()),
        });
        assert_eq!(peers.broadcasts().len(), 1);
    }
}
