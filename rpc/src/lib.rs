//! Submission/notification boundary: the one JSON-RPC method the miner
//! driver actually calls (`submitblock`), grounded on the teacher's
//! `jsonrpc-derive` `#[rpc]` trait convention (see the former
//! `v1::traits::BlockChain`). The teacher's full blockchain query
//! surface (`getblock`, `gettxout`, `gettxoutsetinfo`, ...) is RPC
//! method surface and out of scope per spec.md §1 Non-goals — this
//! crate keeps only the slice `duskcoin-miner`'s
//! `ConsensusCollaborator::process_new_block` calls across the
//! process boundary.

use jsonrpc_core::Error as RpcError;
use jsonrpc_derive::rpc;
use log::{info, warn};

use duskcoin_chain::{block_header_hash, Block};
use duskcoin_primitives::hash::Hash256;

#[rpc]
pub trait SubmitBlock {
    /// Accepts a newly mined/staked block, mirroring the teacher's
    /// `submitblock` RPC. Returns the block hash on acceptance.
    #[rpc(name = "submitblock")]
    fn submit_block(&self, block: Block) -> Result<Hash256, RpcError>;
}

/// What the block submission handler asks the hosting node's consensus
/// engine to do; this is the in-process side of the same call
/// `duskcoin-miner`'s `ConsensusCollaborator::process_new_block` makes.
pub trait BlockAcceptor: Send + Sync {
    fn accept(&self, block: Block) -> Result<(), String>;
}

pub struct SubmitBlockClient<T: BlockAcceptor> {
    acceptor: T,
}

impl<T: BlockAcceptor> SubmitBlockClient<T> {
    pub fn new(acceptor: T) -> Self {
        SubmitBlockClient { acceptor }
    }
}

impl<T: BlockAcceptor + 'static> SubmitBlock for SubmitBlockClient<T> {
    fn submit_block(&self, block: Block) -> Result<Hash256, RpcError> {
        let hash = block_header_hash(&block.header);
        self.acceptor.accept(block).map_err(|e| {
            warn!(target: "rpc", "submitblock: rejected {hash}: {e}");
            RpcError::invalid_request()
        })?;
        info!(target: "rpc", "submitblock: accepted {hash}");
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::BlockHeader;
    use std::sync::Mutex;

    struct RecordingAcceptor(Mutex<Vec<Block>>);

    struct RejectingAcceptor;

    impl BlockAcceptor for RecordingAcceptor {
        fn accept(&self, block: Block) -> Result<(), String> {
            self.0.lock().unwrap().push(block);
            Ok(())
        }
    }

    impl BlockAcceptor for RejectingAcceptor {
        fn accept(&self, _block: Block) -> Result<(), String> {
            Err("stale tip".to_string())
        }
    }

    #[test]
    fn accepted_block_returns_its_header_hash() {
        let client = SubmitBlockClient::new(RecordingAcceptor(Mutex::new(Vec::new())));
        let block = Block::new(BlockHeader::default(), Vec::new());
        let expected = block_header_hash(&block.header);
        assert_eq!(client.submit_block(block).unwrap(), expected);
    }

    #[test]
    fn rejected_block_surfaces_as_an_rpc_error() {
        let client = SubmitBlockClient::new(RejectingAcceptor);
        let block = Block::new(BlockHeader::default(), Vec::new());
        assert!(client.submit_block(block).is_err());
    }
}
