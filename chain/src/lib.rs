//! Transaction, header and block types for the hosting chain. Validation
//! (consensus rules, script evaluation, proof verification) lives in the
//! `verification` crate and the (out-of-scope) node's own rule engine —
//! this crate only models the wire/data shape the block assembler reads
//! and writes.

pub mod block;
pub mod block_header;
pub mod constants;
pub mod indexed_header;
pub mod indexed_transaction;
pub mod merkle;
pub mod privacy;
pub mod transaction;

pub use duskcoin_primitives::hash::{Hash160, Hash256};
pub use duskcoin_primitives::{Bytes, Compact};

pub use block::Block;
pub use block_header::{block_header_hash, BlockHeader};
pub use indexed_header::IndexedBlockHeader;
pub use indexed_transaction::IndexedTransaction;
pub use merkle::{merkle_node_hash, merkle_root, witness_merkle_root};
pub use privacy::{MintProof, SpendProof};
pub use transaction::{OutPoint, Transaction, TransactionInput, TransactionOutput, TxKind};
