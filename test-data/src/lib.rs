//! Fixture builders for the core's own unit/integration tests. Not part
//! of the assembler itself.

mod chain_builder;
mod transaction_builder;

pub use chain_builder::ChainBuilder;
pub use transaction_builder::TransactionBuilder;
