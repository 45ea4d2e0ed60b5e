//! Verification helpers consumed by Resource Accounting: transaction fee
//! computation, sigop cost, and package finality. Full consensus
//! verification (script evaluation, proof-of-work/signature checks,
//! chain reorg acceptance) stays in the hosting node's verifier and is
//! out of scope here — this crate only implements the slice the block
//! assembler calls directly.

mod error;
mod fee;
mod finality;
mod sigops;

pub use error::TransactionError;
pub use fee::transaction_fee;
pub use finality::{locktime_cutoff, package_is_final};
pub use sigops::transaction_sigops;
