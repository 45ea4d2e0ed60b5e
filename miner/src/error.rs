//! Error taxonomy from spec.md §7. Every assembler/driver failure
//! surfaces as one of these variants rather than a bare `String`, so
//! callers (the driver, the RPC boundary) can branch on *which* failure
//! happened instead of substring-matching a message.

use thiserror::Error;

/// Failures `BlockAssembler::create_template` can return. Every variant
/// maps to a named row in spec.md §7's taxonomy.
#[derive(Debug, Error)]
pub enum AssemblerError {
    /// PoS template requested with no main wallet available.
    #[error("no wallet available for proof-of-stake template assembly")]
    WalletUnavailable,
    /// The wallet collaborator could not produce a coinstake.
    #[error("coinstake construction failed: {0}")]
    CoinstakeFailed(String),
    /// The mempool guard's try-lock failed; the caller should retry later.
    #[error("mempool is busy")]
    MempoolBusy,
    /// Pre-submit consensus validity check rejected the assembled block.
    #[error("assembled template failed validity check: {0}")]
    TemplateInvalid(String),
    /// Block signing failed: missing key or signature failure.
    #[error("block signing failed: {0}")]
    SignFailed(String),
    /// Height has not yet reached the configured PoS start height.
    #[error("proof-of-stake not yet active at this height")]
    PosNotActive,
    /// The sapling-style commitment/accumulator state needed for this
    /// template is missing for the previous block.
    #[error("accumulator state for block {0} is not available")]
    AccumulatorStateMissing(String),
}

impl From<duskcoin_sync::MempoolBusy> for AssemblerError {
    fn from(_: duskcoin_sync::MempoolBusy) -> Self {
        AssemblerError::MempoolBusy
    }
}

/// Failures surfaced by the miner driver loops. `Cancelled` is the only
/// variant allowed to propagate out of a driver's top level — everything
/// else is logged and the loop continues per its own retry schedule.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("template assembly failed: {0}")]
    Assembler(#[from] AssemblerError),
    /// Both full-node-proof and PoW were requested; logged and ignored,
    /// never propagated to the caller (spec.md §7, §9 Open Question a).
    #[error("full-node-proof requested without proof-of-stake; ignoring")]
    IncompatibleFlags,
    /// Cooperative cancellation observed at a poll point.
    #[error("driver loop cancelled")]
    Cancelled,
}
