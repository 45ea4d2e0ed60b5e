/// Weight units per serialized byte applied to package size when testing
/// the block weight budget (Resource Accounting, §4.1).
pub const WITNESS_SCALE_FACTOR: u64 = 4;

/// Reserved weight at the head of every template for the coinbase (and,
/// for PoS, the coinstake installed right after it).
pub const COINBASE_RESERVED_WEIGHT: u64 = 4000;

/// Starting sigop-cost budget reserved for the coinbase.
pub const COINBASE_RESERVED_SIGOPS: u64 = 400;

/// Accumulator checkpoints are refreshed once per this many blocks.
pub const ACCUMULATOR_CHECKPOINT_INTERVAL: u32 = 10;

/// Upper bound prefixed to every coinbase scriptsig: `(height, extraNonce)`
/// push plus flag bytes must not exceed this length.
pub const MAX_COINBASE_SCRIPT_SIG_SIZE: usize = 100;
