//! Block template assembler and miner loop (spec.md's core): the
//! package selection engine, block assembly pipeline, and miner driver
//! loop described in spec.md §§3-5, built on `chain`/`storage`/
//! `network`/`verification`/`sync` as collaborators.

pub mod block_assembler;
pub mod collaborators;
pub mod config;
pub mod driver;
pub mod error;
pub mod mempool;
pub mod package_selector;
pub mod resource_accounting;

pub use block_assembler::{BlockAssembler, PayoutScripts, Template};
pub use collaborators::{
    AccumulatorCollaborator, AlwaysSynced, AtomicShutdown, ConsensusCollaborator, FakeTimeSource,
    FixedReserveScript, MockAccumulator, MockConsensus, MockWallet, ReserveScriptSource,
    ShutdownSignal, StakingScheduler, SyncStatus, SystemTimeSource, TimeSource, WalletCollaborator,
};
pub use config::MinerConfig;
pub use driver::{run_pos_driver, run_pow_driver, MinerEnvironment, PowThreadGroup, COINBASE_FLAGS};
pub use error::{AssemblerError, DriverError};
pub use mempool::{Entry, MempoolCollaborator, MemoryMempool, ModifiedEntry, ModifiedIndex, PoolHandle};
pub use package_selector::{PackageSelector, SelectorConfig};
pub use resource_accounting::ResourceAccounting;
