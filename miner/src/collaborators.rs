//! Collaborator boundaries from spec.md §6 that don't already live in
//! `storage`/`sync`/`p2p`: wallet (coinstake construction, staking
//! preconditions, signing), consensus (block version/difficulty/PoW
//! check/validity/submission), the privacy accumulator, time, and
//! cooperative shutdown. Each trait ships one in-memory/mock reference
//! implementation, grounded on the teacher's own collaborator-interface
//! pattern (e.g. `db::BlockChainDatabase` standing in for a real chain).
//! Production backends for all of these are out of scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use duskcoin_chain::{Block, Hash256, IndexedTransaction};
use duskcoin_crypto::signing::StakeKey;
use duskcoin_primitives::Compact;

/// `WalletCollaborator` from spec.md §6 / §4.4's PoS driver. A coinstake
/// is a privacy-spend transaction spending the staker's own coin; a real
/// wallet additionally manages the reserve-script lifecycle (reusing it
/// across attempts, rotating it after a PoW payout). That lifecycle is
/// wallet-internal bookkeeping and out of scope here.
pub trait WalletCollaborator: Send + Sync {
    /// Builds a coinstake transaction and the timestamp it is valid for,
    /// given the tip's (height, time). Returns `None` if no eligible coin
    /// is found.
    fn create_coin_stake(&self, height: u32, tip_time: u32) -> Option<(IndexedTransaction, u32)>;
    fn mintable_coins(&self) -> bool;
    fn is_staking_enabled(&self) -> bool;
    fn is_locked(&self) -> bool;
    fn is_unlocked_for_staking_only(&self) -> bool;
    /// Private key keyed by a privacy spend's serial number, used to sign
    /// a just-produced PoS block (§4.3 step 17).
    fn key_for_serial(&self, serial: &Hash256) -> Option<StakeKey>;
}

/// In-memory wallet: always ready to stake, with one pre-seeded
/// coinstake-producing closure. Sufficient for driver tests; production
/// wallets manage real keys and real UTXOs.
pub struct MockWallet {
    pub staking_enabled: bool,
    pub locked: bool,
    pub unlocked_for_staking_only: bool,
    pub has_mintable_coins: bool,
    pub coinstake: Option<(IndexedTransaction, u32)>,
    pub signing_key: StakeKey,
    pub serial: Hash256,
}

impl WalletCollaborator for MockWallet {
    fn create_coin_stake(&self, _height: u32, _tip_time: u32) -> Option<(IndexedTransaction, u32)> {
        self.coinstake.clone()
    }

    fn mintable_coins(&self) -> bool {
        self.has_mintable_coins
    }

    fn is_staking_enabled(&self) -> bool {
        self.staking_enabled
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn is_unlocked_for_staking_only(&self) -> bool {
        self.unlocked_for_staking_only
    }

    fn key_for_serial(&self, serial: &Hash256) -> Option<StakeKey> {
        if serial == &self.serial {
            Some(self.signing_key.clone())
        } else {
            None
        }
    }
}

/// `ConsensusCollaborator` from spec.md §6: the active operations a
/// static `network::ConsensusParams` snapshot cannot express on its own —
/// difficulty retargeting, PoW verification, pre-submit validity, and
/// handing an accepted block to the rest of the node.
pub trait ConsensusCollaborator: Send + Sync {
    fn get_next_work_required(&self, is_pos: bool) -> Compact;
    fn check_pow(&self, header_hash: &Hash256, bits: Compact) -> bool;
    /// Pre-submit validity check (§4.3 step 18): validates the template
    /// without full chain context (it isn't connected yet).
    fn test_block_validity(&self, block: &Block) -> Result<(), String>;
    /// Hands an accepted block to the rest of the node (persistence,
    /// reorg handling, P2P relay) — out of scope beyond this call.
    fn process_new_block(&self, block: Block) -> Result<(), String>;
}

/// Accepts any template whose PoW hash satisfies a fixed, permissive
/// target — useful for driver tests where producing a genuinely valid
/// proof isn't the point.
pub struct MockConsensus {
    pub bits: Compact,
    pub accepted: std::sync::Mutex<Vec<Block>>,
}

impl Default for MockConsensus {
    fn default() -> Self {
        MockConsensus {
            bits: Compact(0x207fffff),
            accepted: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl ConsensusCollaborator for MockConsensus {
    fn get_next_work_required(&self, _is_pos: bool) -> Compact {
        self.bits
    }

    fn check_pow(&self, header_hash: &Hash256, bits: Compact) -> bool {
        match bits.to_u256() {
            Some(target) => header_hash.0 <= target,
            None => false,
        }
    }

    fn test_block_validity(&self, _block: &Block) -> Result<(), String> {
        Ok(())
    }

    fn process_new_block(&self, block: Block) -> Result<(), String> {
        self.accepted.lock().unwrap().push(block);
        Ok(())
    }
}

/// `AccumulatorCollaborator` from spec.md §6 / §4.3 step 14: recomputes
/// the privacy scheme's accumulator checkpoint map every 10th height.
/// The cryptographic accumulator itself is out of scope; this is the
/// interface the assembler calls to get the refreshed map.
pub trait AccumulatorCollaborator: Send + Sync {
    fn calculate_checkpoint(&self, height: u32) -> std::collections::BTreeMap<u32, Hash256>;
}

#[derive(Default)]
pub struct MockAccumulator;

impl AccumulatorCollaborator for MockAccumulator {
    fn calculate_checkpoint(&self, height: u32) -> std::collections::BTreeMap<u32, Hash256> {
        let mut map = std::collections::BTreeMap::new();
        map.insert(0, Hash256([height as u8; 32]));
        map
    }
}

/// `TimeSource` from spec.md §6: adjusted network time, wall clock, and
/// sleep/random, abstracted so the driver loops are testable without
/// real delays.
pub trait TimeSource: Send + Sync {
    fn adjusted_network_time(&self) -> u32;
    fn wall_clock_seconds(&self) -> u64;
    fn wall_clock_micros(&self) -> u64;
    fn sleep(&self, duration: std::time::Duration);
    fn rand_int(&self, bound: u32) -> u32;
}

/// Real-clock implementation; `sleep` blocks the calling thread and
/// `rand_int` draws from `rand`, matching how the real driver would
/// behave when not under test.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn adjusted_network_time(&self) -> u32 {
        self.wall_clock_seconds() as u32
    }

    fn wall_clock_seconds(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    fn wall_clock_micros(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }

    fn sleep(&self, duration: std::time::Duration) {
        std::thread::sleep(duration);
    }

    fn rand_int(&self, bound: u32) -> u32 {
        use rand::Rng;
        if bound == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..bound)
        }
    }
}

/// Deterministic, non-sleeping clock for driver tests: `sleep` just
/// advances an internal counter instead of blocking, and `rand_int`
/// always returns 0 so tests are reproducible.
#[derive(Default)]
pub struct FakeTimeSource {
    pub now: AtomicU64,
}

impl TimeSource for FakeTimeSource {
    fn adjusted_network_time(&self) -> u32 {
        self.now.load(Ordering::SeqCst) as u32
    }

    fn wall_clock_seconds(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn wall_clock_micros(&self) -> u64 {
        self.now.load(Ordering::SeqCst) * 1_000_000
    }

    fn sleep(&self, duration: std::time::Duration) {
        self.now.fetch_add(duration.as_secs().max(1), Ordering::SeqCst);
    }

    fn rand_int(&self, _bound: u32) -> u32 {
        0
    }
}

/// `ShutdownSignal` from spec.md §6: the cooperative cancellation token
/// polled at the driver's three checkpoints (loop head, PoW inner loop,
/// between template builds).
pub trait ShutdownSignal: Send + Sync {
    fn is_shutdown_requested(&self) -> bool;
}

#[derive(Default)]
pub struct AtomicShutdown(AtomicBool);

impl AtomicShutdown {
    pub fn new() -> Self {
        AtomicShutdown(AtomicBool::new(false))
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ShutdownSignal for AtomicShutdown {
    fn is_shutdown_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Initial-block-download status, consulted by both driver loops before
/// they bother building a template (§4.4). A real node derives this from
/// how far its tip lags the best known header; out of scope here beyond
/// the boolean the drivers gate on.
pub trait SyncStatus: Send + Sync {
    fn is_initial_block_download(&self) -> bool;
}

/// Always reports "synced" — the mock used by regtest-style driver tests,
/// where `MinerConfig::genoverride` would bypass this anyway.
#[derive(Default)]
pub struct AlwaysSynced;

impl SyncStatus for AlwaysSynced {
    fn is_initial_block_download(&self) -> bool {
        false
    }
}

/// Reserve-script lifecycle from spec.md §6: the PoW driver mines to
/// whatever script this currently hands out, then calls `keep_script`
/// once a block built against it is accepted so the wallet rotates to a
/// fresh one for the next attempt — mirrors the teacher's
/// `CReserveKey`/`keepScript` pattern rather than mining to one fixed
/// address forever.
pub trait ReserveScriptSource: Send + Sync {
    fn reserve_script(&self) -> duskcoin_script::Script;
    fn keep_script(&self);
}

/// Always hands out the same fixed script; `keep_script` is a no-op
/// counter bump so tests can assert it was called. A real wallet would
/// derive a new address here instead.
pub struct FixedReserveScript {
    pub script: duskcoin_script::Script,
    pub kept: AtomicU64,
}

impl FixedReserveScript {
    pub fn new(script: duskcoin_script::Script) -> Self {
        FixedReserveScript {
            script,
            kept: AtomicU64::new(0),
        }
    }

    pub fn times_kept(&self) -> u64 {
        self.kept.load(Ordering::SeqCst)
    }
}

impl ReserveScriptSource for FixedReserveScript {
    fn reserve_script(&self) -> duskcoin_script::Script {
        self.script.clone()
    }

    fn keep_script(&self) {
        self.kept.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-tip "last hashed" schedule the PoS driver consults before
/// attempting another staking hash against the same tip (§4.4's "staking
/// hash schedule"). A plain `HashMap` behind a mutex is sufficient; this
/// never needs to survive past one process's lifetime.
#[derive(Default)]
pub struct StakingScheduler {
    last_hashed: std::sync::Mutex<HashMap<Hash256, u32>>,
}

impl StakingScheduler {
    pub fn new() -> Self {
        StakingScheduler::default()
    }

    pub fn last_hashed(&self, tip: &Hash256) -> Option<u32> {
        self.last_hashed.lock().unwrap().get(tip).copied()
    }

    pub fn record_hashed(&self, tip: Hash256, when: u32) {
        self.last_hashed.lock().unwrap().insert(tip, when);
    }
}
