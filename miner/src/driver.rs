//! Miner Driver (component D, spec.md §4.4): the PoW nonce-search loop
//! and the PoS staking loop, both built on a shared `MinerEnvironment`
//! bundling every collaborator a template build needs, and both honoring
//! cooperative cancellation polled at the three sites spec.md §5 names —
//! loop head, PoW inner loop body, between template builds.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use duskcoin_chain::constants::MAX_COINBASE_SCRIPT_SIG_SIZE;
use duskcoin_chain::{block_header_hash, Hash256};
use duskcoin_message::BlockAnnouncement;
use duskcoin_network::ConsensusParams;
use duskcoin_p2p::NetworkCollaborator;
use duskcoin_script::{Builder, Script};
use duskcoin_storage::{
    BlockHeaderProvider, ChainIndexStore, PrivacyTracker, TransactionOutputProvider, UtxoView,
};
use duskcoin_sync::{ChainStateGuard, MempoolGuard, NonceCounterGuard};
use log::{debug, info, warn};

use crate::block_assembler::{BlockAssembler, PayoutScripts};
use crate::collaborators::{
    AccumulatorCollaborator, ConsensusCollaborator, ReserveScriptSource, ShutdownSignal,
    StakingScheduler, SyncStatus, TimeSource, WalletCollaborator,
};
use crate::config::MinerConfig;
use crate::mempool::MempoolCollaborator;

/// Tag appended after `(height, extraNonce)` in every PoW coinbase
/// scriptsig, mirroring the teacher's `COINBASE_FLAGS` convention for
/// identifying which implementation mined a block.
pub const COINBASE_FLAGS: &[u8] = b"/duskcoin/";

const INITIAL_BLOCK_DOWNLOAD_SLEEP: Duration = Duration::from_secs(60);
const POS_PRECONDITION_SLEEP: Duration = Duration::from_secs(5);
const POS_UNLOCK_POLL_SLEEP: Duration = Duration::from_millis(2500);
const MINTABLE_RECHECK_SECS: u64 = 5 * 60;
const MINTABLE_REFRESH_SECS: u64 = 60;
const MAX_PAST_BLOCK_TIME: u32 = 2 * 60 * 60;
const MAX_FUTURE_BLOCK_TIME: u32 = 2 * 60 * 60;
const BEST_HEADER_AHEAD_LIMIT: u32 = 60 * 60;
const POW_INNER_ITERATIONS: u32 = 0x10000;
const TEMPLATE_RETRY_SLEEP: Duration = Duration::from_millis(500);

/// Every collaborator `BlockAssembler::create_template` and both driver
/// loops read from, bundled behind one handle so a thread closure clones
/// one `Arc` rather than threading a dozen references through. All
/// fields are trait objects so the node binary can wire in whichever
/// concrete collaborator it has; the `Memory*`/`Mock*` reference
/// implementations scattered across `storage`/`miner`/`p2p` satisfy
/// every bound here.
pub struct MinerEnvironment {
    pub consensus: ConsensusParams,
    pub config: MinerConfig,
    pub payouts: PayoutScripts,
    pub chain_state: ChainStateGuard<Box<dyn ChainIndexStore>>,
    pub header_provider: Box<dyn BlockHeaderProvider>,
    pub mempool: MempoolGuard<Box<dyn MempoolCollaborator>>,
    pub utxo_view: Box<dyn UtxoView>,
    pub output_provider: Box<dyn TransactionOutputProvider>,
    pub privacy_tracker: Box<dyn PrivacyTracker>,
    pub wallet: Option<Box<dyn WalletCollaborator>>,
    pub consensus_collab: Box<dyn ConsensusCollaborator>,
    pub accumulator: Box<dyn AccumulatorCollaborator>,
    pub network: Box<dyn NetworkCollaborator>,
    pub time: Box<dyn TimeSource>,
    pub shutdown: Box<dyn ShutdownSignal>,
    pub sync_status: Box<dyn SyncStatus>,
    pub nonce_counter: NonceCounterGuard,
    pub staking_scheduler: StakingScheduler,
}

impl MinerEnvironment {
    /// Borrows every collaborator into a fresh `BlockAssembler` for one
    /// `create_template` call. Never held across a sleep or a thread
    /// boundary — constructed and consumed within the same loop
    /// iteration.
    fn build_assembler(&self) -> BlockAssembler<'_> {
        BlockAssembler {
            consensus: self.consensus.clone(),
            config: self.config.clone(),
            payouts: self.payouts.clone(),
            chain_state: &self.chain_state,
            header_provider: self.header_provider.as_ref(),
            mempool: &self.mempool,
            utxo_view: self.utxo_view.as_ref(),
            output_provider: self.output_provider.as_ref(),
            privacy_tracker: self.privacy_tracker.as_ref(),
            wallet: self.wallet.as_deref(),
            consensus_collab: self.consensus_collab.as_ref(),
            accumulator: self.accumulator.as_ref(),
            adjusted_network_time: self.time.adjusted_network_time(),
        }
    }

    fn cancelled(&self, generation_cancel: &AtomicBool) -> bool {
        generation_cancel.load(Ordering::SeqCst) || self.shutdown.is_shutdown_requested()
    }

    fn bypasses_tip_gating(&self) -> bool {
        self.config.genoverride
    }
}

/// Builds the coinbase scriptsig the PoW driver rewrites into its
/// template before the inner nonce-search loop: `(height, extraNonce) +
/// COINBASE_FLAGS` (spec.md §4.4), asserting the 100-byte ceiling every
/// real coinbase scriptsig must respect.
fn pow_coinbase_scriptsig(height: u32, extra_nonce: u64) -> Script {
    let script = Builder::default()
        .push_i64(height as i64)
        .push_i64(extra_nonce as i64)
        .push_bytes(COINBASE_FLAGS)
        .into_script();
    assert!(
        script.0.len() <= MAX_COINBASE_SCRIPT_SIG_SIZE,
        "coinbase scriptsig of {} bytes exceeds the {}-byte ceiling",
        script.0.len(),
        MAX_COINBASE_SCRIPT_SIG_SIZE
    );
    script
}

/// One PoW miner thread's body (`minerRun(scriptForPayout)`, spec.md
/// §4.4). Loops until `generation_cancel` or the process-wide shutdown
/// signal fires, polling both at the loop head and inside the inner
/// nonce-search loop.
pub fn run_pow_driver(
    env: Arc<MinerEnvironment>,
    payout: Arc<dyn ReserveScriptSource>,
    generation_cancel: Arc<AtomicBool>,
    thread_id: u32,
) {
    let mut last_tip: Option<Hash256> = None;

    while !env.cancelled(&generation_cancel) {
        if env.sync_status.is_initial_block_download() && !env.bypasses_tip_gating() {
            env.time.sleep(INITIAL_BLOCK_DOWNLOAD_SLEEP);
            continue;
        }

        let tip_hash = env.chain_state.with_snapshot(|index| index.tip().hash);
        if last_tip != Some(tip_hash) {
            env.nonce_counter.reset();
            last_tip = Some(tip_hash);
        }
        let extra_nonce = env.nonce_counter.next_extra_nonce();

        let payout_script = payout.reserve_script();
        let template = match env.build_assembler().create_template(payout_script, true, false, false) {
            Ok(template) => template,
            Err(err) => {
                warn!(target: "miner", "thread {thread_id}: template build failed: {err}");
                env.time.sleep(TEMPLATE_RETRY_SLEEP);
                continue;
            }
        };

        let mut block = template.block;
        block.transactions[0].inputs[0].script_sig =
            pow_coinbase_scriptsig(template.height, extra_nonce);
        block.recompute_merkle_roots();

        let mut hit = false;
        for _ in 0..POW_INNER_ITERATIONS {
            if env.cancelled(&generation_cancel) {
                return;
            }
            block.header.nonce = block.header.nonce.wrapping_add(1);
            let hash = block_header_hash(&block.header);
            env.nonce_counter.record_hash();
            if env.consensus_collab.check_pow(&hash, block.header.bits) {
                hit = true;
                break;
            }
        }

        if !hit {
            debug!(target: "miner", "thread {thread_id}: exhausted inner loop at height {}; rebuilding", template.height);
            continue;
        }

        match env.consensus_collab.process_new_block(block.clone()) {
            Ok(()) => {
                info!(target: "miner", "thread {thread_id}: mined block at height {}", template.height);
                env.network.broadcast_block(BlockAnnouncement { block });
                payout.keep_script();
            }
            Err(err) => warn!(target: "miner", "thread {thread_id}: mined block rejected: {err}"),
        }
    }
}

/// Owns the PoW miner thread pool and implements spec.md §5's
/// thread-group lifecycle: `set_generation(n)` interrupts and joins
/// whatever threads are currently running, then spawns `n` new ones;
/// `n == 0` is interrupt-and-join only.
pub struct PowThreadGroup {
    env: Arc<MinerEnvironment>,
    payout: Arc<dyn ReserveScriptSource>,
    cancel: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl PowThreadGroup {
    pub fn new(env: Arc<MinerEnvironment>, payout: Arc<dyn ReserveScriptSource>) -> Self {
        PowThreadGroup {
            env,
            payout,
            cancel: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    pub fn set_generation(&mut self, threads: u32) {
        self.stop();
        if threads == 0 {
            return;
        }
        self.cancel = Arc::new(AtomicBool::new(false));
        for thread_id in 0..threads {
            let env = Arc::clone(&self.env);
            let payout = Arc::clone(&self.payout);
            let cancel = Arc::clone(&self.cancel);
            let handle = std::thread::Builder::new()
                .name(format!("duskcoin-miner-{thread_id}"))
                .spawn(move || run_pow_driver(env, payout, cancel, thread_id))
                .expect("failed to spawn miner thread");
            self.handles.push(handle);
        }
    }

    pub fn stop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for PowThreadGroup {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The PoS staking loop (spec.md §4.4). Unlike the PoW driver, `height`,
/// signing, and timestamp selection all happen inside
/// `create_template`'s own coinstake step; this loop only gates on the
/// wallet/peer/timing preconditions and drives the staking-hash
/// schedule.
///
/// Spec.md §9 Open Question (d): the source's wallet-lock polling loop
/// breaks out after one iteration regardless of outcome, which reads as
/// unintentional. This loop instead `continue`s back to the top on every
/// failed precondition, re-snapshotting chain state each time, so it
/// genuinely polls until the conditions clear.
pub fn run_pos_driver(env: Arc<MinerEnvironment>, generation_cancel: Arc<AtomicBool>) {
    let mut cached_mintable = false;
    let mut last_mintable_check: u64 = 0;

    loop {
        if env.cancelled(&generation_cancel) {
            return;
        }

        let (height, tip_time, tip_hash) = env
            .chain_state
            .with_snapshot(|index| {
                let tip = index.tip();
                (tip.height, tip.time, tip.hash)
            });
        let best_header_time = env.chain_state.with_snapshot(|index| index.best_header_time());

        let header_too_far_ahead =
            best_header_time.saturating_sub(tip_time) > BEST_HEADER_AHEAD_LIMIT;
        if header_too_far_ahead || (env.sync_status.is_initial_block_download() && !env.bypasses_tip_gating()) {
            env.time.sleep(POS_PRECONDITION_SLEEP);
            continue;
        }

        let wallet = match env.wallet.as_deref() {
            Some(wallet) => wallet,
            None => {
                env.time.sleep(POS_PRECONDITION_SLEEP);
                continue;
            }
        };

        let preconditions_met = env.network.peer_count() >= 1
            && wallet.is_staking_enabled()
            && env.consensus.is_pos_active(height + 1);
        if !preconditions_met {
            env.time.sleep(POS_PRECONDITION_SLEEP);
            continue;
        }

        let now = env.time.wall_clock_seconds();
        let due_for_recheck = now.saturating_sub(last_mintable_check) >= MINTABLE_RECHECK_SECS;
        let due_for_refresh =
            !cached_mintable && now.saturating_sub(last_mintable_check) >= MINTABLE_REFRESH_SECS;
        if due_for_recheck || due_for_refresh {
            cached_mintable = wallet.mintable_coins();
            last_mintable_check = now;
        }

        let adjusted_time = env.time.adjusted_network_time();
        let wallet_unspendable = wallet.is_locked() && !wallet.is_unlocked_for_staking_only();
        let too_far_behind_tip =
            (adjusted_time as i64) < tip_time as i64 - i64::from(MAX_PAST_BLOCK_TIME);
        if wallet_unspendable || !cached_mintable || too_far_behind_tip {
            env.time.sleep(POS_UNLOCK_POLL_SLEEP);
            continue;
        }

        if let Some(last_hashed) = env.staking_scheduler.last_hashed(&tip_hash) {
            let margin = 60 + env.time.rand_int(20);
            let headroom = (adjusted_time + MAX_FUTURE_BLOCK_TIME).saturating_sub(last_hashed);
            if headroom < margin {
                env.time.sleep(Duration::from_secs(u64::from(env.time.rand_int(10))));
                continue;
            }
        }
        env.staking_scheduler.record_hashed(tip_hash, adjusted_time);

        let template = match env
            .build_assembler()
            .create_template(Script::default(), true, true, false)
        {
            Ok(template) => template,
            Err(err) => {
                debug!(target: "miner", "coinstake template build failed: {err}");
                continue;
            }
        };

        let block = template.block;
        match env.consensus_collab.process_new_block(block.clone()) {
            Ok(()) => {
                info!(target: "miner", "staked block accepted at height {}", template.height);
                env.network.broadcast_block(BlockAnnouncement { block });
            }
            Err(err) => warn!(target: "miner", "staked block rejected: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{Hash160, IndexedTransaction, OutPoint, Transaction, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_network::{ConsensusParams, Network};
    use duskcoin_script::build_p2pkh;
    use duskcoin_storage::{
        ChainIndexEntry, MemoryBlockHeaderProvider, MemoryChainIndex, MemoryPrivacyTracker,
        MemoryUtxoView,
    };
    use duskcoin_sync::{ChainStateGuard, MempoolGuard, NonceCounterGuard};
    use duskcoin_p2p::MockPeerSet;

    use crate::collaborators::{
        AlwaysSynced, AtomicShutdown, FakeTimeSource, FixedReserveScript, MockAccumulator,
        MockConsensus, MockWallet, StakingScheduler,
    };
    use crate::mempool::MemoryMempool;

    fn consensus_params() -> ConsensusParams {
        let mut p = ConsensusParams::for_network(Network::Regtest);
        p.pos_start_height = 0;
        p
    }

    fn payouts() -> PayoutScripts {
        PayoutScripts {
            founder: build_p2pkh(&Hash160([1u8; 20])),
            lab: build_p2pkh(&Hash160([2u8; 20])),
            budget: build_p2pkh(&Hash160([3u8; 20])),
            reserve: build_p2pkh(&Hash160([9u8; 20])),
        }
    }

    fn seeded_chain_index() -> MemoryChainIndex {
        let mut index = MemoryChainIndex::new();
        index.push(ChainIndexEntry {
            height: 0,
            hash: Hash256::zero(),
            time: 1_700_000_000,
            network_reward_reserve: 0,
        });
        index
    }

    /// Forwards `process_new_block` into a shared log the test can
    /// inspect after the environment has been moved into a thread,
    /// since `MinerEnvironment` only exposes its consensus collaborator
    /// as a trait object.
    struct SharedConsensus {
        bits: duskcoin_primitives::Compact,
        accepted: Arc<std::sync::Mutex<Vec<duskcoin_chain::Block>>>,
    }

    impl ConsensusCollaborator for SharedConsensus {
        fn get_next_work_required(&self, _is_pos: bool) -> duskcoin_primitives::Compact {
            self.bits
        }

        fn check_pow(&self, header_hash: &Hash256, bits: duskcoin_primitives::Compact) -> bool {
            match bits.to_u256() {
                Some(target) => header_hash.0 <= target,
                None => false,
            }
        }

        fn test_block_validity(&self, _block: &duskcoin_chain::Block) -> Result<(), String> {
            Ok(())
        }

        fn process_new_block(&self, block: duskcoin_chain::Block) -> Result<(), String> {
            self.accepted.lock().unwrap().push(block);
            Ok(())
        }
    }

    fn test_environment(
        wallet: Option<Box<dyn WalletCollaborator>>,
        consensus_collab: Box<dyn ConsensusCollaborator>,
    ) -> Arc<MinerEnvironment> {
        let chain_state = ChainStateGuard::new(Box::new(seeded_chain_index()) as Box<dyn ChainIndexStore>);
        let mempool: Box<dyn MempoolCollaborator> = Box::new(MemoryMempool::new());
        Arc::new(MinerEnvironment {
            consensus: consensus_params(),
            config: MinerConfig::default(),
            payouts: payouts(),
            chain_state,
            header_provider: Box::new(MemoryBlockHeaderProvider::new()),
            mempool: MempoolGuard::new(mempool),
            utxo_view: Box::new(MemoryUtxoView::new()),
            output_provider: Box::new(MemoryUtxoView::new()),
            privacy_tracker: Box::new(MemoryPrivacyTracker::new()),
            wallet,
            consensus_collab,
            accumulator: Box::new(MockAccumulator),
            network: Box::new(MockPeerSet::new(1)),
            time: Box::new(FakeTimeSource {
                now: std::sync::atomic::AtomicU64::new(1_700_000_100),
            }),
            shutdown: Box::new(AtomicShutdown::new()),
            sync_status: Box::new(AlwaysSynced),
            nonce_counter: NonceCounterGuard::new(),
            staking_scheduler: StakingScheduler::new(),
        })
    }

    #[test]
    fn pow_coinbase_scriptsig_encodes_height_then_extra_nonce_then_flags() {
        let script = pow_coinbase_scriptsig(12345, 7);
        // First push is the minimally-encoded height; its length prefix
        // sits at byte 0.
        let height_push_len = script.0[0] as usize;
        assert!(height_push_len > 0);
        assert!(script.0.len() <= MAX_COINBASE_SCRIPT_SIG_SIZE);
    }

    #[test]
    fn pow_driver_mines_and_submits_a_block_within_one_template() {
        // Permissive target: the top 3 bytes of the hash must be small,
        // which the inner 65536-iteration nonce search satisfies with
        // overwhelming probability well before it runs out.
        let accepted = Arc::new(std::sync::Mutex::new(Vec::new()));
        let consensus_collab: Box<dyn ConsensusCollaborator> = Box::new(SharedConsensus {
            bits: duskcoin_primitives::Compact(0x207fffff),
            accepted: Arc::clone(&accepted),
        });
        let env = test_environment(None, consensus_collab);

        let reserve = Arc::new(FixedReserveScript::new(build_p2pkh(&Hash160([7u8; 20]))));
        let payout: Arc<dyn ReserveScriptSource> = reserve.clone();
        let cancel = Arc::new(AtomicBool::new(false));

        let driver_env = Arc::clone(&env);
        let driver_payout = Arc::clone(&payout);
        let driver_cancel = Arc::clone(&cancel);
        let handle = std::thread::spawn(move || {
            run_pow_driver(driver_env, driver_payout, driver_cancel, 0);
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        loop {
            if !accepted.lock().unwrap().is_empty() {
                break;
            }
            if std::time::Instant::now() > deadline {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cancel.store(true, Ordering::SeqCst);
        handle.join().unwrap();

        assert!(!accepted.lock().unwrap().is_empty());
        assert!(reserve.times_kept() > 0);
    }

    #[test]
    fn pos_driver_without_a_wallet_does_not_panic_and_respects_cancellation() {
        let consensus_collab: Box<dyn ConsensusCollaborator> = Box::new(MockConsensus::default());
        let env = test_environment(None, consensus_collab);
        let cancel = Arc::new(AtomicBool::new(true));
        // With `cancel` already set, the loop must return immediately.
        run_pos_driver(env, cancel);
    }

    #[test]
    fn pos_driver_stakes_once_wallet_preconditions_are_satisfied() {
        let signing_key = duskcoin_crypto::signing::StakeKey::from_bytes([9u8; 32]);
        let serial = Hash256([5u8; 32]);
        let coinstake = IndexedTransaction::from_raw(Transaction {
            version: 1,
            kind: TxKind::PrivacySpend(duskcoin_chain::SpendProof {
                serial_hashes: vec![serial],
                proof: vec![],
            }),
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::default(),
                sequence: u32::MAX,
            }],
            outputs: vec![TransactionOutput {
                value: 0,
                script_pubkey: Script::default(),
            }],
            lock_time: 0,
        });
        let wallet: Box<dyn WalletCollaborator> = Box::new(MockWallet {
            staking_enabled: true,
            locked: false,
            unlocked_for_staking_only: false,
            has_mintable_coins: true,
            coinstake: Some((coinstake, 1_700_000_200)),
            signing_key,
            serial,
        });
        let consensus_collab: Box<dyn ConsensusCollaborator> = Box::new(MockConsensus::default());
        let env = test_environment(Some(wallet), consensus_collab);
        let cancel = Arc::new(AtomicBool::new(false));

        let driver_env = Arc::clone(&env);
        let driver_cancel = Arc::clone(&cancel);
        let handle = std::thread::spawn(move || run_pos_driver(driver_env, driver_cancel));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        cancel.store(true, Ordering::SeqCst);
        handle.join().unwrap();
    }
}
