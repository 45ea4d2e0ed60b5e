//! `duskcoind`: wires the `duskcoin-miner` core (resource accounting,
//! package selection, block assembly, miner driver) to concrete
//! collaborators and drives it from the command line.
//!
//! Persistent chain storage, P2P networking, wallet key management, and
//! the RPC method surface are out of scope (spec.md §1 Non-goals); this
//! binary backs those boundaries with the in-memory reference
//! collaborators the `duskcoin-miner`/`duskcoin-storage` crates already
//! ship for their own tests, which is the only implementation of them
//! this workspace has.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};
use parking_lot::Mutex;

use duskcoin_chain::{block_header_hash, Block, Hash256, IndexedBlockHeader, OutPoint, Transaction};
use duskcoin_db::ChainDatabase;
use duskcoin_keys::Address;
use duskcoin_miner::collaborators::{AlwaysSynced, AtomicShutdown, MockAccumulator, SystemTimeSource};
use duskcoin_miner::driver::{run_pos_driver, MinerEnvironment, PowThreadGroup};
use duskcoin_miner::mempool::MemoryMempool;
use duskcoin_miner::{ConsensusCollaborator, MinerConfig, PayoutScripts, ReserveScriptSource};
use duskcoin_network::{ConsensusParams, Network};
use duskcoin_p2p::MockPeerSet;
use duskcoin_primitives::{Compact, Hash160};
use duskcoin_script::{build_for_address, build_p2pkh, Script};
use duskcoin_storage::{
    BlockHeaderProvider, ChainIndexEntry, ChainIndexStore, PrivacyTracker, TransactionOutputProvider,
    UtxoView,
};
use duskcoin_sync::{ChainStateGuard, MempoolGuard, NonceCounterGuard};

/// Block template assembler and miner loop for a UTXO node supporting
/// proof-of-work and proof-of-stake block production.
#[derive(Parser, Debug)]
#[command(name = "duskcoind", version, about)]
struct Cli {
    /// Which network to mine against.
    #[arg(long, value_enum, default_value_t = NetworkArg::Regtest)]
    network: NetworkArg,

    /// Number of PoW miner threads to run. 0 disables PoW mining.
    #[arg(long, default_value_t = 1)]
    threads: u32,

    /// Runs the proof-of-stake driver loop alongside PoW mining.
    #[arg(long)]
    stake: bool,

    /// Address PoW block rewards and PoS coinbase slots are paid to.
    #[arg(long)]
    payout: Option<String>,

    /// Founder reward address.
    #[arg(long)]
    founder_address: Option<String>,

    /// Lab reward address.
    #[arg(long)]
    lab_address: Option<String>,

    /// Budget reward address.
    #[arg(long)]
    budget_address: Option<String>,

    /// Network-reward reserve address.
    #[arg(long)]
    reserve_address: Option<String>,

    /// Hard cap on assembled block weight (clamped into `[4000, MAX/4]`).
    #[arg(long)]
    blockmaxweight: Option<u64>,

    /// Optional floor on package feerate (disabled by default).
    #[arg(long, default_value_t = 0)]
    blockmintxfee: u64,

    /// Regtest-only override of the header version field.
    #[arg(long)]
    blockversion: Option<u32>,

    /// Bypasses initial-block-download and tip-age gating.
    #[arg(long)]
    genoverride: bool,

    /// Diagnostic per-tx feerate logging during package selection.
    #[arg(long)]
    printpriority: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum NetworkArg {
    Mainnet,
    Testnet,
    Regtest,
}

impl From<NetworkArg> for Network {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Mainnet => Network::Mainnet,
            NetworkArg::Testnet => Network::Testnet,
            NetworkArg::Regtest => Network::Regtest,
        }
    }
}

/// Resolves a configured payout address into an output script, falling
/// back to an all-zero placeholder (with a warning) when absent or
/// unparseable — enough for `--threads 0` dry runs that never submit a
/// block built against it.
fn resolve_payout(label: &str, address: &Option<String>) -> Script {
    match address.as_deref().map(Address::from_str) {
        Some(Ok(address)) => build_for_address(&address),
        Some(Err(_)) => {
            warn!(target: "duskcoind", "{label} address is not valid base58; using a placeholder script");
            build_p2pkh(&Hash160([0u8; 20]))
        }
        None => {
            warn!(target: "duskcoind", "no {label} address configured; using a placeholder script");
            build_p2pkh(&Hash160([0u8; 20]))
        }
    }
}

/// Thin view over the shared `ChainDatabase` implementing one
/// collaborator trait by locking and delegating. Four of these share one
/// `Arc<Mutex<ChainDatabase>>` so `MinerEnvironment`'s four separate
/// trait-object fields all observe the same accepted-block state.
struct SharedView(Arc<Mutex<ChainDatabase>>);

impl ChainIndexStore for SharedView {
    fn tip(&self) -> ChainIndexEntry {
        self.0.lock().tip()
    }

    fn best_header_time(&self) -> u32 {
        self.0.lock().best_header_time()
    }

    fn index_by_hash(&self, hash: &Hash256) -> Option<ChainIndexEntry> {
        self.0.lock().index_by_hash(hash)
    }

    fn median_time_past(&self, of: &ChainIndexEntry) -> u32 {
        self.0.lock().median_time_past(of)
    }

    fn push(&mut self, entry: ChainIndexEntry) {
        self.0.lock().push(entry);
    }
}

impl BlockHeaderProvider for SharedView {
    fn block_header(&self, hash: &Hash256) -> Option<IndexedBlockHeader> {
        self.0.lock().block_header(hash)
    }
}

impl UtxoView for SharedView {
    fn is_available(&self, outpoint: &OutPoint) -> bool {
        self.0.lock().is_available(outpoint)
    }
}

impl TransactionOutputProvider for SharedView {
    fn transaction_output(&self, outpoint: &OutPoint) -> Option<duskcoin_chain::TransactionOutput> {
        self.0.lock().transaction_output(outpoint)
    }
}

impl PrivacyTracker for SharedView {
    fn confirmed_serial_height(&self, serial: &Hash256) -> Option<u32> {
        self.0.lock().confirmed_serial_height(serial)
    }

    fn confirmed_pubcoin_height(&self, pubcoin: &Hash256) -> Option<u32> {
        self.0.lock().confirmed_pubcoin_height(pubcoin)
    }
}

/// `ConsensusCollaborator` backing this binary. Real difficulty
/// retargeting and full consensus validation are rule-engine territory
/// and out of scope (spec.md §1 Non-goals); this checks PoW against a
/// fixed per-network target and appends the accepted block's header and
/// index entry to the shared chain database, which is what lets the
/// driver observe height/tip progression across submitted blocks.
struct NodeConsensus {
    bits: Compact,
    store: Arc<Mutex<ChainDatabase>>,
}

impl ConsensusCollaborator for NodeConsensus {
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
        let hash = block_header_hash(&block.header);
        let mut store = self.store.lock();
        let tip = store.tip();
        store.insert_header(IndexedBlockHeader::new(hash, block.header.clone()));
        store.push(ChainIndexEntry {
            height: tip.height + 1,
            hash,
            time: block.header.time,
            network_reward_reserve: network_reward_paid(&block),
        });
        Ok(())
    }
}

/// Reads the network-reward reserve carried by this block's coinbase, so
/// the next `createTemplate` call starts its scan from the right running
/// total (spec.md §4.3 step 7 is cumulative across blocks).
fn network_reward_paid(block: &Block) -> u64 {
    block
        .transactions
        .first()
        .map(|coinbase: &Transaction| coinbase.outputs.iter().map(|o| o.value).sum())
        .unwrap_or(0)
}

/// No-op reserve script source for a binary that always mines to the
/// address given on the command line; a real wallet would rotate this
/// after every accepted block (spec.md §6 "reserveScript lifecycle").
struct FixedPayout(Script);

impl ReserveScriptSource for FixedPayout {
    fn reserve_script(&self) -> Script {
        self.0.clone()
    }

    fn keep_script(&self) {}
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let network: Network = cli.network.into();
    let mut consensus = ConsensusParams::for_network(network);
    if let Some(max_weight) = cli.blockmaxweight {
        consensus.max_block_weight = max_weight;
    }
    if cli.blockversion.is_some() && !matches!(network, Network::Regtest) {
        warn!(target: "duskcoind", "--blockversion is regtest-only; ignoring on this network");
    }

    let config = MinerConfig {
        block_max_weight: consensus.max_block_weight,
        block_min_tx_fee: cli.blockmintxfee,
        block_version: matches!(network, Network::Regtest).then_some(cli.blockversion).flatten(),
        genoverride: cli.genoverride,
        printpriority: cli.printpriority,
    };

    let payouts = PayoutScripts {
        founder: resolve_payout("founder", &cli.founder_address),
        lab: resolve_payout("lab", &cli.lab_address),
        budget: resolve_payout("budget", &cli.budget_address),
        reserve: resolve_payout("reserve", &cli.reserve_address),
    };
    let payout_script = resolve_payout("payout", &cli.payout);

    let mut database = ChainDatabase::new();
    database.index.push(ChainIndexEntry {
        height: 0,
        hash: Hash256::zero(),
        time: SystemTimeSource.wall_clock_seconds() as u32,
        network_reward_reserve: 0,
    });
    let store = Arc::new(Mutex::new(database));

    let bits = match network {
        Network::Regtest => Compact::new(0x207f_ffff),
        Network::Testnet => Compact::new(0x1e03_ffff),
        Network::Mainnet => Compact::new(0x1d00_ffff),
    };

    let chain_state = ChainStateGuard::new(Box::new(SharedView(Arc::clone(&store))) as Box<dyn ChainIndexStore>);
    let mempool: Box<dyn duskcoin_miner::MempoolCollaborator> = Box::new(MemoryMempool::new());

    let env = Arc::new(MinerEnvironment {
        consensus: consensus.clone(),
        config,
        payouts,
        chain_state,
        header_provider: Box::new(SharedView(Arc::clone(&store))),
        mempool: MempoolGuard::new(mempool),
        utxo_view: Box::new(SharedView(Arc::clone(&store))),
        output_provider: Box::new(SharedView(Arc::clone(&store))),
        privacy_tracker: Box::new(SharedView(Arc::clone(&store))),
        wallet: cli.stake.then(|| {
            let signing_key = duskcoin_crypto::signing::StakeKey::from_bytes([0x42u8; 32]);
            Box::new(duskcoin_miner::MockWallet {
                staking_enabled: true,
                locked: false,
                unlocked_for_staking_only: false,
                has_mintable_coins: false,
                coinstake: None,
                signing_key,
                serial: Hash256::zero(),
            }) as Box<dyn duskcoin_miner::WalletCollaborator>
        }),
        consensus_collab: Box::new(NodeConsensus {
            bits,
            store: Arc::clone(&store),
        }),
        accumulator: Box::new(MockAccumulator),
        network: Box::new(MockPeerSet::new(0)),
        time: Box::new(SystemTimeSource),
        shutdown: Box::new(AtomicShutdown::new()),
        sync_status: Box::new(AlwaysSynced),
        nonce_counter: NonceCounterGuard::new(),
        staking_scheduler: duskcoin_miner::StakingScheduler::new(),
    });

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    {
        let shutdown_flag = Arc::clone(&shutdown_flag);
        ctrlc::set_handler(move || {
            info!(target: "duskcoind", "shutdown requested");
            shutdown_flag.store(true, Ordering::SeqCst);
        })
        .expect("failed to install Ctrl-C handler");
    }

    let mut pow_threads = PowThreadGroup::new(
        Arc::clone(&env),
        Arc::new(FixedPayout(payout_script)) as Arc<dyn ReserveScriptSource>,
    );
    pow_threads.set_generation(cli.threads);
    info!(target: "duskcoind", "started {} PoW miner thread(s)", pow_threads.thread_count());

    let pos_handle = cli.stake.then(|| {
        let pos_env = Arc::clone(&env);
        let pos_cancel = Arc::new(AtomicBool::new(false));
        let handle_cancel = Arc::clone(&pos_cancel);
        let handle = std::thread::Builder::new()
            .name("duskcoin-staker".to_string())
            .spawn(move || run_pos_driver(pos_env, handle_cancel))
            .expect("failed to spawn staking thread");
        (handle, pos_cancel)
    });

    while !shutdown_flag.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    info!(target: "duskcoind", "stopping miner threads");
    pow_threads.stop();
    if let Some((handle, cancel)) = pos_handle {
        cancel.store(true, Ordering::SeqCst);
        let _ = handle.join();
    }
}
