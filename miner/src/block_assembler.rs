//! Block Assembler (component C, spec.md §4.3): the single
//! `create_template` operation that drives tip snapshot, optional
//! coinstake construction, package selection, privacy screening,
//! coinbase/coinstake assembly, header finalization, and the pre-submit
//! validity check — atomically under the chain-state guard.

use std::collections::{BTreeMap, HashMap, HashSet};

use duskcoin_chain::constants::ACCUMULATOR_CHECKPOINT_INTERVAL;
use duskcoin_chain::{
    block_header_hash, Block, BlockHeader, Hash256, IndexedTransaction, OutPoint, Transaction,
    TransactionInput, TransactionOutput, TxKind,
};
use duskcoin_crypto::dhash256;
use duskcoin_network::{accumulate_network_reward, block_subsidy, ConsensusParams, RewardSplit};
use duskcoin_script::{Builder, Script};
use duskcoin_storage::{BlockHeaderProvider, ChainIndexStore, PrivacyTracker, TransactionOutputProvider, UtxoView};
use duskcoin_sync::{ChainStateGuard, MempoolGuard};
use duskcoin_verification::{locktime_cutoff, transaction_fee, transaction_sigops};
use log::warn;

use crate::collaborators::{AccumulatorCollaborator, ConsensusCollaborator, WalletCollaborator};
use crate::config::MinerConfig;
use crate::error::AssemblerError;
use crate::mempool::{MempoolCollaborator, PoolHandle};
use crate::package_selector::{PackageSelector, SelectorConfig};
use crate::resource_accounting::ResourceAccounting;

/// A finished candidate block plus the metadata the miner driver and RPC
/// submission boundary need about it.
pub struct Template {
    pub block: Block,
    pub height: u32,
    pub fees: u64,
    pub reward: RewardSplit,
    pub is_pos: bool,
}

/// Addresses the coinbase/coinstake pays besides the miner/staker slot
/// itself, resolved once per network (spec.md §6's payout configuration).
#[derive(Clone, Debug)]
pub struct PayoutScripts {
    pub founder: Script,
    pub lab: Script,
    pub budget: Script,
    pub reserve: Script,
}

/// Bundles every collaborator `create_template` reads from. Trait
/// objects throughout (rather than a generic-per-collaborator design)
/// since exactly one concrete implementation of each exists in this
/// repo; a production node would still satisfy these same boundaries.
pub struct BlockAssembler<'a> {
    pub consensus: ConsensusParams,
    pub config: MinerConfig,
    pub payouts: PayoutScripts,
    pub chain_state: &'a ChainStateGuard<Box<dyn ChainIndexStore>>,
    pub header_provider: &'a dyn BlockHeaderProvider,
    pub mempool: &'a MempoolGuard<Box<dyn MempoolCollaborator>>,
    pub utxo_view: &'a dyn UtxoView,
    pub output_provider: &'a dyn TransactionOutputProvider,
    pub privacy_tracker: &'a dyn PrivacyTracker,
    pub wallet: Option<&'a dyn WalletCollaborator>,
    pub consensus_collab: &'a dyn ConsensusCollaborator,
    pub accumulator: &'a dyn AccumulatorCollaborator,
    pub adjusted_network_time: u32,
}

struct SelectionResult {
    transactions: Vec<IndexedTransaction>,
    total_fees: u64,
}

impl<'a> BlockAssembler<'a> {
    pub fn create_template(
        &self,
        payout_script: Script,
        want_witness: bool,
        is_pos: bool,
        is_full_node_proof: bool,
    ) -> Result<Template, AssemblerError> {
        // Step 1: snapshot the tip.
        let tip = self.chain_state.with_snapshot(|index| index.tip());
        let height = tip.height + 1;

        // Step 2: optional coinstake.
        let mut coinstake: Option<IndexedTransaction> = None;
        let mut block_time;
        if is_pos {
            if !self.consensus.is_pos_active(height) {
                return Err(AssemblerError::PosNotActive);
            }
            let wallet = self.wallet.ok_or(AssemblerError::WalletUnavailable)?;
            let (stake_tx, stake_time) = wallet
                .create_coin_stake(height, tip.time)
                .ok_or_else(|| {
                    AssemblerError::CoinstakeFailed("no eligible coin found".to_string())
                })?;
            block_time = stake_time;
            coinstake = Some(stake_tx);
        } else {
            let median_time_past = self.chain_state.with_snapshot(|index| index.median_time_past(&tip));
            block_time = median_time_past.saturating_add(1).max(self.adjusted_network_time);
            block_time = block_time.max(tip.time);
        }

        // Step 4: block version and median-time-past for the locktime cutoff.
        let version = self
            .config
            .block_version
            .unwrap_or_else(|| self.consensus.compute_block_version(tip.height));
        let median_time_past = self.chain_state.with_snapshot(|index| index.median_time_past(&tip));

        // Step 5: locktime cutoff. Median-time-past locktime is treated as
        // permanently active; the soft-fork flag that would gate this in a
        // production node is consensus-rule state out of scope here.
        let cutoff = locktime_cutoff(true, median_time_past, block_time);

        // Steps 3, 6-9: mempool guard, package selection, network-reward
        // scan, privacy screening, tx-list rebuild. All under one
        // non-blocking try-lock per spec.md §5.
        let selector_config = SelectorConfig {
            min_package_feerate: (self.config.block_min_tx_fee > 0)
                .then_some((self.config.block_min_tx_fee, 1)),
            want_witness,
            print_priority: self.config.printpriority,
        };
        let selection: SelectionResult = self
            .mempool
            .try_with(|pool_box| {
                let pool: &mut dyn MempoolCollaborator = pool_box.as_mut();
                self.select_and_screen(pool, height, cutoff, selector_config)
            })
            .map_err(AssemblerError::from)?;

        // Step 7: network-reward reserve.
        let mut network_reward = tip.network_reward_reserve;
        for it in &selection.transactions {
            for output in &it.raw.outputs {
                if output.script_pubkey == self.payouts.reserve {
                    network_reward = accumulate_network_reward(
                        network_reward,
                        output.value,
                        duskcoin_network::MAX_NETWORK_REWARD,
                    );
                }
            }
        }

        // Step 10: reward split.
        let gross_reward = block_subsidy(height).saturating_add(selection.total_fees);
        let mut reward = self.consensus.budget_schedule(height, gross_reward);
        reward.network_reward = network_reward;

        // Step 11: coinbase construction.
        let coinbase = self.build_coinbase(height, is_pos, &reward, &payout_script);

        // Step 12: assemble the transaction list, installing the
        // coinstake at index 1 when PoS.
        let mut transactions = Vec::with_capacity(selection.transactions.len() + 2);
        transactions.push(coinbase);
        if is_pos {
            let stake = coinstake
                .clone()
                .ok_or_else(|| AssemblerError::CoinstakeFailed("missing coinstake".to_string()))?;
            transactions.push(stake.raw);
        }
        transactions.extend(selection.transactions.iter().map(|it| it.raw.clone()));

        // Step 13: finalize the header.
        let mut header = BlockHeader {
            version,
            previous_header_hash: tip.hash,
            merkle_root: Hash256::zero(),
            witness_merkle_root: Hash256::zero(),
            time: block_time,
            bits: self.consensus_collab.get_next_work_required(is_pos),
            nonce: 0,
            accumulator_checkpoint: BTreeMap::new(),
            auxiliary_data_hash: Hash256::zero(),
            full_node_proof_hash: None,
            signature: None,
        };

        // Step 14: accumulator checkpoint.
        header.accumulator_checkpoint = if height % ACCUMULATOR_CHECKPOINT_INTERVAL == 0 {
            self.accumulator.calculate_checkpoint(height)
        } else {
            self.header_provider
                .block_header(&tip.hash)
                .map(|h| h.raw.accumulator_checkpoint)
                .unwrap_or_default()
        };

        let mut block = Block::new(header, transactions);
        block.recompute_merkle_roots();

        // Step 15: full-node proof.
        if is_full_node_proof {
            if is_pos {
                let mut stream_input = Vec::new();
                stream_input.extend_from_slice(block.header.merkle_root.as_bytes());
                stream_input.extend_from_slice(block.header.witness_merkle_root.as_bytes());
                block.header.full_node_proof_hash = Some(dhash256(&stream_input));
            } else {
                warn!(
                    target: "miner",
                    "full-node-proof requested without proof-of-stake at height {height}; ignoring"
                );
            }
        }

        // Step 16: auxiliary data hash.
        block.header.auxiliary_data_hash = auxiliary_data_hash(&block.header);

        // Step 17: block signing.
        if is_pos {
            let stake = coinstake.expect("checked above");
            if !stake.raw.is_privacy_spend() {
                return Err(AssemblerError::SignFailed(
                    "coinstake is not a privacy spend".to_string(),
                ));
            }
            let serial = match &stake.raw.kind {
                TxKind::PrivacySpend(proof) => proof
                    .serial_hashes
                    .first()
                    .copied()
                    .ok_or_else(|| AssemblerError::SignFailed("coinstake has no serial".to_string()))?,
                _ => unreachable!("checked is_privacy_spend above"),
            };
            let wallet = self.wallet.ok_or(AssemblerError::WalletUnavailable)?;
            let key = wallet
                .key_for_serial(&serial)
                .ok_or_else(|| AssemblerError::SignFailed("no key for coinstake serial".to_string()))?;
            let hash = block_header_hash(&block.header);
            let signature = key.sign(hash.as_bytes());
            block.header.signature = Some(signature.to_bytes().to_vec());
        }

        // Step 18: pre-submit validation.
        self.consensus_collab
            .test_block_validity(&block)
            .map_err(AssemblerError::TemplateInvalid)?;

        Ok(Template {
            block,
            height,
            fees: selection.total_fees,
            reward,
            is_pos,
        })
    }

    /// Steps 6-9 under the mempool guard: run the package selector, scan
    /// the result for privacy duplicates, evict confirmed duplicates from
    /// the pool, and drop any tx whose inputs vanished from the UTXO view.
    fn select_and_screen(
        &self,
        pool: &mut dyn MempoolCollaborator,
        height: u32,
        cutoff: u32,
        selector_config: SelectorConfig,
    ) -> SelectionResult {
        let mut accounting = ResourceAccounting::new(&self.consensus, self.config.clamped_max_weight(&self.consensus));
        let handles_by_hash: HashMap<Hash256, PoolHandle> = {
            let pool_ref: &dyn MempoolCollaborator = &*pool;
            let mut selector = PackageSelector::new(pool_ref, selector_config);
            selector.run(&mut accounting, height, cutoff, |h| {
                pool_ref.entry(h).expect("selector only commits known handles").indexed_transaction()
            });
            selector
                .inclusion_set()
                .iter()
                .filter_map(|&h| pool_ref.entry(h).map(|e| (e.hash, h)))
                .collect()
        };

        let mut seen_serials: HashSet<Hash256> = HashSet::new();
        let mut seen_pubcoins: HashSet<Hash256> = HashSet::new();
        let mut duplicate_hashes: HashSet<Hash256> = HashSet::new();

        for it in &accounting.transactions {
            match &it.raw.kind {
                TxKind::PrivacySpend(proof) => {
                    for serial in &proof.serial_hashes {
                        let already_confirmed = self
                            .privacy_tracker
                            .confirmed_serial_height(serial)
                            .map(|h| h < height)
                            .unwrap_or(false);
                        if already_confirmed || !seen_serials.insert(*serial) {
                            duplicate_hashes.insert(it.hash);
                        }
                    }
                }
                TxKind::PrivacyMint(proof) => {
                    for pubcoin in &proof.pubcoin_hashes {
                        let already_confirmed = self
                            .privacy_tracker
                            .confirmed_pubcoin_height(pubcoin)
                            .map(|h| h < height)
                            .unwrap_or(false);
                        if already_confirmed || !seen_pubcoins.insert(*pubcoin) {
                            duplicate_hashes.insert(it.hash);
                        }
                    }
                }
                _ => {}
            }
        }

        for hash in &duplicate_hashes {
            if let Some(&handle) = handles_by_hash.get(hash) {
                pool.evict_recursive(handle);
            }
        }

        let mut transactions = Vec::new();
        let mut total_fees = 0u64;
        // Outputs of transactions already accepted into this template. The
        // selector always orders a package's ancestors before its
        // descendants (`ordered.sort_by_key` on ancestor count), so by the
        // time a CPFP child is reached here its in-mempool parent's
        // outputs are already in this set, even though the parent is
        // still unconfirmed and therefore absent from `utxo_view`.
        // Mirrors the teacher's `FittingTransactionsIterator::
        // transaction_output` consulting `previous_entries` before the
        // store.
        let mut produced: HashSet<OutPoint> = HashSet::new();

        for (it, fee) in accounting.transactions.into_iter().zip(accounting.tx_fees.into_iter()) {
            if duplicate_hashes.contains(&it.hash) {
                continue;
            }
            if !it.raw.is_privacy_spend() && !it.raw.is_privacy_mint() {
                let missing_input = it.raw.inputs.iter().any(|input| {
                    !self.utxo_view.is_available(&input.previous_output)
                        && !produced.contains(&input.previous_output)
                });
                if missing_input {
                    continue;
                }
            }
            for index in 0..it.raw.outputs.len() {
                produced.insert(OutPoint {
                    hash: it.hash,
                    index: index as u32,
                });
            }
            total_fees += fee;
            transactions.push(it);
        }

        SelectionResult {
            transactions,
            total_fees,
        }
    }

    /// Step 11: constructs the coinbase per the `(isPoS, budget>0,
    /// founder>0)` output matrix.
    fn build_coinbase(
        &self,
        height: u32,
        is_pos: bool,
        reward: &RewardSplit,
        payout_script: &Script,
    ) -> Transaction {
        let miner_value = reward.block_reward + reward.network_reward;
        let budget_on = reward.budget_payment > 0;
        let founder_on = reward.founder_payment > 0;

        let output = |value: u64, script: &Script| TransactionOutput {
            value,
            script_pubkey: script.clone(),
        };

        let outputs = match (is_pos, budget_on, founder_on) {
            (false, false, _) => vec![output(miner_value, payout_script)],
            (false, true, false) => vec![
                output(miner_value, payout_script),
                output(reward.budget_payment, &self.payouts.budget),
                output(reward.lab_payment, &self.payouts.lab),
            ],
            (false, true, true) => vec![
                output(miner_value, payout_script),
                output(reward.budget_payment, &self.payouts.budget),
                output(reward.lab_payment, &self.payouts.lab),
                output(reward.founder_payment, &self.payouts.founder),
            ],
            (true, false, _) => vec![TransactionOutput::empty()],
            (true, true, false) => vec![
                output(reward.budget_payment, &self.payouts.budget),
                output(reward.lab_payment, &self.payouts.lab),
            ],
            (true, true, true) => vec![
                output(reward.budget_payment, &self.payouts.budget),
                output(reward.lab_payment, &self.payouts.lab),
                output(reward.founder_payment, &self.payouts.founder),
            ],
        };

        let scriptsig = Builder::default().push_i64(height as i64).into_script();
        Transaction {
            version: 1,
            kind: TxKind::Coinbase,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: scriptsig,
                sequence: u32::MAX,
            }],
            outputs,
            lock_time: 0,
        }
    }
}

/// Binds the Merkle root, witness Merkle root, and accumulator checkpoint
/// map into a single hash (§4.3 step 16), so a recipient can check the
/// three together without re-deriving the checkpoint itself.
fn auxiliary_data_hash(header: &BlockHeader) -> Hash256 {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(header.merkle_root.as_bytes());
    bytes.extend_from_slice(header.witness_merkle_root.as_bytes());
    for (group, checkpoint) in &header.accumulator_checkpoint {
        bytes.extend_from_slice(&group.to_le_bytes());
        bytes.extend_from_slice(checkpoint.as_bytes());
    }
    dhash256(&bytes)
}

/// Computes the fee/sigop cost a transaction contributes, used when the
/// caller inserts a transaction into the mempool (outside this crate's
/// own scope) rather than by the assembler itself, which only reads
/// pre-computed aggregates.
pub fn evaluate_for_pool(
    output_provider: &dyn TransactionOutputProvider,
    tx: &Transaction,
) -> Result<(u64, u64, usize), duskcoin_verification::TransactionError> {
    let fee = transaction_fee(output_provider, tx)?;
    let sigops = transaction_sigops(tx);
    let size = tx.serialized_size();
    Ok((fee, sigops, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{Hash160, TransactionOutput as Txo};
    use duskcoin_network::Network;
    use duskcoin_script::build_p2pkh;
    use duskcoin_storage::{MemoryBlockHeaderProvider, MemoryChainIndex, MemoryPrivacyTracker, MemoryUtxoView};
    use duskcoin_sync::MempoolGuard;

    use crate::collaborators::MockConsensus;
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

    fn seeded_chain_index() -> ChainStateGuard<Box<dyn ChainIndexStore>> {
        let mut index = MemoryChainIndex::new();
        index.push(duskcoin_storage::ChainIndexEntry {
            height: 0,
            hash: Hash256::zero(),
            time: 1_700_000_000,
            network_reward_reserve: 0,
        });
        let boxed: Box<dyn ChainIndexStore> = Box::new(index);
        ChainStateGuard::new(boxed)
    }

    #[test]
    fn pow_template_has_a_single_miner_coinbase_output() {
        let chain_state = seeded_chain_index();
        let pool: Box<dyn MempoolCollaborator> = Box::new(MemoryMempool::new());
        let mempool = MempoolGuard::new(pool);
        let utxo_view = MemoryUtxoView::new();
        let privacy_tracker = MemoryPrivacyTracker::new();
        let header_provider = MemoryBlockHeaderProvider::new();
        let consensus_collab = MockConsensus::default();
        let accumulator = crate::collaborators::MockAccumulator;

        let assembler = BlockAssembler {
            consensus: consensus_params(),
            config: MinerConfig::default(),
            payouts: payouts(),
            chain_state: &chain_state,
            header_provider: &header_provider,
            mempool: &mempool,
            utxo_view: &utxo_view,
            output_provider: &utxo_view,
            privacy_tracker: &privacy_tracker,
            wallet: None,
            consensus_collab: &consensus_collab,
            accumulator: &accumulator,
            adjusted_network_time: 1_700_000_100,
        };

        let payout_script = build_p2pkh(&Hash160([7u8; 20]));
        let template = assembler
            .create_template(payout_script.clone(), true, false, false)
            .unwrap();

        assert_eq!(template.height, 1);
        assert!(!template.is_pos);
        assert_eq!(template.block.transactions[0].outputs.len(), 1);
        assert_eq!(template.block.transactions[0].outputs[0].script_pubkey, payout_script);
        assert!(template.block.transactions[0].outputs[0].value > 0);
    }

    #[test]
    fn pos_template_without_budget_zeroes_the_coinbase() {
        let chain_state = seeded_chain_index();
        let pool: Box<dyn MempoolCollaborator> = Box::new(MemoryMempool::new());
        let mempool = MempoolGuard::new(pool);
        let utxo_view = MemoryUtxoView::new();
        let privacy_tracker = MemoryPrivacyTracker::new();
        let header_provider = MemoryBlockHeaderProvider::new();
        let consensus_collab = MockConsensus::default();
        let accumulator = crate::collaborators::MockAccumulator;

        let signing_key = duskcoin_crypto::signing::StakeKey::from_bytes([9u8; 32]);
        let serial = Hash256([5u8; 32]);
        let coinstake = IndexedTransaction::from_raw(Transaction {
            version: 1,
            kind: TxKind::PrivacySpend(duskcoin_chain::SpendProof {
                serial_hashes: vec![serial],
                proof: vec![],
            }),
            inputs: vec![],
            outputs: vec![Txo { value: 0, script_pubkey: Script::default() }],
            lock_time: 0,
        });
        let wallet = crate::collaborators::MockWallet {
            staking_enabled: true,
            locked: false,
            unlocked_for_staking_only: false,
            has_mintable_coins: true,
            coinstake: Some((coinstake, 1_700_000_200)),
            signing_key,
            serial,
        };

        let mut consensus = consensus_params();
        consensus.budget_start_height = 1_000_000;
        consensus.founder_reward_last_height = 0;

        let assembler = BlockAssembler {
            consensus,
            config: MinerConfig::default(),
            payouts: payouts(),
            chain_state: &chain_state,
            header_provider: &header_provider,
            mempool: &mempool,
            utxo_view: &utxo_view,
            output_provider: &utxo_view,
            privacy_tracker: &privacy_tracker,
            wallet: Some(&wallet),
            consensus_collab: &consensus_collab,
            accumulator: &accumulator,
            adjusted_network_time: 1_700_000_100,
        };

        let payout_script = Script::default();
        let template = assembler
            .create_template(payout_script, true, true, false)
            .unwrap();

        assert!(template.is_pos);
        assert_eq!(template.block.transactions[0].outputs.len(), 1);
        assert_eq!(template.block.transactions[0].outputs[0].value, 0);
        assert!(template.block.transactions[1].is_privacy_spend());
        assert!(template.block.header.signature.is_some());
    }

    #[test]
    fn cpfp_child_is_not_dropped_for_spending_an_unconfirmed_parent() {
        let chain_state = seeded_chain_index();
        let mut utxo_view = MemoryUtxoView::new();
        let confirmed_outpoint = OutPoint { hash: Hash256([100u8; 32]), index: 0 };
        utxo_view.insert(
            confirmed_outpoint,
            Txo { value: 1000, script_pubkey: Script::default() },
        );

        let parent_hash = Hash256([1u8; 32]);
        let parent_tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: confirmed_outpoint,
                script_sig: Script::default(),
                sequence: u32::MAX,
            }],
            outputs: vec![Txo { value: 900, script_pubkey: Script::default() }],
            lock_time: 0,
        };
        let child_hash = Hash256([2u8; 32]);
        let child_tx = Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint { hash: parent_hash, index: 0 },
                script_sig: Script::default(),
                sequence: u32::MAX,
            }],
            outputs: vec![Txo { value: 890, script_pubkey: Script::default() }],
            lock_time: 0,
        };

        let mut mempool = MemoryMempool::new();
        let parent_handle = mempool.insert(parent_hash, parent_tx.clone(), 200, 10, 0, false, &[]);
        mempool.insert(child_hash, child_tx.clone(), 200, 200, 0, false, &[parent_handle]);
        let pool: Box<dyn MempoolCollaborator> = Box::new(mempool);
        let mempool_guard = MempoolGuard::new(pool);

        let privacy_tracker = MemoryPrivacyTracker::new();
        let header_provider = MemoryBlockHeaderProvider::new();
        let consensus_collab = MockConsensus::default();
        let accumulator = crate::collaborators::MockAccumulator;

        let assembler = BlockAssembler {
            consensus: consensus_params(),
            config: MinerConfig::default(),
            payouts: payouts(),
            chain_state: &chain_state,
            header_provider: &header_provider,
            mempool: &mempool_guard,
            utxo_view: &utxo_view,
            output_provider: &utxo_view,
            privacy_tracker: &privacy_tracker,
            wallet: None,
            consensus_collab: &consensus_collab,
            accumulator: &accumulator,
            adjusted_network_time: 1_700_000_100,
        };

        let payout_script = build_p2pkh(&Hash160([7u8; 20]));
        let template = assembler.create_template(payout_script, true, false, false).unwrap();

        assert!(template.block.transactions.contains(&parent_tx));
        assert!(template.block.transactions.contains(&child_tx));
    }
}
