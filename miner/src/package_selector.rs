//! Package Selector (component B, spec.md §4.2): merges the raw
//! `byAncestorScore` pool cursor with the mutable `modifiedIndex`
//! overlay, committing ancestor-complete packages into
//! `ResourceAccounting` in feerate-with-ancestors order until the block
//! is full or the pool is exhausted.

use std::collections::BTreeSet;

use duskcoin_chain::IndexedTransaction;
use log::debug;

use crate::mempool::{MempoolCollaborator, ModifiedEntry, ModifiedIndex, PoolHandle};
use crate::resource_accounting::ResourceAccounting;

/// Optional floor on aggregate package feerate (spec.md §4.2 "Minimum
/// feerate gate"); disabled by default per the reference behavior.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelectorConfig {
    pub min_package_feerate: Option<(u64, u64)>,
    pub want_witness: bool,
    /// `printpriority` (spec.md §6): logs each committed package's
    /// feerate-with-ancestors at debug level.
    pub print_priority: bool,
}

/// Terminates the main loop once this many consecutive rejected
/// candidates have piled up and the block is already near-full — spec.md
/// §4.2 step 4's termination condition.
const MAX_CONSECUTIVE_FAILURES: u32 = 1000;
const NEAR_FULL_MARGIN: u64 = 4000;

pub struct PackageSelector<'a> {
    pool: &'a dyn MempoolCollaborator,
    config: SelectorConfig,
    inclusion_set: BTreeSet<PoolHandle>,
    failed_set: BTreeSet<PoolHandle>,
    modified_index: ModifiedIndex,
    raw_cursor: Vec<PoolHandle>,
    raw_pos: usize,
}

impl<'a> PackageSelector<'a> {
    pub fn new(pool: &'a dyn MempoolCollaborator, config: SelectorConfig) -> Self {
        PackageSelector {
            pool,
            config,
            inclusion_set: BTreeSet::new(),
            failed_set: BTreeSet::new(),
            modified_index: ModifiedIndex::new(),
            raw_cursor: pool.handles_by_ancestor_score(),
            raw_pos: 0,
        }
    }

    /// Seeds the selector from handles the caller pre-placed in the
    /// block (e.g. a coinstake's own inputs), so their in-mempool
    /// descendants' aggregates are corrected before selection begins.
    pub fn preload(&mut self, already_included: &[PoolHandle]) {
        for &handle in already_included {
            self.inclusion_set.insert(handle);
        }
        self.update_packages_for_added(already_included);
    }

    fn advance_past_unusable(&mut self) {
        while self.raw_pos < self.raw_cursor.len() {
            let head = self.raw_cursor[self.raw_pos];
            if self.inclusion_set.contains(&head)
                || self.modified_index.contains(head)
                || self.failed_set.contains(&head)
            {
                self.raw_pos += 1;
            } else {
                break;
            }
        }
    }

    fn raw_head(&self) -> Option<PoolHandle> {
        self.raw_cursor.get(self.raw_pos).copied()
    }

    /// `updatePackagesForAdded`: for every descendant of a just-committed
    /// handle not itself in `added`, correct its ancestor aggregates by
    /// subtracting the committed entry's own contribution.
    fn update_packages_for_added(&mut self, added: &[PoolHandle]) -> usize {
        let added_set: BTreeSet<PoolHandle> = added.iter().copied().collect();
        let mut touched = BTreeSet::new();
        for &handle in added {
            let Some(added_entry) = self.pool.entry(handle) else {
                continue;
            };
            let (a_size, a_fee, a_sigops) = (
                added_entry.size,
                added_entry.fee,
                added_entry.sigop_cost,
            );
            for descendant in self.pool.descendants(handle) {
                if added_set.contains(&descendant) {
                    continue;
                }
                touched.insert(descendant);
                if let Some(existing) = self.modified_index.get(descendant) {
                    let updated = ModifiedEntry {
                        handle: descendant,
                        size_with_ancestors: existing.size_with_ancestors.saturating_sub(a_size),
                        fee_with_ancestors: existing.fee_with_ancestors.saturating_sub(a_fee),
                        sigop_cost_with_ancestors: existing
                            .sigop_cost_with_ancestors
                            .saturating_sub(a_sigops),
                    };
                    self.modified_index.upsert(updated);
                } else if let Some(base) = self.pool.entry(descendant) {
                    let updated = ModifiedEntry {
                        handle: descendant,
                        size_with_ancestors: base.size_with_ancestors.saturating_sub(a_size),
                        fee_with_ancestors: base.fee_with_ancestors.saturating_sub(a_fee),
                        sigop_cost_with_ancestors: base
                            .sigop_cost_with_ancestors
                            .saturating_sub(a_sigops),
                    };
                    self.modified_index.upsert(updated);
                }
            }
        }
        touched.len()
    }

    /// Drives the main loop (spec.md §4.2 steps 1-8), appending every
    /// committed package into `accounting` in ancestor-count order, and
    /// finality-testing each package against `height`/`locktime_cutoff`.
    /// `build_entry` maps a committed handle to the `(tx, fee, sigops,
    /// size)` tuple `ResourceAccounting::add` needs.
    pub fn run(
        &mut self,
        accounting: &mut ResourceAccounting,
        height: u32,
        locktime_cutoff: u32,
        build_entry: impl Fn(PoolHandle) -> IndexedTransaction,
    ) {
        let mut consecutive_failures: u32 = 0;

        loop {
            self.advance_past_unusable();
            let raw_available = self.raw_pos < self.raw_cursor.len();
            let modified_best = self.modified_index.peek_best().cloned();

            if !raw_available && modified_best.is_none() {
                break;
            }

            let (handle, pkg_size, pkg_fee, pkg_sigops, using_modified) = if !raw_available {
                let best = modified_best.expect("checked above");
                (
                    best.handle,
                    best.size_with_ancestors,
                    best.fee_with_ancestors,
                    best.sigop_cost_with_ancestors,
                    true,
                )
            } else {
                let raw_handle = self.raw_head().expect("raw_available implies Some");
                let raw_entry = self.pool.entry(raw_handle);
                let raw_key = raw_entry.map(|e| crate::mempool::FeerateAncestorsKey {
                    fee_with_ancestors: e.fee_with_ancestors,
                    size_with_ancestors: e.size_with_ancestors.max(1),
                    handle: raw_handle,
                });

                match (&modified_best, raw_key) {
                    (Some(modified), Some(raw_key))
                        if crate::mempool::FeerateAncestorsKey {
                            fee_with_ancestors: modified.fee_with_ancestors,
                            size_with_ancestors: modified.size_with_ancestors.max(1),
                            handle: modified.handle,
                        }
                        .strictly_better_than(&raw_key) =>
                    {
                        (
                            modified.handle,
                            modified.size_with_ancestors,
                            modified.fee_with_ancestors,
                            modified.sigop_cost_with_ancestors,
                            true,
                        )
                    }
                    _ => {
                        self.raw_pos += 1;
                        let e = raw_entry.expect("raw_key built from entry");
                        (
                            raw_handle,
                            e.size_with_ancestors,
                            e.fee_with_ancestors,
                            e.sigop_cost_with_ancestors,
                            false,
                        )
                    }
                }
            };

            if let Some((min_fee, min_size)) = self.config.min_package_feerate {
                let floor = min_fee as u128 * pkg_size.max(1) as u128;
                let got = pkg_fee as u128 * min_size.max(1) as u128;
                if got < floor {
                    self.reject(handle, using_modified, &mut consecutive_failures);
                    if self.should_terminate(accounting, consecutive_failures) {
                        break;
                    }
                    continue;
                }
            }

            if !accounting.test_package(pkg_size, pkg_sigops) {
                self.reject(handle, using_modified, &mut consecutive_failures);
                if self.should_terminate(accounting, consecutive_failures) {
                    break;
                }
                continue;
            }

            let mut package: BTreeSet<PoolHandle> = self.pool.ancestors(handle);
            package.retain(|h| !self.inclusion_set.contains(h));
            package.insert(handle);

            let txs: Vec<IndexedTransaction> =
                package.iter().map(|&h| build_entry(h)).collect();
            let tx_refs: Vec<&IndexedTransaction> = txs.iter().collect();
            let finality_ok = accounting
                .test_finality(&tx_refs, height, locktime_cutoff, self.config.want_witness)
                .unwrap_or(false);
            if !finality_ok {
                self.reject(handle, using_modified, &mut consecutive_failures);
                continue;
            }

            let mut ordered: Vec<PoolHandle> = package.into_iter().collect();
            ordered.sort_by_key(|h| self.pool.ancestors(*h).len());

            for h in &ordered {
                let entry = self.pool.entry(*h).expect("package members exist in pool");
                if self.config.print_priority {
                    let feerate = entry.fee as f64 / entry.size.max(1) as f64;
                    debug!(
                        target: "miner",
                        "priority: tx {} fee={} size={} feerate={feerate:.3} sat/byte",
                        entry.hash, entry.fee, entry.size
                    );
                }
                accounting.add(build_entry(*h), entry.fee, entry.sigop_cost, entry.size);
                self.inclusion_set.insert(*h);
                self.modified_index.remove(*h);
            }
            consecutive_failures = 0;
            self.update_packages_for_added(&ordered);
        }
    }

    fn reject(&mut self, handle: PoolHandle, using_modified: bool, consecutive_failures: &mut u32) {
        if using_modified {
            self.modified_index.remove(handle);
        }
        self.failed_set.insert(handle);
        *consecutive_failures += 1;
    }

    fn should_terminate(&self, accounting: &ResourceAccounting, consecutive_failures: u32) -> bool {
        consecutive_failures > MAX_CONSECUTIVE_FAILURES
            && accounting.block_weight > accounting.max_weight().saturating_sub(NEAR_FULL_MARGIN)
    }

    pub fn inclusion_set(&self) -> &BTreeSet<PoolHandle> {
        &self.inclusion_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{Hash256, OutPoint, Transaction, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_network::{ConsensusParams, Network};
    use duskcoin_script::Script;

    use crate::mempool::MemoryMempool;

    fn tx(value: u64) -> Transaction {
        Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::default(),
                sequence: 0xffffffff,
            }],
            outputs: vec![TransactionOutput {
                value,
                script_pubkey: Script::default(),
            }],
            lock_time: 0,
        }
    }

    fn build(pool: &MemoryMempool, handle: PoolHandle) -> IndexedTransaction {
        let entry = pool.entry(handle).unwrap();
        entry.indexed_transaction()
    }

    #[test]
    fn picks_the_highest_feerate_package_first() {
        let mut pool = MemoryMempool::new();
        let low = pool.insert(Hash256([1; 32]), tx(1), 200, 100, 0, false, &[]);
        let high = pool.insert(Hash256([2; 32]), tx(2), 100, 200, 0, false, &[]);

        let consensus = ConsensusParams::for_network(Network::Regtest);
        let mut accounting = ResourceAccounting::new(&consensus, 1_000_000);
        let mut selector = PackageSelector::new(&pool, SelectorConfig::default());
        selector.run(&mut accounting, 1, 0, |h| build(&pool, h));

        assert_eq!(accounting.transactions[0].hash, pool.entry(high).unwrap().hash);
        assert_eq!(accounting.transactions[1].hash, pool.entry(low).unwrap().hash);
    }

    #[test]
    fn includes_ancestors_before_their_descendant() {
        let mut pool = MemoryMempool::new();
        let parent = pool.insert(Hash256([1; 32]), tx(1), 100, 10, 0, false, &[]);
        let child = pool.insert(Hash256([2; 32]), tx(2), 100, 1000, 0, false, &[parent]);

        let consensus = ConsensusParams::for_network(Network::Regtest);
        let mut accounting = ResourceAccounting::new(&consensus, 1_000_000);
        let mut selector = PackageSelector::new(&pool, SelectorConfig::default());
        selector.run(&mut accounting, 1, 0, |h| build(&pool, h));

        assert_eq!(accounting.num_tx, 2);
        let parent_hash = pool.entry(parent).unwrap().hash;
        let child_hash = pool.entry(child).unwrap().hash;
        let parent_pos = accounting
            .transactions
            .iter()
            .position(|t| t.hash == parent_hash)
            .unwrap();
        let child_pos = accounting
            .transactions
            .iter()
            .position(|t| t.hash == child_hash)
            .unwrap();
        assert!(parent_pos < child_pos);
    }

    #[test]
    fn stops_selecting_once_the_block_is_full() {
        let mut pool = MemoryMempool::new();
        pool.insert(Hash256([1; 32]), tx(1), 500, 100, 0, false, &[]);
        pool.insert(Hash256([2; 32]), tx(2), 500, 90, 0, false, &[]);

        let consensus = ConsensusParams::for_network(Network::Regtest);
        // Weight floor clamps to 4000; with WITNESS_SCALE_FACTOR=4 a
        // single 500-byte package already consumes all headroom.
        let mut accounting = ResourceAccounting::new(&consensus, 10);
        let mut selector = PackageSelector::new(&pool, SelectorConfig::default());
        selector.run(&mut accounting, 1, 0, |h| build(&pool, h));

        assert_eq!(accounting.num_tx, 0);
    }
}
