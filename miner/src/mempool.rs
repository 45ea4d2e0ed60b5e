//! Candidate/entry data model (spec.md §3) and the `MempoolCollaborator`
//! boundary (spec.md §6) the package selector iterates. Mempool
//! *admission* policy — what gets into the pool, replace-by-fee,
//! eviction under memory pressure — is out of scope; this module only
//! carries what the selector needs to read out of an already-admitted
//! pool: ancestor-aggregated feerate ordering, descendant enumeration,
//! and recursive eviction.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, VecDeque};

use duskcoin_chain::{Hash256, IndexedTransaction, Transaction};

/// Opaque, stable reference to a pool-owned entry. Per spec.md §9
/// "Handle identity": the assembler never owns candidate storage, only
/// this index into the mempool's own table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolHandle(pub u64);

/// A mempool transaction plus its precomputed aggregates (spec.md §3
/// "Candidate entry"). Ancestor aggregates are computed once at
/// insertion by walking the transitive ancestor set, mirroring the
/// "admission policy is out of scope" boundary: this model assumes
/// ancestors are always admitted before their descendants, as any real
/// mempool guarantees.
#[derive(Clone, Debug)]
pub struct Entry {
    pub handle: PoolHandle,
    pub hash: Hash256,
    pub transaction: Transaction,
    pub size: u64,
    /// Modified fee: the fee used for ordering, after any fee-bump
    /// delta a wallet might apply. This spec's mempool never mutates it
    /// post-insertion (prioritisation RPCs are mempool admission policy,
    /// out of scope), so it is simply the transaction's paid fee.
    pub fee: u64,
    pub sigop_cost: u64,
    pub has_witness: bool,
    /// Transitive in-mempool ancestors (not including `handle` itself).
    pub ancestors: BTreeSet<PoolHandle>,
    /// Direct in-mempool children, used to walk descendants.
    pub children: BTreeSet<PoolHandle>,
    pub size_with_ancestors: u64,
    pub fee_with_ancestors: u64,
    pub sigop_cost_with_ancestors: u64,
}

impl Entry {
    pub fn indexed_transaction(&self) -> IndexedTransaction {
        IndexedTransaction::new(self.hash, self.transaction.clone())
    }

    fn feerate_key(&self) -> FeerateAncestorsKey {
        FeerateAncestorsKey {
            fee_with_ancestors: self.fee_with_ancestors,
            size_with_ancestors: self.size_with_ancestors.max(1),
            handle: self.handle,
        }
    }
}

/// An overlay entry for a candidate whose ancestor aggregates have been
/// invalidated because some ancestor was just included in the block
/// (spec.md §3 "Modified entry"). Carries only the adjusted aggregates;
/// everything else is read from the underlying `Entry` via `handle`.
#[derive(Clone, Debug)]
pub struct ModifiedEntry {
    pub handle: PoolHandle,
    pub size_with_ancestors: u64,
    pub fee_with_ancestors: u64,
    pub sigop_cost_with_ancestors: u64,
}

impl ModifiedEntry {
    fn feerate_key(&self) -> FeerateAncestorsKey {
        FeerateAncestorsKey {
            fee_with_ancestors: self.fee_with_ancestors,
            size_with_ancestors: self.size_with_ancestors.max(1),
            handle: self.handle,
        }
    }
}

/// Feerate-with-ancestors ordering key: higher feerate sorts first,
/// cross-multiplied to avoid floating point; ties break on handle
/// identity so iteration is deterministic and reproducible across runs
/// for the same pool snapshot (spec.md §4.2 "Tie-breaking").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeerateAncestorsKey {
    pub fee_with_ancestors: u64,
    pub size_with_ancestors: u64,
    pub handle: PoolHandle,
}

impl FeerateAncestorsKey {
    /// True iff `self`'s feerate is strictly better than `other`'s,
    /// ignoring the tie-break handle — spec.md §4.2 step 2's "strictly
    /// better" comparison between the raw-cursor head and the
    /// `modifiedIndex` head.
    pub fn strictly_better_than(&self, other: &Self) -> bool {
        let lhs = self.fee_with_ancestors as u128 * other.size_with_ancestors as u128;
        let rhs = other.fee_with_ancestors as u128 * self.size_with_ancestors as u128;
        lhs > rhs
    }
}

impl PartialOrd for FeerateAncestorsKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FeerateAncestorsKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let self_cross = self.fee_with_ancestors as u128 * other.size_with_ancestors as u128;
        let other_cross = other.fee_with_ancestors as u128 * self.size_with_ancestors as u128;
        other_cross
            .cmp(&self_cross)
            .then_with(|| self.handle.cmp(&other.handle))
    }
}

/// `MempoolCollaborator` from spec.md §6: ancestor-feerate iteration,
/// descendant enumeration, ancestor-set computation, recursive
/// eviction. The one in-memory implementation below (`MemoryMempool`)
/// is sufficient for the core's own tests; a production mempool data
/// structure is out of scope.
pub trait MempoolCollaborator: Send + Sync {
    fn entry(&self, handle: PoolHandle) -> Option<&Entry>;
    /// `byAncestorScore`: all current handles, sorted by
    /// feerate-with-ancestors descending with the stable tie-break.
    /// Spec.md §9 models this as "an immutable (for the duration of the
    /// build) view"; callers snapshot it once per template build.
    fn handles_by_ancestor_score(&self) -> Vec<PoolHandle>;
    /// Transitive in-mempool descendants of `handle` (not including
    /// `handle` itself).
    fn descendants(&self, handle: PoolHandle) -> BTreeSet<PoolHandle>;
    /// Transitive in-mempool ancestors of `handle`, "unbounded limits"
    /// per spec.md §4.2 step 5 (not including `handle` itself).
    fn ancestors(&self, handle: PoolHandle) -> BTreeSet<PoolHandle>;
    /// Removes `handle` and every in-mempool descendant of it, returning
    /// every handle actually removed.
    fn evict_recursive(&mut self, handle: PoolHandle) -> Vec<PoolHandle>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory reference mempool. Parent/child links are supplied at
/// insertion time by the caller (test fixtures build transactions in
/// topological order, as any real wallet/relay path would).
#[derive(Default)]
pub struct MemoryMempool {
    entries: HashMap<PoolHandle, Entry>,
    next_handle: u64,
}

impl MemoryMempool {
    pub fn new() -> Self {
        MemoryMempool {
            entries: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Inserts a verified transaction with `parents` already-admitted
    /// in-mempool handles it spends from. Computes the full ancestor
    /// closure and this entry's ancestor-aggregated size/fee/sigop cost.
    pub fn insert(
        &mut self,
        hash: Hash256,
        transaction: Transaction,
        size: u64,
        fee: u64,
        sigop_cost: u64,
        has_witness: bool,
        parents: &[PoolHandle],
    ) -> PoolHandle {
        let handle = PoolHandle(self.next_handle);
        self.next_handle += 1;

        let mut ancestors = BTreeSet::new();
        let mut ancestor_size = 0u64;
        let mut ancestor_fee = 0u64;
        let mut ancestor_sigops = 0u64;
        for &parent in parents {
            if ancestors.insert(parent) {
                if let Some(parent_entry) = self.entries.get(&parent) {
                    ancestor_size += parent_entry.size;
                    ancestor_fee += parent_entry.fee;
                    ancestor_sigops += parent_entry.sigop_cost;
                }
            }
            if let Some(parent_entry) = self.entries.get(&parent) {
                for &grandparent in &parent_entry.ancestors {
                    if ancestors.insert(grandparent) {
                        if let Some(g) = self.entries.get(&grandparent) {
                            ancestor_size += g.size;
                            ancestor_fee += g.fee;
                            ancestor_sigops += g.sigop_cost;
                        }
                    }
                }
            }
        }

        let entry = Entry {
            handle,
            hash,
            transaction,
            size,
            fee,
            sigop_cost,
            has_witness,
            ancestors,
            children: BTreeSet::new(),
            size_with_ancestors: size + ancestor_size,
            fee_with_ancestors: fee + ancestor_fee,
            sigop_cost_with_ancestors: sigop_cost + ancestor_sigops,
        };

        for &parent in parents {
            if let Some(parent_entry) = self.entries.get_mut(&parent) {
                parent_entry.children.insert(handle);
            }
        }

        self.entries.insert(handle, entry);
        handle
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }
}

impl MempoolCollaborator for MemoryMempool {
    fn entry(&self, handle: PoolHandle) -> Option<&Entry> {
        self.entries.get(&handle)
    }

    fn handles_by_ancestor_score(&self) -> Vec<PoolHandle> {
        let mut keyed: Vec<FeerateAncestorsKey> =
            self.entries.values().map(Entry::feerate_key).collect();
        keyed.sort();
        keyed.into_iter().map(|k| k.handle).collect()
    }

    fn descendants(&self, handle: PoolHandle) -> BTreeSet<PoolHandle> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<PoolHandle> = VecDeque::new();
        if let Some(entry) = self.entries.get(&handle) {
            queue.extend(entry.children.iter().copied());
        }
        while let Some(next) = queue.pop_front() {
            if seen.insert(next) {
                if let Some(entry) = self.entries.get(&next) {
                    queue.extend(entry.children.iter().copied());
                }
            }
        }
        seen
    }

    fn ancestors(&self, handle: PoolHandle) -> BTreeSet<PoolHandle> {
        self.entries
            .get(&handle)
            .map(|e| e.ancestors.clone())
            .unwrap_or_default()
    }

    fn evict_recursive(&mut self, handle: PoolHandle) -> Vec<PoolHandle> {
        let mut removed = Vec::new();
        let mut to_remove: Vec<PoolHandle> = self.descendants(handle).into_iter().collect();
        to_remove.push(handle);
        for h in to_remove {
            if let Some(entry) = self.entries.remove(&h) {
                for parent in entry.ancestors {
                    if let Some(parent_entry) = self.entries.get_mut(&parent) {
                        parent_entry.children.remove(&h);
                    }
                }
                removed.push(h);
            }
        }
        removed
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Overlay index used by the package selector (spec.md §4.2's
/// `modifiedIndex`): a mutable ordered set of `ModifiedEntry` keyed on
/// the same feerate-with-ancestors comparator, supporting O(log n)
/// insert/remove and O(1) head peek via an auxiliary `BTreeSet` of keys.
#[derive(Default)]
pub struct ModifiedIndex {
    entries: HashMap<PoolHandle, ModifiedEntry>,
    order: BTreeSet<FeerateAncestorsKey>,
}

impl ModifiedIndex {
    pub fn new() -> Self {
        ModifiedIndex {
            entries: HashMap::new(),
            order: BTreeSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&ModifiedEntry> {
        self.entries.get(&handle)
    }

    pub fn contains(&self, handle: PoolHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Current best (highest feerate-with-ancestors) entry, if any.
    pub fn peek_best(&self) -> Option<&ModifiedEntry> {
        self.order
            .iter()
            .next()
            .and_then(|key| self.entries.get(&key.handle))
    }

    /// Inserts a brand new overlay entry, or — if one already exists for
    /// this handle — re-keys it in place (remove+reinsert, since
    /// aggregates changed; spec.md §9 "Mutable overlay").
    pub fn upsert(&mut self, entry: ModifiedEntry) {
        if let Some(old) = self.entries.get(&entry.handle) {
            self.order.remove(&old.feerate_key());
        }
        self.order.insert(entry.feerate_key());
        self.entries.insert(entry.handle, entry);
    }

    pub fn remove(&mut self, handle: PoolHandle) -> Option<ModifiedEntry> {
        let entry = self.entries.remove(&handle)?;
        self.order.remove(&entry.feerate_key());
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duskcoin_chain::{OutPoint, TransactionInput, TransactionOutput, TxKind};
    use duskcoin_script::Script;

    fn tx(n: u8) -> Transaction {
        Transaction {
            version: 1,
            kind: TxKind::Standard,
            inputs: vec![TransactionInput {
                previous_output: OutPoint::null(),
                script_sig: Script::default(),
                sequence: 0,
            }],
            outputs: vec![TransactionOutput {
                value: n as u64,
                script_pubkey: Script::default(),
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn parent_fee_and_size_roll_up_into_the_child_aggregate() {
        let mut pool = MemoryMempool::new();
        let a = pool.insert(Hash256([1; 32]), tx(1), 100, 100, 0, false, &[]);
        let b = pool.insert(Hash256([2; 32]), tx(2), 100, 200, 0, false, &[a]);

        let entry_b = pool.entry(b).unwrap();
        assert_eq!(entry_b.size_with_ancestors, 200);
        assert_eq!(entry_b.fee_with_ancestors, 300);
        assert_eq!(entry_b.ancestors, BTreeSet::from([a]));
    }

    #[test]
    fn ancestor_package_outranks_a_lower_combined_feerate_single_tx() {
        // A (fee=100,size=100), B (fee=200,size=100,parent=A): combined
        // feerate with ancestors = 300/200 = 1.5.
        // C (fee=50,size=100): feerate 0.5. A/B package must rank first.
        let mut pool = MemoryMempool::new();
        let a = pool.insert(Hash256([1; 32]), tx(1), 100, 100, 0, false, &[]);
        let b = pool.insert(Hash256([2; 32]), tx(2), 100, 200, 0, false, &[a]);
        let c = pool.insert(Hash256([3; 32]), tx(3), 100, 50, 0, false, &[]);

        let order = pool.handles_by_ancestor_score();
        assert_eq!(order[0], b);
        assert!(order.contains(&a));
        assert!(order.contains(&c));
    }

    #[test]
    fn evicting_a_parent_also_evicts_its_descendants() {
        let mut pool = MemoryMempool::new();
        let a = pool.insert(Hash256([1; 32]), tx(1), 100, 100, 0, false, &[]);
        let b = pool.insert(Hash256([2; 32]), tx(2), 100, 200, 0, false, &[a]);

        let removed = pool.evict_recursive(a);
        assert!(removed.contains(&a));
        assert!(removed.contains(&b));
        assert!(pool.is_empty());
    }

    #[test]
    fn modified_index_rekeys_on_upsert() {
        let mut index = ModifiedIndex::new();
        let h = PoolHandle(0);
        index.upsert(ModifiedEntry {
            handle: h,
            size_with_ancestors: 100,
            fee_with_ancestors: 100,
            sigop_cost_with_ancestors: 0,
        });
        assert_eq!(index.peek_best().unwrap().fee_with_ancestors, 100);

        index.upsert(ModifiedEntry {
            handle: h,
            size_with_ancestors: 100,
            fee_with_ancestors: 50,
            sigop_cost_with_ancestors: 0,
        });
        assert_eq!(index.peek_best().unwrap().fee_with_ancestors, 50);
        assert_eq!(index.get(h).unwrap().fee_with_ancestors, 50);
    }

    #[test]
    fn strictly_better_than_uses_cross_multiplication() {
        let a = FeerateAncestorsKey {
            fee_with_ancestors: 300,
            size_with_ancestors: 200,
            handle: PoolHandle(0),
        };
        let b = FeerateAncestorsKey {
            fee_with_ancestors: 50,
            size_with_ancestors: 100,
            handle: PoolHandle(1),
        };
        assert!(a.strictly_better_than(&b));
        assert!(!b.strictly_better_than(&a));
    }
}
