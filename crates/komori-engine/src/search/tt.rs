//! Cluster-based transposition table with hand-domination subsumption and
//! generation-based garbage collection.
//!
//! Entries are grouped into small fixed-size clusters sharing one hash
//! slot; probing scans the cluster linearly. All table-wide access goes
//! through a single [`SharedExclusiveLock`]: ordinary lookups and writes
//! take the shared side (the search thread is the only writer, so this
//! never contends with itself), and garbage collection takes the
//! exclusive side so it never races a torn read.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

use komori_core::Hand;

use crate::path_keys::PathKey;
use crate::search::lock::SharedExclusiveLock;

/// Sentinel pn/dn value meaning "effectively infinite" — a result at this
/// value has been ruled out, not merely unexplored.
pub const INF: PnDn = 1_000_000_000;

/// Proof/disproof work estimate. `0` means proven (for `pn`) or disproven
/// (for `dn`); both positive means the node is not yet resolved.
pub type PnDn = u32;

/// Highest residual-hand-count dimension the length ordering budgets for.
const HAND_COUNT_BOUND: u32 = 81;

/// A lexicographically ordered `(plies, residual_hand_count)` mate length.
///
/// Shorter `plies` is always preferred; for equal `plies`, fewer pieces left
/// in the attacker's hand is preferred. `succ`/`prec` step to the immediate
/// neighbor in this combined order (used by the driver's length-refinement
/// loop); `Sub`/`Add` on a plain `u32` instead shift only the ply component
/// (used to pass a one-ply-shallower bound down to a child search).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MateLen {
    pub plies: u32,
    pub residual: u32,
}

impl MateLen {
    pub const ZERO: MateLen = MateLen { plies: 0, residual: 0 };
    pub const MAX: MateLen = MateLen {
        plies: u32::MAX,
        residual: HAND_COUNT_BOUND,
    };

    pub const fn new(plies: u32, residual: u32) -> Self {
        MateLen { plies, residual }
    }

    /// Immediate successor in the combined `(plies, residual)` order.
    pub fn succ(self) -> MateLen {
        if self.residual < HAND_COUNT_BOUND {
            MateLen::new(self.plies, self.residual + 1)
        } else {
            MateLen::new(self.plies + 1, 0)
        }
    }

    /// Immediate predecessor in the combined `(plies, residual)` order.
    pub fn prec(self) -> MateLen {
        if self.residual > 0 {
            MateLen::new(self.plies, self.residual - 1)
        } else {
            MateLen::new(self.plies.saturating_sub(1), HAND_COUNT_BOUND)
        }
    }

    pub fn succ2(self) -> MateLen {
        self.succ().succ()
    }
}

impl std::ops::Sub<u32> for MateLen {
    type Output = MateLen;
    fn sub(self, rhs: u32) -> MateLen {
        MateLen::new(self.plies.saturating_sub(rhs), self.residual)
    }
}

impl std::ops::Add<u32> for MateLen {
    type Output = MateLen;
    fn add(self, rhs: u32) -> MateLen {
        MateLen::new(self.plies + rhs, self.residual)
    }
}

/// Marks why a non-final result was returned, distinguishing genuine
/// search states from budget exhaustion (node/depth/time limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinalData {
    pub is_repetition: bool,
}

impl FinalData {
    pub const NONE: FinalData = FinalData { is_repetition: false };
    pub const REPETITION: FinalData = FinalData { is_repetition: true };
}

/// A (possibly partial) search result: `pn == 0 xor dn == 0` iff final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub pn: PnDn,
    pub dn: PnDn,
    pub hand: Hand,
    pub len: MateLen,
    pub amount: u64,
    pub final_data: FinalData,
}

impl SearchResult {
    pub fn unknown(hand: Hand) -> SearchResult {
        SearchResult {
            pn: 1,
            dn: 1,
            hand,
            len: MateLen::ZERO,
            amount: 1,
            final_data: FinalData::NONE,
        }
    }

    pub fn proven(hand: Hand, len: MateLen, amount: u64) -> SearchResult {
        SearchResult {
            pn: 0,
            dn: INF,
            hand,
            len,
            amount,
            final_data: FinalData::NONE,
        }
    }

    pub fn disproven(hand: Hand, len: MateLen, amount: u64) -> SearchResult {
        SearchResult {
            pn: INF,
            dn: 0,
            hand,
            len,
            amount,
            final_data: FinalData::NONE,
        }
    }

    pub fn repetition(hand: Hand, len: MateLen, amount: u64) -> SearchResult {
        SearchResult {
            pn: INF,
            dn: 1,
            hand,
            len,
            amount,
            final_data: FinalData::REPETITION,
        }
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.pn == 0 || self.dn == 0
    }

    #[inline]
    pub fn is_proven(&self) -> bool {
        self.pn == 0
    }

    #[inline]
    pub fn is_disproven(&self) -> bool {
        self.dn == 0
    }

    /// Whether this is the synthesized estimate returned on a TT miss,
    /// rather than a result someone actually computed.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.pn == 1 && self.dn == 1 && self.amount <= 1
    }
}

/// The node-count interval between garbage collections, derived from table
/// capacity so larger tables are swept less often.
pub fn gc_interval(entry_count: u64) -> u64 {
    entry_count / 2 * 3
}

const CLUSTER_SIZE: usize = 4;

#[derive(Debug, Clone, Copy)]
struct TtEntry {
    occupied: bool,
    position_key: u128,
    hand: Hand,
    generation: u32,
    pn: PnDn,
    dn: PnDn,
    len: MateLen,
    amount: u64,
    is_repetition: bool,
}

impl TtEntry {
    const EMPTY: TtEntry = TtEntry {
        occupied: false,
        position_key: 0,
        hand: Hand::EMPTY,
        generation: 0,
        pn: 1,
        dn: 1,
        len: MateLen::ZERO,
        amount: 0,
        is_repetition: false,
    };

    fn result(&self) -> SearchResult {
        SearchResult {
            pn: self.pn,
            dn: self.dn,
            hand: self.hand,
            len: self.len,
            amount: self.amount,
            final_data: FinalData {
                is_repetition: self.is_repetition,
            },
        }
    }

    /// Whether this entry's stored result may stand in for a lookup with
    /// `query_hand` — the hand-domination subsumption rule (§4.3).
    fn satisfies(&self, query_hand: Hand) -> bool {
        if self.hand == query_hand {
            return true;
        }
        if self.pn == 0 {
            return self.hand.is_subset_of(query_hand);
        }
        if self.dn == 0 {
            return query_hand.is_subset_of(self.hand);
        }
        false
    }
}

#[derive(Debug, Clone, Copy)]
struct TtCluster {
    entries: [TtEntry; CLUSTER_SIZE],
}

impl TtCluster {
    const EMPTY: TtCluster = TtCluster {
        entries: [TtEntry::EMPTY; CLUSTER_SIZE],
    };
}

/// A bounded, cluster-based store of mate-search results.
pub struct TranspositionTable {
    clusters: UnsafeCell<Vec<TtCluster>>,
    lock: SharedExclusiveLock,
    generation: AtomicU32,
}

// Safety: every access to `clusters` happens while holding either the
// shared or exclusive side of `lock`; the shared side is only ever taken
// by the single search thread for lookups/writes, and the exclusive side
// (GC) cannot run concurrently with any shared holder by construction of
// `SharedExclusiveLock`.
unsafe impl Sync for TranspositionTable {}
unsafe impl Send for TranspositionTable {}

impl TranspositionTable {
    /// Allocate a table sized to fit within `hash_mb` mebibytes.
    pub fn new(hash_mb: usize) -> Self {
        let cluster_bytes = std::mem::size_of::<TtCluster>();
        let budget_bytes = hash_mb.max(1) * 1024 * 1024;
        let num_clusters = (budget_bytes / cluster_bytes).max(1);
        TranspositionTable {
            clusters: UnsafeCell::new(vec![TtCluster::EMPTY; num_clusters]),
            lock: SharedExclusiveLock::new(),
            generation: AtomicU32::new(0),
        }
    }

    /// Total number of entry slots (clusters × cluster size).
    pub fn entry_count(&self) -> u64 {
        let num_clusters = unsafe { (*self.clusters.get()).len() };
        (num_clusters * CLUSTER_SIZE) as u64
    }

    /// Begin a new top-level search: bump the generation counter. Entries
    /// from prior generations remain until GC or eviction reclaims them.
    pub fn new_search(&self) {
        self.generation.fetch_add(1, Ordering::Relaxed);
    }

    fn current_generation(&self) -> u32 {
        self.generation.load(Ordering::Relaxed)
    }

    fn cluster_index(&self, position_key: u128) -> usize {
        let num_clusters = unsafe { (*self.clusters.get()).len() };
        ((position_key >> 64) as u64 as usize) % num_clusters
    }

    fn with_cluster_shared<R>(&self, index: usize, f: impl FnOnce(&mut TtCluster) -> R) -> R {
        self.lock.lock_shared();
        let result = unsafe {
            let cluster = &mut (*self.clusters.get())[index];
            f(cluster)
        };
        self.lock.unlock_shared();
        result
    }

    /// Probe for a result matching `position_key`/`hand`, or a fresh
    /// unexplored estimate on miss.
    pub fn look_up(&self, position_key: u128, hand: Hand) -> SearchResult {
        let index = self.cluster_index(position_key);
        self.with_cluster_shared(index, |cluster| {
            for entry in &cluster.entries {
                if entry.occupied && entry.position_key == position_key && entry.satisfies(hand) {
                    return entry.result();
                }
            }
            SearchResult::unknown(hand)
        })
    }

    /// Store `result` for `position_key`, selecting a victim within the
    /// cluster if no matching entry exists and the cluster is full.
    pub fn set_result(&self, position_key: u128, result: SearchResult) {
        let index = self.cluster_index(position_key);
        let generation = self.current_generation();
        self.with_cluster_shared(index, |cluster| {
            let slot = cluster
                .entries
                .iter_mut()
                .find(|e| e.occupied && e.position_key == position_key && e.hand == result.hand)
                .or_else(|| cluster.entries.iter_mut().find(|e| !e.occupied))
                .unwrap_or_else(|| {
                    cluster
                        .entries
                        .iter_mut()
                        .min_by_key(|e| (e.generation, e.amount))
                        .expect("cluster has at least one entry")
                });

            slot.occupied = true;
            slot.position_key = position_key;
            slot.hand = result.hand;
            slot.generation = generation;
            slot.pn = result.pn;
            slot.dn = result.dn;
            slot.len = result.len;
            slot.amount = result.amount;
            slot.is_repetition = result.final_data.is_repetition;
        });
    }

    /// Fraction of probed entries whose generation equals the current one.
    pub fn hashfull(&self) -> f64 {
        let generation = self.current_generation();
        let num_clusters = unsafe { (*self.clusters.get()).len() };
        let sample = num_clusters.min(1000);
        let mut filled = 0usize;
        let mut total = 0usize;
        for i in 0..sample {
            self.with_cluster_shared(i, |cluster| {
                for entry in &cluster.entries {
                    total += 1;
                    if entry.occupied && entry.generation == generation {
                        filled += 1;
                    }
                }
            });
        }
        if total == 0 {
            0.0
        } else {
            filled as f64 / total as f64
        }
    }

    /// Remove entries below an adaptively-chosen `amount` threshold so
    /// roughly half the occupied entries survive. Entries from the current
    /// generation are never removed.
    pub fn collect_garbage(&self) {
        self.lock.lock();
        let current_generation = self.current_generation();
        let clusters = unsafe { &mut *self.clusters.get() };

        let mut amounts: Vec<u64> = clusters
            .iter()
            .flat_map(|c| c.entries.iter())
            .filter(|e| e.occupied && e.generation != current_generation)
            .map(|e| e.amount)
            .collect();

        if !amounts.is_empty() {
            amounts.sort_unstable();
            let threshold = amounts[amounts.len() / 2];
            for cluster in clusters.iter_mut() {
                for entry in cluster.entries.iter_mut() {
                    if entry.occupied && entry.generation != current_generation && entry.amount < threshold {
                        *entry = TtEntry::EMPTY;
                    }
                }
            }
        }

        self.lock.unlock();
    }
}

impl std::fmt::Debug for TranspositionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranspositionTable")
            .field("entries", &self.entry_count())
            .field("generation", &self.current_generation())
            .finish()
    }
}

/// A bound `(position_key, path_key, hand, depth)` used to probe and store
/// a single node's result, amortizing the cluster hash across a visit.
pub struct Query<'tt> {
    tt: &'tt TranspositionTable,
    position_key: u128,
    #[allow(dead_code)]
    path_key: PathKey,
    hand: Hand,
    #[allow(dead_code)]
    depth: u32,
}

impl<'tt> Query<'tt> {
    pub fn new(tt: &'tt TranspositionTable, position_key: u128, path_key: PathKey, hand: Hand, depth: u32) -> Self {
        Query {
            tt,
            position_key,
            path_key,
            hand,
            depth,
        }
    }

    pub fn look_up(&self) -> SearchResult {
        self.tt.look_up(self.position_key, self.hand)
    }

    pub fn set_result(&self, result: SearchResult) {
        self.tt.set_result(self.position_key, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_returns_unknown_result() {
        let tt = TranspositionTable::new(1);
        let result = tt.look_up(12345, Hand::EMPTY);
        assert!(!result.is_final());
    }

    #[test]
    fn round_trip_set_then_look_up() {
        let tt = TranspositionTable::new(1);
        tt.new_search();
        let result = SearchResult::proven(Hand::EMPTY, MateLen::new(3, 0), 10);
        tt.set_result(999, result);
        let probed = tt.look_up(999, Hand::EMPTY);
        assert!(probed.is_proven());
        assert_eq!(probed.len, MateLen::new(3, 0));
    }

    #[test]
    fn proven_entry_subsumes_superset_hand_query() {
        let tt = TranspositionTable::new(1);
        tt.new_search();
        let stored_hand = Hand::EMPTY;
        tt.set_result(42, SearchResult::proven(stored_hand, MateLen::new(1, 0), 1));

        let mut bigger_hand = Hand::EMPTY;
        bigger_hand.add(komori_core::PieceKind::Pawn);
        let probed = tt.look_up(42, bigger_hand);
        assert!(probed.is_proven());
    }

    #[test]
    fn disproven_entry_subsumes_subset_hand_query() {
        let tt = TranspositionTable::new(1);
        tt.new_search();
        let mut stored_hand = Hand::EMPTY;
        stored_hand.add(komori_core::PieceKind::Gold);
        tt.set_result(7, SearchResult::disproven(stored_hand, MateLen::new(2, 0), 1));

        let probed = tt.look_up(7, Hand::EMPTY);
        assert!(probed.is_disproven());
    }

    #[test]
    fn hashfull_reflects_current_generation_entries() {
        let tt = TranspositionTable::new(1);
        tt.new_search();
        assert_eq!(tt.hashfull(), 0.0);
        tt.set_result(1, SearchResult::proven(Hand::EMPTY, MateLen::ZERO, 1));
        assert!(tt.hashfull() > 0.0);
    }

    #[test]
    fn gc_never_removes_current_generation_entries() {
        let tt = TranspositionTable::new(1);
        tt.new_search();
        tt.set_result(1, SearchResult::proven(Hand::EMPTY, MateLen::ZERO, 1));
        tt.collect_garbage();
        let probed = tt.look_up(1, Hand::EMPTY);
        assert!(probed.is_proven());
    }

    #[test]
    fn mate_len_succ_prec_round_trip() {
        let len = MateLen::new(5, 3);
        assert_eq!(len.succ().prec(), len);
    }

    #[test]
    fn mate_len_succ_rolls_over_residual() {
        let len = MateLen::new(5, HAND_COUNT_BOUND);
        assert_eq!(len.succ(), MateLen::new(6, 0));
    }

    #[test]
    fn mate_len_ordering_is_lexicographic() {
        assert!(MateLen::new(3, 99) < MateLen::new(4, 0));
        assert!(MateLen::new(3, 0) < MateLen::new(3, 1));
    }
}
