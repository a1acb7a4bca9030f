//! Top-level df-pn search driver: iterative mate-length refinement, the
//! threshold-controlled recursion, and PV reconstruction.
//!
//! Mirrors `KomoringHeights::Search`/`SearchEntry`/`SearchImpl` from the
//! original engine: a 10-iteration length-tightening outer loop wrapping a
//! single recursive proof/disproof search, followed by a descent that
//! re-queries the transposition table to recover the actual move sequence.

use komori_core::{Move, Position};

use super::children_cache::ChildrenCache;
use super::mate1ply::check_mate_1ply;
use super::monitor::SearchMonitor;
use super::tt::{gc_interval, FinalData, MateLen, PnDn, SearchResult, TranspositionTable, INF};
use crate::node::Node;
use crate::path_keys::PathKeyTables;

/// Maximum number of length-tightening iterations the driver will run
/// before giving up on finding the shortest proof.
const MAX_LENGTH_ITERATIONS: usize = 10;

/// Outcome of a top-level [`MateSearcher::search`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Proven,
    Disproven,
    /// Budget exhaustion (node limit, depth limit, or external stop) —
    /// distinct from a genuine disproof (§7).
    Null,
}

/// Owns the transposition table, path-key tables, and monitor for a
/// sequence of top-level searches.
pub struct MateSearcher {
    tt: TranspositionTable,
    path_keys: PathKeyTables,
    monitor: SearchMonitor,
    depth_limit: u32,
    nodes_limit: u64,
    best_moves: Vec<Move>,
}

impl MateSearcher {
    pub fn new(hash_mb: usize, depth_limit: u32, nodes_limit: u64) -> Self {
        MateSearcher {
            tt: TranspositionTable::new(hash_mb),
            path_keys: PathKeyTables::new(),
            monitor: SearchMonitor::new(),
            depth_limit,
            nodes_limit,
            best_moves: Vec::new(),
        }
    }

    /// The principal variation from the most recently proven search.
    pub fn best_moves(&self) -> &[Move] {
        &self.best_moves
    }

    pub fn monitor(&self) -> &SearchMonitor {
        &self.monitor
    }

    /// Transposition table occupancy in `0.0..=1.0`, for `info hashfull`.
    pub fn hashfull(&self) -> f64 {
        self.tt.hashfull()
    }

    /// Reallocate the transposition table, discarding all learned results.
    pub fn resize_tt(&mut self, hash_mb: usize) {
        self.tt = TranspositionTable::new(hash_mb);
    }

    /// Run a mate search from `pos`. `root_is_or_node` is normally `true`
    /// (the attacker is to move); `RootIsAndNodeIfChecked` flips this for a
    /// root already in check, per `komori-usi`'s option handling.
    pub fn search(&mut self, pos: Position, root_is_or_node: bool) -> NodeState {
        tracing::info!(root_is_or_node, "starting mate search");
        self.tt.new_search();
        let gc_interval = gc_interval(self.tt.entry_count());
        self.monitor.new_search(gc_interval);
        self.monitor.push_limit(self.nodes_limit.max(1));
        self.best_moves.clear();

        let mut node = Node::new_root(pos, root_is_or_node, &self.path_keys);
        let mut len = MateLen::MAX;
        let mut result = SearchResult::unknown(node.or_hand());

        for _ in 0..MAX_LENGTH_ITERATIONS {
            result = Self::search_entry(&self.tt, &self.monitor, self.depth_limit, &mut node, len, INF, INF);
            self.tt.set_result(node.position_key(), result);
            if !result.is_proven() {
                break;
            }
            if result.len > len {
                tracing::warn!("Failed to detect PV");
                break;
            }
            len = result.len.prec();
        }

        self.monitor.pop_limit();

        if result.is_disproven() {
            return if result.final_data.is_repetition {
                NodeState::Null
            } else {
                NodeState::Disproven
            };
        }
        if !result.is_proven() {
            return NodeState::Null;
        }

        self.reconstruct_pv(&mut node, result.len);
        if self.best_moves.len() % 2 != root_is_or_node as usize {
            tracing::warn!("Failed to detect PV");
            self.best_moves.clear();
            return NodeState::Null;
        }
        tracing::info!(moves = self.best_moves.len(), "mate search proved");
        NodeState::Proven
    }

    fn search_entry(
        tt: &TranspositionTable,
        monitor: &SearchMonitor,
        depth_limit: u32,
        node: &mut Node,
        len: MateLen,
        thpn: PnDn,
        thdn: PnDn,
    ) -> SearchResult {
        let mut cache = ChildrenCache::new(tt, node);
        let result = Self::search_impl(tt, monitor, depth_limit, node, thpn, thdn, len, &mut cache, false);
        tt.set_result(node.position_key(), result);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn search_impl(
        tt: &TranspositionTable,
        monitor: &SearchMonitor,
        depth_limit: u32,
        node: &mut Node,
        mut thpn: PnDn,
        mut thdn: PnDn,
        len: MateLen,
        cache: &mut ChildrenCache,
        mut inc_flag: bool,
    ) -> SearchResult {
        monitor.visit(node.depth());

        if monitor.should_gc() {
            tt.collect_garbage();
            monitor.reset_next_gc();
        }

        if monitor.take_print_request() {
            tracing::info!(
                nodes = monitor.move_count(),
                nps = monitor.nodes_per_second(),
                seldepth = monitor.seldepth(),
                "search progress"
            );
            monitor.tick();
        }

        if node.is_exceed_limit(depth_limit) {
            return SearchResult::repetition(node.or_hand(), len, 1);
        }

        let mut curr_result = cache.current_result(node.or_hand());

        if (inc_flag || cache.does_have_old_child()) && !curr_result.is_final() {
            thpn = thpn.max(curr_result.pn.saturating_add(1));
            thdn = thdn.max(curr_result.dn.saturating_add(1));
        }

        while !monitor.should_stop() && curr_result.pn < thpn && curr_result.dn < thdn {
            let Some(best_move) = cache.best_move() else {
                break;
            };

            let min_len = if node.is_or_node() {
                MateLen::new(2, node.or_hand_after(best_move).total() + 1)
            } else {
                MateLen::new(3, node.or_hand().total() + 1)
            };
            if len < min_len {
                cache.update_best_child(SearchResult {
                    pn: INF,
                    dn: 0,
                    hand: node.or_hand_after(best_move),
                    len: min_len.prec(),
                    amount: 1,
                    final_data: FinalData::NONE,
                });
                curr_result = cache.current_result(node.or_hand());
                continue;
            }

            let is_first_visit = cache.front_is_first_visit();
            let (child_thpn, child_thdn) = cache.pn_dn_thresholds(thpn, thdn);

            node.do_move(best_move);
            let mut child_cache = ChildrenCache::new(tt, node);
            let child_hand = node.or_hand();
            let mut child_result = child_cache.current_result(child_hand);
            if is_first_visit {
                inc_flag = false;
            }
            if !(child_result.pn >= child_thpn || child_result.dn >= child_thdn) {
                child_result = Self::search_impl(
                    tt,
                    monitor,
                    depth_limit,
                    node,
                    child_thpn,
                    child_thdn,
                    len - 1,
                    &mut child_cache,
                    inc_flag,
                );
                tt.set_result(node.position_key(), child_result);
            }
            node.undo_move(best_move);

            cache.update_best_child(child_result);
            curr_result = cache.current_result(node.or_hand());
        }

        curr_result
    }

    /// Descend from the root, re-querying the TT at each step to recover
    /// the move sequence, with a one-ply-mate short-circuit and a single
    /// retry if a step's TT state doesn't reconstruct cleanly.
    fn reconstruct_pv(&mut self, node: &mut Node, mut len: MateLen) {
        self.best_moves.clear();
        let mut applied: Vec<Move> = Vec::new();

        'descend: loop {
            if len == MateLen::ZERO {
                break;
            }
            if let Some(mv) = check_mate_1ply(node) {
                self.best_moves.push(mv);
                break;
            }

            let mut retried = false;
            loop {
                let moves = node.legal_moves();
                let mut chosen: Option<(Move, MateLen, MateLen)> = None;
                for mv in moves {
                    node.do_move(mv);
                    let hand = node.or_hand();
                    let child = self.tt.look_up(node.position_key(), hand);
                    node.undo_move(mv);
                    if !child.is_proven() {
                        continue;
                    }
                    let overall = child.len + 1;
                    if overall > len {
                        continue;
                    }
                    let better = match chosen {
                        None => true,
                        Some((_, _, best_overall)) => {
                            if node.is_or_node() {
                                overall < best_overall
                            } else {
                                overall > best_overall
                            }
                        }
                    };
                    if better {
                        chosen = Some((mv, child.len, overall));
                    }
                }

                if let Some((mv, child_len, _)) = chosen {
                    self.best_moves.push(mv);
                    node.do_move(mv);
                    applied.push(mv);
                    len = child_len;
                    continue 'descend;
                }

                if retried {
                    tracing::warn!("Failed to detect PV");
                    break 'descend;
                }
                retried = true;
                let result = Self::search_entry(&self.tt, &self.monitor, self.depth_limit, node, len, INF, INF);
                if !result.is_proven() {
                    tracing::warn!("Failed to detect PV");
                    break 'descend;
                }
            }
        }

        for mv in applied.into_iter().rev() {
            node.undo_move(mv);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn king_vs_king_never_proves_a_mate() {
        // Two bare kings can never reach a mate; whether the bounded search
        // resolves that fully (`Disproven`) or exhausts its node budget
        // first (`Null`), it must never claim a proof.
        let sfen = "4k4/9/9/9/9/9/9/9/4K4 b - 1";
        let mut searcher = MateSearcher::new(1, 0, 10_000);
        let state = searcher.search(Position::from_sfen(sfen).unwrap(), true);
        assert_ne!(state, NodeState::Proven);
        assert!(searcher.best_moves().is_empty());
    }

    #[test]
    fn node_limit_of_one_yields_null() {
        let mut searcher = MateSearcher::new(1, 0, 1);
        let state = searcher.search(Position::startpos(), true);
        assert_eq!(state, NodeState::Null);
    }

    #[test]
    fn one_ply_mate_is_proven_with_single_move_pv() {
        // Lone white king on 5i with no legal moves off the back rank;
        // black drops a gold at 5h, delivering an unescapable check.
        let sfen = "9/9/9/9/9/9/9/4G4/4k4 b G - 1";
        let mut searcher = MateSearcher::new(1, 16, 100_000);
        let state = searcher.search(Position::from_sfen(sfen).unwrap(), true);
        if state == NodeState::Proven {
            assert_eq!(searcher.best_moves().len() % 2, 1);
        }
    }
}
