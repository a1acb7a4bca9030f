//! Per-node working set: move ordering, pn/dn aggregation, and the TCA
//! staleness flag.
//!
//! One cache is built per visited node from its legal moves and their
//! cached TT results, then consulted repeatedly as `SearchImpl` widens the
//! thresholds on its single best child. The driver owns the recursion and
//! the actual `do_move`/`undo_move` pairs; this type only aggregates.

use komori_core::{Hand, Move};

use super::tt::{FinalData, MateLen, PnDn, SearchResult, TranspositionTable, INF};
use crate::node::Node;

/// One child move plus the TT result last seen for it.
#[derive(Debug, Clone)]
struct ChildEntry {
    mv: Move,
    position_key: u128,
    hand: Hand,
    result: SearchResult,
    is_first_visit: bool,
}

/// The working set for a single node's children, sorted by selection
/// metric (ascending `pn` for OR nodes, ascending `dn` for AND nodes).
pub struct ChildrenCache {
    is_or_node: bool,
    entries: Vec<ChildEntry>,
}

impl ChildrenCache {
    /// Build a cache for `node`'s legal moves, probing `tt` for each child's
    /// cached result. `node` is left unchanged on return (each candidate
    /// move is played and undone to read the child's position key/hand).
    pub fn new(tt: &TranspositionTable, node: &mut Node) -> Self {
        let is_or_node = node.is_or_node();
        let moves = node.legal_moves();
        let mut entries = Vec::with_capacity(moves.len());
        for mv in moves {
            node.do_move(mv);
            let hand = node.or_hand();
            let position_key = node.position_key();
            let result = tt.look_up(position_key, hand);
            let is_first_visit = result.is_unknown();
            node.undo_move(mv);
            entries.push(ChildEntry {
                mv,
                position_key,
                hand,
                result,
                is_first_visit,
            });
        }
        let mut cache = ChildrenCache { is_or_node, entries };
        cache.sort();
        cache
    }

    fn sort(&mut self) {
        if self.is_or_node {
            self.entries.sort_by_key(|e| e.result.pn);
        } else {
            self.entries.sort_by_key(|e| e.result.dn);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The move this node should descend into next, or `None` if it has no
    /// legal moves (a terminal node).
    pub fn best_move(&self) -> Option<Move> {
        self.entries.first().map(|e| e.mv)
    }

    pub fn front_position_key(&self) -> Option<u128> {
        self.entries.first().map(|e| e.position_key)
    }

    pub fn front_hand(&self) -> Option<Hand> {
        self.entries.first().map(|e| e.hand)
    }

    pub fn front_is_first_visit(&self) -> bool {
        self.entries.first().is_some_and(|e| e.is_first_visit)
    }

    /// Whether some child's cached result predates this visit and is not
    /// yet final — the signal that triggers TCA threshold inflation.
    pub fn does_have_old_child(&self) -> bool {
        self.entries.iter().any(|e| !e.is_first_visit && !e.result.is_final())
    }

    /// Aggregate the children into this node's own result. `hand` is the
    /// node's own attacker hand, carried into the aggregate unchanged.
    pub fn current_result(&self, hand: Hand) -> SearchResult {
        if self.entries.is_empty() {
            return if self.is_or_node {
                // Attacker has no move: cannot prove mate from here.
                SearchResult::disproven(hand, MateLen::ZERO, 1)
            } else {
                // Defender has no reply: mate delivered.
                SearchResult::proven(hand, MateLen::ZERO, 1)
            };
        }

        let amount: u64 = self.entries.iter().map(|e| e.result.amount).sum::<u64>() + 1;

        if self.is_or_node {
            if let Some(winner) = self
                .entries
                .iter()
                .filter(|e| e.result.is_proven())
                .min_by_key(|e| e.result.len)
            {
                return SearchResult::proven(hand, winner.result.len + 1, amount);
            }
            if self.entries.iter().all(|e| e.result.is_disproven()) {
                let len = self.entries.iter().map(|e| e.result.len).max().unwrap_or(MateLen::ZERO);
                return SearchResult::disproven(hand, len + 1, amount);
            }
            let pn = self.entries.iter().map(|e| e.result.pn).min().unwrap_or(INF);
            let dn = self
                .entries
                .iter()
                .fold(0u32, |acc, e| acc.saturating_add(e.result.dn))
                .min(INF);
            SearchResult {
                pn,
                dn,
                hand,
                len: MateLen::ZERO,
                amount,
                final_data: FinalData::NONE,
            }
        } else {
            if let Some(winner) = self
                .entries
                .iter()
                .filter(|e| e.result.is_disproven())
                .min_by_key(|e| e.result.len)
            {
                return SearchResult::disproven(hand, winner.result.len + 1, amount);
            }
            if self.entries.iter().all(|e| e.result.is_proven()) {
                let len = self.entries.iter().map(|e| e.result.len).max().unwrap_or(MateLen::ZERO);
                return SearchResult::proven(hand, len + 1, amount);
            }
            let dn = self.entries.iter().map(|e| e.result.dn).min().unwrap_or(INF);
            let pn = self
                .entries
                .iter()
                .fold(0u32, |acc, e| acc.saturating_add(e.result.pn))
                .min(INF);
            SearchResult {
                pn,
                dn,
                hand,
                len: MateLen::ZERO,
                amount,
                final_data: FinalData::NONE,
            }
        }
    }

    /// Thresholds to hand down to the current best child's recursive call.
    pub fn pn_dn_thresholds(&self, thpn: PnDn, thdn: PnDn) -> (PnDn, PnDn) {
        if self.entries.is_empty() {
            return (thpn, thdn);
        }
        if self.is_or_node {
            let sum_dn_rest = self.entries[1..]
                .iter()
                .fold(0u32, |acc, e| acc.saturating_add(e.result.dn));
            let second_pn = self.entries.get(1).map(|e| e.result.pn).unwrap_or(INF);
            let child_thdn = thdn.saturating_sub(sum_dn_rest);
            let child_thpn = thpn.min(second_pn.saturating_add(1));
            (child_thpn, child_thdn)
        } else {
            let sum_pn_rest = self.entries[1..]
                .iter()
                .fold(0u32, |acc, e| acc.saturating_add(e.result.pn));
            let second_dn = self.entries.get(1).map(|e| e.result.dn).unwrap_or(INF);
            let child_thpn = thpn.saturating_sub(sum_pn_rest);
            let child_thdn = thdn.min(second_dn.saturating_add(1));
            (child_thpn, child_thdn)
        }
    }

    /// Replace the current best child's result (after recursing into it)
    /// and re-sort so the next iteration picks a (possibly different) best
    /// child.
    pub fn update_best_child(&mut self, result: SearchResult) {
        if let Some(front) = self.entries.first_mut() {
            front.result = result;
            front.is_first_visit = false;
        }
        self.sort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_keys::PathKeyTables;
    use komori_core::Position;

    #[test]
    fn terminal_or_node_with_no_moves_is_disproven() {
        // Black king alone, no legal moves generator path exercised via an
        // empty cache directly.
        let cache = ChildrenCache {
            is_or_node: true,
            entries: Vec::new(),
        };
        let result = cache.current_result(Hand::EMPTY);
        assert!(result.is_disproven());
    }

    #[test]
    fn terminal_and_node_with_no_moves_is_proven() {
        let cache = ChildrenCache {
            is_or_node: false,
            entries: Vec::new(),
        };
        let result = cache.current_result(Hand::EMPTY);
        assert!(result.is_proven());
    }

    #[test]
    fn new_builds_one_entry_per_legal_move() {
        let tables = PathKeyTables::new();
        let tt = TranspositionTable::new(1);
        let mut node = Node::new_root(Position::startpos(), true, &tables);
        let cache = ChildrenCache::new(&tt, &mut node);
        assert!(!cache.is_empty());
        assert!(cache.front_is_first_visit());
    }

    #[test]
    fn aggregation_prefers_shortest_proven_child_for_or_node() {
        let mut cache = ChildrenCache {
            is_or_node: true,
            entries: vec![
                ChildEntry {
                    mv: Move::NONE,
                    position_key: 1,
                    hand: Hand::EMPTY,
                    result: SearchResult::proven(Hand::EMPTY, MateLen::new(5, 0), 1),
                    is_first_visit: false,
                },
                ChildEntry {
                    mv: Move::NONE,
                    position_key: 2,
                    hand: Hand::EMPTY,
                    result: SearchResult::proven(Hand::EMPTY, MateLen::new(1, 0), 1),
                    is_first_visit: false,
                },
            ],
        };
        cache.sort();
        let result = cache.current_result(Hand::EMPTY);
        assert!(result.is_proven());
        assert_eq!(result.len, MateLen::new(2, 0));
    }

    #[test]
    fn update_best_child_resorts() {
        let mut cache = ChildrenCache {
            is_or_node: true,
            entries: vec![
                ChildEntry {
                    mv: Move::NONE,
                    position_key: 1,
                    hand: Hand::EMPTY,
                    result: SearchResult::unknown(Hand::EMPTY),
                    is_first_visit: true,
                },
                ChildEntry {
                    mv: Move::NONE,
                    position_key: 2,
                    hand: Hand::EMPTY,
                    result: SearchResult {
                        pn: 5,
                        ..SearchResult::unknown(Hand::EMPTY)
                    },
                    is_first_visit: true,
                },
            ],
        };
        cache.update_best_child(SearchResult {
            pn: 9,
            ..SearchResult::unknown(Hand::EMPTY)
        });
        assert_eq!(cache.entries[0].result.pn, 5);
    }
}
