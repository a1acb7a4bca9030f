//! One-ply mate detector.
//!
//! The full df-pn recursion is overkill for the common case of "does one
//! of the attacker's current moves deliver an immediate checkmate" — the
//! driver's PV-reconstruction walk calls this first at each step before
//! falling back to a TT-based child search (§4.5).

use crate::node::Node;
use komori_core::Move;

/// If `node` is an OR node (attacker to move) and some legal move leaves
/// the defender checkmated, return that move.
pub fn check_mate_1ply(node: &mut Node) -> Option<Move> {
    if !node.is_or_node() {
        return None;
    }
    for mv in node.legal_moves() {
        node.do_move(mv);
        let is_mate = node.in_check() && node.legal_moves().is_empty();
        node.undo_move(mv);
        if is_mate {
            return Some(mv);
        }
    }
    None
}
