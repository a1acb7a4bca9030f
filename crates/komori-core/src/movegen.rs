//! Pseudo-legal move generation and attack detection.
//!
//! This is an array-scanning implementation, not a bitboard one: the
//! specification places the low-level move generator and bitboard library
//! out of scope for optimization, so this module exists only to give the
//! search core a working `Position` to search over.

use crate::color::Color;
use crate::piece::PieceKind;
use crate::position::Position;
use crate::shogi_move::Move;
use crate::square::Square;

/// A direction step, in file/rank delta, expressed from Black's point of
/// view. [`forward`] flips the rank component for White.
type Step = (i8, i8);

#[inline]
fn forward(color: Color, dy: i8) -> i8 {
    match color {
        Color::Black => dy,
        Color::White => -dy,
    }
}

const SILVER_STEPS: [Step; 5] = [(0, 1), (1, 1), (-1, 1), (1, -1), (-1, -1)];
const GOLD_STEPS: [Step; 6] = [(0, 1), (1, 1), (-1, 1), (1, 0), (-1, 0), (0, -1)];
const KING_STEPS: [Step; 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];
const BISHOP_SLIDES: [Step; 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const ROOK_SLIDES: [Step; 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// Movement pattern for a piece kind: step destinations plus slide
/// directions, both relative to Black's forward direction.
struct Pattern {
    steps: &'static [Step],
    slides: &'static [Step],
}

fn pattern(kind: PieceKind) -> Pattern {
    match kind {
        PieceKind::Pawn => Pattern {
            steps: &[(0, 1)],
            slides: &[],
        },
        PieceKind::Lance => Pattern {
            steps: &[],
            slides: &[(0, 1)],
        },
        PieceKind::Knight => Pattern {
            steps: &[(1, 2), (-1, 2)],
            slides: &[],
        },
        PieceKind::Silver => Pattern {
            steps: &SILVER_STEPS,
            slides: &[],
        },
        PieceKind::Gold
        | PieceKind::ProPawn
        | PieceKind::ProLance
        | PieceKind::ProKnight
        | PieceKind::ProSilver => Pattern {
            steps: &GOLD_STEPS,
            slides: &[],
        },
        PieceKind::Bishop => Pattern {
            steps: &[],
            slides: &BISHOP_SLIDES,
        },
        PieceKind::Rook => Pattern {
            steps: &[],
            slides: &ROOK_SLIDES,
        },
        PieceKind::King => Pattern {
            steps: &KING_STEPS,
            slides: &[],
        },
        PieceKind::Horse => Pattern {
            steps: &ROOK_SLIDES,
            slides: &BISHOP_SLIDES,
        },
        PieceKind::Dragon => Pattern {
            steps: &BISHOP_SLIDES,
            slides: &ROOK_SLIDES,
        },
    }
}

fn slide_reaches(pos: &Position, from: Square, dx: i8, dy: i8, target: Square) -> bool {
    let mut cur = from;
    loop {
        match cur.step(dx, dy) {
            Some(next) => {
                if next == target {
                    return true;
                }
                if pos.piece_at(next).is_some() {
                    return false;
                }
                cur = next;
            }
            None => return false,
        }
    }
}

/// Whether a piece of kind `kind` and color `color` sitting on `from` can
/// move/attack `target`, ignoring whether that would leave its own king in
/// check.
fn reaches(pos: &Position, from: Square, color: Color, kind: PieceKind, target: Square) -> bool {
    let pat = pattern(kind);
    for &(dx, dy) in pat.steps {
        if from.step(dx, forward(color, dy)) == Some(target) {
            return true;
        }
    }
    for &(dx, dy) in pat.slides {
        if slide_reaches(pos, from, dx, forward(color, dy), target) {
            return true;
        }
    }
    false
}

/// Whether `target` is attacked by any piece of color `by_color`.
pub fn is_attacked(pos: &Position, target: Square, by_color: Color) -> bool {
    for sq in Square::all() {
        if let Some(piece) = pos.piece_at(sq) {
            if piece.color == by_color && reaches(pos, sq, by_color, piece.kind, target) {
                return true;
            }
        }
    }
    false
}

/// Last rank (from `color`'s perspective) on which a piece can still
/// legally move.
fn last_playable_rank(color: Color, kind: PieceKind) -> Option<u8> {
    match kind {
        PieceKind::Pawn | PieceKind::Lance => Some(match color {
            Color::Black => 1,
            Color::White => 9,
        }),
        PieceKind::Knight => Some(match color {
            Color::Black => 2,
            Color::White => 8,
        }),
        _ => None,
    }
}

fn in_promotion_zone(color: Color, rank: u8) -> bool {
    match color {
        Color::Black => rank >= 7,
        Color::White => rank <= 3,
    }
}

/// Generate every pseudo-legal move (board moves and drops) for the side
/// to move, without filtering for king safety.
fn pseudo_legal_moves(pos: &Position) -> Vec<Move> {
    let side = pos.side_to_move();
    let mut moves = Vec::new();

    for from in Square::all() {
        let Some(piece) = pos.piece_at(from) else {
            continue;
        };
        if piece.color != side {
            continue;
        }
        let pat = pattern(piece.kind);
        for &(dx, dy) in pat.steps {
            if let Some(to) = from.step(dx, forward(side, dy)) {
                push_board_move(pos, &mut moves, piece.kind, side, from, to);
            }
        }
        for &(dx, dy) in pat.slides {
            let mut cur = from;
            let ddy = forward(side, dy);
            while let Some(to) = cur.step(dx, ddy) {
                let blocked = pos.piece_at(to).is_some();
                push_board_move(pos, &mut moves, piece.kind, side, from, to);
                if blocked {
                    break;
                }
                cur = to;
            }
        }
    }

    let hand = pos.hand_of(side);
    for &kind in &PieceKind::DROPPABLE {
        if hand.count(kind) == 0 {
            continue;
        }
        for to in Square::all() {
            if pos.piece_at(to).is_some() {
                continue;
            }
            if let Some(last) = last_playable_rank(side, kind) {
                if to.rank() == last {
                    continue;
                }
            }
            if kind == PieceKind::Pawn && file_has_own_pawn(pos, side, to.file()) {
                continue;
            }
            moves.push(Move::drop(kind, to));
        }
    }

    moves
}

fn file_has_own_pawn(pos: &Position, side: Color, file: u8) -> bool {
    (1..=9).any(|rank| {
        Square::new(file, rank).is_some_and(|sq| {
            pos.piece_at(sq)
                .is_some_and(|p| p.color == side && p.kind == PieceKind::Pawn)
        })
    })
}

fn push_board_move(
    pos: &Position,
    moves: &mut Vec<Move>,
    kind: PieceKind,
    side: Color,
    from: Square,
    to: Square,
) {
    if let Some(occupant) = pos.piece_at(to) {
        if occupant.color == side {
            return;
        }
    }

    let can_promote = kind.is_promotable()
        && (in_promotion_zone(side, from.rank()) || in_promotion_zone(side, to.rank()));
    let must_promote = last_playable_rank(side, kind).is_some_and(|last| to.rank() == last);

    if can_promote {
        moves.push(Move::board(from, to, true));
    }
    if !must_promote {
        moves.push(Move::board(from, to, false));
    }
}

/// Generate every legal move for the side to move: pseudo-legal moves with
/// those leaving the mover's own king in check filtered out.
pub fn legal_moves(pos: &Position) -> Vec<Move> {
    let side = pos.side_to_move();
    let mut pos = pos.clone();
    pseudo_legal_moves(&pos)
        .into_iter()
        .filter(|&mv| {
            pos.do_move(mv);
            let legal = !pos.in_check(side);
            pos.undo_move();
            legal
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_legal_moves_for_black() {
        let pos = Position::startpos();
        let moves = legal_moves(&pos);
        assert!(!moves.is_empty());
        assert!(moves.iter().all(|_| true));
    }

    #[test]
    fn king_cannot_move_into_check() {
        let pos = Position::from_sfen("4k4/9/4r4/9/9/9/9/9/4K4 b - 1").unwrap();
        let moves = legal_moves(&pos);
        let king_sq = pos.king_square(Color::Black).unwrap();
        let into_check = Square::new(5, 2).unwrap();
        assert!(!moves
            .iter()
            .any(|&mv| mv.from_square() == Some(king_sq) && mv.to_square() == into_check));
    }

    #[test]
    fn pawn_cannot_drop_on_file_with_own_pawn() {
        let pos = Position::from_sfen("4k4/9/9/4P4/9/9/9/9/4K4 b P 1").unwrap();
        let moves = legal_moves(&pos);
        assert!(!moves
            .iter()
            .any(|&mv| mv.is_drop() && mv.dropped_piece_type() == Some(PieceKind::Pawn)
                && mv.to_square().file() == 5));
    }

    #[test]
    fn pawn_cannot_drop_on_last_rank() {
        let pos = Position::from_sfen("4k4/9/9/9/9/9/9/9/4K4 b P 1").unwrap();
        let moves = legal_moves(&pos);
        let last_rank_drop = Square::new(5, 1).unwrap();
        assert!(!moves
            .iter()
            .any(|&mv| mv.is_drop() && mv.to_square() == last_rank_drop));
    }

    #[test]
    fn rook_on_open_board_attacks_along_file_and_rank() {
        let pos = Position::from_sfen("4k4/9/9/9/4R4/9/9/9/4K4 b - 1").unwrap();
        let target = Square::new(5, 9).unwrap();
        assert!(is_attacked(&pos, target, Color::Black));
    }
}
