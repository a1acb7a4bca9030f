//! Board state: piece placement, hands, and move application.

use crate::color::Color;
use crate::error::PositionError;
use crate::hand::{hand_index, Hand};
use crate::piece::{Piece, PieceKind};
use crate::shogi_move::Move;
use crate::square::Square;
use crate::zobrist;

/// Information needed to undo a single [`Position::do_move`] call.
///
/// Kept on an explicit stack inside `Position` rather than returned to the
/// caller, mirroring the recursive search driver's push/pop discipline: a
/// node descends with `do_move`, recurses, and ascends with `undo_move`
/// without ever holding more than one frame's worth of undo state live at
/// a time per depth.
#[derive(Debug, Clone, Copy)]
struct UndoInfo {
    mv: Move,
    captured: Option<PieceKind>,
    moved_from_kind: PieceKind,
}

/// Full shogi position: board, hands, side to move, and the undo stack
/// needed to make `do_move`/`undo_move` cheap and reversible.
#[derive(Debug, Clone)]
pub struct Position {
    board: [Option<Piece>; Square::COUNT],
    hands: [Hand; Color::COUNT],
    side_to_move: Color,
    king_squares: [Option<Square>; Color::COUNT],
    ply: u32,
    history: Vec<UndoInfo>,
    key: u128,
}

impl Position {
    /// The standard shogi starting position.
    pub fn startpos() -> Position {
        Position::from_sfen(crate::sfen::STARTING_SFEN).expect("startpos sfen is well-formed")
    }

    /// Parse a position from an SFEN-style string: board, side to move,
    /// hands, and a move-count field.
    pub fn from_sfen(sfen: &str) -> Result<Position, PositionError> {
        let fields: Vec<&str> = sfen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(PositionError::TooFewFields(sfen.to_string()));
        }
        let board = parse_board(fields[0])?;
        let side_to_move = parse_side_to_move(fields[1])?;
        let hands = parse_hands(fields[2])?;
        fields[3]
            .parse::<u32>()
            .map_err(|_| PositionError::InvalidMoveCount(fields[3].to_string()))?;

        let mut king_squares = [None; Color::COUNT];
        for sq in Square::all() {
            if let Some(piece) = board[sq.index()] {
                if piece.kind == PieceKind::King {
                    king_squares[piece.color.index()] = Some(sq);
                }
            }
        }

        let mut key = 0u128;
        let tables = zobrist::tables();
        for sq in Square::all() {
            if let Some(piece) = board[sq.index()] {
                key ^= tables.piece(piece.kind, piece.color, sq);
            }
        }
        for &color in &Color::ALL {
            for (idx, &kind) in PieceKind::DROPPABLE.iter().enumerate() {
                let count = hands[color.index()].count(kind);
                if count > 0 {
                    key ^= tables.hand(idx, color, 0) ^ tables.hand(idx, color, count);
                }
            }
        }
        if side_to_move == Color::White {
            key ^= tables.side_to_move();
        }

        Ok(Position {
            board,
            hands,
            side_to_move,
            king_squares,
            ply: 0,
            history: Vec::new(),
            key,
        })
    }

    /// The incremental 128-bit Zobrist-style position key.
    #[inline]
    pub fn key(&self) -> u128 {
        self.key
    }

    fn toggle_hand(&mut self, kind: PieceKind, color: Color, old_count: u8, new_count: u8) {
        let idx = hand_index(kind);
        let tables = zobrist::tables();
        self.key ^= tables.hand(idx, color, old_count) ^ tables.hand(idx, color, new_count);
    }

    /// The piece occupying `sq`, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index()]
    }

    /// The side to move.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// `color`'s hand of captured pieces.
    #[inline]
    pub fn hand_of(&self, color: Color) -> Hand {
        self.hands[color.index()]
    }

    /// `color`'s king square, if it is on the board.
    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.king_squares[color.index()]
    }

    /// Number of moves played since [`Position::from_sfen`] / [`Position::startpos`].
    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Whether `color`'s king is currently attacked.
    ///
    /// Movegen is scoped down to a simple scan (see
    /// `crate::movegen`); `in_check` reuses the same attacker scan rather
    /// than a bitboard lookup.
    pub fn in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king_sq) => crate::movegen::is_attacked(self, king_sq, !color),
            None => false,
        }
    }

    /// Apply `mv`, pushing its undo information onto the history stack.
    ///
    /// # Panics
    ///
    /// Panics if `mv` is not consistent with the current board and hands
    /// (e.g. no piece on its origin square, or dropping a piece not held).
    /// The search driver only ever calls `do_move` with moves produced by
    /// `crate::movegen`, so this is an internal invariant, not a user-facing
    /// error path.
    pub fn do_move(&mut self, mv: Move) {
        tracing::trace!(?mv, ply = self.ply, "do_move");
        let side = self.side_to_move;
        let to = mv.to_square();

        let tables = zobrist::tables();
        let (moved_from_kind, captured) = if mv.is_drop() {
            let kind = mv.dropped_piece_type().expect("drop move carries a kind");
            let old_count = self.hands[side.index()].count(kind);
            self.hands[side.index()].remove(kind);
            self.toggle_hand(kind, side, old_count, old_count - 1);
            self.board[to.index()] = Some(Piece::new(kind, side));
            self.key ^= tables.piece(kind, side, to);
            (kind, None)
        } else {
            let from = mv.from_square().expect("board move carries a from-square");
            let moving = self.board[from.index()].expect("no piece to move");
            let captured = self.board[to.index()];
            self.key ^= tables.piece(moving.kind, side, from);
            if let Some(captured) = captured {
                self.key ^= tables.piece(captured.kind, !side, to);
                let base = captured.kind.unpromoted();
                let old_count = self.hands[side.index()].count(base);
                self.hands[side.index()].add(base);
                self.toggle_hand(base, side, old_count, old_count + 1);
            }
            let final_kind = if mv.is_promote() {
                moving.kind.promoted()
            } else {
                moving.kind
            };
            self.board[from.index()] = None;
            self.board[to.index()] = Some(Piece::new(final_kind, side));
            self.key ^= tables.piece(final_kind, side, to);
            if final_kind == PieceKind::King {
                self.king_squares[side.index()] = Some(to);
            }
            (moving.kind, captured.map(|p| p.kind))
        };

        self.history.push(UndoInfo {
            mv,
            captured,
            moved_from_kind,
        });
        self.key ^= tables.side_to_move();
        self.side_to_move = !side;
        self.ply += 1;
    }

    /// Undo the most recent [`Position::do_move`] call.
    ///
    /// # Panics
    ///
    /// Panics if the history stack is empty.
    pub fn undo_move(&mut self) {
        let undo = self.history.pop().expect("undo_move called with empty history");
        let tables = zobrist::tables();
        self.key ^= tables.side_to_move();
        self.side_to_move = !self.side_to_move;
        self.ply -= 1;
        let side = self.side_to_move;
        let to = undo.mv.to_square();

        if undo.mv.is_drop() {
            let kind = undo.mv.dropped_piece_type().expect("drop move carries a kind");
            self.key ^= tables.piece(kind, side, to);
            self.board[to.index()] = None;
            let old_count = self.hands[side.index()].count(kind);
            self.hands[side.index()].add(kind);
            self.toggle_hand(kind, side, old_count, old_count + 1);
        } else {
            let from = undo.mv.from_square().expect("board move carries a from-square");
            self.key ^= tables.piece(self.board[to.index()].unwrap().kind, side, to);
            self.board[from.index()] = Some(Piece::new(undo.moved_from_kind, side));
            self.key ^= tables.piece(undo.moved_from_kind, side, from);
            if undo.moved_from_kind == PieceKind::King {
                self.king_squares[side.index()] = Some(from);
            }
            self.board[to.index()] = undo.captured.map(|kind| Piece::new(kind, !side));
            if let Some(captured_kind) = undo.captured {
                self.key ^= tables.piece(captured_kind, !side, to);
                let base = captured_kind.unpromoted();
                let old_count = self.hands[side.index()].count(base);
                self.hands[side.index()].remove(base);
                self.toggle_hand(base, side, old_count, old_count - 1);
            }
        }
    }
}

fn parse_side_to_move(field: &str) -> Result<Color, PositionError> {
    match field {
        "b" => Ok(Color::Black),
        "w" => Ok(Color::White),
        other => Err(PositionError::InvalidSideToMove(other.to_string())),
    }
}

fn parse_board(field: &str) -> Result<[Option<Piece>; Square::COUNT], PositionError> {
    let mut board = [None; Square::COUNT];
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != Square::SIZE as usize {
        return Err(PositionError::InvalidBoard(field.to_string()));
    }

    for (rank_idx, rank_str) in ranks.iter().enumerate() {
        let rank = Square::SIZE - rank_idx as u8;
        let mut file = Square::SIZE;
        let mut chars = rank_str.chars().peekable();
        while let Some(c) = chars.next() {
            if let Some(skip) = c.to_digit(10) {
                file = file
                    .checked_sub(skip as u8)
                    .ok_or_else(|| PositionError::InvalidBoard(field.to_string()))?;
                continue;
            }
            let promoted = c == '+';
            let piece_char = if promoted {
                chars.next().ok_or_else(|| PositionError::InvalidBoard(field.to_string()))?
            } else {
                c
            };
            let color = if piece_char.is_ascii_uppercase() {
                Color::Black
            } else {
                Color::White
            };
            let mut kind = piece_kind_from_char(piece_char)
                .ok_or_else(|| PositionError::InvalidBoard(field.to_string()))?;
            if promoted {
                kind = kind.promoted();
            }
            if file == 0 {
                return Err(PositionError::InvalidBoard(field.to_string()));
            }
            let sq = Square::new(file, rank).ok_or_else(|| PositionError::InvalidBoard(field.to_string()))?;
            board[sq.index()] = Some(Piece::new(kind, color));
            file -= 1;
        }
    }

    Ok(board)
}

fn piece_kind_from_char(c: char) -> Option<PieceKind> {
    Some(match c.to_ascii_uppercase() {
        'P' => PieceKind::Pawn,
        'L' => PieceKind::Lance,
        'N' => PieceKind::Knight,
        'S' => PieceKind::Silver,
        'G' => PieceKind::Gold,
        'B' => PieceKind::Bishop,
        'R' => PieceKind::Rook,
        'K' => PieceKind::King,
        _ => return None,
    })
}

fn parse_hands(field: &str) -> Result<[Hand; Color::COUNT], PositionError> {
    let mut hands = [Hand::EMPTY; Color::COUNT];
    if field == "-" {
        return Ok(hands);
    }
    let mut chars = field.chars().peekable();
    while let Some(c) = chars.next() {
        let mut count = 0u32;
        let mut digit = Some(c);
        while let Some(d) = digit.and_then(|ch| ch.to_digit(10)) {
            count = count * 10 + d;
            digit = chars.next();
        }
        let piece_char = digit.ok_or_else(|| PositionError::InvalidHand(field.to_string()))?;
        let count = if count == 0 { 1 } else { count };
        let color = if piece_char.is_ascii_uppercase() {
            Color::Black
        } else {
            Color::White
        };
        let kind = piece_kind_from_char(piece_char)
            .ok_or_else(|| PositionError::InvalidHand(field.to_string()))?;
        for _ in 0..count {
            hands[color.index()].add(kind);
        }
    }
    Ok(hands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_has_both_kings() {
        let pos = Position::startpos();
        assert!(pos.king_square(Color::Black).is_some());
        assert!(pos.king_square(Color::White).is_some());
        assert_eq!(pos.side_to_move(), Color::Black);
    }

    #[test]
    fn startpos_hands_are_empty() {
        let pos = Position::startpos();
        assert_eq!(pos.hand_of(Color::Black), Hand::EMPTY);
        assert_eq!(pos.hand_of(Color::White), Hand::EMPTY);
    }

    #[test]
    fn do_move_then_undo_move_restores_position() {
        let mut pos = Position::startpos();
        let before = pos.clone();
        let from = Square::new(7, 7).unwrap();
        let to = Square::new(7, 6).unwrap();
        let mv = Move::board(from, to, false);
        pos.do_move(mv);
        assert_eq!(pos.side_to_move(), Color::White);
        assert!(pos.piece_at(to).is_some());
        assert!(pos.piece_at(from).is_none());
        pos.undo_move();
        assert_eq!(pos.side_to_move(), before.side_to_move());
        assert_eq!(pos.piece_at(from), before.piece_at(from));
        assert_eq!(pos.piece_at(to), before.piece_at(to));
    }

    #[test]
    fn capture_adds_to_hand_and_undo_restores_it() {
        let sfen = "4k4/9/9/9/9/9/9/4r4/4K4 b - 1";
        let mut pos = Position::from_sfen(sfen).unwrap();
        let from = Square::new(5, 8).unwrap();
        let to = Square::new(5, 2).unwrap();
        let mv = Move::board(from, to, false);
        pos.do_move(mv);
        assert_eq!(pos.hand_of(Color::Black).count(PieceKind::Rook), 1);
        pos.undo_move();
        assert_eq!(pos.hand_of(Color::Black).count(PieceKind::Rook), 0);
        assert!(pos.piece_at(to).is_some());
    }

    #[test]
    fn drop_move_consumes_hand_piece() {
        let sfen = "4k4/9/9/9/9/9/9/9/4K4 b P 1";
        let mut pos = Position::from_sfen(sfen).unwrap();
        let to = Square::new(5, 5).unwrap();
        let mv = Move::drop(PieceKind::Pawn, to);
        pos.do_move(mv);
        assert_eq!(pos.hand_of(Color::Black).count(PieceKind::Pawn), 0);
        assert_eq!(pos.piece_at(to).unwrap().kind, PieceKind::Pawn);
        pos.undo_move();
        assert_eq!(pos.hand_of(Color::Black).count(PieceKind::Pawn), 1);
        assert!(pos.piece_at(to).is_none());
    }

    #[test]
    fn key_restored_after_do_move_undo_move() {
        let mut pos = Position::startpos();
        let before = pos.key();
        let from = Square::new(7, 7).unwrap();
        let to = Square::new(7, 6).unwrap();
        pos.do_move(Move::board(from, to, false));
        assert_ne!(pos.key(), before);
        pos.undo_move();
        assert_eq!(pos.key(), before);
    }

    #[test]
    fn key_restored_after_capturing_move() {
        let sfen = "4k4/9/9/9/9/9/9/4r4/4K4 b - 1";
        let mut pos = Position::from_sfen(sfen).unwrap();
        let before = pos.key();
        let from = Square::new(5, 8).unwrap();
        let to = Square::new(5, 2).unwrap();
        pos.do_move(Move::board(from, to, false));
        assert_ne!(pos.key(), before);
        pos.undo_move();
        assert_eq!(pos.key(), before);
    }

    #[test]
    fn rejects_sfen_with_too_few_fields() {
        assert!(matches!(
            Position::from_sfen("lnsgkgsnl"),
            Err(PositionError::TooFewFields(_))
        ));
    }
}
