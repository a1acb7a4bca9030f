//! Rendering a [`Position`] back out as an SFEN string.

use std::fmt;

use crate::color::Color;
use crate::piece::PieceKind;
use crate::position::Position;
use crate::square::Square;

/// The standard shogi starting position, in SFEN.
pub const STARTING_SFEN: &str = "lnsgkgsnl/1r5b1/ppppppppp/9/9/9/PPPPPPPPP/1B5R1/LNSGKGSNL b - 1";

fn kind_char(kind: PieceKind) -> &'static str {
    match kind.unpromoted() {
        PieceKind::Pawn => "P",
        PieceKind::Lance => "L",
        PieceKind::Knight => "N",
        PieceKind::Silver => "S",
        PieceKind::Gold => "G",
        PieceKind::Bishop => "B",
        PieceKind::Rook => "R",
        PieceKind::King => "K",
        _ => unreachable!("unpromoted() never returns a promoted kind"),
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank_idx in 0..Square::SIZE {
            let rank = Square::SIZE - rank_idx;
            if rank_idx > 0 {
                write!(f, "/")?;
            }
            let mut empty_run = 0u8;
            for file in (1..=Square::SIZE).rev() {
                let sq = Square::new(file, rank).unwrap();
                match self.piece_at(sq) {
                    None => empty_run += 1,
                    Some(piece) => {
                        if empty_run > 0 {
                            write!(f, "{empty_run}")?;
                            empty_run = 0;
                        }
                        let glyph = kind_char(piece.kind);
                        let promoted = piece.kind.is_promoted();
                        let cased = if piece.color == Color::Black {
                            glyph.to_string()
                        } else {
                            glyph.to_lowercase()
                        };
                        if promoted {
                            write!(f, "+{cased}")?;
                        } else {
                            write!(f, "{cased}")?;
                        }
                    }
                }
            }
            if empty_run > 0 {
                write!(f, "{empty_run}")?;
            }
        }

        write!(f, " {} ", self.side_to_move())?;

        let mut any_hand = false;
        for &color in &Color::ALL {
            let hand = self.hand_of(color);
            for &kind in &PieceKind::DROPPABLE {
                let count = hand.count(kind);
                if count == 0 {
                    continue;
                }
                any_hand = true;
                let glyph = kind_char(kind);
                let cased = if color == Color::Black {
                    glyph.to_string()
                } else {
                    glyph.to_lowercase()
                };
                if count > 1 {
                    write!(f, "{count}{cased}")?;
                } else {
                    write!(f, "{cased}")?;
                }
            }
        }
        if !any_hand {
            write!(f, "-")?;
        }

        write!(f, " {}", self.ply() + 1)
    }
}
