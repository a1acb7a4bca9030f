//! USI command parsing.
//!
//! Only the commands needed to drive a mate search from a terminal are
//! recognized (`position`, `go mate`, `stop`, `quit`, `usi`, `isready`,
//! `usinewgame`) — this is glue for manual testing, not a general USI host.

use komori_core::{legal_moves, Move, Position};

use crate::error::UsiError;

/// A parsed USI command.
#[derive(Debug)]
pub enum Command {
    /// `usi` -- identify the engine.
    Usi,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `usinewgame` -- reset engine state.
    UsiNewGame,
    /// `position` -- set up a position with optional moves applied.
    Position(Position),
    /// `go mate [nodes N]` -- start a mate search, optionally capping the
    /// node budget for this search only.
    GoMate {
        /// Per-search node cap, overriding `EngineOptions::nodes_limit`.
        nodes_limit: Option<u64>,
    },
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per USI convention).
    Unknown(String),
}

/// Parse a single line of USI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UsiError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Ok(Command::Unknown(String::new()));
    }

    match tokens[0] {
        "usi" => Ok(Command::Usi),
        "isready" => Ok(Command::IsReady),
        "usinewgame" => Ok(Command::UsiNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(&tokens[1..]),
        "go" => parse_go(&tokens[1..]),
        _ => Ok(Command::Unknown(tokens[0].to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves 7g7f 3c3d ...]`
/// - `position sfen <sfen-string> [moves 7g7f 3c3d ...]`
fn parse_position(tokens: &[&str]) -> Result<Command, UsiError> {
    if tokens.is_empty() {
        return Err(UsiError::MalformedPosition);
    }

    let (mut pos, rest) = if tokens[0] == "startpos" {
        (Position::startpos(), &tokens[1..])
    } else if tokens[0] == "sfen" {
        // SFEN is 4 space-separated fields.
        if tokens.len() < 5 {
            return Err(UsiError::InvalidSfen {
                sfen: tokens[1..].join(" "),
            });
        }
        let sfen = tokens[1..5].join(" ");
        let pos = Position::from_sfen(&sfen).map_err(|_| UsiError::InvalidSfen { sfen: sfen.clone() })?;
        (pos, &tokens[5..])
    } else {
        return Err(UsiError::MalformedPosition);
    };

    if !rest.is_empty() && rest[0] == "moves" {
        for usi_move in &rest[1..] {
            let mv = find_move(&pos, usi_move).ok_or_else(|| UsiError::InvalidMove {
                usi_move: usi_move.to_string(),
            })?;
            pos.do_move(mv);
        }
    }

    Ok(Command::Position(pos))
}

/// Resolve a USI move string against `pos`'s legal moves by display match
/// (the crate has no magic-bitboard move table to parse directly into).
fn find_move(pos: &Position, usi_move: &str) -> Option<Move> {
    legal_moves(pos).into_iter().find(|mv| format!("{mv}") == usi_move)
}

/// Parse the `go` command arguments. Only `go mate [nodes N]` is supported.
fn parse_go(tokens: &[&str]) -> Result<Command, UsiError> {
    if tokens.is_empty() || tokens[0] != "mate" {
        return Err(UsiError::UnsupportedGo {
            subcommand: tokens.first().unwrap_or(&"").to_string(),
        });
    }

    let mut nodes_limit = None;
    let mut i = 1;
    while i < tokens.len() {
        if tokens[i] == "nodes" && i + 1 < tokens.len() {
            nodes_limit = tokens[i + 1].parse().ok();
            i += 2;
        } else {
            i += 1;
        }
    }

    Ok(Command::GoMate { nodes_limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_usi() {
        assert!(matches!(parse_command("usi").unwrap(), Command::Usi));
    }

    #[test]
    fn parse_isready() {
        assert!(matches!(parse_command("isready").unwrap(), Command::IsReady));
    }

    #[test]
    fn parse_quit() {
        assert!(matches!(parse_command("quit").unwrap(), Command::Quit));
    }

    #[test]
    fn parse_usinewgame() {
        assert!(matches!(parse_command("usinewgame").unwrap(), Command::UsiNewGame));
    }

    #[test]
    fn parse_position_startpos() {
        let cmd = parse_command("position startpos").unwrap();
        assert!(matches!(cmd, Command::Position(_)));
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let cmd = parse_command("position startpos moves 7g7f 3c3d").unwrap();
        assert!(matches!(cmd, Command::Position(_)));
    }

    #[test]
    fn parse_position_startpos_with_bad_move_errs() {
        let result = parse_command("position startpos moves 9i1a");
        assert!(result.is_err());
    }

    #[test]
    fn parse_go_mate() {
        let cmd = parse_command("go mate").unwrap();
        assert!(matches!(cmd, Command::GoMate { nodes_limit: None }));
    }

    #[test]
    fn parse_go_mate_with_nodes() {
        let cmd = parse_command("go mate nodes 5000").unwrap();
        match cmd {
            Command::GoMate { nodes_limit } => assert_eq!(nodes_limit, Some(5000)),
            _ => panic!("expected GoMate"),
        }
    }

    #[test]
    fn parse_go_without_mate_errs() {
        assert!(parse_command("go depth 5").is_err());
    }

    #[test]
    fn parse_unknown_command() {
        let cmd = parse_command("foobar").unwrap();
        assert!(matches!(cmd, Command::Unknown(_)));
    }

    #[test]
    fn parse_empty_line() {
        let cmd = parse_command("").unwrap();
        assert!(matches!(cmd, Command::Unknown(_)));
    }

    #[test]
    fn parse_position_missing_keyword() {
        assert!(parse_command("position").is_err());
    }

    #[test]
    fn parse_stop() {
        assert!(matches!(parse_command("stop").unwrap(), Command::Stop));
    }
}
