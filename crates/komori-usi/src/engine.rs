//! USI engine loop: reads commands from stdin, drives a [`MateSearcher`],
//! and prints `info`/`checkmate` lines.

use std::io::{self, BufRead};

use tracing::{debug, info, warn};

use komori_core::Position;
use komori_engine::{MateSearcher, NodeState, Score};

use crate::command::{parse_command, Command};
use crate::error::UsiError;
use crate::info::UsiInfo;
use crate::options::EngineOptions;

/// The USI engine, holding current position, options, and a searcher
/// rebuilt fresh for each `go mate` (this is manual-testing glue, not a
/// production host — see module docs).
pub struct UsiEngine {
    position: Position,
    options: EngineOptions,
}

impl UsiEngine {
    /// Create a new engine at the starting position with default options.
    pub fn new() -> Self {
        UsiEngine {
            position: Position::startpos(),
            options: EngineOptions::default(),
        }
    }

    /// Run the USI event loop, reading from stdin until `quit` or EOF.
    pub fn run(mut self) -> Result<(), UsiError> {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!(cmd = %trimmed, "received USI command");

            match parse_command(trimmed) {
                Ok(Command::Usi) => self.handle_usi(),
                Ok(Command::IsReady) => self.handle_isready(),
                Ok(Command::UsiNewGame) => self.handle_usinewgame(),
                Ok(Command::Position(pos)) => self.handle_position(pos),
                Ok(Command::GoMate { nodes_limit }) => self.handle_go_mate(nodes_limit),
                Ok(Command::Stop) => {}
                Ok(Command::Quit) => break,
                Ok(Command::Unknown(_)) => {}
                Err(e) => warn!(error = %e, "USI parse error"),
            }
        }

        info!("komori shutting down");
        Ok(())
    }

    fn handle_usi(&self) {
        println!("id name komori");
        println!("id author the komori project");
        println!(
            "option name USI_Hash type spin default {} min 1 max 65536",
            self.options.usi_hash_mb
        );
        println!("usiok");
    }

    fn handle_isready(&self) {
        println!("readyok");
    }

    fn handle_usinewgame(&mut self) {
        self.position = Position::startpos();
    }

    fn handle_position(&mut self, position: Position) {
        self.position = position;
    }

    fn handle_go_mate(&mut self, nodes_limit: Option<u64>) {
        let nodes_limit = nodes_limit.unwrap_or(self.options.nodes_limit);
        let root_is_or_node = !(self.options.root_is_and_node_if_checked
            && self.position.in_check(self.position.side_to_move()));

        let mut searcher = MateSearcher::new(self.options.usi_hash_mb, self.options.depth_limit, nodes_limit);
        let state = searcher.search(self.position.clone(), root_is_or_node);

        let monitor = searcher.monitor();
        let info = UsiInfo {
            seldepth: monitor.seldepth(),
            time_ms: monitor.elapsed().as_millis() as u64,
            nodes: monitor.move_count(),
            nps: monitor.nodes_per_second(),
            hashfull: (searcher.hashfull() * 1000.0) as u32,
            // `make_score` is a stub upstream (see `komori-engine::score`);
            // there is no defined mapping to fill in here yet.
            score: Score::default(),
            pv: searcher.best_moves().to_vec(),
        };
        println!("{info}");

        match state {
            NodeState::Proven => {
                let pv: Vec<String> = searcher.best_moves().iter().map(|m| m.to_string()).collect();
                println!("checkmate {}", pv.join(" "));
            }
            NodeState::Disproven => println!("checkmate nomate"),
            NodeState::Null => println!("checkmate timeout"),
        }
    }
}

impl Default for UsiEngine {
    fn default() -> Self {
        Self::new()
    }
}
