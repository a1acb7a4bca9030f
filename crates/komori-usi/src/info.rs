//! `UsiInfo`: the key/value bundle printed during and after a search,
//! mirroring the teacher's `info depth ... score ... nodes ... pv ...` line.

use std::fmt;

use komori_core::Move;
use komori_engine::Score;

/// A single `info` line's worth of search progress.
#[derive(Debug, Clone, Default)]
pub struct UsiInfo {
    pub seldepth: u32,
    pub time_ms: u64,
    pub nodes: u64,
    pub nps: u64,
    /// Hash table occupancy in permille (0..=1000), USI convention.
    pub hashfull: u32,
    pub score: Score,
    pub pv: Vec<Move>,
}

impl fmt::Display for UsiInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "info seldepth {} time {} nodes {} nps {} hashfull {} score cp {}",
            self.seldepth, self.time_ms, self.nodes, self.nps, self.hashfull, self.score.0
        )?;
        if !self.pv.is_empty() {
            write!(f, " pv")?;
            for mv in &self.pv {
                write!(f, " {mv}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_omits_pv_when_empty() {
        let info = UsiInfo::default();
        assert!(!format!("{info}").contains("pv"));
    }

    #[test]
    fn display_includes_pv_moves() {
        let mut info = UsiInfo::default();
        info.pv.push(Move::NONE);
        assert!(format!("{info}").contains("pv"));
    }
}
