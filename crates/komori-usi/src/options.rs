//! Engine options, mirroring the teacher's on-next-`go`-command option
//! pattern: callers mutate fields directly and the next `search()` call
//! picks them up.

/// The engine's tunable options, matching the table exposed over USI.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    /// Transposition table size, in mebibytes.
    pub usi_hash_mb: usize,
    /// Maximum recursion depth, in plies. `0` means unlimited.
    pub depth_limit: u32,
    /// Node budget for a single `go mate` search.
    pub nodes_limit: u64,
    /// Minimum interval between unsolicited `info` lines, in milliseconds.
    pub pv_interval_ms: u64,
    /// Node count past which a yozume (alternate-proof) search is attempted
    /// alongside the main line. `0` disables it.
    pub yozume_node_count: u64,
    /// Path to a file recording yozume search traces, if any.
    pub yozume_path: Option<String>,
    /// When the root position is already in check, treat it as an AND node
    /// (the side in check is the one being mated) rather than an OR node.
    pub root_is_and_node_if_checked: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            usi_hash_mb: 16,
            depth_limit: 0,
            nodes_limit: 100_000_000,
            pv_interval_ms: 1000,
            yozume_node_count: 0,
            yozume_path: None,
            root_is_and_node_if_checked: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_hash_is_16mb() {
        assert_eq!(EngineOptions::default().usi_hash_mb, 16);
    }

    #[test]
    fn default_depth_limit_is_unlimited() {
        assert_eq!(EngineOptions::default().depth_limit, 0);
    }
}
