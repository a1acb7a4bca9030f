//! df-pn search: the transposition table, per-node children aggregation,
//! the shared/exclusive lock guarding it, node-count/time monitoring, the
//! one-ply mate shortcut, and the top-level iterative-length driver.

pub mod children_cache;
pub mod driver;
pub mod lock;
pub mod mate1ply;
pub mod monitor;
pub mod tt;

pub use driver::{MateSearcher, NodeState};
pub use tt::{MateLen, PnDn, SearchResult, TranspositionTable, INF};
