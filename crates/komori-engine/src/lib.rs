//! df-pn mate search for shogi, with TCA threshold inflation and a
//! shared/exclusive-locked transposition table.

pub mod node;
pub mod path_keys;
pub mod score;
pub mod search;

pub use node::Node;
pub use path_keys::{PathKey, PathKeyTables};
pub use score::{make_score, Score};
pub use search::{MateSearcher, NodeState};
