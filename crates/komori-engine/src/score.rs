//! Score mapping for completed mate searches.
//!
//! The original engine carries a `MakeScore` stub that is never filled in
//! (`// unimplemented; return {};`) — the mapping from `(pn, dn, len)` to a
//! user-facing score was left undefined upstream, not merely unwritten.
//! We keep that as an open question rather than inventing a convention the
//! source engine itself never committed to.

use crate::search::tt::SearchResult;

/// A user-facing score. Always `0` today — see the module docs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score(pub i32);

/// Map a completed search result to a display score.
///
/// `root_is_or_node` is accepted because any future mapping will need to
/// know which side the score is relative to, but it is unused while the
/// mapping itself is undefined.
pub fn make_score(_result: &SearchResult, _root_is_or_node: bool) -> Score {
    Score::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::tt::MateLen;
    use komori_core::Hand;

    #[test]
    fn make_score_is_a_stub() {
        let result = SearchResult::proven(Hand::EMPTY, MateLen::new(3, 0), 10);
        assert_eq!(make_score(&result, true), Score::default());
    }
}
