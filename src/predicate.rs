//! Block matching predicates

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::index::block::BlockState;

/// Decides whether a block state belongs in the index.
///
/// Implementations must be pure: the same state always yields the same answer
/// for a given predicate instance. Swapping the active predicate at runtime
/// requires a full rescan (see `BlockHighlighter::set_predicate`).
pub trait BlockPredicate: Send + Sync {
    /// Whether blocks of this state should be indexed
    fn matches(&self, state: BlockState) -> bool;
}

impl<F> BlockPredicate for F
where
    F: Fn(BlockState) -> bool + Send + Sync,
{
    fn matches(&self, state: BlockState) -> bool {
        self(state)
    }
}

/// User-editable allow-list of block states
///
/// The typical predicate: the user picks which block types to highlight.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    states: HashSet<BlockState>,
}

impl AllowList {
    /// Create an empty allow-list (matches nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an iterator of states
    pub fn from_states(states: impl IntoIterator<Item = BlockState>) -> Self {
        Self {
            states: states.into_iter().collect(),
        }
    }

    /// Add a state to the list
    ///
    /// Returns `false` if it was already present.
    pub fn insert(&mut self, state: BlockState) -> bool {
        self.states.insert(state)
    }

    /// Remove a state from the list
    pub fn remove(&mut self, state: BlockState) -> bool {
        self.states.remove(&state)
    }

    /// Whether a state is listed
    pub fn contains(&self, state: BlockState) -> bool {
        self.states.contains(&state)
    }

    /// Number of listed states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl BlockPredicate for AllowList {
    fn matches(&self, state: BlockState) -> bool {
        self.states.contains(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_matches() {
        let list = AllowList::from_states([BlockState(14), BlockState(15)]);

        assert!(list.matches(BlockState(14)));
        assert!(list.matches(BlockState(15)));
        assert!(!list.matches(BlockState(1)));
        assert!(!list.matches(BlockState::AIR));
    }

    #[test]
    fn test_allow_list_edit() {
        let mut list = AllowList::new();
        assert!(list.is_empty());

        assert!(list.insert(BlockState(7)));
        assert!(!list.insert(BlockState(7)));
        assert_eq!(list.len(), 1);
        assert!(list.contains(BlockState(7)));

        assert!(list.remove(BlockState(7)));
        assert!(!list.matches(BlockState(7)));
    }

    #[test]
    fn test_closure_predicate() {
        let pred = |state: BlockState| state.0 > 10;
        assert!(pred.matches(BlockState(11)));
        assert!(!pred.matches(BlockState(10)));
    }
}
