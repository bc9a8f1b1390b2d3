use crate::state::{MoveError, SimpleState, View};
use crate::Action;
use thiserror::Error;

/// A move as recorded in the deal history
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    /// Player index 0-2, or -1 for the world/dealer
    pub source: i32,
    pub action: String,
}

impl Move {
    pub fn new(source: i32, action: impl Into<String>) -> Self {
        Move {
            source,
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history has {states} snapshots for {moves} moves")]
    SnapshotCount { moves: usize, states: usize },
    #[error("move {index} ({action}) rejected: {source}")]
    Rejected {
        index: usize,
        action: String,
        #[source]
        source: MoveError,
    },
}

/// Owns the moves of one deal and the snapshot before each of them.
///
/// `states[i]` is the state before `moves[i]`; the last snapshot is the
/// state after the last move, so there is always one more snapshot than
/// there are moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleGame {
    moves: Vec<Move>,
    states: Vec<SimpleState>,
}

impl SimpleGame {
    /// Empty history seen from `view`
    pub fn new(view: View) -> Self {
        SimpleGame {
            moves: Vec::new(),
            states: vec![SimpleState::new(view)],
        }
    }

    /// Build a history from decoded parts
    pub fn from_parts(moves: Vec<Move>, states: Vec<SimpleState>) -> Result<Self, HistoryError> {
        if states.len() != moves.len() + 1 {
            return Err(HistoryError::SnapshotCount {
                moves: moves.len(),
                states: states.len(),
            });
        }
        Ok(SimpleGame { moves, states })
    }

    /// Append a move and its successor snapshot. The history is unchanged
    /// when the move is rejected.
    pub fn apply(&mut self, mv: Move, action: &Action) -> Result<(), HistoryError> {
        let next = self
            .current_state()
            .successor(mv.source, action)
            .map_err(|source| HistoryError::Rejected {
                index: self.moves.len(),
                action: mv.action.clone(),
                source,
            })?;
        self.moves.push(mv);
        self.states.push(next);
        Ok(())
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn states(&self) -> &[SimpleState] {
        &self.states
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    pub fn state(&self, index: usize) -> Option<&SimpleState> {
        self.states.get(index)
    }

    /// State the move at `index` was made in
    pub fn state_before(&self, index: usize) -> Option<&SimpleState> {
        self.states.get(index)
    }

    /// State produced by the move at `index`
    pub fn state_after(&self, index: usize) -> Option<&SimpleState> {
        self.states.get(index + 1)
    }

    pub fn current_state(&self) -> &SimpleState {
        // never empty: constructors guarantee states.len() == moves.len() + 1
        &self.states[self.states.len() - 1]
    }

    pub fn view(&self) -> View {
        self.current_state().view
    }
}
