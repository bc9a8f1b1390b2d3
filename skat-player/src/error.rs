use skat_core::{MoveError, View};
use skat_dds::SolverError;
use thiserror::Error;

/// Error returned by a player instead of a move
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("seat {seat} asked for a move but seat {to_move} is to move")]
    NotToMove { seat: usize, to_move: usize },
    #[error("no moves in the deal history")]
    NoHistory,
    #[error("move index {index} beyond a history of {moves} moves")]
    BadIndex { index: usize, moves: usize },
    #[error("view {0:?} has no seat to play for")]
    NoSeat(View),
    #[error("no world is consistent with the cards seen so far")]
    Sampling,
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Move(#[from] MoveError),
}
