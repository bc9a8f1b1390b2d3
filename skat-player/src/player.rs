use crate::PlayerError;
use skat_core::SimpleGame;
use skat_dds::{Interrupt, SolverConfig};
use std::time::Duration;

/// Player settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Worlds sampled for each card decision
    pub worlds: usize,
    pub seed: u64,
    pub solver: SolverConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            worlds: 20,
            seed: 0,
            solver: SolverConfig::default(),
        }
    }
}

/// A seat at a Skat table driven by an external orchestrator.
///
/// The orchestrator calls [`Player::game_change`] once per move in move
/// order and [`Player::compute_move`] when the player's seat is to move.
pub trait Player {
    /// Forget everything about the current deal and clear the interrupt
    fn reset(&mut self);

    /// Process the moves of `game` up to and including move `index` (the
    /// last move if `None`). Moves already processed are skipped.
    fn game_change(&mut self, game: &SimpleGame, index: Option<usize>)
        -> Result<(), PlayerError>;

    /// Action token for the current snapshot of `game`. Searching stops at
    /// the interrupt or when `budget` runs out, returning the best move
    /// found so far.
    fn compute_move(
        &mut self,
        game: &SimpleGame,
        budget: Option<Duration>,
    ) -> Result<String, PlayerError>;

    /// Ask a running search to stop
    fn interrupt_move_computation(&self) {
        self.interrupt_handle().set();
    }

    /// Handle for interrupting from another thread
    fn interrupt_handle(&self) -> Interrupt;
}
