//! Skat card play search.
//!
//! - [`Solver`]: double-dummy alpha-beta search with a transposition cache
//! - [`Solver::w_paranoid`]: the same search over sampled worlds
//! - [`ParanoidSolver`]: win/schneider/schwarz/loss classification of a
//!   declarer hand and skat, from a table or by search

mod cache;
mod config;
mod error;
mod paranoid;
mod position;
mod solver;
mod w_paranoid;

pub use cache::{Bounds, CacheKey, TranspositionCache};
pub use config::{Interrupt, SolverConfig};
pub use error::SolverError;
pub use paranoid::{ParanoidOutcome, ParanoidSolver, ParanoidTable};
pub use position::{Played, Position};
pub use solver::{BoundKind, DdsResult, SearchMode, Solver, INF};
pub use w_paranoid::{aggregate, WorldQuery};

#[cfg(test)]
mod tests;
