//! Skat players for an external table orchestrator
//!
//! [`SearchPlayer`] passes in the bidding, takes the skat and picks its
//! cards with the world sampling search of `skat-dds`.

mod error;
mod player;
mod sampler;
mod search;

pub use error::PlayerError;
pub use player::{Player, PlayerConfig};
pub use sampler::{World, WorldSampler};
pub use search::{DealMemory, SearchPlayer};

#[cfg(test)]
mod fixtures;
