use skat_core::Cards;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by the solver entry points
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("hands and trick share cards: {0}")]
    OverlappingHands(Cards),
    #[error("invalid trick in progress: {0}")]
    InvalidTrick(String),
    #[error("inconsistent card counts: {0:?}")]
    InvalidHand([usize; 3]),
    #[error("seat {0} out of range")]
    BadSeat(usize),
    #[error("world arrays differ in size: {hands1}, {hands2}, {skats}")]
    WorldSizeMismatch {
        hands1: usize,
        hands2: usize,
        skats: usize,
    },
    #[error("no consistent world to search")]
    EmptyWorlds,
    #[error("paranoid table not loaded")]
    ParanoidNotLoaded,
    #[error("paranoid table was loaded for {loaded}, queried with {queried}")]
    HandMismatch { loaded: Cards, queried: Cards },
    #[error("paranoid search does not cover null games")]
    NullNotSupported,
    #[error("cannot read {path}: {source}")]
    TableIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: {message}")]
    TableFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },
}
