use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Search configuration shared by all solver entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Nodes searched between two polls of the interrupt flag
    pub poll_interval: u64,
    /// Cache entries kept before the table is dropped
    pub cache_limit: usize,
    /// Worlds sampled when the paranoid table has no entry (at most 64)
    pub paranoid_worlds: usize,
    /// Information set nodes per paranoid target before the search settles
    /// for the per-world answer
    pub paranoid_nodes: u64,
    /// Seed for every random choice made by the solvers
    pub seed: u64,
    /// Worker threads for parallel world evaluation (0 = auto-detect)
    pub num_threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            poll_interval: 4096,
            cache_limit: 1 << 22,
            paranoid_worlds: 16,
            paranoid_nodes: 20_000,
            seed: 0,
            num_threads: 0,
        }
    }
}

impl SolverConfig {
    /// Get the actual number of threads to use.
    pub fn actual_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.num_threads
        }
    }
}

/// Cooperative cancellation flag.
///
/// Clones share the flag. Once set it stays set until [`Interrupt::clear`].
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Interrupt::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_shared() {
        let a = Interrupt::new();
        let b = a.clone();
        assert!(!b.is_set());
        a.set();
        assert!(b.is_set());
        b.clear();
        assert!(!a.is_set());
    }

    #[test]
    fn test_actual_threads() {
        let config = SolverConfig {
            num_threads: 3,
            ..SolverConfig::default()
        };
        assert_eq!(config.actual_threads(), 3);
        assert!(SolverConfig::default().actual_threads() >= 1);
    }
}
