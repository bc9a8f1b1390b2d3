//! Double-dummy search over sampled worlds.
//!
//! Each world fixes the hidden cards: the hands of the two seats after the
//! mover and the skat. Every world is searched with full information and
//! the results are combined into one value for the side to move.

use crate::solver::{BoundKind, INF};
use crate::{DdsResult, Played, Position, SearchMode, Solver, SolverError};
use skat_core::{Card, Cards, GameType};
use tracing::{debug, warn};

/// Card play position with the hidden cards given as a list of worlds
#[derive(Debug, Clone)]
pub struct WorldQuery<'a> {
    /// Declarer's remaining cards when the caller knows them; worlds that
    /// disagree are dropped
    pub declarer_hand: Option<Cards>,
    /// Cards played to completed tricks and to the trick in progress
    pub played: Cards,
    pub to_move: usize,
    pub declarer: usize,
    pub game_type: GameType,
    pub trick: Vec<Card>,
    /// Declarer's trick points; the skat of each world is added on top
    pub declarer_points: u32,
    pub defender_points: u32,
    pub alpha: i32,
    pub beta: i32,
    pub clear_hash: bool,
    /// Hands of seat `to_move + 1`
    pub hands1: &'a [Cards],
    /// Hands of seat `to_move + 2`
    pub hands2: &'a [Cards],
    pub skats: &'a [Cards],
}

impl WorldQuery<'_> {
    /// Number of worlds, once the three arrays agree in size
    pub fn num_worlds(&self) -> Result<usize, SolverError> {
        let n = self.hands1.len();
        if self.hands2.len() != n || self.skats.len() != n {
            return Err(SolverError::WorldSizeMismatch {
                hands1: n,
                hands2: self.hands2.len(),
                skats: self.skats.len(),
            });
        }
        if n == 0 {
            return Err(SolverError::EmptyWorlds);
        }
        Ok(n)
    }

    /// Full information position of world `i`
    pub fn world(&self, i: usize) -> Result<Position, SolverError> {
        let (h1, h2, skat) = (self.hands1[i], self.hands2[i], self.skats[i]);
        let trick = Cards::from_cards(self.trick.iter().copied());
        let mut known = self.played | trick;
        for set in [h1, h2, skat] {
            if known.intersects(set) {
                return Err(SolverError::OverlappingHands(known & set));
            }
            known |= set;
        }
        if skat.len() != 2 {
            return Err(SolverError::InvalidHand([h1.len(), h2.len(), skat.len()]));
        }

        let mut hands = [Cards::EMPTY; 3];
        hands[self.to_move % 3] = !known;
        hands[(self.to_move + 1) % 3] = h1;
        hands[(self.to_move + 2) % 3] = h2;
        if self.declarer > 2 {
            return Err(SolverError::BadSeat(self.declarer));
        }
        match self.declarer_hand {
            Some(hand) if hand != hands[self.declarer] => {
                return Err(SolverError::HandMismatch {
                    loaded: hand,
                    queried: hands[self.declarer],
                });
            }
            _ => {}
        }

        let position = Position {
            hands,
            to_move: self.to_move,
            declarer: self.declarer,
            game_type: self.game_type,
            trick: self.trick.clone(),
            declarer_points: self.declarer_points + skat.points(),
            defender_points: self.defender_points,
        };
        position.validate()?;
        Ok(position)
    }

    /// Consistent worlds; the others are logged and dropped
    fn positions(&self) -> Result<Vec<Position>, SolverError> {
        let n = self.num_worlds()?;
        let mut positions = Vec::with_capacity(n);
        for i in 0..n {
            match self.world(i) {
                Ok(p) => positions.push(p),
                Err(e) => warn!(world = i, "dropping world: {}", e),
            }
        }
        if positions.is_empty() {
            return Err(SolverError::EmptyWorlds);
        }
        Ok(positions)
    }
}

/// Combine per-world results for the same side to move.
///
/// Trump games average the values. Null games take the majority of the
/// declarer's wins and losses, a tie counting as a loss, and report the
/// average value of the majority. A single result is returned unchanged.
pub fn aggregate(
    game_type: GameType,
    results: &[DdsResult],
    alpha: i32,
    beta: i32,
) -> Option<DdsResult> {
    let first = *results.first()?;
    if results.len() == 1 {
        return Some(first);
    }

    let nodes = results.iter().map(|r| r.nodes).sum();
    let interrupted = results.iter().any(|r| r.interrupted);
    let value = if game_type.is_null() {
        let (wins, losses): (Vec<i32>, Vec<i32>) = results
            .iter()
            .map(|r| r.for_declarer().value)
            .partition(|&v| v > 0);
        let majority = if wins.len() > losses.len() {
            wins
        } else {
            losses
        };
        let declarer_value = mean(&majority);
        if first.declarer_to_move {
            declarer_value
        } else {
            -declarer_value
        }
    } else {
        mean(&results.iter().map(|r| r.value).collect::<Vec<_>>())
    };

    let (alpha, beta) = if game_type.is_null() {
        (-1, 1)
    } else {
        (alpha, beta)
    };
    let bound = if interrupted {
        interrupted_bound(results)
    } else if value >= beta {
        BoundKind::Lower
    } else if value <= alpha {
        BoundKind::Upper
    } else {
        BoundKind::Exact
    };
    Some(DdsResult {
        value,
        bound,
        interrupted,
        nodes,
        declarer_to_move: first.declarer_to_move,
    })
}

/// Bound kind of the interrupted results, which share the side they were
/// proven for. If they disagree only the flag is meaningful.
fn interrupted_bound(results: &[DdsResult]) -> BoundKind {
    let mut kinds = results
        .iter()
        .filter(|r| r.interrupted && r.bound != BoundKind::Exact)
        .map(|r| r.bound);
    match kinds.next() {
        Some(kind) if kinds.all(|k| k == kind) => kind,
        _ => BoundKind::Lower,
    }
}

fn mean(values: &[i32]) -> i32 {
    if values.is_empty() {
        return 0;
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    (sum as f64 / values.len() as f64).round() as i32
}

/// Convert a result to the view of the declarer's side or the defenders
fn seen_by(result: DdsResult, declarer_side: bool) -> DdsResult {
    let r = result.for_declarer();
    if declarer_side {
        return r;
    }
    DdsResult {
        value: -r.value,
        bound: r.bound.flip(),
        declarer_to_move: false,
        ..r
    }
}

impl Solver {
    /// Search every world of `query` and combine the results.
    ///
    /// Worlds that contradict the known cards are dropped. An interrupt
    /// stops the loop after the current world; the combined result is then
    /// marked interrupted.
    pub fn w_paranoid(&mut self, query: &WorldQuery) -> Result<DdsResult, SolverError> {
        let positions = query.positions()?;
        if query.clear_hash {
            self.clear_hash();
        }
        let interrupt = self.interrupt_handle();

        let mut results = Vec::with_capacity(positions.len());
        for position in &positions {
            results.push(self.dds(position, query.alpha, query.beta, false, SearchMode::Normal)?);
            if interrupt.is_set() {
                break;
            }
        }

        // averaging bounds of different kinds says nothing, so settle them
        let mixed = results.windows(2).any(|w| w[0].bound != w[1].bound);
        if mixed && !query.game_type.is_null() && !interrupt.is_set() {
            for (result, position) in results.iter_mut().zip(&positions) {
                if !result.is_exact() {
                    *result = self.dds(position, -INF, INF, false, SearchMode::Normal)?;
                }
            }
        }

        let mut result = aggregate(query.game_type, &results, query.alpha, query.beta)
            .ok_or(SolverError::EmptyWorlds)?;
        if results.len() < positions.len() {
            result.interrupted = true;
            if result.is_exact() {
                result.bound = BoundKind::Lower;
            }
        }
        debug!(
            worlds = results.len(),
            dropped = query.hands1.len() - positions.len(),
            value = result.value,
            bound = ?result.bound,
            "w_paranoid"
        );
        Ok(result)
    }

    /// Value of every legal card of the mover over the worlds of `query`,
    /// from the mover's side. The query window is not used.
    ///
    /// An interrupt ends the loop; the card being searched keeps a marked
    /// partial score and later cards get none.
    pub fn w_paranoid_moves(
        &mut self,
        query: &WorldQuery,
    ) -> Result<Vec<(Card, DdsResult)>, SolverError> {
        let positions = query.positions()?;
        if query.clear_hash {
            self.clear_hash();
        }
        let interrupt = self.interrupt_handle();
        let mover_side = query.to_move == query.declarer;
        let legal = positions[0].legal_cards();

        let mut scores = Vec::with_capacity(legal.len());
        for card in legal {
            let mut results = Vec::with_capacity(positions.len());
            for position in &positions {
                let result = match position.play(card)? {
                    Played::Over { declarer_value } => DdsResult {
                        value: declarer_value,
                        bound: BoundKind::Exact,
                        interrupted: false,
                        nodes: 0,
                        declarer_to_move: true,
                    },
                    Played::Next(next) => {
                        self.dds(&next, -INF, INF, false, SearchMode::Normal)?
                    }
                };
                results.push(seen_by(result, mover_side));
                if interrupt.is_set() {
                    break;
                }
            }
            if let Some(mut result) = aggregate(query.game_type, &results, -INF, INF) {
                if results.len() < positions.len() {
                    result.interrupted = true;
                    if result.is_exact() {
                        result.bound = BoundKind::Lower;
                    }
                }
                scores.push((card, result));
            }
            if interrupt.is_set() {
                break;
            }
        }
        debug!(
            worlds = positions.len(),
            cards = scores.len(),
            "w_paranoid moves"
        );
        Ok(scores)
    }
}
