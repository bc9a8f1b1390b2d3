//! Player choosing its cards by double-dummy search over sampled worlds

use crate::{Player, PlayerConfig, PlayerError, World, WorldSampler};
use rand::rngs::StdRng;
use rand::SeedableRng;
use skat_core::{
    Action, Card, Cards, GameDeclaration, GameType, Phase, SimpleGame, SimpleState, View, Voids,
};
use skat_dds::{DdsResult, Interrupt, Solver, WorldQuery, INF};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, trace};

/// What the player remembers about the current deal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealMemory {
    /// Moves processed so far
    pub processed: usize,
    pub phase: Option<Phase>,
    pub declarer: Option<usize>,
    pub game_type: Option<GameType>,
    pub voids: [Voids; 3],
    pub tricks: u32,
}

pub struct SearchPlayer {
    config: PlayerConfig,
    solver: Solver,
    interrupt: Interrupt,
    memory: DealMemory,
    rng: StdRng,
}

impl SearchPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        let interrupt = Interrupt::new();
        SearchPlayer {
            solver: Solver::with_interrupt(config.solver.clone(), interrupt.clone()),
            rng: StdRng::seed_from_u64(config.seed),
            interrupt,
            memory: DealMemory::default(),
            config,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn memory(&self) -> &DealMemory {
        &self.memory
    }

    /// Run `f` with a timer that raises the interrupt once `budget` is
    /// spent. A raised timer interrupt is cleared again afterwards.
    fn with_budget<T>(
        &mut self,
        budget: Option<Duration>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let Some(budget) = budget else {
            return f(self);
        };
        let was_set = self.interrupt.is_set();
        let interrupt = self.interrupt.clone();
        let (done, wait) = mpsc::channel::<()>();

        thread::scope(|scope| {
            let timer = scope.spawn(move || match wait.recv_timeout(budget) {
                Err(RecvTimeoutError::Timeout) => {
                    interrupt.set();
                    true
                }
                _ => false,
            });
            let result = f(self);
            // the timer may already be gone
            done.send(()).ok();
            let fired = timer.join().unwrap_or(false);
            if fired && !was_set {
                debug!(?budget, "time budget spent");
                self.interrupt.clear();
            }
            result
        })
    }

    /// Pick the game and the two cards to put away after taking the skat.
    ///
    /// Grand with three or more jacks, otherwise the longest suit. The two
    /// cheapest non-trumps go back.
    fn declare(&self, state: &SimpleState, seat: usize) -> Action {
        let cards = state.players[seat].hand | state.skat_cards();
        let game_type = if (cards & Cards::JACKS).len() >= 3 {
            GameType::Grand
        } else {
            GameType::ALL[..4]
                .iter()
                .copied()
                .max_by_key(|g| (g.trumps() & cards).len())
                .unwrap_or(GameType::Grand)
        };

        let trumps = game_type.trumps();
        let mut discards: Vec<Card> = (cards - trumps).iter().collect();
        if discards.len() < 2 {
            discards.extend((cards & trumps).iter());
        }
        discards.sort_by_key(|c| (c.points(), c.to_index()));
        Action::Declare {
            declaration: GameDeclaration::new(game_type),
            cards: discards.iter().take(2).map(|&c| Some(c)).collect(),
        }
    }

    /// Best legal card by w_paranoid over freshly sampled worlds
    fn choose_card(&mut self, state: &SimpleState, seat: usize) -> Result<Card, PlayerError> {
        let legal = state.legal_cards();
        let lowest = legal.lowest().ok_or(PlayerError::Sampling)?;
        if legal.len() == 1 {
            return Ok(lowest);
        }
        let (Some(declarer), Some(game_type)) = (state.declarer, state.game_type()) else {
            return Err(PlayerError::Sampling);
        };

        let sampler = WorldSampler::new(state, seat)?;
        let worlds: Vec<World> = (0..self.config.worlds.max(1))
            .map(|_| sampler.sample(&mut self.rng).ok_or(PlayerError::Sampling))
            .collect::<Result<_, _>>()?;
        let hands1: Vec<Cards> = worlds.iter().map(|w| w.hands[(seat + 1) % 3]).collect();
        let hands2: Vec<Cards> = worlds.iter().map(|w| w.hands[(seat + 2) % 3]).collect();
        let skats: Vec<Cards> = worlds.iter().map(|w| w.skat).collect();

        let query = WorldQuery {
            declarer_hand: (seat == declarer).then_some(state.players[seat].hand),
            played: state.played_cards(),
            to_move: seat,
            declarer,
            game_type,
            trick: state.open_trick().to_vec(),
            declarer_points: state.players[declarer].trick_points,
            defender_points: state.defender_points(),
            alpha: -INF,
            beta: INF,
            clear_hash: false,
            hands1: &hands1,
            hands2: &hands2,
            skats: &skats,
        };
        let scores = self.solver.w_paranoid_moves(&query)?;
        let card = best_card(&scores, lowest);
        debug!(
            seat,
            %card,
            worlds = worlds.len(),
            scored = scores.len(),
            "chose card"
        );
        Ok(card)
    }
}

/// Highest scoring card, ties going to the earlier (lower) card. Scores
/// cut short by an interrupt only count when no card was searched in full.
fn best_card(scores: &[(Card, DdsResult)], lowest: Card) -> Card {
    let complete = scores
        .iter()
        .any(|(_, r)| r.is_exact() && !r.interrupted);
    let mut best: Option<(Card, i32)> = None;
    for &(card, result) in scores {
        trace!(
            %card,
            value = result.value,
            bound = ?result.bound,
            interrupted = result.interrupted,
            "card score"
        );
        if complete && (result.interrupted || !result.is_exact()) {
            continue;
        }
        if best.map_or(true, |(_, v)| result.value > v) {
            best = Some((card, result.value));
        }
    }
    best.map_or(lowest, |(c, _)| c)
}

impl Player for SearchPlayer {
    fn reset(&mut self) {
        self.memory = DealMemory::default();
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.interrupt.clear();
    }

    fn game_change(&mut self, game: &SimpleGame, index: Option<usize>) -> Result<(), PlayerError> {
        let moves = game.num_moves();
        let Some(index) = index.or(moves.checked_sub(1)) else {
            return Ok(());
        };
        if index >= moves {
            return Err(PlayerError::BadIndex { index, moves });
        }

        for i in self.memory.processed..=index {
            let Some(state) = game.state_after(i) else {
                return Err(PlayerError::BadIndex { index: i, moves });
            };
            trace!(index = i, phase = ?state.phase, "game change");
            let memory = &mut self.memory;
            memory.phase = Some(state.phase);
            memory.declarer = state.declarer;
            memory.game_type = state.game_type();
            memory.tricks = state.tricks_played();
            for (seat, player) in state.players.iter().enumerate() {
                memory.voids[seat] |= player.voids;
            }
            memory.processed = i + 1;
        }
        Ok(())
    }

    fn compute_move(
        &mut self,
        game: &SimpleGame,
        budget: Option<Duration>,
    ) -> Result<String, PlayerError> {
        if game.num_moves() == 0 {
            return Err(PlayerError::NoHistory);
        }
        let state = game.current_state();
        let View::Player(seat) = state.view else {
            return Err(PlayerError::NoSeat(state.view));
        };
        if state.to_move != seat {
            return Err(PlayerError::NotToMove {
                seat,
                to_move: state.to_move,
            });
        }
        self.game_change(game, None)?;

        let action = match state.phase {
            Phase::Bid | Phase::Answer => Action::Pass,
            Phase::SkatOrHandDecl => Action::TakeSkat,
            Phase::DiscardAndDecl => self.declare(state, seat),
            Phase::Cardplay => {
                Action::Play(self.with_budget(budget, |p| p.choose_card(state, seat))?)
            }
            Phase::Deal | Phase::GetSkat | Phase::Finished => {
                return Err(PlayerError::NotToMove {
                    seat,
                    to_move: state.to_move,
                });
            }
        };
        // never hand out a move the game would reject
        state.successor(seat as i32, &action)?;
        Ok(action.to_string())
    }

    fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{cards, game};
    use skat_dds::{BoundKind, SolverConfig};

    fn player() -> SearchPlayer {
        SearchPlayer::new(PlayerConfig {
            worlds: 3,
            seed: 5,
            solver: SolverConfig {
                num_threads: 1,
                ..SolverConfig::default()
            },
        })
    }

    #[test]
    fn test_replay_matches_single_call() {
        let g = game(View::Player(1), 15);

        let mut step = player();
        for i in 0..g.num_moves() {
            step.game_change(&g, Some(i)).unwrap();
            // replaying an index twice changes nothing
            step.game_change(&g, Some(i)).unwrap();
        }
        let mut once = player();
        once.game_change(&g, Some(g.num_moves() - 1)).unwrap();

        assert_eq!(step.memory(), once.memory());
        assert_eq!(once.memory().processed, g.num_moves());
        assert_eq!(once.memory().declarer, Some(0));
        assert_eq!(once.memory().tricks, 5);
        assert!(once.memory().voids[2].contains(Voids::CLUBS));

        once.reset();
        assert_eq!(once.memory(), &DealMemory::default());
    }

    #[test]
    fn test_bad_index() {
        let g = game(View::Player(1), 0);
        let mut p = player();
        assert!(matches!(
            p.game_change(&g, Some(50)),
            Err(PlayerError::BadIndex { index: 50, .. })
        ));
    }

    #[test]
    fn test_not_to_move() {
        // seat 1 is not to move after five tricks
        let g = game(View::Player(1), 15);
        let mut p = player();
        let err = p.compute_move(&g, None).unwrap_err();
        assert!(matches!(err, PlayerError::NotToMove { seat: 1, to_move: 0 }));
        assert_eq!(p.memory(), &DealMemory::default());

        let g = SimpleGame::new(View::Player(1));
        assert!(matches!(
            p.compute_move(&g, None),
            Err(PlayerError::NoHistory)
        ));
    }

    #[test]
    fn test_bidding_moves() {
        let g = game(View::Player(1), 0);
        let before_pass = SimpleGame::from_parts(
            g.moves()[..1].to_vec(),
            g.states()[..2].to_vec(),
        )
        .unwrap();
        let mut p = player();
        assert_eq!(p.compute_move(&before_pass, None).unwrap(), "p");
    }

    #[test]
    fn test_declaration() {
        let g = game(View::Player(0), 0);
        // snapshot before the declaration move
        let n = g.num_moves() - 1;
        let before = SimpleGame::from_parts(g.moves()[..n].to_vec(), g.states()[..=n].to_vec())
            .unwrap();
        let mut p = player();
        // seven clubs with CJ SJ: clubs, putting away the D8 and D7
        assert_eq!(p.compute_move(&before, None).unwrap(), "C.D7.D8");
    }

    #[test]
    fn test_single_legal_card() {
        // D7 led, seat 1 holds DA as its only diamond
        let g = game(View::Player(1), 16);
        let mut p = player();
        assert_eq!(p.compute_move(&g, None).unwrap(), "DA");
    }

    #[test]
    fn test_card_search() {
        // seat 2 follows D7 DA with one of DT DK DQ; partner wins the
        // trick, so the ten goes on it
        let g = game(View::Player(2), 17);
        let mut p = player();
        let token = p.compute_move(&g, Some(Duration::from_secs(60))).unwrap();
        assert!(["DT", "DK", "DQ"].contains(&token.as_str()));
        assert_eq!(token, "DT");
        assert!(!p.interrupt_handle().is_set());
        assert_eq!(g.current_state().players[2].hand, cards("S9.H9.DT.DK.DQ"));
    }

    fn score(value: i32, bound: BoundKind, interrupted: bool) -> DdsResult {
        DdsResult {
            value,
            bound,
            interrupted,
            nodes: 1,
            declarer_to_move: false,
        }
    }

    #[test]
    fn test_cut_short_score_not_preferred() {
        // the interrupt hit while DT was being searched: its value is
        // only an upper bound and must not beat the full search of DK
        let scores = [
            (Card::parse("DK").unwrap(), score(4, BoundKind::Exact, false)),
            (Card::parse("DT").unwrap(), score(40, BoundKind::Upper, true)),
            (Card::parse("DQ").unwrap(), score(-2, BoundKind::Exact, false)),
        ];
        let lowest = Card::parse("DQ").unwrap();
        assert_eq!(best_card(&scores, lowest), Card::parse("DK").unwrap());

        // with nothing complete the partial values still decide
        let partial = [
            (Card::parse("DQ").unwrap(), score(1, BoundKind::Lower, true)),
            (Card::parse("DT").unwrap(), score(9, BoundKind::Upper, true)),
        ];
        assert_eq!(best_card(&partial, lowest), Card::parse("DT").unwrap());
        assert_eq!(best_card(&[], lowest), lowest);

        // ties keep the first card
        let tied = [
            (Card::parse("DQ").unwrap(), score(3, BoundKind::Exact, false)),
            (Card::parse("DK").unwrap(), score(3, BoundKind::Exact, false)),
        ];
        assert_eq!(best_card(&tied, lowest), lowest);
    }

    #[test]
    fn test_interrupted_search_still_moves() {
        let g = game(View::Player(2), 17);
        let mut p = player();
        p.interrupt_move_computation();
        let token = p.compute_move(&g, None).unwrap();
        assert!(["DT", "DK", "DQ"].contains(&token.as_str()));
        p.reset();
        assert!(!p.interrupt_handle().is_set());
    }
}
