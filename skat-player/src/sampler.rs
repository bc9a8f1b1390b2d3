//! Random deals of the cards a seat cannot see

use crate::PlayerError;
use rand::seq::SliceRandom;
use rand::Rng;
use skat_core::{Card, Cards, SimpleState};

/// Tries before a sampler gives up on a set of constraints
const MAX_ATTEMPTS: usize = 64;

/// One full assignment of the cards still in play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct World {
    pub hands: [Cards; 3],
    pub skat: Cards,
}

/// Deals unseen cards to the hidden seats and the hidden skat, honouring
/// card counts and known voids
#[derive(Debug, Clone)]
pub struct WorldSampler {
    known: [Option<Cards>; 3],
    skat: Option<Cards>,
    counts: [usize; 3],
    allowed: [Cards; 3],
    pool: Cards,
}

impl WorldSampler {
    /// Sampler for the card play snapshot `state` as seen by `seat`
    pub fn new(state: &SimpleState, seat: usize) -> Result<Self, PlayerError> {
        let game_type = state.game_type().ok_or(PlayerError::Sampling)?;
        let skat = state.skat_cards();
        let skat = (skat.len() == 2).then_some(skat);
        let mut taken = state.played_cards() | skat.unwrap_or_default();

        let mut known = [None; 3];
        let mut counts = [0; 3];
        for s in 0..3 {
            let hand = state.players[s].hand;
            counts[s] = state.num_cards(s);
            if s == seat || state.view.sees(s) || !hand.is_empty() {
                known[s] = Some(hand);
                taken |= hand;
            }
        }

        let pool = !taken;
        let mut allowed = [Cards::EMPTY; 3];
        for s in 0..3 {
            allowed[s] = pool - game_type.void_mask(state.players[s].voids);
        }

        let sampler = WorldSampler {
            known,
            skat,
            counts,
            allowed,
            pool,
        };
        if sampler.pool.len() != sampler.needed() {
            return Err(PlayerError::Sampling);
        }
        Ok(sampler)
    }

    /// Cards the sampler deals out
    pub fn pool(&self) -> Cards {
        self.pool
    }

    fn needed(&self) -> usize {
        let hands: usize = (0..3)
            .filter(|&s| self.known[s].is_none())
            .map(|s| self.counts[s])
            .sum();
        hands + if self.skat.is_some() { 0 } else { 2 }
    }

    /// Draw one world, or `None` if the constraints kept failing
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<World> {
        (0..MAX_ATTEMPTS).find_map(|_| self.try_sample(rng))
    }

    /// Deal the cards with the fewest possible places first; each card goes
    /// to an open place with probability proportional to its free room.
    fn try_sample<R: Rng>(&self, rng: &mut R) -> Option<World> {
        let mut hands = self.known.map(|h| h.unwrap_or_default());
        let mut skat = self.skat.unwrap_or_default();
        // free room of seats 0-2 and the skat
        let mut room = [0usize; 4];
        for s in 0..3 {
            if self.known[s].is_none() {
                room[s] = self.counts[s];
            }
        }
        if self.skat.is_none() {
            room[3] = 2;
        }

        let fits = |place: usize, card: Card| place == 3 || self.allowed[place].contains(card);
        let mut cards: Vec<Card> = self.pool.iter().collect();
        cards.shuffle(rng);
        cards.sort_by_key(|&c| (0..4).filter(|&p| room[p] > 0 && fits(p, c)).count());

        for card in cards {
            let open = |p: usize| if fits(p, card) { room[p] } else { 0 };
            let total: usize = (0..4).map(open).sum();
            if total == 0 {
                return None;
            }
            let mut pick = rng.gen_range(0..total);
            let mut place = 0;
            while pick >= open(place) {
                pick -= open(place);
                place += 1;
            }
            room[place] -= 1;
            if place == 3 {
                skat.insert(card);
            } else {
                hands[place].insert(card);
            }
        }
        Some(World { hands, skat })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{cards, game};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use skat_core::View;

    #[test]
    fn test_declarer_view() {
        // after five tricks, declarer to lead; seat 2 is out of trumps
        let g = game(View::Player(0), 15);
        let state = g.current_state();
        let sampler = WorldSampler::new(state, 0).unwrap();
        assert_eq!(sampler.pool(), cards("HJ.HT.HK.HQ.DA.S9.H9.DT.DK.DQ"));

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let world = sampler.sample(&mut rng).unwrap();
            assert_eq!(world.hands[0], state.players[0].hand);
            assert_eq!(world.skat, cards("HA.D8"));
            assert_eq!(world.hands[1].len(), 5);
            assert_eq!(world.hands[2].len(), 5);
            assert!(world.hands[1].contains(Card::parse("HJ").unwrap()));
            assert_eq!(world.hands[1] | world.hands[2], sampler.pool());
        }
    }

    #[test]
    fn test_defender_view() {
        // seat 2 to play to D7 DA; declarer and skat hidden
        let g = game(View::Player(2), 17);
        let state = g.current_state();
        assert_eq!(state.to_move, 2);
        let sampler = WorldSampler::new(state, 2).unwrap();
        assert_eq!(sampler.pool().len(), 4 + 4 + 2);

        let mut rng = StdRng::seed_from_u64(11);
        let world = sampler.sample(&mut rng).unwrap();
        assert_eq!(world.hands[0].len(), 4);
        assert_eq!(world.hands[1].len(), 4);
        assert_eq!(world.skat.len(), 2);
        assert_eq!(world.hands[2], state.players[2].hand);
        assert_eq!(
            world.hands[0] | world.hands[1] | world.skat,
            sampler.pool()
        );
    }

    #[test]
    fn test_needs_game() {
        let g = game(View::Player(1), 0);
        let state = g.state(4).unwrap();
        assert!(state.game_type().is_none());
        assert!(matches!(
            WorldSampler::new(state, 1),
            Err(PlayerError::Sampling)
        ));
    }
}
