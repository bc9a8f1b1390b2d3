//! Search input: the cards left in play and the points already taken

use crate::SolverError;
use skat_core::{Card, Cards, GameType, Phase, SimpleState};

/// Perfect information card play position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Cards still held by seats 0-2
    pub hands: [Cards; 3],
    pub to_move: usize,
    pub declarer: usize,
    pub game_type: GameType,
    /// Cards of the trick in progress (0-2), in play order
    pub trick: Vec<Card>,
    /// Points already won by the declarer, including the skat when known
    pub declarer_points: u32,
    pub defender_points: u32,
}

/// Result of playing one card in a [`Position`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Played {
    Next(Position),
    /// Play is over; value from the declarer's side as the search reports it
    Over { declarer_value: i32 },
}

impl Position {
    /// Check the position before searching it
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.to_move > 2 {
            return Err(SolverError::BadSeat(self.to_move));
        }
        if self.declarer > 2 {
            return Err(SolverError::BadSeat(self.declarer));
        }

        let mut seen = Cards::EMPTY;
        for &hand in &self.hands {
            if seen.intersects(hand) {
                return Err(SolverError::OverlappingHands(seen & hand));
            }
            seen |= hand;
        }

        if self.trick.len() > 2 {
            return Err(SolverError::InvalidTrick(format!(
                "{} cards, at most 2 allowed",
                self.trick.len()
            )));
        }
        for &card in &self.trick {
            if seen.contains(card) {
                return Err(SolverError::OverlappingHands(Cards::EMPTY.with(card)));
            }
            seen.insert(card);
        }

        // seats that already played to this trick hold one card less
        let sizes = self.hands.map(|h| h.len());
        let n = sizes[self.to_move];
        for k in 1..3 {
            let seat = (self.to_move + k) % 3;
            let expected = if 3 - k <= self.trick.len() {
                n.checked_sub(1)
            } else {
                Some(n)
            };
            if expected != Some(sizes[seat]) {
                return Err(SolverError::InvalidHand(sizes));
            }
        }
        Ok(())
    }

    /// Position of a card play snapshot with every hand known
    pub fn from_state(state: &SimpleState) -> Result<Position, SolverError> {
        let (Some(declarer), Some(game_type)) = (state.declarer, state.game_type()) else {
            return Err(SolverError::InvalidTrick("no game declared".to_string()));
        };
        if state.phase != Phase::Cardplay {
            return Err(SolverError::InvalidTrick(format!(
                "snapshot in phase {:?}",
                state.phase
            )));
        }
        let position = Position {
            hands: [
                state.players[0].hand,
                state.players[1].hand,
                state.players[2].hand,
            ],
            to_move: state.to_move,
            declarer,
            game_type,
            trick: state.open_trick().to_vec(),
            declarer_points: state.declarer_points(),
            defender_points: state.defender_points(),
        };
        position.validate()?;
        Ok(position)
    }

    /// All cards not yet played to a completed trick
    pub fn cards_in_play(&self) -> Cards {
        let trick = Cards::from_cards(self.trick.iter().copied());
        self.hands.iter().fold(trick, |acc, &h| acc | h)
    }

    /// Points still to be won
    pub fn remaining_points(&self) -> u32 {
        self.cards_in_play().points()
    }

    /// Legal cards for the seat to move
    pub fn legal_cards(&self) -> Cards {
        self.game_type
            .legal_plays(self.hands[self.to_move], self.trick.first().copied())
    }

    /// Play `card` for the seat to move, scoring a completed trick
    pub fn play(&self, card: Card) -> Result<Played, SolverError> {
        if !self.legal_cards().contains(card) {
            return Err(SolverError::InvalidTrick(format!(
                "{} is not a legal play for seat {}",
                card, self.to_move
            )));
        }
        let mut next = self.clone();
        next.hands[self.to_move].remove(card);
        next.trick.push(card);
        if next.trick.len() < 3 {
            next.to_move = (self.to_move + 1) % 3;
            return Ok(Played::Next(next));
        }

        let cards = [next.trick[0], next.trick[1], next.trick[2]];
        let starter = (self.to_move + 1) % 3;
        let winner = (starter + self.game_type.trick_winner(cards)) % 3;
        let points: u32 = cards.iter().map(|c| c.points() as u32).sum();
        next.trick.clear();
        next.to_move = winner;
        if winner == self.declarer {
            next.declarer_points += points;
        } else {
            next.defender_points += points;
        }

        let all_played = next.hands.iter().all(|h| h.is_empty());
        if self.game_type.is_null() {
            if winner == self.declarer {
                let held = next.hands[self.declarer].len() as i32;
                return Ok(Played::Over {
                    declarer_value: -(100 + held),
                });
            }
            if all_played {
                return Ok(Played::Over {
                    declarer_value: 100,
                });
            }
        } else if all_played {
            return Ok(Played::Over {
                declarer_value: next.declarer_points as i32 - next.defender_points as i32,
            });
        }
        Ok(Played::Next(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(s: &str) -> Cards {
        s.split('.').filter_map(Card::parse).collect()
    }

    fn endgame() -> Position {
        Position {
            hands: [cards("CJ.HA"), cards("SA.ST"), cards("H7.H8")],
            to_move: 0,
            declarer: 0,
            game_type: GameType::Grand,
            trick: vec![],
            declarer_points: 50,
            defender_points: 37,
        }
    }

    #[test]
    fn test_validate() {
        assert!(endgame().validate().is_ok());

        let mut p = endgame();
        p.hands[1] = cards("SA.HA");
        assert!(matches!(p.validate(), Err(SolverError::OverlappingHands(_))));

        let mut p = endgame();
        p.hands[2] = cards("H7");
        assert!(matches!(p.validate(), Err(SolverError::InvalidHand(_))));

        let mut p = endgame();
        p.hands[0] = cards("CJ");
        p.trick = vec![Card::parse("HA").unwrap()];
        // seat 2 led HA, seat 0 to move
        assert!(matches!(p.validate(), Err(SolverError::InvalidHand(_))));
        p.hands = [cards("CJ.HA"), cards("SA.ST"), cards("H8")];
        p.trick = vec![Card::parse("H7").unwrap()];
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_play_scores_trick() {
        let p = endgame();
        let Played::Next(p) = p.play(Card::parse("HA").unwrap()).unwrap() else {
            panic!("game over too early");
        };
        assert_eq!(p.to_move, 1);
        // SA and ST are not hearts, but seat 1 has no hearts
        let Played::Next(p) = p.play(Card::parse("ST").unwrap()).unwrap() else {
            panic!("game over too early");
        };
        assert!(p.play(Card::parse("CJ").unwrap()).is_err());
        let Played::Next(p) = p.play(Card::parse("H7").unwrap()).unwrap() else {
            panic!("game over too early");
        };
        assert_eq!(p.to_move, 0);
        assert_eq!(p.declarer_points, 71);
        assert!(p.trick.is_empty());
    }

    #[test]
    fn test_last_trick_ends_play() {
        let p = Position {
            hands: [cards("CJ"), cards("SA"), cards("H7")],
            to_move: 0,
            declarer: 0,
            game_type: GameType::Grand,
            trick: vec![],
            declarer_points: 60,
            defender_points: 49,
        };
        let Played::Next(p) = p.play(Card::parse("CJ").unwrap()).unwrap() else {
            panic!("game over too early");
        };
        let Played::Next(p) = p.play(Card::parse("SA").unwrap()).unwrap() else {
            panic!("game over too early");
        };
        assert_eq!(
            p.play(Card::parse("H7").unwrap()).unwrap(),
            Played::Over {
                declarer_value: 73 - 49
            }
        );
    }
}
