use crate::{Card, Cards, GameType, Rank, Suit};
use std::fmt;
use thiserror::Error;

/// Null game values: plain, hand, ouvert, ouvert hand
pub const NULL_VALUES: [u32; 4] = [23, 35, 46, 59];

/// The legal bid ladder
pub const BIDS: [u32; 66] = [
    18, 20, 22, 23, 24, 27, 30, 33, 35, 36, 40, 44, 45, 46, 48, 50, 54, 55, 59, 60, 63, 66, 70,
    72, 77, 80, 81, 84, 88, 90, 96, 99, 100, 108, 110, 117, 120, 121, 126, 130, 132, 135, 140, 143,
    144, 150, 153, 154, 156, 160, 162, 165, 168, 170, 171, 176, 180, 187, 189, 190, 192, 198, 204,
    216, 240, 264,
];

/// Lowest legal bid strictly above `bid`
pub fn next_bid(bid: u32) -> Option<u32> {
    BIDS.iter().copied().find(|&b| b > bid)
}

pub fn is_legal_bid(bid: u32) -> bool {
    BIDS.contains(&bid)
}

/// Error parsing or validating a declaration string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("empty game declaration")]
    Empty,
    #[error("game type '{0}' not recognized")]
    UnknownType(char),
    #[error("modifier '{0}' not recognized")]
    UnknownModifier(char),
    #[error("null game cannot announce schneider or schwarz")]
    NullAnnouncement,
    #[error("schneider or schwarz announced in a non-hand game")]
    AnnouncementWithoutHand,
}

/// A declared game: type plus hand/ouvert/announcement flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameDeclaration {
    /// None until the declarer has chosen a game
    pub game_type: Option<GameType>,
    pub hand: bool,
    pub ouvert: bool,
    pub schneider_announced: bool,
    pub schwarz_announced: bool,
}

impl Default for GameDeclaration {
    /// An undeclared game counts as hand until the skat is picked up
    fn default() -> Self {
        GameDeclaration {
            game_type: None,
            hand: true,
            ouvert: false,
            schneider_announced: false,
            schwarz_announced: false,
        }
    }
}

/// Outcome of scoring a finished game for the declarer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameValue {
    /// Positive when the declarer won, negative (doubled) when lost
    pub value: i32,
    /// Positive "with", negative "without"
    pub matadors: i32,
    pub schneider: bool,
    pub schwarz: bool,
    pub overbid: bool,
}

impl GameDeclaration {
    pub fn new(game_type: GameType) -> Self {
        GameDeclaration {
            game_type: Some(game_type),
            hand: false,
            ouvert: false,
            schneider_announced: false,
            schwarz_announced: false,
        }
    }

    /// Parse a declaration such as "C", "GH", "NO" or "SHS".
    ///
    /// Ouvert in a trump game implies hand, schneider and schwarz, and
    /// schwarz implies schneider.
    pub fn parse(s: &str) -> Result<Self, DeclarationError> {
        let mut chars = s.chars();
        let first = chars.next().ok_or(DeclarationError::Empty)?;
        let game_type = GameType::from_char(first).ok_or(DeclarationError::UnknownType(first))?;
        let mut decl = GameDeclaration::new(game_type);

        for c in chars {
            match c {
                'O' => decl.ouvert = true,
                'H' => decl.hand = true,
                'S' => decl.schneider_announced = true,
                'Z' => decl.schwarz_announced = true,
                other => return Err(DeclarationError::UnknownModifier(other)),
            }
        }

        if decl.ouvert && !game_type.is_null() {
            decl.hand = true;
            decl.schneider_announced = true;
            decl.schwarz_announced = true;
        }
        if decl.schwarz_announced {
            decl.schneider_announced = true;
        }
        if game_type.is_null() && decl.schneider_announced {
            return Err(DeclarationError::NullAnnouncement);
        }
        if !decl.hand && decl.schneider_announced {
            return Err(DeclarationError::AnnouncementWithoutHand);
        }
        Ok(decl)
    }

    pub fn is_declared(&self) -> bool {
        self.game_type.is_some()
    }

    /// Base value times the multiplier the declarer would win with
    pub fn win_value(&self, cards: Cards) -> u32 {
        let Some(game_type) = self.game_type else {
            return 0;
        };
        if game_type.is_null() {
            return NULL_VALUES[self.null_index()];
        }
        (trump_multiplier(cards, game_type) + self.modifiers()) * game_type.base_value()
    }

    /// One level each for hand, announcements and ouvert
    fn modifiers(&self) -> u32 {
        [
            self.hand,
            self.schneider_announced,
            self.schwarz_announced,
            self.ouvert,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count() as u32
    }

    fn null_index(&self) -> usize {
        (if self.ouvert { 2 } else { 0 }) + (if self.hand { 1 } else { 0 })
    }

    /// Score a finished game.
    ///
    /// `cards` is the declarer's hand before card play plus the skat,
    /// `points` and `tricks` what the declarer took, `instant_loss` is set
    /// when the declarer resigned, timed out or left, and `all_tricks` is the
    /// number of tricks played in total.
    pub fn evaluate(
        &self,
        cards: Cards,
        points: u32,
        tricks: u32,
        bid: u32,
        instant_loss: bool,
        all_tricks: u32,
    ) -> GameValue {
        let mut result = GameValue::default();
        let Some(game_type) = self.game_type else {
            return result;
        };
        let bid = bid.max(18);

        if game_type.is_null() {
            let v = NULL_VALUES[self.null_index()] as i32;
            result.value = if tricks > 0 || instant_loss { -2 * v } else { v };
            return result;
        }

        let mut m = trump_multiplier(cards, game_type);
        let matadors = m as i32 - 1;
        result.matadors = if cards.contains(crate::CLUBS_JACK) {
            matadors
        } else {
            -matadors
        };

        let won = !instant_loss
            && if self.schwarz_announced {
                tricks == 10
            } else if self.schneider_announced {
                points >= 90
            } else {
                points >= 61
            };

        m += self.modifiers();
        let base = game_type.base_value();

        if won {
            if points >= 90 {
                m += 1;
                result.schneider = true;
            }
            if tricks == 10 {
                m += 1;
                result.schwarz = true;
                result.schneider = true;
            }
            if m * base >= bid {
                result.value = (m * base) as i32;
                return result;
            }
        } else {
            if !self.schneider_announced && all_tricks >= 1 && points <= 30 {
                m += 1;
                result.schneider = true;
            }
            if !self.schwarz_announced && all_tricks >= 1 && tricks == 0 {
                m += 1;
                result.schwarz = true;
                result.schneider = true;
            }
            if m * base >= bid {
                result.value = -2 * (m * base) as i32;
                return result;
            }
        }

        result.overbid = true;
        let v = bid.div_ceil(base) * base;
        result.value = -2 * v as i32;
        result
    }
}

/// "With" or "without" multiplier: matadors plus one
pub fn trump_multiplier(cards: Cards, game_type: GameType) -> u32 {
    let with = cards.contains(crate::CLUBS_JACK);
    let mut order: Vec<Card> = [Suit::Spades, Suit::Hearts, Suit::Diamonds]
        .iter()
        .map(|s| Card::new(*s, Rank::Jack))
        .collect();
    if let Some(trump) = game_type.trump_suit() {
        for rank in [
            Rank::Ace,
            Rank::Ten,
            Rank::King,
            Rank::Queen,
            Rank::Nine,
            Rank::Eight,
            Rank::Seven,
        ] {
            order.push(Card::new(trump, rank));
        }
    }

    let mut m = 2;
    for card in order {
        if cards.contains(card) != with {
            break;
        }
        m += 1;
    }
    m
}

impl fmt::Display for GameDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let Some(game_type) = self.game_type else {
            return write!(f, "?");
        };
        write!(f, "{}", game_type.to_char())?;
        if self.ouvert {
            write!(f, "O")?;
            if !game_type.is_null() {
                return Ok(());
            }
        }
        if self.hand {
            write!(f, "H")?;
        }
        if !game_type.is_null() {
            if self.schwarz_announced {
                write!(f, "Z")?;
            } else if self.schneider_announced {
                write!(f, "S")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(list: &[&str]) -> Cards {
        list.iter().map(|s| Card::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_parse_plain() {
        let d = GameDeclaration::parse("C").unwrap();
        assert_eq!(d.game_type, Some(GameType::Clubs));
        assert!(!d.hand && !d.ouvert);
        let d = GameDeclaration::parse("GH").unwrap();
        assert_eq!(d.game_type, Some(GameType::Grand));
        assert!(d.hand);
    }

    #[test]
    fn test_parse_implications() {
        let d = GameDeclaration::parse("SO").unwrap();
        assert!(d.hand && d.ouvert && d.schneider_announced && d.schwarz_announced);
        let d = GameDeclaration::parse("HHZ").unwrap();
        assert!(d.schneider_announced);
        let d = GameDeclaration::parse("NO").unwrap();
        assert!(d.ouvert && !d.hand);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(GameDeclaration::parse(""), Err(DeclarationError::Empty));
        assert_eq!(
            GameDeclaration::parse("X"),
            Err(DeclarationError::UnknownType('X'))
        );
        assert_eq!(
            GameDeclaration::parse("DQ"),
            Err(DeclarationError::UnknownModifier('Q'))
        );
        assert_eq!(
            GameDeclaration::parse("NHS"),
            Err(DeclarationError::NullAnnouncement)
        );
        assert_eq!(
            GameDeclaration::parse("DS"),
            Err(DeclarationError::AnnouncementWithoutHand)
        );
    }

    #[test]
    fn test_display() {
        for s in ["C", "GH", "NO", "NOH", "SO", "HHS", "DHZ"] {
            let d = GameDeclaration::parse(s).unwrap();
            assert_eq!(d.to_string(), s);
        }
        assert_eq!(GameDeclaration::default().to_string(), "?");
    }

    #[test]
    fn test_trump_multiplier() {
        // with 2 (clubs and spades jack), play 3
        let h = cards(&["CJ", "SJ", "DA"]);
        assert_eq!(trump_multiplier(h, GameType::Grand), 3);
        let h = cards(&["CJ", "SJ", "HJ", "DJ", "HA", "HT"]);
        assert_eq!(trump_multiplier(h, GameType::Hearts), 7);
        // without 3, play 4
        let h = cards(&["DJ", "C7"]);
        assert_eq!(trump_multiplier(h, GameType::Clubs), 4);
    }

    #[test]
    fn test_evaluate_win_and_loss() {
        let d = GameDeclaration::parse("G").unwrap();
        let h = cards(&["CJ", "SJ"]);
        let win = d.evaluate(h, 70, 6, 18, false, 10);
        assert_eq!(win.value, 3 * 24);
        assert_eq!(win.matadors, 2);

        let loss = d.evaluate(h, 50, 4, 18, false, 10);
        assert_eq!(loss.value, -2 * 3 * 24);

        let schneider = d.evaluate(h, 95, 9, 18, false, 10);
        assert!(schneider.schneider && !schneider.schwarz);
        assert_eq!(schneider.value, 4 * 24);
    }

    #[test]
    fn test_evaluate_overbid_and_null() {
        let d = GameDeclaration::parse("D").unwrap();
        let h = cards(&["CJ"]);
        // with 1 play 2 = 18, bid 20 is an overbid
        let r = d.evaluate(h, 80, 7, 20, false, 10);
        assert!(r.overbid);
        assert_eq!(r.value, -2 * 27);

        let n = GameDeclaration::parse("NH").unwrap();
        assert_eq!(n.evaluate(Cards::EMPTY, 0, 0, 18, false, 10).value, 35);
        assert_eq!(n.evaluate(Cards::EMPTY, 0, 1, 18, false, 3).value, -70);
    }

    #[test]
    fn test_bids() {
        assert_eq!(next_bid(0), Some(18));
        assert_eq!(next_bid(18), Some(20));
        assert_eq!(next_bid(264), None);
        assert!(is_legal_bid(23));
        assert!(!is_legal_bid(19));
    }
}
