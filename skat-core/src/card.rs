use std::fmt;

/// Represents the four suits in Skat, ordered by game value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Suit {
    Diamonds = 0,
    Hearts = 1,
    Spades = 2,
    Clubs = 3,
}

impl Suit {
    /// All suits from lowest to highest
    pub const ALL: [Suit; 4] = [Suit::Diamonds, Suit::Hearts, Suit::Spades, Suit::Clubs];

    /// Convert from numeric index (0-3)
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Suit::Diamonds),
            1 => Some(Suit::Hearts),
            2 => Some(Suit::Spades),
            3 => Some(Suit::Clubs),
            _ => None,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'D' => Some(Suit::Diamonds),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            'C' => Some(Suit::Clubs),
            _ => None,
        }
    }

    /// Get the suit as a single character (D, H, S, C)
    pub fn to_char(&self) -> char {
        match self {
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
            Suit::Clubs => 'C',
        }
    }
}

/// Card ranks from Seven to Ace in deck order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rank {
    Seven = 0,
    Eight = 1,
    Nine = 2,
    Ten = 3,
    Jack = 4,
    Queen = 5,
    King = 6,
    Ace = 7,
}

impl Rank {
    /// All ranks from Seven to Ace
    pub const ALL: [Rank; 8] = [
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Convert from numeric index (0-7)
    pub fn from_index(index: u8) -> Option<Self> {
        Rank::ALL.get(index as usize).copied()
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '7' => Some(Rank::Seven),
            '8' => Some(Rank::Eight),
            '9' => Some(Rank::Nine),
            'T' => Some(Rank::Ten),
            'J' => Some(Rank::Jack),
            'Q' => Some(Rank::Queen),
            'K' => Some(Rank::King),
            'A' => Some(Rank::Ace),
            _ => None,
        }
    }

    /// Get the rank as a character (7-9, T, J, Q, K, A)
    pub fn to_char(&self) -> char {
        match self {
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    /// Card points: A=11, T=10, K=4, Q=3, J=2, others=0
    pub fn points(&self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Ten => 10,
            Rank::King => 4,
            Rank::Queen => 3,
            Rank::Jack => 2,
            _ => 0,
        }
    }
}

/// Token printed for a card that is not known to the viewer
pub const UNKNOWN_CARD: &str = "??";

/// Represents a single playing card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    /// Create a new card
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Card { suit, rank }
    }

    /// Create a card from its bit index (0-31)
    /// Index is calculated as: suit * 8 + rank
    pub fn from_index(index: u8) -> Option<Self> {
        if index >= 32 {
            return None;
        }
        let suit = Suit::from_index(index / 8)?;
        let rank = Rank::from_index(index % 8)?;
        Some(Card::new(suit, rank))
    }

    /// Convert card to bit index (0-31)
    pub fn to_index(&self) -> u8 {
        (self.suit as u8) * 8 + self.rank as u8
    }

    /// Single-bit mask of this card
    pub fn bit(&self) -> u32 {
        1 << self.to_index()
    }

    pub fn points(&self) -> u8 {
        self.rank.points()
    }

    pub fn is_jack(&self) -> bool {
        self.rank == Rank::Jack
    }

    /// Parse a two character token such as "H8". Returns None for "??"
    /// and anything malformed.
    pub fn parse(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        let suit = Suit::from_char(chars.next()?)?;
        let rank = Rank::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Card::new(suit, rank))
    }

    /// Wire encoding of an optional card as (suit, rank); unknown is (-1, -1)
    pub fn to_codes(card: Option<Card>) -> (i32, i32) {
        match card {
            Some(c) => (c.suit as i32, c.rank as i32),
            None => (-1, -1),
        }
    }

    /// Inverse of [`Card::to_codes`]. A negative suit means unknown.
    pub fn from_codes(suit: i32, rank: i32) -> Option<Option<Card>> {
        if suit < 0 {
            return Some(None);
        }
        let suit = u8::try_from(suit).ok().and_then(Suit::from_index)?;
        let rank = u8::try_from(rank).ok().and_then(Rank::from_index)?;
        Some(Some(Card::new(suit, rank)))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.suit.to_char(), self.rank.to_char())
    }
}

/// Format an optional card, printing "??" when unknown
pub fn card_token(card: Option<Card>) -> String {
    match card {
        Some(c) => c.to_string(),
        None => UNKNOWN_CARD.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_index_conversion() {
        // Test all 32 cards
        for i in 0..32 {
            let card = Card::from_index(i).unwrap();
            assert_eq!(card.to_index(), i);
        }
        assert!(Card::from_index(32).is_none());
    }

    #[test]
    fn test_card_points() {
        let total: u32 = (0..32)
            .map(|i| Card::from_index(i).unwrap().points() as u32)
            .sum();
        assert_eq!(total, 120);
        assert_eq!(Card::new(Suit::Clubs, Rank::Jack).points(), 2);
        assert_eq!(Card::new(Suit::Hearts, Rank::Ten).points(), 10);
    }

    #[test]
    fn test_parse_and_display() {
        let card = Card::parse("H8").unwrap();
        assert_eq!(card, Card::new(Suit::Hearts, Rank::Eight));
        assert_eq!(card.to_string(), "H8");
        assert_eq!(card.to_index(), 9);
        assert!(Card::parse("??").is_none());
        assert!(Card::parse("X8").is_none());
        assert!(Card::parse("H8x").is_none());
        assert_eq!(card_token(None), "??");
    }

    #[test]
    fn test_wire_codes() {
        let cj = Card::new(Suit::Clubs, Rank::Jack);
        assert_eq!(Card::to_codes(Some(cj)), (3, 4));
        assert_eq!(Card::from_codes(3, 4), Some(Some(cj)));
        assert_eq!(Card::from_codes(-1, -1), Some(None));
        assert_eq!(Card::from_codes(4, 0), None);
        assert_eq!(Card::from_codes(0, 8), None);
    }
}
