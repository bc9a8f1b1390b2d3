use crate::{Card, Cards, Rank, Suit};
use bitflags::bitflags;

/// Game type chosen by the declarer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum GameType {
    Diamonds = 0,
    Hearts = 1,
    Spades = 2,
    Clubs = 3,
    Grand = 4,
    Null = 5,
}

/// Wire code of "no game declared yet"
pub const NO_GAME: i32 = -1;

/// Rank order inside a plain suit: 7 8 9 Q K T A (jack listed for completeness)
const SUIT_ORDER: [u8; 8] = [0, 1, 2, 5, 7, 3, 4, 6];

bitflags! {
    /// Suits (and, in grand, jacks) a player has shown out of
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Voids: u8 {
        const DIAMONDS = 1 << 0;
        const HEARTS = 1 << 1;
        const SPADES = 1 << 2;
        const CLUBS = 1 << 3;
        const JACKS = 1 << 4;
    }
}

impl Voids {
    pub fn of_suit(suit: Suit) -> Voids {
        Voids::from_bits_retain(1 << suit as u8)
    }
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::Diamonds,
        GameType::Hearts,
        GameType::Spades,
        GameType::Clubs,
        GameType::Grand,
        GameType::Null,
    ];

    /// Convert from wire code (0-5)
    pub fn from_code(code: i32) -> Option<Self> {
        GameType::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'D' => Some(GameType::Diamonds),
            'H' => Some(GameType::Hearts),
            'S' => Some(GameType::Spades),
            'C' => Some(GameType::Clubs),
            'G' => Some(GameType::Grand),
            'N' => Some(GameType::Null),
            _ => None,
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            GameType::Diamonds => 'D',
            GameType::Hearts => 'H',
            GameType::Spades => 'S',
            GameType::Clubs => 'C',
            GameType::Grand => 'G',
            GameType::Null => 'N',
        }
    }

    /// Trump suit of a suit game
    pub fn trump_suit(&self) -> Option<Suit> {
        match self {
            GameType::Diamonds => Some(Suit::Diamonds),
            GameType::Hearts => Some(Suit::Hearts),
            GameType::Spades => Some(Suit::Spades),
            GameType::Clubs => Some(Suit::Clubs),
            GameType::Grand | GameType::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == GameType::Null
    }

    /// Base value used for game values and overbid checks
    pub fn base_value(&self) -> u32 {
        match self {
            GameType::Diamonds => 9,
            GameType::Hearts => 10,
            GameType::Spades => 11,
            GameType::Clubs => 12,
            GameType::Grand => 24,
            GameType::Null => 23,
        }
    }

    /// All trump cards of this game type
    #[inline]
    pub fn trumps(&self) -> Cards {
        match self {
            GameType::Null => Cards::EMPTY,
            GameType::Grand => Cards::JACKS,
            _ => match self.trump_suit() {
                Some(suit) => Cards::JACKS | Cards::suit(suit),
                None => Cards::JACKS,
            },
        }
    }

    #[inline]
    pub fn is_trump(&self, card: Card) -> bool {
        self.trumps().contains(card)
    }

    /// Cards of a plain suit (jacks removed in trump games)
    #[inline]
    pub fn plain_suit(&self, suit: Suit) -> Cards {
        Cards::suit(suit) - self.trumps()
    }

    /// Cards that count as following when `led` was led
    #[inline]
    pub fn follow_mask(&self, led: Card) -> Cards {
        if self.is_trump(led) {
            self.trumps()
        } else {
            self.plain_suit(led.suit)
        }
    }

    /// Legal plays from `hand` given the card that led the trick
    #[inline]
    pub fn legal_plays(&self, hand: Cards, led: Option<Card>) -> Cards {
        match led {
            Some(led) => {
                let following = hand & self.follow_mask(led);
                if following.is_empty() {
                    hand
                } else {
                    following
                }
            }
            None => hand,
        }
    }

    /// Void flag recorded when a player fails to follow `led`
    pub fn void_for(&self, led: Card) -> Voids {
        match self {
            GameType::Null => Voids::of_suit(led.suit),
            GameType::Grand if led.is_jack() => Voids::JACKS,
            _ => match self.trump_suit() {
                Some(trump) if self.is_trump(led) => Voids::of_suit(trump),
                _ => Voids::of_suit(led.suit),
            },
        }
    }

    /// Cards a player with the given void flags cannot hold
    pub fn void_mask(&self, voids: Voids) -> Cards {
        let mut mask = Cards::EMPTY;
        for suit in Suit::ALL {
            if !voids.contains(Voids::of_suit(suit)) {
                continue;
            }
            mask |= match self {
                GameType::Null => Cards::suit(suit),
                _ if self.trump_suit() == Some(suit) => self.trumps(),
                _ => self.plain_suit(suit),
            };
        }
        if voids.contains(Voids::JACKS) && *self == GameType::Grand {
            mask |= Cards::JACKS;
        }
        mask
    }

    /// Strength of a card inside a trick. Trumps rank above every plain
    /// card; plain cards only compare within their suit.
    #[inline]
    pub fn trick_rank(&self, card: Card) -> u8 {
        match self {
            GameType::Null => card.rank as u8,
            _ if card.is_jack() => 16 + card.suit as u8,
            _ if self.is_trump(card) => 8 + SUIT_ORDER[card.rank as usize],
            _ => SUIT_ORDER[card.rank as usize],
        }
    }

    /// True if `card` takes the trick from the current `winner`
    #[inline]
    pub fn beats(&self, card: Card, winner: Card) -> bool {
        let card_trump = self.is_trump(card);
        let winner_trump = self.is_trump(winner);
        if card_trump != winner_trump {
            return card_trump;
        }
        if !card_trump && card.suit != winner.suit {
            return false;
        }
        self.trick_rank(card) > self.trick_rank(winner)
    }

    /// Index (0-2) of the winning card of a complete trick, in play order
    pub fn trick_winner(&self, trick: [Card; 3]) -> usize {
        let mut best = 0;
        for i in 1..3 {
            if self.beats(trick[i], trick[best]) {
                best = i;
            }
        }
        best
    }

    /// Cards in trick-rank order from highest to lowest, grouped so that
    /// trumps come first and each plain suit follows
    pub fn ranked_groups(&self) -> Vec<Vec<Card>> {
        let mut groups = Vec::new();
        let trumps = self.trumps();
        if !trumps.is_empty() {
            let mut t: Vec<Card> = trumps.iter().collect();
            t.sort_by_key(|c| std::cmp::Reverse(self.trick_rank(*c)));
            groups.push(t);
        }
        for suit in Suit::ALL.iter().rev() {
            let mut s: Vec<Card> = (Cards::suit(*suit) - trumps).iter().collect();
            s.sort_by_key(|c| std::cmp::Reverse(self.trick_rank(*c)));
            groups.push(s);
        }
        groups
    }
}

/// Jack of clubs, highest trump in every trump game
pub const CLUBS_JACK: Card = Card {
    suit: Suit::Clubs,
    rank: Rank::Jack,
};
