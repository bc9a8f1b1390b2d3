use crate::{Card, Suit};
use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not, Sub, SubAssign};

/// A set of cards packed into one machine word (bit = suit * 8 + rank)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Cards(u32);

impl Cards {
    pub const EMPTY: Cards = Cards(0);
    pub const ALL: Cards = Cards(u32::MAX);
    /// The four jacks
    pub const JACKS: Cards = Cards(0x1010_1010);

    pub const fn from_bits(bits: u32) -> Self {
        Cards(bits)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// All eight cards of a suit, jack included
    pub const fn suit(suit: Suit) -> Self {
        Cards(0xff << (8 * suit as u32))
    }

    pub fn from_cards<I: IntoIterator<Item = Card>>(cards: I) -> Self {
        cards.into_iter().fold(Cards::EMPTY, |acc, c| acc.with(c))
    }

    #[inline]
    pub fn contains(&self, card: Card) -> bool {
        self.0 & card.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, card: Card) {
        self.0 |= card.bit();
    }

    #[inline]
    pub fn remove(&mut self, card: Card) {
        self.0 &= !card.bit();
    }

    #[inline]
    pub fn with(self, card: Card) -> Self {
        Cards(self.0 | card.bit())
    }

    #[inline]
    pub fn without(self, card: Card) -> Self {
        Cards(self.0 & !card.bit())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersects(&self, other: Cards) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_subset(&self, other: Cards) -> bool {
        self.0 & !other.0 == 0
    }

    /// Lowest card by bit index
    #[inline]
    pub fn lowest(&self) -> Option<Card> {
        if self.0 == 0 {
            None
        } else {
            Card::from_index(self.0.trailing_zeros() as u8)
        }
    }

    /// Sum of card points
    pub fn points(&self) -> u32 {
        self.iter().map(|c| c.points() as u32).sum()
    }

    pub fn iter(&self) -> CardsIter {
        CardsIter(self.0)
    }
}

/// Iterates a [`Cards`] set from the lowest bit upwards
pub struct CardsIter(u32);

impl Iterator for CardsIter {
    type Item = Card;

    fn next(&mut self) -> Option<Card> {
        if self.0 == 0 {
            return None;
        }
        let index = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Card::from_index(index as u8)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for Cards {
    type Item = Card;
    type IntoIter = CardsIter;

    fn into_iter(self) -> CardsIter {
        self.iter()
    }
}

impl FromIterator<Card> for Cards {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        Cards::from_cards(iter)
    }
}

impl BitOr for Cards {
    type Output = Cards;
    fn bitor(self, rhs: Cards) -> Cards {
        Cards(self.0 | rhs.0)
    }
}

impl BitOrAssign for Cards {
    fn bitor_assign(&mut self, rhs: Cards) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Cards {
    type Output = Cards;
    fn bitand(self, rhs: Cards) -> Cards {
        Cards(self.0 & rhs.0)
    }
}

impl BitAndAssign for Cards {
    fn bitand_assign(&mut self, rhs: Cards) {
        self.0 &= rhs.0;
    }
}

impl Sub for Cards {
    type Output = Cards;
    fn sub(self, rhs: Cards) -> Cards {
        Cards(self.0 & !rhs.0)
    }
}

impl SubAssign for Cards {
    fn sub_assign(&mut self, rhs: Cards) {
        self.0 &= !rhs.0;
    }
}

impl Not for Cards {
    type Output = Cards;
    fn not(self) -> Cards {
        Cards(!self.0)
    }
}

/// Cards joined with '.', e.g. "D7.HA.CJ"
impl fmt::Display for Cards {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, card) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}
