use crate::card::card_token;
use crate::{Card, GameDeclaration};
use std::fmt;

/// A parsed move action token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Numeric bid such as "18"
    Bid(u32),
    /// "p"
    Pass,
    /// "y", holding the current bid
    Yes,
    /// "s", ask for the skat
    TakeSkat,
    /// "RE"
    Resign,
    /// "SC.c1.c2...", declarer shows the remaining cards
    ShowCards(Vec<Card>),
    /// "TI.n", seat n ran out of time
    TimeOut(usize),
    /// "LE.n", seat n left the table
    Left(usize),
    /// Declaration with discards and/or shown cards ("C", "DH", "S.C7.D8",
    /// "NOH.c1...c10"). Hidden cards are `None`.
    Declare {
        declaration: GameDeclaration,
        cards: Vec<Option<Card>>,
    },
    /// A single card played
    Play(Card),
    /// A card list dealt by the world: 32 cards for the deal, 2 for the skat
    Cards(Vec<Option<Card>>),
}

impl Action {
    /// Short name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Bid(_) => "bid",
            Action::Pass => "pass",
            Action::Yes => "yes",
            Action::TakeSkat => "take skat",
            Action::Resign => "resign",
            Action::ShowCards(_) => "show cards",
            Action::TimeOut(_) => "timeout",
            Action::Left(_) => "left",
            Action::Declare { .. } => "declaration",
            Action::Play(_) => "card",
            Action::Cards(_) => "card list",
        }
    }
}

fn join(cards: impl Iterator<Item = Option<Card>>) -> String {
    cards.map(card_token).collect::<Vec<_>>().join(".")
}

/// Formats the action back into its wire token
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Bid(b) => write!(f, "{}", b),
            Action::Pass => write!(f, "p"),
            Action::Yes => write!(f, "y"),
            Action::TakeSkat => write!(f, "s"),
            Action::Resign => write!(f, "RE"),
            Action::ShowCards(cards) => {
                write!(f, "SC.{}", join(cards.iter().map(|c| Some(*c))))
            }
            Action::TimeOut(seat) => write!(f, "TI.{}", seat),
            Action::Left(seat) => write!(f, "LE.{}", seat),
            Action::Declare { declaration, cards } => {
                write!(f, "{}", declaration)?;
                if !cards.is_empty() {
                    write!(f, ".{}", join(cards.iter().copied()))?;
                }
                Ok(())
            }
            Action::Play(card) => write!(f, "{}", card),
            Action::Cards(cards) => write!(f, "{}", join(cards.iter().copied())),
        }
    }
}
