//! Core types for Skat: cards and card sets, game types, declarations,
//! snapshots of a deal and the deal history.

mod action;
mod card;
mod cards;
mod declaration;
mod game_type;
mod history;
mod state;

pub use action::Action;
pub use card::{card_token, Card, Rank, Suit, UNKNOWN_CARD};
pub use cards::{Cards, CardsIter};
pub use declaration::{
    is_legal_bid, next_bid, trump_multiplier, DeclarationError, GameDeclaration, GameValue, BIDS,
    NULL_VALUES,
};
pub use game_type::{GameType, Voids, CLUBS_JACK, NO_GAME};
pub use history::{HistoryError, Move, SimpleGame};
pub use state::{
    GameResult, MoveError, Phase, PlayerInfo, SimpleState, View, FORE_HAND, MIDDLE_HAND,
    REAR_HAND, WORLD,
};
