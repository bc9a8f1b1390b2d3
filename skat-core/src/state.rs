//! Point-in-time snapshot of a Skat deal and the transitions between
//! snapshots.

use crate::declaration::{next_bid, GameValue};
use crate::{Action, Card, Cards, GameDeclaration, GameType, Voids};
use thiserror::Error;

pub const FORE_HAND: usize = 0;
pub const MIDDLE_HAND: usize = 1;
pub const REAR_HAND: usize = 2;
/// Seat index used for moves made by the dealer/server
pub const WORLD: usize = 4;

/// Perspective a snapshot is recorded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Player(usize),
    Public,
    World,
}

impl View {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0..=2 => Some(View::Player(code as usize)),
            3 => Some(View::Public),
            4 => Some(View::World),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            View::Player(p) => *p as i32,
            View::Public => 3,
            View::World => 4,
        }
    }

    /// True if cards of `seat` are visible from this view
    pub fn sees(&self, seat: usize) -> bool {
        match self {
            View::World => true,
            View::Player(p) => *p == seat,
            View::Public => false,
        }
    }
}

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Deal = 0,
    Bid = 1,
    Answer = 2,
    SkatOrHandDecl = 3,
    GetSkat = 4,
    DiscardAndDecl = 5,
    Cardplay = 6,
    Finished = 7,
}

impl Phase {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Phase::Deal),
            1 => Some(Phase::Bid),
            2 => Some(Phase::Answer),
            3 => Some(Phase::SkatOrHandDecl),
            4 => Some(Phase::GetSkat),
            5 => Some(Phase::DiscardAndDecl),
            6 => Some(Phase::Cardplay),
            7 => Some(Phase::Finished),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Error applying a move to a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("game already finished")]
    GameFinished,
    #[error("seat {seat} moved but {to_move} is to move")]
    NotYourTurn { seat: usize, to_move: usize },
    #[error("{action} not allowed in phase {phase:?}")]
    WrongPhase { action: &'static str, phase: Phase },
    #[error("player {seat} does not hold {card}")]
    CardNotHeld { seat: usize, card: Card },
    #[error("{card} does not follow suit")]
    IllegalCard { card: Card },
    #[error("bid {bid} not higher than {max_bid}")]
    BidTooLow { bid: u32, max_bid: u32 },
    #[error("bid {0} out of range")]
    BidOutOfRange(u32),
    #[error("player {0} already resigned")]
    AlreadyResigned(usize),
    #[error("only the declarer may show cards")]
    OnlyDeclarerShows,
    #[error("expected {expected} cards, got {got}")]
    CardCount { expected: usize, got: usize },
    #[error("unknown card where a known card is required")]
    UnknownCard,
    #[error("a hand game must be declared before picking up the skat")]
    MustDeclareHand,
    #[error("hand game declared after picking up the skat")]
    HandAfterPickup,
    #[error("null game illegal with bid {0}")]
    NullOverbid(u32),
    #[error("illegal discard")]
    IllegalDiscard,
    #[error("seat {0} out of range")]
    BadSeat(usize),
}

/// Per-player information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerInfo {
    pub tricks_won: u32,
    pub trick_points: u32,
    /// 0 = no information, 1 = passed at 18, otherwise the bid held
    pub max_bid: u32,
    pub resigned: bool,
    /// Current hand; empty when unknown to the viewer
    pub hand: Cards,
    pub played: Cards,
    pub voids: Voids,
}

/// One snapshot of a deal as seen from `view`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleState {
    pub view: View,
    pub phase: Phase,
    pub prev_phase: Phase,
    pub declarer: Option<usize>,
    pub max_bid: u32,
    /// Seat asked in the bidding phase (4 = nobody left to ask)
    pub asked: Option<usize>,
    /// Seat to move (4 = world)
    pub to_move: usize,
    pub bidder: Option<usize>,
    pub trick_winner: Option<usize>,
    pub left: Option<usize>,
    pub timeout: Option<usize>,
    pub winning_card: Option<Card>,
    pub declaration: GameDeclaration,
    pub declarer_hand_before_cardplay: Cards,
    pub players: [PlayerInfo; 3],
    /// Original skat, or the discarded cards once the declarer has discarded
    pub skat: [Option<Card>; 2],
    /// Cards of the current trick; a completed trick stays until the next lead
    pub trick: Vec<Card>,
}

impl SimpleState {
    /// Initial snapshot before the deal
    pub fn new(view: View) -> Self {
        SimpleState {
            view,
            phase: Phase::Deal,
            prev_phase: Phase::Deal,
            declarer: None,
            max_bid: 0,
            asked: Some(FORE_HAND),
            to_move: WORLD,
            bidder: Some(MIDDLE_HAND),
            trick_winner: None,
            left: None,
            timeout: None,
            winning_card: None,
            declaration: GameDeclaration::default(),
            declarer_hand_before_cardplay: Cards::EMPTY,
            players: [PlayerInfo::default(); 3],
            skat: [None, None],
            trick: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn game_type(&self) -> Option<GameType> {
        self.declaration.game_type
    }

    /// Lowest bid above the current maximum
    pub fn next_bid(&self) -> Option<u32> {
        next_bid(self.max_bid)
    }

    /// Cards of the trick in progress; empty after a completed trick
    pub fn open_trick(&self) -> &[Card] {
        if self.trick.len() == 3 {
            &[]
        } else {
            &self.trick
        }
    }

    /// Cards that have been played by anyone
    pub fn played_cards(&self) -> Cards {
        self.players
            .iter()
            .fold(Cards::EMPTY, |acc, p| acc | p.played)
    }

    /// Known skat cards (empty if hidden)
    pub fn skat_cards(&self) -> Cards {
        self.skat.iter().flatten().copied().collect()
    }

    pub fn tricks_played(&self) -> u32 {
        self.players
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.tricks_won))
    }

    /// Points in the trick on the table
    pub fn trick_points(&self) -> u32 {
        self.trick.iter().map(|c| c.points() as u32).sum()
    }

    /// Declarer's trick points plus any known skat points
    pub fn declarer_points(&self) -> u32 {
        match self.declarer {
            Some(d) => self
                .players
                .get(d)
                .map_or(0, |p| p.trick_points + self.skat_cards().points()),
            None => 0,
        }
    }

    pub fn defender_points(&self) -> u32 {
        (0..3)
            .filter(|&p| Some(p) != self.declarer)
            .map(|p| self.players[p].trick_points)
            .sum()
    }

    /// Number of cards a seat still holds, derived from tricks when the
    /// hand itself is hidden
    pub fn num_cards(&self, seat: usize) -> usize {
        let Some(player) = self.players.get(seat) else {
            return 0;
        };
        let n = player.hand.len();
        if n > 0 {
            return n;
        }
        let mut left = 10usize
            .checked_sub(self.tricks_played() as usize)
            .unwrap_or(0);
        let on_table = self.open_trick().len();
        for k in 1..=on_table {
            if (self.to_move + 3 - k) % 3 == seat {
                left = left.saturating_sub(1);
            }
        }
        left
    }

    /// Legal cards for the seat to move in the card play phase
    pub fn legal_cards(&self) -> Cards {
        let (Some(game_type), true) = (self.game_type(), self.phase == Phase::Cardplay) else {
            return Cards::EMPTY;
        };
        if self.to_move > REAR_HAND {
            return Cards::EMPTY;
        }
        let hand = self.players[self.to_move].hand;
        game_type.legal_plays(hand, self.open_trick().first().copied())
    }

    /// Snapshot after `source` played `action`. `self` is left unchanged;
    /// a rejected move returns the reason.
    pub fn successor(&self, source: i32, action: &Action) -> Result<SimpleState, MoveError> {
        let mut next = self.clone();
        next.apply(source, action)?;
        if next.phase != self.phase {
            next.prev_phase = self.phase;
        }
        Ok(next)
    }

    fn apply(&mut self, source: i32, action: &Action) -> Result<(), MoveError> {
        let seat = if source < 0 { WORLD } else { source as usize };
        if self.phase == Phase::Finished {
            return Err(MoveError::GameFinished);
        }
        if let Some(declarer) = self.declarer.filter(|&d| d > REAR_HAND) {
            return Err(MoveError::BadSeat(declarer));
        }

        match action {
            Action::Resign => return self.resign(seat),
            Action::ShowCards(cards) => return self.show_cards(seat, cards),
            Action::TimeOut(p) | Action::Left(p) if seat == WORLD => {
                if *p > REAR_HAND {
                    return Err(MoveError::BadSeat(*p));
                }
                if matches!(action, Action::TimeOut(_)) {
                    self.timeout = Some(*p);
                } else {
                    self.left = Some(*p);
                }
                self.phase = Phase::Finished;
                return Ok(());
            }
            _ => {}
        }

        // only the deal and the skat come from the world
        if seat > REAR_HAND && !matches!(self.phase, Phase::Deal | Phase::GetSkat) {
            return Err(MoveError::BadSeat(seat));
        }
        if seat != self.to_move {
            return Err(MoveError::NotYourTurn {
                seat,
                to_move: self.to_move,
            });
        }

        match (self.phase, action) {
            (Phase::Cardplay, Action::Play(card)) => self.play_card(seat, *card),
            (Phase::Deal, Action::Cards(cards)) => self.deal(cards),
            (Phase::Bid, Action::Pass) => {
                self.pass_bid(seat);
                Ok(())
            }
            (Phase::Bid, Action::Bid(bid)) => self.bid(seat, *bid),
            (Phase::Answer, Action::Yes) => {
                self.players[seat].max_bid = self.max_bid;
                self.phase = Phase::Bid;
                self.to_move = self.bidder.unwrap_or(FORE_HAND);
                Ok(())
            }
            (Phase::Answer, Action::Pass) => {
                self.pass_answer(seat);
                Ok(())
            }
            (Phase::SkatOrHandDecl, Action::TakeSkat) => {
                self.phase = Phase::GetSkat;
                self.to_move = WORLD;
                self.declaration.hand = false;
                Ok(())
            }
            (Phase::SkatOrHandDecl, Action::Declare { declaration, cards }) => {
                self.declare_hand(*declaration, cards)
            }
            (Phase::GetSkat, Action::Cards(cards)) => self.receive_skat(cards),
            (Phase::DiscardAndDecl, Action::Declare { declaration, cards }) => {
                self.discard_and_declare(seat, *declaration, cards)
            }
            (phase, action) => Err(MoveError::WrongPhase {
                action: action.kind(),
                phase,
            }),
        }
    }

    fn resign(&mut self, seat: usize) -> Result<(), MoveError> {
        if self.phase != Phase::Cardplay {
            return Err(MoveError::WrongPhase {
                action: "resign",
                phase: self.phase,
            });
        }
        if seat > REAR_HAND {
            return Err(MoveError::BadSeat(seat));
        }
        if self.players[seat].resigned {
            return Err(MoveError::AlreadyResigned(seat));
        }
        self.players[seat].resigned = true;

        let declarer = self.declarer.unwrap_or(FORE_HAND);
        let defenders_resigned = (0..3)
            .filter(|&p| p != declarer && self.players[p].resigned)
            .count();
        if seat == declarer || defenders_resigned >= 2 {
            self.phase = Phase::Finished;
        }
        if self.trick.len() == 3 {
            self.trick.clear();
        }
        Ok(())
    }

    fn show_cards(&mut self, seat: usize, cards: &[Card]) -> Result<(), MoveError> {
        if Some(seat) != self.declarer {
            return Err(MoveError::OnlyDeclarerShows);
        }
        if self.phase != Phase::Cardplay {
            return Err(MoveError::WrongPhase {
                action: "show cards",
                phase: self.phase,
            });
        }
        if self.view != View::World && !self.view.sees(seat) {
            self.players[seat].hand = cards.iter().copied().collect();
        }
        Ok(())
    }

    fn deal(&mut self, cards: &[Option<Card>]) -> Result<(), MoveError> {
        if cards.len() != 32 {
            return Err(MoveError::CardCount {
                expected: 32,
                got: cards.len(),
            });
        }
        for seat in 0..3 {
            let hand = &cards[seat * 10..seat * 10 + 10];
            self.players[seat].hand = if self.view.sees(seat) {
                hand.iter().flatten().copied().collect()
            } else {
                Cards::EMPTY
            };
        }
        self.skat = [cards[30], cards[31]];
        self.to_move = MIDDLE_HAND;
        self.phase = Phase::Bid;
        Ok(())
    }

    fn pass_bid(&mut self, seat: usize) {
        if self.players[seat].max_bid == 0 {
            self.players[seat].max_bid = 1;
        }
        match self.bidder {
            Some(FORE_HAND) => self.phase = Phase::Finished,
            Some(MIDDLE_HAND) => {
                self.bidder = Some(REAR_HAND);
                self.asked = Some(FORE_HAND);
                self.to_move = REAR_HAND;
            }
            _ => {
                if self.max_bid < 18 {
                    // nobody bid yet: forehand may still open
                    self.bidder = Some(FORE_HAND);
                    self.asked = Some(WORLD);
                    self.to_move = FORE_HAND;
                } else {
                    let declarer = self.asked.unwrap_or(FORE_HAND);
                    self.start_declaration(declarer);
                }
            }
        }
    }

    fn bid(&mut self, seat: usize, bid: u32) -> Result<(), MoveError> {
        if bid <= self.max_bid {
            return Err(MoveError::BidTooLow {
                bid,
                max_bid: self.max_bid,
            });
        }
        if bid >= 500 {
            return Err(MoveError::BidOutOfRange(bid));
        }
        self.players[seat].max_bid = bid;
        self.max_bid = bid;
        if seat == FORE_HAND {
            // the others passed already
            self.start_declaration(FORE_HAND);
        } else {
            self.phase = Phase::Answer;
            self.to_move = self.asked.unwrap_or(FORE_HAND);
        }
        Ok(())
    }

    fn pass_answer(&mut self, seat: usize) {
        if self.players[seat].max_bid == 0 {
            self.players[seat].max_bid = 1;
        }
        if self.bidder == Some(MIDDLE_HAND) {
            self.phase = Phase::Bid;
            self.bidder = Some(REAR_HAND);
            self.asked = Some(MIDDLE_HAND);
            self.to_move = REAR_HAND;
        } else {
            let declarer = self.bidder.unwrap_or(FORE_HAND);
            self.start_declaration(declarer);
        }
    }

    fn start_declaration(&mut self, declarer: usize) {
        self.phase = Phase::SkatOrHandDecl;
        self.declarer = Some(declarer);
        self.to_move = declarer;
        self.asked = None;
        self.bidder = None;
    }

    fn check_null_bid(&self, declaration: &GameDeclaration) -> Result<(), MoveError> {
        if declaration.game_type != Some(GameType::Null) {
            return Ok(());
        }
        let limit = declaration.win_value(Cards::EMPTY);
        if self.max_bid > limit {
            return Err(MoveError::NullOverbid(self.max_bid));
        }
        Ok(())
    }

    /// Replace the declarer's hand with shown cards when the viewer could not
    /// see them before
    fn reveal(&mut self, declarer: usize, cards: &[Option<Card>]) -> Result<(), MoveError> {
        if self.view == View::World || self.view.sees(declarer) {
            return Ok(());
        }
        if cards.len() != 10 {
            return Err(MoveError::CardCount {
                expected: 10,
                got: cards.len(),
            });
        }
        let mut hand = Cards::EMPTY;
        for card in cards {
            hand.insert(card.ok_or(MoveError::UnknownCard)?);
        }
        self.players[declarer].hand = hand;
        Ok(())
    }

    fn begin_cardplay(&mut self, declarer: usize) {
        self.declarer_hand_before_cardplay = self.players[declarer].hand;
        self.phase = Phase::Cardplay;
        self.to_move = FORE_HAND;
    }

    fn declare_hand(
        &mut self,
        declaration: GameDeclaration,
        cards: &[Option<Card>],
    ) -> Result<(), MoveError> {
        if !declaration.hand {
            return Err(MoveError::MustDeclareHand);
        }
        self.check_null_bid(&declaration)?;
        let declarer = self.to_move;
        if declaration.ouvert {
            self.reveal(declarer, cards)?;
        }
        self.declaration = declaration;
        self.begin_cardplay(declarer);
        Ok(())
    }

    fn receive_skat(&mut self, cards: &[Option<Card>]) -> Result<(), MoveError> {
        if cards.len() != 2 {
            return Err(MoveError::CardCount {
                expected: 2,
                got: cards.len(),
            });
        }
        let declarer = self.declarer.unwrap_or(FORE_HAND);
        if self.view.sees(declarer) {
            self.skat = [cards[0], cards[1]];
        }
        self.phase = Phase::DiscardAndDecl;
        self.to_move = declarer;
        Ok(())
    }

    fn discard_and_declare(
        &mut self,
        seat: usize,
        declaration: GameDeclaration,
        cards: &[Option<Card>],
    ) -> Result<(), MoveError> {
        if declaration.hand {
            return Err(MoveError::HandAfterPickup);
        }
        self.check_null_bid(&declaration)?;
        if cards.len() < 2 {
            return Err(MoveError::CardCount {
                expected: 2,
                got: cards.len(),
            });
        }

        if self.view.sees(seat) {
            let (Some(d1), Some(d2)) = (cards[0], cards[1]) else {
                return Err(MoveError::UnknownCard);
            };
            let skat = self.skat_cards();
            let mut hand = self.players[seat].hand;
            if hand.intersects(skat) || skat.len() != 2 {
                return Err(MoveError::IllegalDiscard);
            }
            hand |= skat;
            if d1 == d2 || !hand.contains(d1) || !hand.contains(d2) {
                return Err(MoveError::IllegalDiscard);
            }
            hand = hand.without(d1).without(d2);
            self.players[seat].hand = hand;
            self.skat = [Some(d1), Some(d2)];
        }

        if declaration.ouvert {
            self.reveal(seat, &cards[2..])?;
        }
        self.declaration = declaration;
        self.begin_cardplay(seat);
        Ok(())
    }

    fn play_card(&mut self, seat: usize, card: Card) -> Result<(), MoveError> {
        let Some(game_type) = self.game_type() else {
            return Err(MoveError::WrongPhase {
                action: "card",
                phase: self.phase,
            });
        };
        if seat > REAR_HAND {
            return Err(MoveError::BadSeat(seat));
        }
        if self.view.sees(seat) {
            if !self.players[seat].hand.contains(card) {
                return Err(MoveError::CardNotHeld { seat, card });
            }
            if !self.legal_cards().contains(card) {
                return Err(MoveError::IllegalCard { card });
            }
        } else {
            let known = self
                .players
                .iter()
                .fold(self.played_cards() | self.skat_cards(), |acc, p| acc | p.hand);
            if known.contains(card) {
                return Err(MoveError::CardNotHeld { seat, card });
            }
        }

        if self.trick.len() == 3 {
            self.trick.clear();
        }
        if let Some(&led) = self.trick.first() {
            if !game_type.follow_mask(led).contains(card) {
                self.players[seat].voids |= game_type.void_for(led);
            }
        }

        self.trick.push(card);
        self.players[seat].hand.remove(card);
        self.players[seat].played.insert(card);

        let beats = match self.winning_card {
            Some(winner) if self.trick.len() > 1 => game_type.beats(card, winner),
            _ => true,
        };
        if beats {
            self.trick_winner = Some(seat);
            self.winning_card = Some(card);
        }

        if self.trick.len() < 3 {
            self.to_move = (seat + 1) % 3;
            return Ok(());
        }

        let winner = self.trick_winner.unwrap_or(seat);
        let points = self.trick_points();
        self.players[winner].tricks_won += 1;
        self.players[winner].trick_points += points;
        self.to_move = winner;

        if self.tricks_played() == 10 {
            self.phase = Phase::Finished;
            return Ok(());
        }

        let declarer = self.declarer.unwrap_or(FORE_HAND);
        if game_type.is_null() {
            if winner == declarer {
                self.phase = Phase::Finished;
            }
        } else if winner != declarer {
            if self.declaration.schwarz_announced
                || (self.declaration.schneider_announced && self.defender_points() > 30)
            {
                self.phase = Phase::Finished;
            }
        }
        Ok(())
    }

    /// Score the finished game for the declarer. None while the game is
    /// running or when nobody declared.
    pub fn game_result(&self) -> Option<GameResult> {
        if !self.is_finished() {
            return None;
        }
        let declarer = self.declarer.filter(|&d| d <= REAR_HAND)?;
        let game_type = self.game_type()?;

        let mut skat = self.skat_cards();
        if skat.len() < 2 {
            let unseen = !self.played_cards();
            if unseen.len() == 2 {
                skat = unseen;
            }
        }
        let mut points = self.players[declarer].trick_points + skat.points();
        let mut tricks = self.players[declarer].tricks_won;

        let decl_loss = self.players[declarer].resigned
            || self.timeout == Some(declarer)
            || self.left == Some(declarer);
        let defenders_resigned = (0..3)
            .filter(|&p| p != declarer && self.players[p].resigned)
            .count();
        let defs_loss = !decl_loss
            && (defenders_resigned >= 2
                || self.timeout.is_some_and(|t| t != declarer)
                || self.left.is_some_and(|l| l != declarer));

        if defs_loss && !game_type.is_null() {
            // remaining points and tricks go to the declarer
            points = 120u32.saturating_sub(self.defender_points());
            tricks = 10u32.saturating_sub(self.tricks_played().saturating_sub(tricks));
        }

        let mut hand = self.declarer_hand_before_cardplay;
        if hand.is_empty() {
            hand = self.players[declarer].played;
        }
        let value = self.declaration.evaluate(
            hand | skat,
            points,
            tricks,
            self.max_bid,
            decl_loss,
            self.tricks_played(),
        );
        Some(GameResult {
            declarer,
            points,
            tricks,
            value,
        })
    }
}

/// Result of a finished game from the declarer's side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameResult {
    pub declarer: usize,
    pub points: u32,
    pub tricks: u32,
    pub value: GameValue,
}
