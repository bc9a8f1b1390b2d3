//! Whitespace tokenized text encoding of a deal history.
//!
//! Every record starts with a tag (`Move`, `Card`, `GameDeclaration`,
//! `SimpleState`, `SimpleGame`) followed by its fields. An absent record is
//! written as the tag with a `Null` suffix. Vectors are written as a tag
//! (`MoveVector`, `SimpleStateVector`) followed by the element count.

use skat_core::{
    Card, Cards, GameDeclaration, GameType, HistoryError, Move, Phase, PlayerInfo, SimpleGame,
    SimpleState, View, Voids, NO_GAME, REAR_HAND, WORLD,
};
use std::fmt::Write as _;
use thiserror::Error;
use tracing::warn;

/// Error decoding a serialized record. `position` is the index of the
/// offending whitespace separated token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    #[error("expected {expected} at token {position}, found '{found}'")]
    UnexpectedTag {
        expected: &'static str,
        found: String,
        position: usize,
    },
    #[error("invalid {expected} at token {position}: '{found}'")]
    InvalidValue {
        expected: &'static str,
        found: String,
        position: usize,
    },
    #[error("input ended at token {position} while reading {expected}")]
    UnexpectedEnd {
        expected: &'static str,
        position: usize,
    },
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Token stream over a serialized history
pub struct Reader<'a> {
    tokens: Vec<&'a str>,
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Self {
        Reader {
            tokens: input.split_whitespace().collect(),
            position: 0,
        }
    }

    /// Index of the next token
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn next(&mut self, expected: &'static str) -> Result<&'a str, DeserializationError> {
        let token = self
            .tokens
            .get(self.position)
            .copied()
            .ok_or(DeserializationError::UnexpectedEnd {
                expected,
                position: self.position,
            })?;
        self.position += 1;
        Ok(token)
    }

    fn invalid(&self, expected: &'static str, found: &str) -> DeserializationError {
        self.invalid_at(self.position.saturating_sub(1), expected, found)
    }

    fn invalid_at(
        &self,
        position: usize,
        expected: &'static str,
        found: &str,
    ) -> DeserializationError {
        DeserializationError::InvalidValue {
            expected,
            found: found.to_string(),
            position,
        }
    }

    /// Seat 0-2 or -1 for none
    fn player_seat(&mut self, expected: &'static str) -> Result<Option<usize>, DeserializationError> {
        match self.seat(expected)? {
            Some(seat) if seat > REAR_HAND => Err(self.invalid(expected, &seat.to_string())),
            seat => Ok(seat),
        }
    }

    /// Read a record tag. Returns false for `<tag>Null`.
    fn tag(&mut self, tag: &'static str) -> Result<bool, DeserializationError> {
        let token = self.next(tag)?;
        if token == tag {
            return Ok(true);
        }
        if token.strip_suffix("Null") == Some(tag) {
            return Ok(false);
        }
        Err(DeserializationError::UnexpectedTag {
            expected: tag,
            found: token.to_string(),
            position: self.position - 1,
        })
    }

    /// Read a tag that may not be `Null`
    fn required_tag(&mut self, tag: &'static str) -> Result<(), DeserializationError> {
        if self.tag(tag)? {
            Ok(())
        } else {
            Err(DeserializationError::UnexpectedTag {
                expected: tag,
                found: format!("{}Null", tag),
                position: self.position - 1,
            })
        }
    }

    fn int(&mut self, expected: &'static str) -> Result<i32, DeserializationError> {
        let token = self.next(expected)?;
        token.parse().map_err(|_| self.invalid(expected, token))
    }

    fn uint(&mut self, expected: &'static str) -> Result<u32, DeserializationError> {
        let token = self.next(expected)?;
        token.parse().map_err(|_| self.invalid(expected, token))
    }

    /// Java `true`/`false`; resignation flags are written as 0/1
    fn bool(&mut self, expected: &'static str) -> Result<bool, DeserializationError> {
        let token = self.next(expected)?;
        match token {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(self.invalid(expected, token)),
        }
    }

    /// Seat index or -1 for none
    fn seat(&mut self, expected: &'static str) -> Result<Option<usize>, DeserializationError> {
        let value = self.int(expected)?;
        match value {
            v if v < 0 => Ok(None),
            v if v as usize <= WORLD => Ok(Some(v as usize)),
            v => Err(self.invalid(expected, &v.to_string())),
        }
    }

    /// Card bitset written as a Java int
    fn hand(&mut self, expected: &'static str) -> Result<Cards, DeserializationError> {
        let token = self.next(expected)?;
        let value: i64 = token.parse().map_err(|_| self.invalid(expected, token))?;
        if value < i32::MIN as i64 || value > u32::MAX as i64 {
            return Err(self.invalid(expected, token));
        }
        Ok(Cards::from_bits(value as u32))
    }
}

/// Output buffer producing the record layout
#[derive(Debug, Default)]
pub struct Writer {
    out: String,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn record(&mut self, tag: &str) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
        self.out.push_str(tag);
    }

    fn null(&mut self, tag: &str) {
        self.record(tag);
        self.out.push_str("Null");
    }

    fn value(&mut self, value: impl std::fmt::Display) {
        let _ = write!(self.out, " {}", value);
    }

    fn seat(&mut self, seat: Option<usize>) {
        self.value(seat.map_or(-1, |s| s as i32));
    }

    fn hand(&mut self, cards: Cards) {
        self.value(cards.bits() as i32);
    }
}

pub fn write_move(w: &mut Writer, mv: &Move) {
    w.record("Move");
    w.value(mv.source);
    w.value(&mv.action);
}

pub fn read_move(r: &mut Reader) -> Result<Option<Move>, DeserializationError> {
    if !r.tag("Move")? {
        return Ok(None);
    }
    let source = r.int("move source")?;
    let action = r.next("move action")?;
    Ok(Some(Move::new(source, action)))
}

/// Unknown cards are written as `Card -1 -1`
pub fn write_card(w: &mut Writer, card: Option<Card>) {
    let (suit, rank) = Card::to_codes(card);
    w.record("Card");
    w.value(suit);
    w.value(rank);
}

/// Reads a card record; `CardNull` and unknown cards both yield None
pub fn read_card(r: &mut Reader) -> Result<Option<Card>, DeserializationError> {
    if !r.tag("Card")? {
        return Ok(None);
    }
    let suit = r.int("card suit")?;
    let rank = r.int("card rank")?;
    Card::from_codes(suit, rank).ok_or_else(|| r.invalid("card", &format!("{} {}", suit, rank)))
}

pub fn write_declaration(w: &mut Writer, decl: &GameDeclaration) {
    w.record("GameDeclaration");
    w.value(decl.game_type.map_or(NO_GAME, |t| t.code()));
    w.value(decl.hand);
    w.value(decl.ouvert);
    w.value(decl.schneider_announced);
    w.value(decl.schwarz_announced);
}

/// `GameDeclarationNull` reads as the undeclared default
pub fn read_declaration(r: &mut Reader) -> Result<GameDeclaration, DeserializationError> {
    if !r.tag("GameDeclaration")? {
        return Ok(GameDeclaration::default());
    }
    let code = r.int("game type")?;
    let game_type = if code == NO_GAME {
        None
    } else {
        Some(GameType::from_code(code).ok_or_else(|| r.invalid("game type", &code.to_string()))?)
    };
    Ok(GameDeclaration {
        game_type,
        hand: r.bool("hand flag")?,
        ouvert: r.bool("ouvert flag")?,
        schneider_announced: r.bool("schneider flag")?,
        schwarz_announced: r.bool("schwarz flag")?,
    })
}

pub fn write_state(w: &mut Writer, state: &SimpleState) {
    w.record("SimpleState");
    w.value(state.view.code());
    w.value(state.phase.code());
    w.value(state.prev_phase.code());
    w.seat(state.declarer);
    w.value(state.max_bid);
    w.value(state.next_bid().map_or(-1, |b| b as i32));
    w.seat(state.asked);
    w.value(state.to_move);
    w.seat(state.bidder);
    w.seat(state.trick_winner);
    w.seat(state.left);
    w.seat(state.timeout);
    write_card(w, state.winning_card);
    write_declaration(w, &state.declaration);
    w.hand(state.declarer_hand_before_cardplay);
    for p in &state.players {
        w.value(p.tricks_won);
        w.value(p.trick_points);
        w.value(p.max_bid);
        w.value(p.resigned as u8);
        w.hand(p.hand);
        w.hand(p.played);
        w.value(p.voids.bits());
    }
    write_card(w, state.skat[0]);
    write_card(w, state.skat[1]);
    w.value(state.trick.len());
    for &card in &state.trick {
        write_card(w, Some(card));
    }
}

pub fn read_state(r: &mut Reader) -> Result<Option<SimpleState>, DeserializationError> {
    if !r.tag("SimpleState")? {
        return Ok(None);
    }

    let code = r.int("view")?;
    let view = View::from_code(code).ok_or_else(|| r.invalid("view", &code.to_string()))?;
    let mut state = SimpleState::new(view);
    state.phase = read_phase(r)?;
    state.prev_phase = read_phase(r)?;
    state.declarer = r.player_seat("declarer")?;
    state.max_bid = r.uint("max bid")?;
    // next bid is derived from max bid
    r.int("next bid")?;
    state.asked = r.seat("asked")?;
    let to_move_at = r.position();
    state.to_move = match r.seat("to move")? {
        Some(seat) if seat <= REAR_HAND => seat,
        // the world deals and hands out the skat; a game that ended while
        // the skat was pending keeps it as the mover
        Some(WORLD) if matches!(state.phase, Phase::Deal | Phase::GetSkat | Phase::Finished) => {
            WORLD
        }
        seat => {
            let found = seat.map_or(-1, |s| s as i32).to_string();
            return Err(r.invalid_at(to_move_at, "to move", &found));
        }
    };
    state.bidder = r.seat("bidder")?;
    state.trick_winner = r.player_seat("trick winner")?;
    state.left = r.player_seat("left")?;
    state.timeout = r.player_seat("timeout")?;
    state.winning_card = read_card(r)?;
    state.declaration = read_declaration(r)?;
    state.declarer_hand_before_cardplay = r.hand("declarer hand")?;

    let mut tricks = 0u32;
    for p in state.players.iter_mut() {
        let tricks_at = r.position();
        *p = read_player(r)?;
        tricks = tricks.saturating_add(p.tricks_won);
        if tricks > 10 {
            return Err(r.invalid_at(tricks_at, "tricks won", &p.tricks_won.to_string()));
        }
    }

    state.skat = [read_card(r)?, read_card(r)?];

    let n = r.uint("trick card count")?;
    if n > 3 {
        return Err(r.invalid("trick card count", &n.to_string()));
    }
    for _ in 0..n {
        let card = read_card(r)?.ok_or_else(|| r.invalid("trick card", "unknown"))?;
        state.trick.push(card);
    }
    Ok(Some(state))
}

fn read_phase(r: &mut Reader) -> Result<Phase, DeserializationError> {
    let code = r.int("phase")?;
    Phase::from_code(code).ok_or_else(|| r.invalid("phase", &code.to_string()))
}

fn read_player(r: &mut Reader) -> Result<PlayerInfo, DeserializationError> {
    let tricks_won = r.uint("tricks won")?;
    let trick_points = r.uint("trick points")?;
    let max_bid = r.uint("player max bid")?;
    let resigned = r.bool("resigned flag")?;
    let hand = r.hand("hand")?;
    let played = r.hand("played cards")?;
    let bits = r.uint("voids")?;
    let voids = u8::try_from(bits)
        .ok()
        .and_then(Voids::from_bits)
        .ok_or_else(|| r.invalid("voids", &bits.to_string()))?;
    Ok(PlayerInfo {
        tricks_won,
        trick_points,
        max_bid,
        resigned,
        hand,
        played,
        voids,
    })
}

pub fn write_game(w: &mut Writer, game: &SimpleGame) {
    w.record("SimpleGame");
    w.record("MoveVector");
    w.value(game.num_moves());
    for mv in game.moves() {
        write_move(w, mv);
    }
    w.record("SimpleStateVector");
    w.value(game.states().len());
    for state in game.states() {
        write_state(w, state);
    }
}

pub fn read_game(r: &mut Reader) -> Result<Option<SimpleGame>, DeserializationError> {
    if !r.tag("SimpleGame")? {
        return Ok(None);
    }

    r.required_tag("MoveVector")?;
    let n = r.uint("move count")?;
    let mut moves = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let position = r.position();
        let mv = read_move(r)?.ok_or(DeserializationError::UnexpectedTag {
            expected: "Move",
            found: "MoveNull".to_string(),
            position,
        })?;
        moves.push(mv);
    }

    r.required_tag("SimpleStateVector")?;
    let n = r.uint("state count")?;
    let mut states = Vec::with_capacity(n as usize);
    for _ in 0..n {
        let position = r.position();
        let state = read_state(r)?.ok_or(DeserializationError::UnexpectedTag {
            expected: "SimpleState",
            found: "SimpleStateNull".to_string(),
            position,
        })?;
        states.push(state);
    }

    Ok(Some(SimpleGame::from_parts(moves, states)?))
}

/// Serialize a whole deal history
pub fn serialize_game(game: &SimpleGame) -> String {
    let mut w = Writer::new();
    write_game(&mut w, game);
    w.finish()
}

/// Deserialize a deal history. `SimpleGameNull` is an error here since the
/// caller needs a history to work with.
pub fn deserialize_game(input: &str) -> Result<SimpleGame, DeserializationError> {
    let mut r = Reader::new(input);
    let game = read_game(&mut r)?.ok_or(DeserializationError::UnexpectedTag {
        expected: "SimpleGame",
        found: "SimpleGameNull".to_string(),
        position: 0,
    })?;
    if !r.is_at_end() {
        warn!(
            position = r.position(),
            "ignoring trailing tokens after serialized game"
        );
    }
    Ok(game)
}

pub fn serialize_state(state: &SimpleState) -> String {
    let mut w = Writer::new();
    write_state(&mut w, state);
    w.finish()
}

pub fn deserialize_state(input: &str) -> Result<Option<SimpleState>, DeserializationError> {
    read_state(&mut Reader::new(input))
}
