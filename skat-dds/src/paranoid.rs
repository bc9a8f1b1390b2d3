//! Paranoid classification of a declarer hand with a given skat.
//!
//! Answers come from a precomputed table loaded per declarer hand. Hands
//! missing from the table are classified by searching the declarer's
//! information sets over sampled defender hands: the declarer has to
//! pick its cards without seeing the worlds apart while the defenders
//! play with full knowledge.

use crate::{Interrupt, Position, SearchMode, Solver, SolverConfig, SolverError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use skat_core::{Card, Cards, GameType};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Outcome of a game for the declarer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParanoidOutcome {
    Win = 0,
    /// Defenders held to 30 points or less
    Schneider = 1,
    /// Defenders take no trick
    Schwarz = 2,
    Loss = 3,
}

impl ParanoidOutcome {
    pub const ALL: [ParanoidOutcome; 4] = [
        ParanoidOutcome::Win,
        ParanoidOutcome::Schneider,
        ParanoidOutcome::Schwarz,
        ParanoidOutcome::Loss,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        ParanoidOutcome::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Rank for the declarer: loss < win < schneider < schwarz
    pub fn strength(&self) -> u8 {
        match self {
            ParanoidOutcome::Loss => 0,
            ParanoidOutcome::Win => 1,
            ParanoidOutcome::Schneider => 2,
            ParanoidOutcome::Schwarz => 3,
        }
    }

    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "win" => Some(ParanoidOutcome::Win),
            "schneider" => Some(ParanoidOutcome::Schneider),
            "schwarz" => Some(ParanoidOutcome::Schwarz),
            "loss" => Some(ParanoidOutcome::Loss),
            digits => ParanoidOutcome::from_code(digits.parse().ok()?),
        }
    }
}

/// Outcomes for one declarer hand, keyed by skat and game type
#[derive(Debug, Clone, Default)]
pub struct ParanoidTable {
    hand: Cards,
    entries: FxHashMap<(u32, GameType), ParanoidOutcome>,
}

impl ParanoidTable {
    pub fn new(hand: Cards) -> Self {
        ParanoidTable {
            hand,
            entries: FxHashMap::default(),
        }
    }

    /// Load the lines of `path` that belong to `hand`.
    ///
    /// Line format: `<hand-hex> <skat-hex> <game-char> <outcome>` where the
    /// outcome is 0-3 or one of win, schneider, schwarz, loss. `#` starts a
    /// comment.
    pub fn load(path: &Path, hand: Cards) -> Result<Self, SolverError> {
        let text = std::fs::read_to_string(path).map_err(|source| SolverError::TableIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path, hand)
    }

    fn parse(text: &str, path: &Path, hand: Cards) -> Result<Self, SolverError> {
        let mut table = ParanoidTable::new(hand);
        let mut other_hands = 0;

        for (i, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let format_error = |message: String| SolverError::TableFormat {
                path: PathBuf::from(path),
                line: i + 1,
                message,
            };

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [hand_hex, skat_hex, game, outcome] = fields[..] else {
                return Err(format_error(format!("expected 4 fields, got {}", fields.len())));
            };
            let line_hand = parse_hex(hand_hex)
                .ok_or_else(|| format_error(format!("bad hand '{}'", hand_hex)))?;
            let skat = parse_hex(skat_hex)
                .ok_or_else(|| format_error(format!("bad skat '{}'", skat_hex)))?;
            let game_type = game
                .chars()
                .next()
                .filter(|_| game.len() == 1)
                .and_then(GameType::from_char)
                .ok_or_else(|| format_error(format!("bad game type '{}'", game)))?;
            let outcome = ParanoidOutcome::parse(outcome)
                .ok_or_else(|| format_error(format!("bad outcome '{}'", outcome)))?;

            if line_hand != hand {
                other_hands += 1;
                continue;
            }
            if game_type.is_null() || skat.len() != 2 || skat.intersects(hand) {
                warn!(line = i + 1, "skipping paranoid table entry {}", line);
                continue;
            }
            table.entries.insert((skat.bits(), game_type), outcome);
        }

        debug!(
            path = %path.display(),
            entries = table.entries.len(),
            other_hands,
            "loaded paranoid table"
        );
        Ok(table)
    }

    pub fn hand(&self) -> Cards {
        self.hand
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, skat: Cards, game_type: GameType) -> Option<ParanoidOutcome> {
        self.entries.get(&(skat.bits(), game_type)).copied()
    }

    pub fn insert(&mut self, skat: Cards, game_type: GameType, outcome: ParanoidOutcome) {
        self.entries.insert((skat.bits(), game_type), outcome);
    }
}

fn parse_hex(s: &str) -> Option<Cards> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u32::from_str_radix(digits, 16).ok().map(Cards::from_bits)
}

/// Paranoid solver holding the table of the current declarer hand
pub struct ParanoidSolver {
    config: SolverConfig,
    interrupt: Interrupt,
    table: Option<ParanoidTable>,
}

impl ParanoidSolver {
    pub fn new(config: SolverConfig, interrupt: Interrupt) -> Self {
        ParanoidSolver {
            config,
            interrupt,
            table: None,
        }
    }

    /// Load the table for `hand`, replacing the table of any earlier hand.
    /// Returns the number of entries loaded.
    pub fn paranoid_init(
        &mut self,
        path: impl AsRef<Path>,
        hand: Cards,
    ) -> Result<usize, SolverError> {
        self.table = None;
        let table = ParanoidTable::load(path.as_ref(), hand)?;
        let n = table.len();
        self.table = Some(table);
        Ok(n)
    }

    pub fn table(&self) -> Option<&ParanoidTable> {
        self.table.as_ref()
    }

    /// Classify `hand` with `skat` in `game_type`
    pub fn paranoid(
        &mut self,
        hand: Cards,
        skat: Cards,
        game_type: GameType,
    ) -> Result<ParanoidOutcome, SolverError> {
        let table = self.table.as_ref().ok_or(SolverError::ParanoidNotLoaded)?;
        if table.hand() != hand {
            return Err(SolverError::HandMismatch {
                loaded: table.hand(),
                queried: hand,
            });
        }
        if game_type.is_null() {
            return Err(SolverError::NullNotSupported);
        }
        if hand.intersects(skat) {
            return Err(SolverError::OverlappingHands(hand & skat));
        }
        if hand.len() != 10 || skat.len() != 2 {
            return Err(SolverError::InvalidHand([hand.len(), skat.len(), 0]));
        }
        if let Some(outcome) = table.get(skat, game_type) {
            return Ok(outcome);
        }

        let (outcome, interrupted) = self.search(hand, skat, game_type)?;
        if !interrupted {
            if let Some(table) = self.table.as_mut() {
                table.insert(skat, game_type, outcome);
            }
        }
        Ok(outcome)
    }

    fn search(
        &self,
        hand: Cards,
        skat: Cards,
        game_type: GameType,
    ) -> Result<(ParanoidOutcome, bool), SolverError> {
        let seed = self.config.seed ^ ((skat.bits() as u64) << 8) ^ game_type.code() as u64;
        let mut rng = StdRng::seed_from_u64(seed);
        let rest: Vec<Card> = (!(hand | skat)).iter().collect();
        let worlds: Vec<[Cards; 2]> = (0..self.config.paranoid_worlds.clamp(1, MAX_WORLDS))
            .map(|_| {
                let mut cards = rest.clone();
                cards.shuffle(&mut rng);
                let (a, b) = cards.split_at(cards.len() / 2);
                [Cards::from_cards(a.iter().copied()), Cards::from_cards(b.iter().copied())]
            })
            .collect();

        let start = Endgame {
            game_type,
            declarer_hand: hand,
            played: Cards::EMPTY,
            trick: Vec::new(),
            to_move: 0,
            declarer_points: skat.points(),
            defender_points: 0,
            defender_tricks: 0,
        };
        let (outcome, interrupted) = classify(&self.config, &self.interrupt, &start, &worlds)?;
        debug!(
            skat = %skat,
            game = ?game_type,
            worlds = worlds.len(),
            outcome = ?outcome,
            interrupted,
            "paranoid search"
        );
        Ok((outcome, interrupted))
    }
}

/// World masks are u64
const MAX_WORLDS: usize = 64;

/// What the declarer has to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Card points including the skat
    Points(u32),
    /// Every trick
    Schwarz,
}

const TARGETS: [Target; 3] = [Target::Points(61), Target::Points(90), Target::Schwarz];

/// Card play state as the declarer at seat 0 sees it. The defenders' hands
/// come from the worlds.
#[derive(Debug, Clone)]
struct Endgame {
    game_type: GameType,
    /// Declarer's cards not yet played
    declarer_hand: Cards,
    /// Cards no defender can hold any more
    played: Cards,
    trick: Vec<Card>,
    to_move: usize,
    declarer_points: u32,
    defender_points: u32,
    defender_tricks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeKey {
    mask: u64,
    played: u32,
    trick: [u8; 2],
    to_move: u8,
    declarer_points: u32,
    defender_tricks: bool,
}

impl Endgame {
    fn hand(&self, world: &[Cards; 2], seat: usize) -> Cards {
        match seat {
            0 => self.declarer_hand,
            s => world[(s - 1) % 2] - self.played,
        }
    }

    fn legal(&self, hand: Cards) -> Cards {
        self.game_type.legal_plays(hand, self.trick.first().copied())
    }

    fn remaining(&self) -> u32 {
        120u32.saturating_sub(self.declarer_points + self.defender_points)
    }

    fn is_over(&self) -> bool {
        self.declarer_hand.is_empty() && self.trick.is_empty()
    }

    fn play(&self, card: Card) -> Endgame {
        let mut next = self.clone();
        next.declarer_hand.remove(card);
        next.played.insert(card);
        next.trick.push(card);
        if next.trick.len() < 3 {
            next.to_move = (self.to_move + 1) % 3;
            return next;
        }

        let cards = [next.trick[0], next.trick[1], next.trick[2]];
        let leader = (self.to_move + 1) % 3;
        let winner = (leader + self.game_type.trick_winner(cards)) % 3;
        let points: u32 = cards.iter().map(|c| c.points() as u32).sum();
        if winner == 0 {
            next.declarer_points += points;
        } else {
            next.defender_points += points;
            next.defender_tricks += 1;
        }
        next.trick.clear();
        next.to_move = winner;
        next
    }

    /// Full information position in one world
    fn position(&self, world: &[Cards; 2]) -> Position {
        Position {
            hands: [self.declarer_hand, self.hand(world, 1), self.hand(world, 2)],
            to_move: self.to_move,
            declarer: 0,
            game_type: self.game_type,
            trick: self.trick.clone(),
            declarer_points: self.declarer_points,
            defender_points: self.defender_points,
        }
    }

    fn key(&self, mask: u64) -> NodeKey {
        let mut trick = [u8::MAX; 2];
        for (slot, card) in trick.iter_mut().zip(&self.trick) {
            *slot = card.to_index();
        }
        NodeKey {
            mask,
            played: self.played.bits(),
            trick,
            to_move: self.to_move as u8,
            declarer_points: self.declarer_points,
            defender_tricks: self.defender_tricks > 0,
        }
    }
}

fn worlds_in(mask: u64) -> impl Iterator<Item = usize> {
    (0..MAX_WORLDS).filter(move |&w| mask >> w & 1 == 1)
}

/// Search over the declarer's information sets.
///
/// The declarer sees only its own cards and what has been played, so one
/// card choice must serve every world still consistent with the play.
/// The defenders see everything and answer world by world.
struct InfoSetSearch<'a> {
    solver: Solver,
    interrupt: Interrupt,
    worlds: &'a [[Cards; 2]],
    target: Target,
    memo: FxHashMap<NodeKey, bool>,
    nodes: u64,
    node_limit: u64,
    over_budget: bool,
    interrupted: bool,
}

impl<'a> InfoSetSearch<'a> {
    fn new(
        config: &SolverConfig,
        interrupt: &Interrupt,
        worlds: &'a [[Cards; 2]],
        target: Target,
    ) -> Self {
        InfoSetSearch {
            solver: Solver::with_interrupt(config.clone(), interrupt.clone()),
            interrupt: interrupt.clone(),
            worlds,
            target,
            memo: FxHashMap::default(),
            nodes: 0,
            node_limit: config.paranoid_nodes,
            over_budget: false,
            interrupted: false,
        }
    }

    /// Can the declarer reach the target from `node` in every world of
    /// `mask`? An interrupt answers no.
    fn reaches(&mut self, mask: u64, node: &Endgame) -> Result<bool, SolverError> {
        if self.interrupt.is_set() {
            self.interrupted = true;
            return Ok(false);
        }
        match self.target {
            Target::Points(t) => {
                if node.declarer_points >= t {
                    return Ok(true);
                }
                if node.declarer_points + node.remaining() < t {
                    return Ok(false);
                }
            }
            Target::Schwarz => {
                if node.defender_tricks > 0 {
                    return Ok(false);
                }
                if node.is_over() {
                    return Ok(true);
                }
            }
        }
        if self.sure_tricks(mask, node) {
            return Ok(true);
        }

        let key = node.key(mask);
        if let Some(&known) = self.memo.get(&key) {
            return Ok(known);
        }

        // every world has to reach the target on its own first
        for w in worlds_in(mask) {
            if !self.world_reaches(w, node)? {
                if !self.interrupted {
                    self.memo.insert(key, false);
                }
                return Ok(false);
            }
        }
        if mask.count_ones() == 1 {
            self.memo.insert(key, true);
            return Ok(true);
        }
        self.nodes += 1;
        if self.nodes > self.node_limit {
            self.over_budget = true;
            return Ok(true);
        }

        let reached = if node.to_move == 0 {
            let mut found = false;
            for card in node.legal(node.declarer_hand) {
                if self.reaches(mask, &node.play(card))? {
                    found = true;
                    break;
                }
                if self.interrupted {
                    break;
                }
            }
            found
        } else {
            let legal: Vec<(usize, Cards)> = worlds_in(mask)
                .map(|w| (w, node.legal(node.hand(&self.worlds[w], node.to_move))))
                .collect();
            let cards = legal.iter().fold(Cards::EMPTY, |acc, &(_, c)| acc | c);
            let mut all = true;
            for card in cards {
                // worlds the declarer still cannot tell apart after seeing `card`
                let sub = legal
                    .iter()
                    .filter(|(_, c)| c.contains(card))
                    .fold(0u64, |acc, &(w, _)| acc | 1u64 << w);
                if !self.reaches(sub, &node.play(card))? {
                    all = false;
                    break;
                }
            }
            all
        };
        if !self.interrupted {
            self.memo.insert(key, reached);
        }
        Ok(reached)
    }

    /// Double-dummy check of a single world
    fn world_reaches(&mut self, w: usize, node: &Endgame) -> Result<bool, SolverError> {
        let position = node.position(&self.worlds[w]);
        let (result, reached) = match self.target {
            Target::Points(t) => {
                // final point difference the declarer needs
                let goal = 2 * t as i32 - 120;
                let (alpha, beta) = if node.to_move == 0 {
                    (goal - 1, goal)
                } else {
                    (-goal, 1 - goal)
                };
                let result = self
                    .solver
                    .dds(&position, alpha, beta, false, SearchMode::Normal)?;
                (result, result.for_declarer().value >= goal)
            }
            Target::Schwarz => {
                let result = self.solver.schwarz(&position)?;
                (result, result.declarer_wins())
            }
        };
        if result.interrupted {
            self.interrupted = true;
            return Ok(false);
        }
        Ok(reached)
    }

    /// The declarer is on lead and no outstanding card beats any of its
    /// cards, so it takes every trick left
    fn sure_tricks(&self, mask: u64, node: &Endgame) -> bool {
        if node.to_move != 0 || !node.trick.is_empty() {
            return false;
        }
        let outstanding = worlds_in(mask)
            .fold(Cards::EMPTY, |acc, w| acc | self.worlds[w][0] | self.worlds[w][1])
            - node.played;
        node.declarer_hand.iter().all(|mine| {
            outstanding
                .iter()
                .all(|other| !node.game_type.beats(other, mine))
        })
    }
}

/// Best outcome the declarer can force from `start` in all `worlds` at
/// once. Also reports whether an interrupt cut the search short.
fn classify(
    config: &SolverConfig,
    interrupt: &Interrupt,
    start: &Endgame,
    worlds: &[[Cards; 2]],
) -> Result<(ParanoidOutcome, bool), SolverError> {
    let worlds = &worlds[..worlds.len().min(MAX_WORLDS)];
    if worlds.is_empty() {
        return Err(SolverError::EmptyWorlds);
    }
    let mask = if worlds.len() == MAX_WORLDS {
        u64::MAX
    } else {
        (1u64 << worlds.len()) - 1
    };

    let reach = |&target: &Target| -> Result<(bool, bool), SolverError> {
        let mut search = InfoSetSearch::new(config, interrupt, worlds, target);
        let reached = search.reaches(mask, start)?;
        if search.over_budget {
            warn!(
                ?target,
                nodes = search.nodes,
                "information set search over budget, using per-world answer"
            );
        }
        debug!(?target, reached, nodes = search.nodes, "paranoid target");
        Ok((reached, search.interrupted))
    };
    let results: Vec<(bool, bool)> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.actual_threads().min(TARGETS.len()))
        .build()
    {
        Ok(pool) => pool.install(|| {
            TARGETS
                .par_iter()
                .map(reach)
                .collect::<Result<Vec<_>, SolverError>>()
        })?,
        Err(e) => {
            warn!("thread pool unavailable, searching targets serially: {}", e);
            TARGETS
                .iter()
                .map(reach)
                .collect::<Result<Vec<_>, SolverError>>()?
        }
    };

    let interrupted = results.iter().any(|&(_, i)| i);
    let outcome = match results[..] {
        [(false, _), ..] => ParanoidOutcome::Loss,
        [_, (false, _), ..] => ParanoidOutcome::Win,
        [_, _, (false, _)] => ParanoidOutcome::Schneider,
        _ => ParanoidOutcome::Schwarz,
    };
    Ok((outcome, interrupted))
}
