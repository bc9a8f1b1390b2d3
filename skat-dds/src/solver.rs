//! Double-dummy search for Skat card play.
//!
//! Negamax alpha-beta over the remaining cards. Values are card point
//! differentials of the future tricks from the side to move; the points
//! already taken only shift the window. Null games (and the schwarz check
//! used by the paranoid solver) search for a binary goal instead, with
//! leaves worth 100 plus the cards the declarer still holds.

use crate::cache::{Bounds, CacheKey, TranspositionCache};
use crate::{Interrupt, Position, SolverConfig, SolverError};
use skat_core::{Card, Cards, GameType};
use std::cmp::Reverse;
use tracing::{debug, info};

/// Window bound standing for infinity
pub const INF: i32 = 10_000;

/// Leaf value of a lost binary goal with every card still in hand
const GOAL_WORST: i32 = -110;

/// How the declarer's points are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Accumulated points are taken as given
    Normal,
    /// The skat is not known to the caller: every point that is neither
    /// taken nor in play is credited to the declarer
    UnknownSkat,
}

/// What a returned value says about the true value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Exact,
    /// True value is at least the returned value
    Lower,
    /// True value is at most the returned value
    Upper,
}

impl BoundKind {
    /// The same bound seen from the other side
    pub fn flip(self) -> Self {
        match self {
            BoundKind::Exact => BoundKind::Exact,
            BoundKind::Lower => BoundKind::Upper,
            BoundKind::Upper => BoundKind::Lower,
        }
    }
}

/// Result of a double-dummy search, from the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DdsResult {
    pub value: i32,
    pub bound: BoundKind,
    /// The search stopped early; `bound` is never `Exact` then
    pub interrupted: bool,
    pub nodes: u64,
    pub declarer_to_move: bool,
}

impl DdsResult {
    pub fn is_exact(&self) -> bool {
        self.bound == BoundKind::Exact
    }

    /// The same result seen from the declarer's side
    pub fn for_declarer(&self) -> DdsResult {
        if self.declarer_to_move {
            return *self;
        }
        DdsResult {
            value: -self.value,
            bound: self.bound.flip(),
            declarer_to_move: true,
            ..*self
        }
    }

    /// Null games: the declarer takes no trick. Trump games: the declarer
    /// ends with more than 60 points.
    pub fn declarer_wins(&self) -> bool {
        self.for_declarer().value > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Goal {
    Points = 0,
    /// Declarer must not take a trick
    Null = 1,
    /// Declarer must take every trick
    Schwarz = 2,
}

#[derive(Clone, Copy)]
struct Node {
    hands: [Cards; 3],
    trick: [Option<Card>; 2],
    to_move: usize,
}

impl Node {
    fn from_position(position: &Position) -> Self {
        Node {
            hands: position.hands,
            trick: [position.trick.first().copied(), position.trick.get(1).copied()],
            to_move: position.to_move,
        }
    }

    fn trick_len(&self) -> usize {
        self.trick.iter().flatten().count()
    }

    fn in_play(&self) -> Cards {
        let trick: Cards = self.trick.iter().flatten().copied().collect();
        trick | self.hands[0] | self.hands[1] | self.hands[2]
    }

    fn is_empty(&self) -> bool {
        self.in_play().is_empty()
    }
}

enum Step {
    Continue(Node, i32),
    Terminal(i32),
}

struct Context {
    game_type: GameType,
    declarer: usize,
    goal: Goal,
    groups: Vec<Vec<Card>>,
}

impl Context {
    fn same_side(&self, a: usize, b: usize) -> bool {
        (a == self.declarer) == (b == self.declarer)
    }

    fn key(&self, node: &Node) -> CacheKey {
        let code = |c: Option<Card>| c.map_or(0, |c| c.to_index() as u16 + 1);
        CacheKey {
            hands: node.hands.map(|h| h.bits()),
            trick: code(node.trick[0]) | code(node.trick[1]) << 6,
            to_move: node.to_move as u8,
            game_type: self.game_type as u8,
            declarer: self.declarer as u8,
            goal: self.goal as u8,
        }
    }

    /// Current winner of a partial trick as (card, seat)
    fn trick_winner(&self, node: &Node) -> Option<(Card, usize)> {
        let led = node.trick[0]?;
        let starter = (node.to_move + 3 - node.trick_len()) % 3;
        match node.trick[1] {
            Some(second) if self.game_type.beats(second, led) => {
                Some((second, (starter + 1) % 3))
            }
            _ => Some((led, starter)),
        }
    }

    fn step(&self, node: &Node, card: Card) -> Step {
        let mover = node.to_move;
        let mut child = *node;
        child.hands[mover].remove(card);

        let (a, b) = match node.trick {
            [Some(a), Some(b)] => (a, b),
            [Some(_), None] => {
                child.trick[1] = Some(card);
                child.to_move = (mover + 1) % 3;
                return Step::Continue(child, 0);
            }
            _ => {
                child.trick = [Some(card), None];
                child.to_move = (mover + 1) % 3;
                return Step::Continue(child, 0);
            }
        };

        let starter = (mover + 1) % 3;
        let winner = (starter + self.game_type.trick_winner([a, b, card])) % 3;
        child.trick = [None, None];
        child.to_move = winner;
        let done = child.hands.iter().all(|h| h.is_empty());

        match self.goal {
            Goal::Points => {
                let points = (a.points() + b.points() + card.points()) as i32;
                let gain = if self.same_side(mover, winner) {
                    points
                } else {
                    -points
                };
                if done {
                    Step::Terminal(gain)
                } else {
                    Step::Continue(child, gain)
                }
            }
            Goal::Null | Goal::Schwarz => {
                let failed = match self.goal {
                    Goal::Null => winner == self.declarer,
                    _ => winner != self.declarer,
                };
                let sign = if mover == self.declarer { 1 } else { -1 };
                if failed {
                    let held = child.hands[self.declarer].len() as i32;
                    Step::Terminal(-sign * (100 + held))
                } else if done {
                    Step::Terminal(sign * 100)
                } else {
                    Step::Continue(child, 0)
                }
            }
        }
    }

    /// Legal cards with equivalent cards removed, most promising first.
    ///
    /// Two cards of one rank group are equivalent when every card ranked
    /// between them is the mover's own or already gone, and they carry the
    /// same points (points do not matter for binary goals).
    fn ordered_moves(&self, node: &Node) -> Vec<Card> {
        let mover = node.to_move;
        let hand = node.hands[mover];
        let legal = self.game_type.legal_plays(hand, node.trick[0]);
        let in_play = node.in_play();

        let mut moves = Vec::with_capacity(legal.len());
        for group in &self.groups {
            let mut last: Option<Card> = None;
            for &card in group {
                if legal.contains(card) {
                    let equivalent = last.is_some_and(|prev| {
                        self.goal != Goal::Points || prev.points() == card.points()
                    });
                    if !equivalent {
                        moves.push(card);
                    }
                    last = Some(card);
                } else if in_play.contains(card) && !hand.contains(card) {
                    last = None;
                }
            }
        }

        let winner = self.trick_winner(node);
        moves.sort_by_key(|&card| Reverse(self.move_score(mover, card, winner)));
        moves
    }

    fn move_score(&self, mover: usize, card: Card, winner: Option<(Card, usize)>) -> i32 {
        let rank = self.game_type.trick_rank(card) as i32;
        let points = card.points() as i32;
        let Some((win_card, win_seat)) = winner else {
            // leading
            return if self.goal == Goal::Null { -rank } else { rank };
        };
        let beats = self.game_type.beats(card, win_card);
        if self.goal == Goal::Null {
            return if beats { -rank } else { 100 + rank };
        }
        match (beats, self.same_side(mover, win_seat)) {
            (true, false) => 200 + points,
            (false, true) => 100 + points,
            (true, true) => 50 + points,
            (false, false) => -points - rank,
        }
    }
}

/// Double-dummy solver owning a transposition cache
pub struct Solver {
    config: SolverConfig,
    cache: TranspositionCache,
    interrupt: Interrupt,
    nodes: u64,
    aborted: bool,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Solver::with_interrupt(config, Interrupt::new())
    }

    /// Solver polling a shared interrupt flag
    pub fn with_interrupt(config: SolverConfig, interrupt: Interrupt) -> Self {
        Solver {
            cache: TranspositionCache::new(config.cache_limit),
            config,
            interrupt,
            nodes: 0,
            aborted: false,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Drop every cached bound. Needed before searching a different deal
    /// only for memory reasons; keys already separate game types and
    /// declarers.
    pub fn clear_hash(&mut self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Search `position` with the window (`alpha`, `beta`) on the final
    /// point differential of the side to move.
    ///
    /// Null games ignore the window and search the sign of the result.
    pub fn dds(
        &mut self,
        position: &Position,
        alpha: i32,
        beta: i32,
        clear_hash: bool,
        mode: SearchMode,
    ) -> Result<DdsResult, SolverError> {
        position.validate()?;
        if clear_hash {
            self.clear_hash();
        }

        if position.game_type.is_null() {
            return Ok(self.run(position, Goal::Null, -1, 1, 0));
        }

        let mut declarer_points = position.declarer_points;
        if mode == SearchMode::UnknownSkat {
            let known = position.declarer_points
                + position.defender_points
                + position.remaining_points();
            declarer_points += 120u32.saturating_sub(known);
        }
        let diff = declarer_points as i32 - position.defender_points as i32;
        let offset = if position.to_move == position.declarer {
            diff
        } else {
            -diff
        };
        Ok(self.run(position, Goal::Points, alpha, beta, offset))
    }

    /// Binary search: can the declarer take every remaining trick?
    pub(crate) fn schwarz(&mut self, position: &Position) -> Result<DdsResult, SolverError> {
        position.validate()?;
        Ok(self.run(position, Goal::Schwarz, -1, 1, 0))
    }

    fn run(
        &mut self,
        position: &Position,
        goal: Goal,
        alpha: i32,
        beta: i32,
        offset: i32,
    ) -> DdsResult {
        let ctx = Context {
            game_type: position.game_type,
            declarer: position.declarer,
            goal,
            groups: position.game_type.ranked_groups(),
        };
        let node = Node::from_position(position);
        self.nodes = 0;
        self.aborted = self.interrupt.is_set();

        let worst = match goal {
            Goal::Points => -(position.remaining_points() as i32),
            _ => GOAL_WORST,
        };
        let (value, interrupted) = self.root(
            &ctx,
            &node,
            alpha.saturating_sub(offset),
            beta.saturating_sub(offset),
            worst,
        );
        let value = value + offset;

        let bound = if interrupted || value >= beta {
            BoundKind::Lower
        } else if value <= alpha {
            BoundKind::Upper
        } else {
            BoundKind::Exact
        };
        if interrupted {
            info!(nodes = self.nodes, value, "search interrupted");
        }
        debug!(
            game = ?position.game_type,
            goal = ?goal,
            nodes = self.nodes,
            value,
            bound = ?bound,
            cache = self.cache.len(),
            "dds"
        );
        DdsResult {
            value,
            bound,
            interrupted,
            nodes: self.nodes,
            declarer_to_move: position.to_move == position.declarer,
        }
    }

    /// Root search. On interruption, returns the best lower bound proven
    /// by the children searched so far.
    fn root(
        &mut self,
        ctx: &Context,
        node: &Node,
        alpha: i32,
        beta: i32,
        worst: i32,
    ) -> (i32, bool) {
        if node.is_empty() {
            return (0, false);
        }
        if self.aborted {
            return (worst, true);
        }

        let mut a = alpha;
        let mut best = -INF;
        let mut proven = worst;
        for card in ctx.ordered_moves(node) {
            let v = self.child_value(ctx, node, card, a, beta);
            if self.aborted {
                return (proven, true);
            }
            if v > a {
                proven = proven.max(v);
            }
            best = best.max(v);
            a = a.max(v);
            if a >= beta {
                break;
            }
        }
        (best, false)
    }

    fn child_value(
        &mut self,
        ctx: &Context,
        node: &Node,
        card: Card,
        alpha: i32,
        beta: i32,
    ) -> i32 {
        match ctx.step(node, card) {
            Step::Terminal(v) => v,
            Step::Continue(child, gain) => {
                if ctx.same_side(node.to_move, child.to_move) {
                    gain + self.search(ctx, &child, alpha - gain, beta - gain)
                } else {
                    gain - self.search(ctx, &child, gain - beta, gain - alpha)
                }
            }
        }
    }

    fn search(&mut self, ctx: &Context, node: &Node, alpha: i32, beta: i32) -> i32 {
        self.nodes += 1;
        if self.nodes % self.config.poll_interval.max(1) == 0 && self.interrupt.is_set() {
            self.aborted = true;
        }
        if self.aborted {
            return alpha;
        }

        let key = ctx.key(node);
        let (mut alpha, mut beta) = (alpha, beta);
        if let Some(b) = self.cache.probe(&key) {
            if b.lower >= beta {
                return b.lower;
            }
            if b.upper <= alpha {
                return b.upper;
            }
            if b.is_exact() {
                return b.lower;
            }
            alpha = alpha.max(b.lower);
            beta = beta.min(b.upper);
        }

        let moves = ctx.ordered_moves(node);
        if moves.is_empty() {
            return 0;
        }
        let mut a = alpha;
        let mut best = -INF;
        for card in moves {
            let v = self.child_value(ctx, node, card, a, beta);
            if self.aborted {
                return alpha;
            }
            if v > best {
                best = v;
                a = a.max(v);
                if a >= beta {
                    break;
                }
            }
        }

        let bounds = if best <= alpha {
            Bounds::new(-INF, best)
        } else if best >= beta {
            Bounds::new(best, INF)
        } else {
            Bounds::exact(best)
        };
        self.cache.store(key, bounds);
        best
    }
}
