//! Solver tests on small hand-checked endgames

use super::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use skat_core::{Card, Cards, GameType};

fn cards(s: &str) -> Cards {
    s.split('.').filter_map(Card::parse).collect()
}

/// Endgame with the expected final point difference (declarer minus
/// defenders), or for null games whether the declarer wins
struct TestCase {
    name: &'static str,
    hands: [&'static str; 3],
    to_move: usize,
    declarer: usize,
    game_type: GameType,
    points: (u32, u32),
    expected: Expected,
}

enum Expected {
    Diff(i32),
    NullWin(bool),
}

const TEST_CASES: &[TestCase] = &[
    TestCase {
        name: "grand, declarer leads the top trump",
        hands: ["CJ", "SA", "H7"],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Grand,
        points: (58, 49),
        expected: Expected::Diff(71 - 49),
    },
    TestCase {
        name: "grand, defender cashes the spade ace",
        hands: ["CJ.S7", "SA.H7", "ST.HK"],
        to_move: 1,
        declarer: 0,
        game_type: GameType::Grand,
        points: (0, 0),
        expected: Expected::Diff(6 - 21),
    },
    TestCase {
        name: "clubs, both sides take one trick",
        hands: ["SA.CT", "HA.HT", "H7.C7"],
        to_move: 1,
        declarer: 0,
        game_type: GameType::Clubs,
        points: (0, 0),
        expected: Expected::Diff(21 - 21),
    },
    TestCase {
        name: "null, declarer ducks everything",
        hands: ["D8.S7", "D7.SA", "D9.SK"],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Null,
        points: (0, 0),
        expected: Expected::NullWin(true),
    },
    TestCase {
        name: "null, declarer must win the diamond",
        hands: ["DA.S7", "D7.S8", "D8.S9"],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Null,
        points: (0, 0),
        expected: Expected::NullWin(false),
    },
];

fn position(case: &TestCase) -> Position {
    Position {
        hands: case.hands.map(cards),
        to_move: case.to_move,
        declarer: case.declarer,
        game_type: case.game_type,
        trick: vec![],
        declarer_points: case.points.0,
        defender_points: case.points.1,
    }
}

#[test]
fn test_all_cases() {
    let mut solver = Solver::new(SolverConfig::default());
    for case in TEST_CASES {
        let result = solver
            .dds(&position(case), -INF, INF, true, SearchMode::Normal)
            .unwrap_or_else(|e| panic!("{}: {}", case.name, e));
        assert!(!result.interrupted, "{}", case.name);
        let declarer = result.for_declarer();
        match case.expected {
            Expected::Diff(diff) => {
                assert_eq!(declarer.value, diff, "{}", case.name);
                assert!(result.is_exact(), "{}", case.name);
            }
            Expected::NullWin(win) => {
                assert_eq!(declarer.declarer_wins(), win, "{}", case.name);
            }
        }
    }
}

#[test]
fn test_value_from_mover() {
    let mut solver = Solver::new(SolverConfig::default());
    let result = solver
        .dds(&position(&TEST_CASES[1]), -INF, INF, true, SearchMode::Normal)
        .unwrap();
    assert!(!result.declarer_to_move);
    assert_eq!(result.value, 15);
    assert!(!result.declarer_wins());
}

#[test]
fn test_window() {
    let mut solver = Solver::new(SolverConfig::default());
    let p = position(&TEST_CASES[1]);

    // window around the true value
    let r = solver.dds(&p, 14, 16, true, SearchMode::Normal).unwrap();
    assert_eq!(r.value, 15);
    assert_eq!(r.bound, BoundKind::Exact);

    // narrowing the window keeps an in-window value
    for (alpha, beta) in [(-INF, INF), (-50, 50), (0, 30), (10, 20)] {
        let r = solver.dds(&p, alpha, beta, false, SearchMode::Normal).unwrap();
        assert_eq!(r.value, 15, "window ({}, {})", alpha, beta);
        assert!(r.is_exact());
    }

    // outside the window only the side is known
    let r = solver.dds(&p, 20, 30, true, SearchMode::Normal).unwrap();
    assert_eq!(r.bound, BoundKind::Upper);
    assert!(r.value <= 20 && r.value >= 15);
    let r = solver.dds(&p, -30, 0, true, SearchMode::Normal).unwrap();
    assert_eq!(r.bound, BoundKind::Lower);
    assert!(r.value >= 0 && r.value <= 15);
}

#[test]
fn test_window_shifted_by_points() {
    let mut solver = Solver::new(SolverConfig::default());
    let mut p = position(&TEST_CASES[1]);
    p.declarer_points = 30;
    p.defender_points = 20;
    let r = solver.dds(&p, -INF, INF, true, SearchMode::Normal).unwrap();
    // seat 1 sees 15 from the play and -10 from the points taken
    assert_eq!(r.value, 5);
    let r = solver.dds(&p, 4, 6, false, SearchMode::Normal).unwrap();
    assert_eq!(r.value, 5);
    assert!(r.is_exact());
}

#[test]
fn test_cache_clear_same_value() {
    let p = Position {
        hands: [
            cards("CJ.HJ.CA.CT.SA"),
            cards("SJ.C9.ST.SK.HA"),
            cards("DJ.C7.HT.HK.DA"),
        ],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Clubs,
        trick: vec![],
        declarer_points: 30,
        defender_points: 20,
    };
    let mut solver = Solver::new(SolverConfig::default());
    let first = solver.dds(&p, -INF, INF, true, SearchMode::Normal).unwrap();
    assert!(solver.cache_len() > 0);

    // a warm cache gives the same answer
    let warm = solver.dds(&p, -INF, INF, false, SearchMode::Normal).unwrap();
    assert_eq!(warm.value, first.value);

    solver.clear_hash();
    assert_eq!(solver.cache_len(), 0);
    let cold = solver.dds(&p, -INF, INF, false, SearchMode::Normal).unwrap();
    assert_eq!(cold.value, first.value);
    assert!(cold.is_exact());
}

#[test]
fn test_cache_separates_games() {
    let mut p = position(&TEST_CASES[2]);
    let mut solver = Solver::new(SolverConfig::default());
    let clubs = solver.dds(&p, -INF, INF, true, SearchMode::Normal).unwrap();
    p.game_type = GameType::Grand;
    let grand_warm = solver.dds(&p, -INF, INF, false, SearchMode::Normal).unwrap();
    let grand_cold = Solver::new(SolverConfig::default())
        .dds(&p, -INF, INF, true, SearchMode::Normal)
        .unwrap();
    assert_eq!(grand_warm.value, grand_cold.value);
    assert_ne!(clubs.value, grand_cold.value);
}

#[test]
fn test_interrupted_search() {
    let interrupt = Interrupt::new();
    let mut solver = Solver::with_interrupt(SolverConfig::default(), interrupt.clone());
    interrupt.set();
    let r = solver
        .dds(&position(&TEST_CASES[1]), -INF, INF, true, SearchMode::Normal)
        .unwrap();
    assert!(r.interrupted);
    assert_eq!(r.bound, BoundKind::Lower);
    assert!(!r.is_exact());
    // a lower bound on 15
    assert!(r.value <= 15);

    interrupt.clear();
    let r = solver
        .dds(&position(&TEST_CASES[1]), -INF, INF, false, SearchMode::Normal)
        .unwrap();
    assert!(!r.interrupted);
    assert_eq!(r.value, 15);
}

#[test]
fn test_unknown_skat_credit() {
    let mut solver = Solver::new(SolverConfig::default());
    let mut p = position(&TEST_CASES[0]);
    p.declarer_points = 40;
    // 120 - 40 - 49 - 13 points go to the declarer
    let r = solver.dds(&p, -INF, INF, true, SearchMode::UnknownSkat).unwrap();
    assert_eq!(r.value, 71 - 49);
    let r = solver.dds(&p, -INF, INF, true, SearchMode::Normal).unwrap();
    assert_eq!(r.value, 53 - 49);
}

#[test]
fn test_schwarz_goal() {
    let mut solver = Solver::new(SolverConfig::default());
    let all_tricks = Position {
        hands: [cards("CJ.SJ"), cards("S7.S8"), cards("H7.H8")],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Grand,
        trick: vec![],
        declarer_points: 100,
        defender_points: 0,
    };
    assert!(solver.schwarz(&all_tricks).unwrap().declarer_wins());

    // the defenders take the spade ace
    let p = position(&TEST_CASES[1]);
    assert!(!solver.schwarz(&p).unwrap().declarer_wins());
}

#[test]
fn test_trick_in_progress() {
    // seat 1 led SA and seat 2 followed with ST: the declarer plays S7
    let p = Position {
        hands: [cards("CJ.S7"), cards("H7"), cards("HK")],
        to_move: 0,
        declarer: 0,
        game_type: GameType::Grand,
        trick: vec![
            Card::parse("SA").unwrap(),
            Card::parse("ST").unwrap(),
        ],
        declarer_points: 0,
        defender_points: 0,
    };
    let mut solver = Solver::new(SolverConfig::default());
    let r = solver.dds(&p, -INF, INF, true, SearchMode::Normal).unwrap();
    assert!(r.declarer_to_move);
    assert_eq!(r.value, 6 - 21);
}

#[test]
fn test_invalid_positions() {
    let mut solver = Solver::new(SolverConfig::default());
    let mut p = position(&TEST_CASES[1]);
    p.hands[2] = cards("SA.HK");
    assert!(matches!(
        solver.dds(&p, -INF, INF, true, SearchMode::Normal),
        Err(SolverError::OverlappingHands(_))
    ));

    let mut p = position(&TEST_CASES[1]);
    p.to_move = 3;
    assert!(matches!(
        solver.dds(&p, -INF, INF, true, SearchMode::Normal),
        Err(SolverError::BadSeat(3))
    ));
}

/// Plain minimax over every legal card; final value for the declarer
fn minimax(p: &Position) -> i32 {
    let values = p.legal_cards().iter().map(|card| match p.play(card).unwrap() {
        Played::Over { declarer_value } => declarer_value,
        Played::Next(next) => minimax(&next),
    });
    let best = if p.to_move == p.declarer {
        values.max()
    } else {
        values.min()
    };
    best.unwrap()
}

/// One to three cards per seat, sometimes inside a trick
fn random_position(rng: &mut StdRng) -> Position {
    let mut deck: Vec<Card> = Cards::ALL.iter().collect();
    deck.shuffle(rng);
    let n = rng.gen_range(1..=3);
    let hands = [0, 1, 2].map(|s| Cards::from_cards(deck[s * n..(s + 1) * n].iter().copied()));
    let mut p = Position {
        hands,
        to_move: rng.gen_range(0..3),
        declarer: rng.gen_range(0..3),
        game_type: GameType::ALL[rng.gen_range(0..GameType::ALL.len())],
        trick: vec![],
        declarer_points: rng.gen_range(0..40),
        defender_points: rng.gen_range(0..40),
    };
    for _ in 0..rng.gen_range(0..3) {
        let legal: Vec<Card> = p.legal_cards().iter().collect();
        let card = legal[rng.gen_range(0..legal.len())];
        if let Played::Next(next) = p.play(card).unwrap() {
            p = next;
        }
    }
    p
}

#[test]
fn test_random_positions_match_minimax() {
    let mut rng = StdRng::seed_from_u64(2024);
    // a single solver, so later positions run against a warm cache
    let mut solver = Solver::new(SolverConfig::default());
    for i in 0..1000 {
        let p = random_position(&mut rng);
        let truth = minimax(&p);
        let full = solver
            .dds(&p, -INF, INF, false, SearchMode::Normal)
            .unwrap();
        if p.game_type.is_null() {
            assert_eq!(full.declarer_wins(), truth > 0, "position {}: {:?}", i, p);
            continue;
        }

        let mover_truth = if p.to_move == p.declarer { truth } else { -truth };
        assert_eq!(full.value, mover_truth, "position {}: {:?}", i, p);
        assert!(full.is_exact());

        let alpha = mover_truth + rng.gen_range(-20..=20);
        let beta = alpha + rng.gen_range(1..=20);
        let r = solver
            .dds(&p, alpha, beta, false, SearchMode::Normal)
            .unwrap();
        let holds = match r.bound {
            BoundKind::Exact => r.value == mover_truth && alpha < r.value && r.value < beta,
            BoundKind::Lower => r.value >= beta && mover_truth >= r.value,
            BoundKind::Upper => r.value <= alpha && mover_truth <= r.value,
        };
        assert!(
            holds,
            "position {}: window ({}, {}) gave {:?}, true value {}",
            i, alpha, beta, r, mover_truth
        );
    }
}

#[test]
fn test_null_sign_independent_of_trick_order() {
    // seat 1 wins a diamond and a heart trick in either order, then leads
    // the S9; the declarer at seat 0 ducks with S7 or is stuck with SA
    for (last, declarer_wins) in [("S7", true), ("SA", false)] {
        let start = Position {
            hands: [
                cards(&format!("D8.H8.{}", last)),
                cards("DA.HA.S9"),
                cards("D7.H7.S8"),
            ],
            to_move: 1,
            declarer: 0,
            game_type: GameType::Null,
            trick: vec![],
            declarer_points: 0,
            defender_points: 0,
        };
        let diamonds_first = ["DA", "D7", "D8", "HA", "H7", "H8"];
        let hearts_first = ["HA", "H7", "H8", "DA", "D7", "D8"];

        let mut warm = Solver::new(SolverConfig::default());
        let mut ends = Vec::new();
        for order in [diamonds_first, hearts_first] {
            let mut p = start.clone();
            for token in order {
                let sign = warm
                    .dds(&p, -INF, INF, false, SearchMode::Normal)
                    .unwrap()
                    .declarer_wins();
                let cold = Solver::new(SolverConfig::default())
                    .dds(&p, -INF, INF, true, SearchMode::Normal)
                    .unwrap()
                    .declarer_wins();
                assert_eq!(sign, declarer_wins, "{} before {}", last, token);
                assert_eq!(cold, sign);
                assert_eq!(minimax(&p) > 0, sign);
                match p.play(Card::parse(token).unwrap()).unwrap() {
                    Played::Next(next) => p = next,
                    Played::Over { .. } => panic!("null game over after {}", token),
                }
            }
            ends.push(p);
        }
        // both orders meet in the same position
        assert_eq!(ends[0], ends[1]);
        assert_eq!(ends[0].to_move, 1);
    }
}
