//! A clubs game replayed from any seat's view

use skat_core::{Card, Cards, SimpleGame, View};
use skat_parser::play;

pub(crate) const HANDS: [&str; 3] = [
    "CJ.SJ.CA.CT.CK.CQ.C9.SA.ST.HA",
    "HJ.DJ.C8.C7.SK.SQ.HT.HK.HQ.DA",
    "S9.S8.S7.H9.H8.H7.DT.DK.DQ.D9",
];
pub(crate) const SKAT: &str = "D8.D7";

/// Forehand wins the first five tricks, then leads D7
pub(crate) const CARDPLAY: [&str; 17] = [
    "SA", "SK", "S7", "CA", "C7", "D9", "CJ", "C8", "H7", "SJ", "DJ", "H8", "ST", "SQ", "S8",
    "D7", "DA",
];

pub(crate) fn cards(s: &str) -> Cards {
    s.split('.').filter_map(Card::parse).collect()
}

fn hidden(cards: &str) -> String {
    cards.split('.').map(|_| "??").collect::<Vec<_>>().join(".")
}

fn shown(view: View, seat: usize, cards: &str) -> String {
    if view.sees(seat) {
        cards.to_string()
    } else {
        hidden(cards)
    }
}

/// Deal, bidding, skat pickup, clubs declaration and the first `n` cards.
/// Forehand declares; every trick so far goes to forehand.
pub(crate) fn game(view: View, n: usize) -> SimpleGame {
    let mut deal: Vec<String> = (0..3).map(|s| shown(view, s, HANDS[s])).collect();
    deal.push(if view == View::World {
        SKAT.to_string()
    } else {
        hidden(SKAT)
    });

    let mut game = SimpleGame::new(view);
    play(&mut game, -1, &deal.join(".")).unwrap();
    play(&mut game, 1, "p").unwrap();
    play(&mut game, 2, "p").unwrap();
    play(&mut game, 0, "18").unwrap();
    play(&mut game, 0, "s").unwrap();
    play(&mut game, -1, &shown(view, 0, SKAT)).unwrap();
    let declaration = if view.sees(0) { "C.HA.D8" } else { "C.??.??" };
    play(&mut game, 0, declaration).unwrap();
    for (i, card) in CARDPLAY.iter().take(n).enumerate() {
        play(&mut game, (i % 3) as i32, card).unwrap();
    }
    game
}
