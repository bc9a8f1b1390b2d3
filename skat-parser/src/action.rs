use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use skat_core::{Action, Card, DeclarationError, GameDeclaration, HistoryError, Move, SimpleGame};
use thiserror::Error;

#[derive(Parser)]
#[grammar = "action.pest"]
pub struct ActionParser;

/// Error turning an action token into an [`Action`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("malformed action '{token}': {message}")]
    Syntax { token: String, message: String },
    #[error("bad declaration in '{token}': {source}")]
    Declaration {
        token: String,
        #[source]
        source: DeclarationError,
    },
    #[error("number out of range in '{0}'")]
    Number(String),
}

/// Error applying a move token to a history
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Parse one move action token
pub fn parse_action(token: &str) -> Result<Action, ActionError> {
    let mut pairs = ActionParser::parse(Rule::action, token).map_err(|e| ActionError::Syntax {
        token: token.to_string(),
        message: e.variant.message().to_string(),
    })?;

    let inner = pairs
        .next()
        .and_then(|action| action.into_inner().next())
        .ok_or_else(|| ActionError::Syntax {
            token: token.to_string(),
            message: "empty input".to_string(),
        })?;

    build_action(inner, token)
}

/// Parse `token` and append it to the history as a move by `source`
pub fn play(game: &mut SimpleGame, source: i32, token: &str) -> Result<(), PlayError> {
    let action = parse_action(token)?;
    game.apply(Move::new(source, token), &action)?;
    Ok(())
}

fn build_action(pair: Pair<Rule>, token: &str) -> Result<Action, ActionError> {
    let number = |s: &str| {
        s.parse::<u32>()
            .map_err(|_| ActionError::Number(token.to_string()))
    };

    match pair.as_rule() {
        Rule::resign => Ok(Action::Resign),
        Rule::pass => Ok(Action::Pass),
        Rule::yes => Ok(Action::Yes),
        Rule::take_skat => Ok(Action::TakeSkat),
        Rule::bid => Ok(Action::Bid(number(pair.as_str())?)),
        Rule::timeout | Rule::left => {
            let is_timeout = pair.as_rule() == Rule::timeout;
            let seat = pair
                .into_inner()
                .next()
                .map(|p| p.as_str())
                .unwrap_or_default();
            let seat = number(seat)? as usize;
            Ok(if is_timeout {
                Action::TimeOut(seat)
            } else {
                Action::Left(seat)
            })
        }
        Rule::show => {
            let cards = pair
                .into_inner()
                .map(|p| card(p, token))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Action::ShowCards(cards))
        }
        Rule::card => Ok(Action::Play(card(pair, token)?)),
        Rule::card_list => {
            let slots = pair
                .into_inner()
                .map(|p| slot(p, token))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Action::Cards(slots))
        }
        Rule::declare => {
            let mut inner = pair.into_inner();
            let game = inner.next().map(|p| p.as_str()).unwrap_or_default();
            let declaration =
                GameDeclaration::parse(game).map_err(|source| ActionError::Declaration {
                    token: token.to_string(),
                    source,
                })?;
            let cards = inner
                .map(|p| slot(p, token))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Action::Declare { declaration, cards })
        }
        rule => Err(ActionError::Syntax {
            token: token.to_string(),
            message: format!("unexpected rule {:?}", rule),
        }),
    }
}

fn card(pair: Pair<Rule>, token: &str) -> Result<Card, ActionError> {
    Card::parse(pair.as_str()).ok_or_else(|| ActionError::Syntax {
        token: token.to_string(),
        message: format!("bad card {}", pair.as_str()),
    })
}

/// A card or "??"
fn slot(pair: Pair<Rule>, token: &str) -> Result<Option<Card>, ActionError> {
    match pair.into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::card => Ok(Some(card(inner, token)?)),
        Some(_) => Ok(None),
        None => Err(ActionError::Syntax {
            token: token.to_string(),
            message: "empty card slot".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skat_core::{GameType, View};

    fn c(s: &str) -> Card {
        Card::parse(s).unwrap()
    }

    #[test]
    fn test_parse_bidding_tokens() {
        assert_eq!(parse_action("18").unwrap(), Action::Bid(18));
        assert_eq!(parse_action("p").unwrap(), Action::Pass);
        assert_eq!(parse_action("y").unwrap(), Action::Yes);
        assert_eq!(parse_action("s").unwrap(), Action::TakeSkat);
        assert_eq!(parse_action("RE").unwrap(), Action::Resign);
    }

    #[test]
    fn test_parse_cards() {
        assert_eq!(parse_action("H8").unwrap(), Action::Play(c("H8")));
        assert_eq!(
            parse_action("D7.??").unwrap(),
            Action::Cards(vec![Some(c("D7")), None])
        );
        assert_eq!(
            parse_action("SC.CJ.SA").unwrap(),
            Action::ShowCards(vec![c("CJ"), c("SA")])
        );
        assert_eq!(parse_action("TI.2").unwrap(), Action::TimeOut(2));
        assert_eq!(parse_action("LE.0").unwrap(), Action::Left(0));
    }

    #[test]
    fn test_parse_declarations() {
        match parse_action("DH").unwrap() {
            Action::Declare { declaration, cards } => {
                assert_eq!(declaration.game_type, Some(GameType::Diamonds));
                assert!(declaration.hand);
                assert!(cards.is_empty());
            }
            other => panic!("expected declaration, got {:?}", other),
        }
        match parse_action("S.C7.??").unwrap() {
            Action::Declare { declaration, cards } => {
                assert_eq!(declaration.game_type, Some(GameType::Spades));
                assert_eq!(cards, vec![Some(c("C7")), None]);
            }
            other => panic!("expected declaration, got {:?}", other),
        }
        assert!(matches!(
            parse_action("GHS").unwrap(),
            Action::Declare { .. }
        ));
    }

    #[test]
    fn test_token_round_trip() {
        for token in ["18", "p", "RE", "HA", "G.D7.D8", "SC.CJ", "NOH", "D7.??"] {
            assert_eq!(parse_action(token).unwrap().to_string(), token);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_action("X1"),
            Err(ActionError::Syntax { .. })
        ));
        assert!(matches!(parse_action(""), Err(ActionError::Syntax { .. })));
        assert!(matches!(
            parse_action("NS"),
            Err(ActionError::Declaration { .. })
        ));
        assert!(matches!(
            parse_action("99999999999"),
            Err(ActionError::Number(_))
        ));
    }

    #[test]
    fn test_play_appends_move() {
        let mut game = SimpleGame::new(View::World);
        let deal: Vec<String> = (0..32)
            .map(|i| Card::from_index(i).unwrap().to_string())
            .collect();
        play(&mut game, -1, &deal.join(".")).unwrap();
        play(&mut game, 1, "18").unwrap();
        assert_eq!(game.num_moves(), 2);
        assert_eq!(game.moves()[1].action, "18");
        let err = play(&mut game, 1, "p").unwrap_err();
        assert!(matches!(err, PlayError::History(_)));
    }
}
