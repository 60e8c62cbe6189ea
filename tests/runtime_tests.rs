/// Session integration tests: playing compiled scripts end to end.

use narrative_script::core::compiler::compile;
use narrative_script::core::config::EngineConfig;
use narrative_script::core::runtime::{Outcome, RuntimeFault, Session, SessionEvent, SessionState};
use narrative_script::schema::value::Value;
use pretty_assertions::assert_eq;
use std::path::Path;

fn coffee_shop() -> Session {
    let source = std::fs::read_to_string("scripts/coffee_shop.ink").unwrap();
    Session::builder(compile(&source)).build()
}

#[test]
fn buy_sets_coins_and_ends() {
    let source = std::fs::read_to_string("tests/fixtures/buy_or_leave.ink").unwrap();
    let mut session = Session::builder(compile(&source)).build();

    let turn = session.start().unwrap();
    let labels: Vec<_> = turn.choices().iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Buy", "Leave"]);

    let turn = session.choose(0).unwrap();
    assert_eq!(turn.outcome, Outcome::Ended);
    assert_eq!(session.var("coins"), Some(&Value::Int(1)));
    assert_eq!(session.state(), &SessionState::Ended);
}

#[test]
fn espresso_path() {
    let mut session = coffee_shop();

    let turn = session.start().unwrap();
    assert_eq!(
        turn.events[0],
        SessionEvent::Passage {
            step: "start".to_string(),
            speaker: Some("Barista".to_string()),
            text: "Morning, stranger! You have 3 coins.".to_string(),
        }
    );
    assert_eq!(turn.choices().len(), 4);

    let turn = session.choose_id("opt_1").unwrap();
    assert!(turn.events.contains(&SessionEvent::ExternalCall {
        name: "play_sound".to_string(),
        args: "\"bell\"".to_string(),
    }));
    assert_eq!(turn.choices().len(), 3);

    let turn = session.choose(0).unwrap();
    assert_eq!(
        turn.passages().collect::<Vec<_>>(),
        vec![
            "One espresso. See you tomorrow.",
            "You step out into the street with 1 coins."
        ]
    );
    assert_eq!(turn.outcome, Outcome::Ended);
    assert_eq!(session.var("cups"), Some(&Value::Int(1)));
    assert_eq!(session.var("regular"), Some(&Value::Bool(true)));
    assert_eq!(
        session.history(),
        &["start", "counter", "counter.espresso", "leave"]
    );
}

#[test]
fn fallthrough_menu_returns_to_start() {
    let mut session = coffee_shop();
    session.start().unwrap();

    let turn = session.choose(1).unwrap();
    assert_eq!(
        turn.passages().collect::<Vec<_>>(),
        vec![
            "Light, medium or dark. All roasted on Tuesdays.",
            "Morning, stranger! You have 3 coins."
        ]
    );
    assert_eq!(
        &session.history()[1..],
        &["menu", "menu.beans", "start"]
    );
}

#[test]
fn repeatable_wallet_stays_available() {
    let mut session = coffee_shop();
    session.start().unwrap();

    let turn = session.choose(2).unwrap();
    assert_eq!(
        turn.passages().next(),
        Some("You count 3 coins. Plenty.")
    );
    assert_eq!(turn.choices().len(), 4);
    assert_eq!(turn.choices()[2].label, "Check your wallet");
}

#[test]
fn consumed_options_disappear() {
    let mut session = coffee_shop();
    session.start().unwrap();
    session.choose(0).unwrap();

    // "Nothing, sorry" is repeatable; "Order a coffee" is now consumed.
    let turn = session.choose(2).unwrap();
    let labels: Vec<_> = turn.choices().iter().map(|o| o.label.as_str()).collect();
    assert_eq!(labels, vec!["Ask about the roasts", "Check your wallet", "Leave"]);
}

#[test]
fn config_from_fixture_limits_diverts() {
    let config = EngineConfig::load_from_ron(Path::new("tests/fixtures/engine.ron")).unwrap();
    assert_eq!(config.max_auto_steps, 16);
    assert_eq!(config.max_expr_len, 256);

    let ir = compile("=== start ===\n-> a\n=== a ===\n-> b\n=== b ===\n-> a");
    let mut session = Session::builder(ir).config(config).build();
    let turn = session.start().unwrap();
    assert!(matches!(
        turn.outcome,
        Outcome::Fault(RuntimeFault::DivertLimit { limit: 16, .. })
    ));
    assert!(session.is_finished());
}

#[test]
fn custom_entry() {
    let ir = compile("=== start ===\n-> END\n=== epilogue ===\nLater.\n-> END");
    let config = EngineConfig {
        entry: "epilogue".to_string(),
        ..EngineConfig::default()
    };
    let mut session = Session::builder(ir).config(config).build();
    let turn = session.start().unwrap();
    assert_eq!(turn.passages().collect::<Vec<_>>(), vec!["Later."]);
}

#[test]
fn rejected_condition_reads_false() {
    let ir = compile("VAR x = 4\n=== start ===\n{x % 2 ? even | odd}\n-> END");
    let mut session = Session::builder(ir).build();
    let turn = session.start().unwrap();
    assert_eq!(turn.passages().collect::<Vec<_>>(), vec!["odd"]);
}

#[test]
fn overflowing_division_is_skipped_not_fatal() {
    let ir = compile(
        "VAR x = 5\n=== start ===\n~ x = (-9223372036854775807 - 1) / -1\n{(-9223372036854775807 - 1) / -1 > 0 ? big | safe} {x}\n-> END",
    );
    let mut session = Session::builder(ir).build();
    let turn = session.start().unwrap();
    assert!(matches!(turn.events[0], SessionEvent::ActionSkipped { .. }));
    assert_eq!(turn.passages().collect::<Vec<_>>(), vec!["safe 5"]);
    assert_eq!(session.var("x"), Some(&Value::Int(5)));
    assert_eq!(turn.outcome, Outcome::Ended);
}
