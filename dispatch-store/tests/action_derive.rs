//! Tests for #[derive(Action)]

use dispatch_store::{Action, ActionSummary};

#[derive(Action, Clone, Debug)]
#[action(summary)]
enum GameAction {
    Start,
    #[action(name = "SET_NUM_ROUNDS")]
    SetNumRounds(u32),
    Answer { index: usize },
}

#[test]
fn test_names_default_to_variant() {
    assert_eq!(GameAction::Start.name(), "Start");
    assert_eq!(GameAction::Answer { index: 2 }.name(), "Answer");
}

#[test]
fn test_name_override() {
    assert_eq!(GameAction::SetNumRounds(5).name(), "SET_NUM_ROUNDS");
}

#[test]
fn test_action_names_in_declaration_order() {
    assert_eq!(
        GameAction::ACTION_NAMES,
        &["Start", "SET_NUM_ROUNDS", "Answer"]
    );
}

#[test]
fn test_summary_uses_debug() {
    assert_eq!(GameAction::SetNumRounds(5).summary(), "SetNumRounds(5)");
}

#[test]
fn test_generic_enum() {
    #[derive(Action, Clone, Debug)]
    enum Wrapped<T: Clone + std::fmt::Debug + Send + 'static> {
        Value(T),
        Empty,
    }

    assert_eq!(Wrapped::Value(1u8).name(), "Value");
    assert_eq!(Wrapped::<u8>::Empty.name(), "Empty");
}

#[test]
fn test_names_ignore_variant_fields() {
    #[derive(Action, Clone, Debug)]
    enum Shapes {
        Point,
        Pair(u8, String),
        Rect { width: u32, height: u32 },
    }

    let names: Vec<&str> = [
        Shapes::Point,
        Shapes::Pair(1, "a".into()),
        Shapes::Rect { width: 2, height: 3 },
    ]
    .iter()
    .map(Action::name)
    .collect();
    assert_eq!(names, vec!["Point", "Pair", "Rect"]);
}
