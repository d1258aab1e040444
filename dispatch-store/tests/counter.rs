//! Store core behavior through the public API

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dispatch_store::prelude::*;
use dispatch_store::{Operation, INIT_ACTION};
use serde::{Deserialize, Serialize};

#[derive(Action, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
enum CounterAction {
    #[action(name = "INC")]
    #[serde(rename = "INC")]
    Inc,
    #[action(name = "ADD")]
    #[serde(rename = "ADD")]
    Add { amount: i64 },
}

fn count(state: &i64, action: &CounterAction) -> i64 {
    match action {
        CounterAction::Inc => state + 1,
        CounterAction::Add { amount } => state + amount,
    }
}

#[test]
fn test_three_increments() {
    let store = create_store(reducer(count), 0, None);
    for _ in 0..3 {
        store.dispatch(CounterAction::Inc).unwrap();
    }
    assert_eq!(*store.get_state().unwrap(), 3);
}

#[test]
fn test_dispatch_json() {
    let store = create_store(reducer(count), 0, None);

    let action = store.dispatch_json(r#"{"type":"ADD","amount":4}"#).unwrap();
    assert_eq!(action, CounterAction::Add { amount: 4 });
    store
        .dispatch_value(serde_json::json!({ "type": "INC" }))
        .unwrap();
    assert_eq!(*store.get_state().unwrap(), 5);
}

#[test]
fn test_dispatch_json_rejects_invalid_actions() {
    let store = create_store(reducer(count), 0, None);
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let _sub = store.subscribe(move || c.set(c.get() + 1)).unwrap();

    let reserved = format!(r#"{{"type":"{INIT_ACTION}"}}"#);
    for bad in [
        r#""INC""#,
        r#"{"amount":1}"#,
        r#"{"type":7}"#,
        r#"{"type":"NOPE"}"#,
        reserved.as_str(),
        "not json",
    ] {
        let err = store.dispatch_json(bad).unwrap_err();
        assert!(
            matches!(err, StoreError::InvalidAction(_)),
            "{bad}: {err:?}"
        );
    }

    assert_eq!(calls.get(), 0);
    assert_eq!(*store.get_state().unwrap(), 0);
}

#[test]
fn test_listeners_see_new_state() {
    let store = create_store(reducer(count), 10, None);
    let seen = Rc::new(RefCell::new(Vec::new()));

    let handle = store.handle();
    let s = seen.clone();
    let subscription = store
        .subscribe(move || s.borrow_mut().push(*handle.get_state().unwrap()))
        .unwrap();

    store.dispatch(CounterAction::Inc).unwrap();
    store.dispatch(CounterAction::Add { amount: -5 }).unwrap();
    subscription.unsubscribe().unwrap();
    store.dispatch(CounterAction::Inc).unwrap();

    assert_eq!(*seen.borrow(), vec![11, 6]);
}

#[test]
fn test_reducer_cannot_reach_store() {
    let store = create_store(reducer(count), 0, None);
    let handle = store.handle();
    let error = Rc::new(RefCell::new(None));

    let e = error.clone();
    store
        .replace_reducer(reducer(move |state: &i64, _: &CounterAction| {
            *e.borrow_mut() = handle.get_state().err();
            *state
        }))
        .unwrap();
    *error.borrow_mut() = None;

    store.dispatch(CounterAction::Inc).unwrap();
    assert_eq!(
        *error.borrow(),
        Some(StoreError::Reentrant(Operation::GetState))
    );
    assert!(store.get_state().is_ok());
}
