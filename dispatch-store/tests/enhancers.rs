//! Enhancer composition and middleware ordering

use std::cell::RefCell;
use std::rc::Rc;

use dispatch_store::prelude::*;

#[derive(Action, Clone, Debug, PartialEq)]
#[action(summary)]
enum TraceAction {
    Step,
    Quiet,
}

type Trace = Rc<RefCell<Vec<String>>>;

fn tracer(trace: Trace, label: &'static str) -> Box<dyn Middleware<u32, TraceAction>> {
    Box::new(from_fn::<u32, TraceAction, _>(move |_api, action, next| {
        trace.borrow_mut().push(label.to_string());
        next.run(action)
    }))
}

fn traced_reducer(trace: Trace) -> Reducer<u32, TraceAction> {
    reducer(move |state: &u32, action: &TraceAction| {
        trace.borrow_mut().push("core".to_string());
        match action {
            TraceAction::Step => state + 1,
            TraceAction::Quiet => *state,
        }
    })
}

#[test]
fn test_compose_order() {
    let trace: Trace = Rc::default();
    let store = create_store(
        traced_reducer(trace.clone()),
        0,
        Some(compose(vec![
            apply_middleware(vec![tracer(trace.clone(), "A")]),
            apply_middleware(vec![tracer(trace.clone(), "B")]),
        ])),
    );
    trace.borrow_mut().clear();

    store.dispatch(TraceAction::Step).unwrap();
    assert_eq!(*trace.borrow(), vec!["A", "B", "core"]);
}

#[test]
fn test_middleware_list_order() {
    let trace: Trace = Rc::default();
    let store = create_store(
        traced_reducer(trace.clone()),
        0,
        Some(apply_middleware(vec![
            tracer(trace.clone(), "m1"),
            tracer(trace.clone(), "m2"),
            tracer(trace.clone(), "m3"),
        ])),
    );

    store.dispatch(TraceAction::Step).unwrap();
    assert_eq!(*trace.borrow(), vec!["m1", "m2", "m3", "core"]);
    assert_eq!(*store.get_state().unwrap(), 1);
}

#[test]
fn test_logger_inside_composed_stack() {
    let trace: Trace = Rc::default();
    let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::new(
        10,
        ActionLoggerConfig::new(None, Some("Quiet")),
    ));
    let history = logger.log_handle().unwrap();

    let store = create_store(
        traced_reducer(trace.clone()),
        0,
        Some(compose(vec![
            apply_middleware(vec![Box::new(logger)]),
            apply_middleware(vec![tracer(trace, "inner")]),
        ])),
    );

    store.dispatch(TraceAction::Step).unwrap();
    store.dispatch(TraceAction::Quiet).unwrap();
    store.dispatch(TraceAction::Step).unwrap();

    let history = history.borrow();
    let names: Vec<_> = history.entries().map(|e| e.name).collect();
    assert_eq!(names, vec!["Step", "Step"]);
    assert!(history.entries().all(|e| e.state_changed == Some(true)));
    assert_eq!(*store.get_state().unwrap(), 2);
}
