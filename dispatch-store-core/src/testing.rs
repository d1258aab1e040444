//! Test utilities for stores, middleware and runtimes
//!
//! - [`RecordingMiddleware`]: records every action that enters the chain
//! - [`TestHarness`]: a [`DispatchRuntime`] with a recorder installed first
//! - Assertion macros over lists of actions
//!
//! # Example
//!
//! ```ignore
//! use dispatch_store::testing::TestHarness;
//!
//! let mut harness = TestHarness::new(0, reducer(counter));
//! harness.dispatch(Action::Increment).unwrap();
//! assert_eq!(*harness.state(), 1);
//!
//! let seen = harness.recorded();
//! assert_emitted!(seen, Action::Increment);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::action::Action;
use crate::enhancer::create_store;
use crate::error::StoreError;
use crate::middleware::{apply_middleware, Middleware, MiddlewareApi, Next};
use crate::runtime::{ActionSender, DispatchRuntime};
use crate::store::{Reducer, Store};

/// Shared list of actions seen by a [`RecordingMiddleware`].
#[derive(Debug)]
pub struct ActionRecorder<A> {
    actions: Rc<RefCell<Vec<A>>>,
}

impl<A> Clone for ActionRecorder<A> {
    fn clone(&self) -> Self {
        Self {
            actions: Rc::clone(&self.actions),
        }
    }
}

impl<A> Default for ActionRecorder<A> {
    fn default() -> Self {
        Self {
            actions: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<A: Clone> ActionRecorder<A> {
    /// Copy of everything recorded so far, oldest first.
    pub fn actions(&self) -> Vec<A> {
        self.actions.borrow().clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<A> {
        std::mem::take(&mut *self.actions.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.actions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.actions.borrow_mut().clear();
    }
}

/// Middleware that records each action, then forwards it unchanged.
pub struct RecordingMiddleware<A> {
    recorder: ActionRecorder<A>,
}

impl<A> Default for RecordingMiddleware<A> {
    fn default() -> Self {
        Self {
            recorder: ActionRecorder::default(),
        }
    }
}

impl<A> RecordingMiddleware<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> ActionRecorder<A> {
        self.recorder.clone()
    }
}

impl<S, A: Action> Middleware<S, A> for RecordingMiddleware<A> {
    fn handle(
        &self,
        _api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        self.recorder.actions.borrow_mut().push(action.clone());
        next.run(action)
    }
}

/// Runtime-backed harness for store tests.
///
/// A [`RecordingMiddleware`] sits first in the chain, so [`recorded`]
/// lists every action dispatched through the store, including ones that
/// later middleware consume. Actions sent to the runtime queue (by
/// background workers or [`emit`]) stay queued until drained or dispatched.
///
/// [`recorded`]: TestHarness::recorded
/// [`emit`]: TestHarness::emit
pub struct TestHarness<S, A> {
    runtime: DispatchRuntime<S, A>,
    recorder: ActionRecorder<A>,
}

impl<S: 'static, A: Action> TestHarness<S, A> {
    /// Harness around a store with no middleware besides the recorder.
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        Self::build(state, reducer, |_| Vec::new())
    }

    /// Harness whose middleware is built from the runtime's sender.
    pub fn build<F>(state: S, reducer: Reducer<S, A>, middleware: F) -> Self
    where
        F: FnOnce(ActionSender<A>) -> Vec<Box<dyn Middleware<S, A>>>,
    {
        let recording = RecordingMiddleware::new();
        let recorder = recording.recorder();
        let runtime = DispatchRuntime::build(|action_tx| {
            let mut chain: Vec<Box<dyn Middleware<S, A>>> = vec![Box::new(recording)];
            chain.extend(middleware(action_tx));
            create_store(reducer, state, Some(apply_middleware(chain)))
        });
        Self { runtime, recorder }
    }

    pub fn store(&self) -> &Store<S, A> {
        self.runtime.store()
    }

    pub fn runtime(&mut self) -> &mut DispatchRuntime<S, A> {
        &mut self.runtime
    }

    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.runtime.dispatch(action)
    }

    /// Current state.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a reducer.
    pub fn state(&self) -> Arc<S> {
        self.runtime
            .state()
            .unwrap_or_else(|e| panic!("TestHarness::state failed: {e}"))
    }

    /// Actions that entered the middleware chain, oldest first.
    pub fn recorded(&self) -> Vec<A> {
        self.recorder.actions()
    }

    /// Remove and return recorded actions.
    pub fn take_recorded(&self) -> Vec<A> {
        self.recorder.take()
    }

    pub fn sender(&self) -> ActionSender<A> {
        self.runtime.action_tx()
    }

    /// Queue an action as a background task would.
    pub fn emit(&self, action: A) {
        self.runtime.enqueue(action);
    }

    /// Remove queued actions without dispatching them.
    pub fn drain_emitted(&mut self) -> Vec<A> {
        self.runtime.take_pending()
    }

    /// Dispatch everything queued, returning how many actions ran.
    pub fn settle(&mut self) -> Result<usize, StoreError> {
        self.runtime.drain_pending()
    }

    /// Wait up to `timeout` for the next queued action, without dispatching.
    pub async fn next_emitted(&mut self, timeout: Duration) -> Option<A> {
        tokio::time::timeout(timeout, self.runtime.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next queued action and dispatch it.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives within `timeout`.
    pub async fn dispatch_next(&mut self, timeout: Duration) -> Result<A, StoreError> {
        match tokio::time::timeout(timeout, self.runtime.process_next()).await {
            Ok(Some(result)) => result,
            Ok(None) => panic!("action queue closed"),
            Err(_) => panic!("no action queued within {timeout:?}"),
        }
    }
}

/// Assert that an action matching a pattern is in the list.
///
/// # Example
///
/// ```ignore
/// let actions = harness.recorded();
/// assert_emitted!(actions, Action::SetNumRounds(5));
/// assert_emitted!(actions, Action::SetNumRounds(n) if *n > 3);
/// ```
#[macro_export]
macro_rules! assert_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "no action matching `{}` in {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action matching a pattern is in the list.
#[macro_export]
macro_rules! assert_not_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "unexpected action matching `{}` in {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// First action matching a pattern, as `Option<&A>`.
#[macro_export]
macro_rules! find_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().find(|a| matches!(a, $pattern $(if $guard)?))
    };
}

/// Number of actions matching a pattern.
#[macro_export]
macro_rules! count_emitted {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions
            .iter()
            .filter(|a| matches!(a, $pattern $(if $guard)?))
            .count()
    };
}
