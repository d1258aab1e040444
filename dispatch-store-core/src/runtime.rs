//! Single owning dispatch loop for a store.
//!
//! The store is single-threaded. Anything that finishes elsewhere (a Tokio
//! task, a blocking persistence call) sends its result as an action through
//! an [`ActionSender`]; the runtime receives it on the store's thread and
//! dispatches it as a new top-level action. Nothing outside the runtime
//! touches the state directly.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::error::StoreError;
use crate::store::Store;

/// Sending half of the runtime's action queue. Cheap to clone and `Send`.
pub type ActionSender<A> = mpsc::UnboundedSender<A>;

/// Receiving half of the runtime's action queue.
pub type ActionReceiver<A> = mpsc::UnboundedReceiver<A>;

/// Create an action queue.
pub fn action_channel<A>() -> (ActionSender<A>, ActionReceiver<A>) {
    mpsc::unbounded_channel()
}

/// Owns a store and serializes every queued action into it.
///
/// # Example
/// ```ignore
/// let mut runtime = DispatchRuntime::build(|action_tx| {
///     let settings = SettingsMiddleware::spawn(repository, action_tx, SettingsConfig::default());
///     create_store(reducer, AppState::default(), Some(apply_middleware(vec![Box::new(settings)])))
/// });
///
/// runtime.dispatch(AppAction::SettingsLoadAll)?;
/// runtime.run(cancel, |action| matches!(action, AppAction::Quit)).await?;
/// ```
pub struct DispatchRuntime<S, A> {
    store: Store<S, A>,
    action_tx: ActionSender<A>,
    action_rx: ActionReceiver<A>,
}

impl<S: 'static, A: Action> DispatchRuntime<S, A> {
    /// Create a runtime from an existing store with a fresh queue.
    pub fn from_store(store: Store<S, A>) -> Self {
        let (action_tx, action_rx) = action_channel();
        Self::with_channel(store, action_tx, action_rx)
    }

    /// Create a runtime from a store and a queue created beforehand.
    ///
    /// Use this when middleware needs the sender before the store exists.
    pub fn with_channel(
        store: Store<S, A>,
        action_tx: ActionSender<A>,
        action_rx: ActionReceiver<A>,
    ) -> Self {
        Self {
            store,
            action_tx,
            action_rx,
        }
    }

    /// Create the queue first, then the store from its sender.
    pub fn build<F>(make_store: F) -> Self
    where
        F: FnOnce(ActionSender<A>) -> Store<S, A>,
    {
        let (action_tx, action_rx) = action_channel();
        let store = make_store(action_tx.clone());
        Self::with_channel(store, action_tx, action_rx)
    }

    /// Send an action into the runtime queue.
    pub fn enqueue(&self, action: A) {
        let _ = self.action_tx.send(action);
    }

    /// Clone the action sender.
    pub fn action_tx(&self) -> ActionSender<A> {
        self.action_tx.clone()
    }

    /// The owned store.
    pub fn store(&self) -> &Store<S, A> {
        &self.store
    }

    /// Current state snapshot.
    pub fn state(&self) -> Result<Arc<S>, StoreError> {
        self.store.get_state()
    }

    /// Dispatch immediately, bypassing the queue.
    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.store.dispatch(action)
    }

    /// Dispatch everything already queued, without waiting for more.
    ///
    /// Returns how many actions were dispatched.
    pub fn drain_pending(&mut self) -> Result<usize, StoreError> {
        let mut dispatched = 0;
        while let Ok(action) = self.action_rx.try_recv() {
            self.store.dispatch(action)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Remove everything already queued without dispatching it.
    pub fn take_pending(&mut self) -> Vec<A> {
        let mut pending = Vec::new();
        while let Ok(action) = self.action_rx.try_recv() {
            pending.push(action);
        }
        pending
    }

    /// Wait for the next queued action without dispatching it.
    pub async fn recv(&mut self) -> Option<A> {
        self.action_rx.recv().await
    }

    /// Wait for the next queued action and dispatch it.
    ///
    /// Returns `None` once every sender is gone, which cannot happen while the
    /// runtime itself is alive.
    pub async fn process_next(&mut self) -> Option<Result<A, StoreError>> {
        let action = self.action_rx.recv().await?;
        Some(self.store.dispatch(action))
    }

    /// Dispatch queued actions until `cancel` fires or `should_quit` matches.
    ///
    /// The quitting action is not dispatched. A dispatch error stops the loop
    /// and is returned.
    pub async fn run<FQuit>(
        &mut self,
        cancel: CancellationToken,
        mut should_quit: FQuit,
    ) -> Result<(), StoreError>
    where
        FQuit: FnMut(&A) -> bool,
    {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Dispatch runtime cancelled");
                    break;
                }

                Some(action) = self.action_rx.recv() => {
                    if should_quit(&action) {
                        tracing::debug!(action = %action.name(), "Dispatch runtime quitting");
                        break;
                    }
                    self.store.dispatch(action)?;
                }

                else => {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Consume the runtime and return the store.
    pub fn into_store(self) -> Store<S, A> {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::reducer;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Add(i32),
        Quit,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Add(_) => "Add",
                TestAction::Quit => "Quit",
            }
        }
    }

    fn runtime() -> DispatchRuntime<i32, TestAction> {
        DispatchRuntime::from_store(Store::new(
            0,
            reducer(|state: &i32, action: &TestAction| match action {
                TestAction::Add(n) => state + n,
                TestAction::Quit => *state,
            }),
        ))
    }

    #[test]
    fn test_drain_pending() {
        let mut runtime = runtime();
        runtime.enqueue(TestAction::Add(1));
        runtime.enqueue(TestAction::Add(2));

        assert_eq!(*runtime.state().unwrap(), 0);
        assert_eq!(runtime.drain_pending().unwrap(), 2);
        assert_eq!(*runtime.state().unwrap(), 3);
        assert_eq!(runtime.drain_pending().unwrap(), 0);
    }

    #[test]
    fn test_take_pending_does_not_dispatch() {
        let mut runtime = runtime();
        runtime.enqueue(TestAction::Add(4));
        assert_eq!(runtime.take_pending(), vec![TestAction::Add(4)]);
        assert_eq!(*runtime.state().unwrap(), 0);
        assert_eq!(runtime.drain_pending().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_background_task_result_is_dispatched() {
        let mut runtime = runtime();
        let calls = Rc::new(Cell::new(0));
        let c = calls.clone();
        runtime.store().subscribe(move || c.set(c.get() + 1)).unwrap();

        let tx = runtime.action_tx();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = tx.send(TestAction::Add(7));
        });

        let result = tokio::time::timeout(Duration::from_secs(5), runtime.process_next())
            .await
            .expect("timed out");
        assert_eq!(result, Some(Ok(TestAction::Add(7))));
        assert_eq!(*runtime.state().unwrap(), 7);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_quit() {
        let mut runtime = runtime();
        runtime.enqueue(TestAction::Add(2));
        runtime.enqueue(TestAction::Quit);
        runtime.enqueue(TestAction::Add(40));

        runtime
            .run(CancellationToken::new(), |action| *action == TestAction::Quit)
            .await
            .unwrap();
        assert_eq!(*runtime.state().unwrap(), 2);

        // Actions after the quit stay queued.
        assert_eq!(runtime.drain_pending().unwrap(), 1);
        assert_eq!(*runtime.state().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut runtime = runtime();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), runtime.run(cancel, |_| false))
            .await
            .expect("timed out")
            .unwrap();
    }

    #[test]
    fn test_build_hands_sender_to_store_factory() {
        let mut runtime = DispatchRuntime::build(|tx: ActionSender<TestAction>| {
            tx.send(TestAction::Add(5)).unwrap();
            Store::new(
                1,
                reducer(|state: &i32, action: &TestAction| match action {
                    TestAction::Add(n) => state * n,
                    TestAction::Quit => *state,
                }),
            )
        });
        runtime.drain_pending().unwrap();
        assert_eq!(*runtime.into_store().get_state().unwrap(), 5);
    }
}
