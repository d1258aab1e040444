//! Centralized state store with reducer pattern

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::action::{parse_action, Action, StoreAction};
use crate::error::{Operation, StoreError};

/// A pure function computing the next state from the current state and an action
///
/// Reducers must be total: actions they do not recognize, including the
/// reserved [`StoreAction::Init`] and [`StoreAction::ReplaceReducer`], return
/// the input state unchanged.
pub type Reducer<S, A> = Rc<dyn Fn(&S, &StoreAction<A>) -> S>;

/// Build a [`Reducer`] from an application-level reducer.
///
/// Reserved store actions return a clone of the current state.
///
/// # Example
/// ```ignore
/// let counter = reducer(|count: &i32, action: &CounterAction| match action {
///     CounterAction::Inc => count + 1,
///     CounterAction::Reset => 0,
/// });
/// ```
pub fn reducer<S, A, F>(f: F) -> Reducer<S, A>
where
    S: Clone + 'static,
    A: 'static,
    F: Fn(&S, &A) -> S + 'static,
{
    Rc::new(move |state: &S, action: &StoreAction<A>| match action {
        StoreAction::App(action) => f(state, action),
        StoreAction::Init | StoreAction::ReplaceReducer => state.clone(),
    })
}

/// Build a [`Reducer`] that also sees the reserved store actions.
pub fn reducer_fn<S, A, F>(f: F) -> Reducer<S, A>
where
    F: Fn(&S, &StoreAction<A>) -> S + 'static,
{
    Rc::new(f)
}

/// Anything that accepts actions: the store core, a middleware chain, or a
/// dispatcher installed by a custom enhancer.
pub trait Dispatch<A> {
    /// Dispatch an action, returning the action handed back by the chain.
    fn dispatch(&self, action: A) -> Result<A, StoreError>;
}

#[derive(Clone)]
struct ListenerEntry {
    id: u64,
    callback: Rc<dyn Fn()>,
}

/// Clears the in-dispatch flag on every exit path, including reducer panics.
struct DispatchGuard<'a>(&'a Cell<bool>);

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// State, reducer and listener registry shared by a store and its handles.
pub(crate) struct StoreCore<S, A> {
    state: RefCell<Arc<S>>,
    reducer: RefCell<Reducer<S, A>>,
    // Copy-on-write: dispatch iterates a cloned `Rc`, so changes made by
    // listeners land in a fresh vector and apply from the next dispatch.
    listeners: RefCell<Rc<Vec<ListenerEntry>>>,
    next_listener_id: Cell<u64>,
    is_dispatching: Cell<bool>,
}

impl<S: 'static, A: Action> StoreCore<S, A> {
    fn new(state: S, reducer: Reducer<S, A>) -> Rc<Self> {
        let core = Rc::new(Self {
            state: RefCell::new(Arc::new(state)),
            reducer: RefCell::new(reducer),
            listeners: RefCell::new(Rc::new(Vec::new())),
            next_listener_id: Cell::new(0),
            is_dispatching: Cell::new(false),
        });
        core.apply(&StoreAction::Init);
        core
    }

    pub(crate) fn check(&self, operation: Operation) -> Result<(), StoreError> {
        if self.is_dispatching.get() {
            Err(StoreError::Reentrant(operation))
        } else {
            Ok(())
        }
    }

    pub(crate) fn get_state(&self) -> Result<Arc<S>, StoreError> {
        self.check(Operation::GetState)?;
        Ok(Arc::clone(&self.state.borrow()))
    }

    fn subscribe(self: &Rc<Self>, callback: Rc<dyn Fn()>) -> Result<Subscription, StoreError> {
        self.check(Operation::Subscribe)?;

        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        Rc::make_mut(&mut self.listeners.borrow_mut()).push(ListenerEntry { id, callback });

        let registry: Rc<dyn ListenerRegistry> = self.clone();
        Ok(Subscription {
            id,
            registry: Rc::downgrade(&registry),
            active: Cell::new(true),
        })
    }

    fn replace_reducer(&self, reducer: Reducer<S, A>) -> Result<(), StoreError> {
        self.check(Operation::ReplaceReducer)?;
        *self.reducer.borrow_mut() = reducer;
        self.apply(&StoreAction::ReplaceReducer);
        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Run the reducer and notify listeners. Callers check the guard first.
    fn apply(&self, action: &StoreAction<A>) {
        let reducer = Rc::clone(&self.reducer.borrow());
        let current = Arc::clone(&self.state.borrow());

        let next = {
            let _guard = DispatchGuard::enter(&self.is_dispatching);
            reducer(&current, action)
        };
        *self.state.borrow_mut() = Arc::new(next);

        let listeners = Rc::clone(&self.listeners.borrow());
        tracing::trace!(
            action = %action.name(),
            listeners = listeners.len(),
            "State replaced"
        );
        for entry in listeners.iter() {
            (entry.callback)();
        }
    }
}

impl<S: 'static, A: Action> Dispatch<A> for StoreCore<S, A> {
    fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.check(Operation::Dispatch)?;
        self.apply(&StoreAction::App(action.clone()));
        Ok(action)
    }
}

trait ListenerRegistry {
    fn remove_listener(&self, id: u64) -> Result<(), StoreError>;
}

impl<S: 'static, A: Action> ListenerRegistry for StoreCore<S, A> {
    fn remove_listener(&self, id: u64) -> Result<(), StoreError> {
        self.check(Operation::Unsubscribe)?;
        Rc::make_mut(&mut self.listeners.borrow_mut()).retain(|entry| entry.id != id);
        Ok(())
    }
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping it does not remove the listener; call [`unsubscribe`](Self::unsubscribe).
pub struct Subscription {
    id: u64,
    registry: Weak<dyn ListenerRegistry>,
    active: Cell<bool>,
}

impl Subscription {
    /// Remove the listener.
    ///
    /// Calling this again, or after the store is gone, does nothing. Fails only
    /// when called from inside a reducer.
    pub fn unsubscribe(&self) -> Result<(), StoreError> {
        if !self.active.get() {
            return Ok(());
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(self.id)?;
        }
        self.active.set(false);
        Ok(())
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.active.get() && self.registry.strong_count() > 0
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Centralized state store with Redux-like reducer pattern
///
/// The store holds the application state and provides a single point
/// for state changes through the `dispatch` method. It is not `Clone`: one
/// store owns the state and the listener set. Code that needs to reach the
/// store later takes a [`StoreHandle`].
///
/// The store is single-threaded (`!Send`). Work finishing on other threads
/// comes back as actions through a
/// [`DispatchRuntime`](crate::runtime::DispatchRuntime).
///
/// # Type Parameters
/// * `S` - The application state type
/// * `A` - The action type (must implement `Action`)
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// enum CounterAction {
///     Inc,
///     Dec,
/// }
///
/// let store = Store::new(0, reducer(|count: &i32, action: &CounterAction| match action {
///     CounterAction::Inc => count + 1,
///     CounterAction::Dec => count - 1,
/// }));
/// store.dispatch(CounterAction::Inc)?;
/// assert_eq!(*store.get_state()?, 1);
/// ```
pub struct Store<S, A> {
    core: Rc<StoreCore<S, A>>,
    dispatcher: Rc<dyn Dispatch<A>>,
}

impl<S: 'static, A: Action> Store<S, A> {
    /// Create a store without enhancers.
    ///
    /// The reducer receives [`StoreAction::Init`] before this returns.
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        let core = StoreCore::new(state, reducer);
        let dispatcher: Rc<dyn Dispatch<A>> = core.clone();
        Self { core, dispatcher }
    }

    /// Dispatch an action through the installed chain.
    ///
    /// Returns the action the chain hands back, normally the one passed in.
    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.dispatcher.dispatch(action)
    }

    /// Dispatch an action received as JSON data.
    pub fn dispatch_value(&self, value: Value) -> Result<A, StoreError>
    where
        A: DeserializeOwned,
    {
        self.dispatch(parse_action(value)?)
    }

    /// Dispatch an action received as a JSON string.
    pub fn dispatch_json(&self, json: &str) -> Result<A, StoreError>
    where
        A: DeserializeOwned,
    {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| StoreError::InvalidAction(format!("malformed JSON: {e}")))?;
        self.dispatch_value(value)
    }

    /// Current state snapshot.
    pub fn get_state(&self) -> Result<Arc<S>, StoreError> {
        self.core.get_state()
    }

    /// Register a listener called after every dispatch.
    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + 'static,
    {
        self.core.subscribe(Rc::new(listener))
    }

    /// Swap the reducer and dispatch [`StoreAction::ReplaceReducer`].
    pub fn replace_reducer(&self, reducer: Reducer<S, A>) -> Result<(), StoreError> {
        self.core.replace_reducer(reducer)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.core.listener_count()
    }

    /// Weak handle for code that must reach this store later.
    ///
    /// Take handles from the fully enhanced store: a handle keeps using the
    /// dispatcher that was installed when it was created.
    pub fn handle(&self) -> StoreHandle<S, A> {
        StoreHandle {
            core: Rc::downgrade(&self.core),
            dispatcher: Rc::downgrade(&self.dispatcher),
        }
    }

    /// The dispatcher external `dispatch` calls go through.
    pub fn dispatcher(&self) -> Rc<dyn Dispatch<A>> {
        Rc::clone(&self.dispatcher)
    }

    /// Return this store with its dispatcher replaced. Used by enhancers.
    pub fn with_dispatcher(self, dispatcher: Rc<dyn Dispatch<A>>) -> Self {
        Self {
            core: self.core,
            dispatcher,
        }
    }

    pub(crate) fn core(&self) -> Rc<StoreCore<S, A>> {
        Rc::clone(&self.core)
    }
}

impl<S, A> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("listeners", &self.core.listeners.borrow().len())
            .field("is_dispatching", &self.core.is_dispatching.get())
            .finish()
    }
}

/// Weak, cloneable access to a [`Store`].
///
/// Every operation fails with [`StoreError::StoreDropped`] once the store is gone.
pub struct StoreHandle<S, A> {
    core: Weak<StoreCore<S, A>>,
    dispatcher: Weak<dyn Dispatch<A>>,
}

impl<S, A> Clone for StoreHandle<S, A> {
    fn clone(&self) -> Self {
        Self {
            core: Weak::clone(&self.core),
            dispatcher: Weak::clone(&self.dispatcher),
        }
    }
}

impl<S: 'static, A: Action> StoreHandle<S, A> {
    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.dispatcher
            .upgrade()
            .ok_or(StoreError::StoreDropped)?
            .dispatch(action)
    }

    pub fn get_state(&self) -> Result<Arc<S>, StoreError> {
        self.core
            .upgrade()
            .ok_or(StoreError::StoreDropped)?
            .get_state()
    }

    pub fn subscribe<F>(&self, listener: F) -> Result<Subscription, StoreError>
    where
        F: Fn() + 'static,
    {
        self.core
            .upgrade()
            .ok_or(StoreError::StoreDropped)?
            .subscribe(Rc::new(listener))
    }
}
