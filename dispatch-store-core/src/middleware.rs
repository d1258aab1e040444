//! Middleware pipeline around the store's dispatch
//!
//! Middleware sees every action dispatched through the store before the
//! reducer does. Installed with [`apply_middleware`], the list
//! `[m1, m2, ..., mn]` produces a dispatch that visits
//! `m1 -> m2 -> ... -> mn -> reducer`.
//!
//! Inside [`Middleware::handle`] a middleware may:
//! - forward the action with `next.run(action)`
//! - forward a different action (translation)
//! - call `api.dispatch(..)` with a new action, which goes through the whole
//!   chain again as a fresh dispatch
//! - return without calling `next` (short-circuit)
//!
//! Short-circuiting is supported on purpose, for actions that only trigger a
//! side effect. The chain emits a `debug` event for every action that never
//! reached the reducer, so a swallowed action is visible in the logs.
//!
//! `next` is synchronous. Work that finishes later (I/O on a background task)
//! must come back as a new action sent to the
//! [`DispatchRuntime`](crate::runtime::DispatchRuntime) channel, never by
//! holding on to `next`.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::action::Action;
use crate::enhancer::{StoreCreator, StoreEnhancer};
use crate::error::{Operation, StoreError};
use crate::store::{Dispatch, Reducer, StoreCore};

/// Middleware trait for intercepting actions
///
/// Implement this trait to add logging, persistence, or other
/// cross-cutting concerns to your store. Handlers take `&self`; keep
/// mutable bookkeeping in `Cell`/`RefCell` since `api.dispatch` may re-enter
/// the same middleware.
pub trait Middleware<S, A> {
    /// Handle an action and decide whether and how to continue the chain.
    fn handle(
        &self,
        api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError>;
}

/// Store access given to middleware.
pub struct MiddlewareApi<S, A> {
    core: Rc<StoreCore<S, A>>,
    dispatcher: Weak<dyn Dispatch<A>>,
}

impl<S: 'static, A: Action> MiddlewareApi<S, A> {
    /// Dispatch through the full middleware chain this middleware belongs to.
    pub fn dispatch(&self, action: A) -> Result<A, StoreError> {
        self.dispatcher
            .upgrade()
            .ok_or(StoreError::StoreDropped)?
            .dispatch(action)
    }

    /// Current state snapshot.
    pub fn get_state(&self) -> Result<Arc<S>, StoreError> {
        self.core.get_state()
    }
}

/// The rest of the chain after the current middleware.
pub struct Next<'a, S, A> {
    middlewares: &'a [Box<dyn Middleware<S, A>>],
    api: &'a MiddlewareApi<S, A>,
    inner: &'a dyn Dispatch<A>,
    reached_inner: &'a Cell<bool>,
}

impl<S, A> Clone for Next<'_, S, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S, A> Copy for Next<'_, S, A> {}

impl<S, A: Action> Next<'_, S, A> {
    /// Continue the chain with `action`.
    pub fn run(self, action: A) -> Result<A, StoreError> {
        match self.middlewares.split_first() {
            Some((middleware, rest)) => middleware.handle(
                self.api,
                action,
                Next {
                    middlewares: rest,
                    ..self
                },
            ),
            None => {
                self.reached_inner.set(true);
                self.inner.dispatch(action)
            }
        }
    }

    /// Number of middleware left before the store's own dispatch.
    pub fn remaining(&self) -> usize {
        self.middlewares.len()
    }
}

struct MiddlewareChain<S, A> {
    middlewares: Vec<Box<dyn Middleware<S, A>>>,
    inner: Rc<dyn Dispatch<A>>,
    api: MiddlewareApi<S, A>,
}

impl<S: 'static, A: Action> Dispatch<A> for MiddlewareChain<S, A> {
    fn dispatch(&self, action: A) -> Result<A, StoreError> {
        // Rejected before any middleware runs, so a swallowing middleware
        // cannot hide a dispatch issued from a reducer.
        self.api.core.check(Operation::Dispatch)?;

        let name = action.name();
        let reached_inner = Cell::new(false);
        let next = Next {
            middlewares: &self.middlewares,
            api: &self.api,
            inner: &*self.inner,
            reached_inner: &reached_inner,
        };

        let result = next.run(action);
        if result.is_ok() && !reached_inner.get() {
            tracing::debug!(action = %name, "Action consumed by middleware");
        }
        result
    }
}

/// Enhancer that installs `middlewares` around the store's dispatch.
///
/// The first middleware in the list sees each action first.
///
/// # Example
/// ```ignore
/// let store = create_store(
///     reducer,
///     AppState::default(),
///     Some(apply_middleware(vec![
///         Box::new(LoggingMiddleware::new()),
///         Box::new(settings),
///     ])),
/// );
/// ```
pub fn apply_middleware<S, A>(middlewares: Vec<Box<dyn Middleware<S, A>>>) -> StoreEnhancer<S, A>
where
    S: 'static,
    A: Action,
{
    Box::new(move |create: StoreCreator<S, A>| -> StoreCreator<S, A> {
        Box::new(move |reducer: Reducer<S, A>, state: S| {
            let store = create(reducer, state);
            let core = store.core();
            let inner = store.dispatcher();
            let chain = Rc::new_cyclic(|chain: &Weak<MiddlewareChain<S, A>>| {
                let dispatcher: Weak<dyn Dispatch<A>> = chain.clone();
                MiddlewareChain {
                    middlewares,
                    inner,
                    api: MiddlewareApi { core, dispatcher },
                }
            });
            store.with_dispatcher(chain)
        })
    })
}

/// Middleware built from a closure, see [`from_fn`].
pub struct FnMiddleware<F>(F);

/// Turn a closure into a middleware.
///
/// ```ignore
/// let audit = from_fn::<AppState, AppAction, _>(|_api, action, next| {
///     tracing::info!(action = %action.name(), "audit");
///     next.run(action)
/// });
/// ```
pub fn from_fn<S, A, F>(f: F) -> FnMiddleware<F>
where
    A: Action,
    F: Fn(&MiddlewareApi<S, A>, A, Next<'_, S, A>) -> Result<A, StoreError>,
{
    FnMiddleware(f)
}

impl<S, A, F> Middleware<S, A> for FnMiddleware<F>
where
    A: Action,
    F: Fn(&MiddlewareApi<S, A>, A, Next<'_, S, A>) -> Result<A, StoreError>,
{
    fn handle(
        &self,
        api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        (self.0)(api, action, next)
    }
}

/// A no-op middleware that forwards every action
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<S, A: Action> Middleware<S, A> for NoopMiddleware {
    fn handle(
        &self,
        _api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        next.run(action)
    }
}

/// Middleware that logs actions (for debugging)
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Whether to log before dispatch
    pub log_before: bool,
    /// Whether to log after dispatch
    pub log_after: bool,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings (log after only)
    pub fn new() -> Self {
        Self {
            log_before: false,
            log_after: true,
        }
    }

    /// Create a logging middleware that logs both before and after
    pub fn verbose() -> Self {
        Self {
            log_before: true,
            log_after: true,
        }
    }
}

impl<S, A: Action> Middleware<S, A> for LoggingMiddleware {
    fn handle(
        &self,
        _api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        let name = action.name();
        if self.log_before {
            tracing::debug!(action = %name, "Dispatching action");
        }

        let result = next.run(action);

        if self.log_after {
            match &result {
                Ok(_) => tracing::debug!(action = %name, "Action processed"),
                Err(error) => tracing::debug!(action = %name, %error, "Action failed"),
            }
        }
        result
    }
}

impl<S, A> fmt::Debug for MiddlewareApi<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareApi")
            .field("store_alive", &(self.dispatcher.strong_count() > 0))
            .finish()
    }
}
