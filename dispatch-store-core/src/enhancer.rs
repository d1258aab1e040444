//! Store enhancers: wrappers around store creation itself
//!
//! An enhancer receives the function that creates a store and returns a
//! replacement. The replacement usually builds the inner store and hands back
//! a copy with its dispatch wrapped, see
//! [`apply_middleware`](crate::middleware::apply_middleware).
//!
//! Enhancers are combined with [`compose`]. The first enhancer in the list is
//! the outermost one: it wraps, and can override, everything listed after it.
//!
//! # Example
//! ```ignore
//! let store = create_store(
//!     reducer,
//!     AppState::default(),
//!     Some(compose(vec![
//!         apply_middleware(vec![Box::new(LoggingMiddleware::new())]), // sees actions first
//!         apply_middleware(vec![Box::new(settings)]),
//!     ])),
//! );
//! ```

use crate::action::Action;
use crate::store::{Reducer, Store};

/// Function that builds a store from a reducer and an initial state.
pub type StoreCreator<S, A> = Box<dyn FnOnce(Reducer<S, A>, S) -> Store<S, A>>;

/// Wraps a [`StoreCreator`] into another one.
pub type StoreEnhancer<S, A> = Box<dyn FnOnce(StoreCreator<S, A>) -> StoreCreator<S, A>>;

/// The bare store creator used at the bottom of every enhancer stack.
pub fn create_base_store<S: 'static, A: Action>(reducer: Reducer<S, A>, state: S) -> Store<S, A> {
    Store::new(state, reducer)
}

/// Create a store, letting `enhancer` take over construction when given.
pub fn create_store<S: 'static, A: Action>(
    reducer: Reducer<S, A>,
    state: S,
    enhancer: Option<StoreEnhancer<S, A>>,
) -> Store<S, A> {
    match enhancer {
        Some(enhancer) => {
            let create = enhancer(Box::new(create_base_store::<S, A>));
            create(reducer, state)
        }
        None => create_base_store(reducer, state),
    }
}

/// Enhancer that leaves store creation unchanged.
pub fn identity<S: 'static, A: Action>() -> StoreEnhancer<S, A> {
    Box::new(|create: StoreCreator<S, A>| create)
}

/// Combine enhancers, `enhancers[0]` outermost.
///
/// `compose(vec![e1, e2, e3])` behaves like `e1(e2(e3(create)))`. An empty
/// list gives [`identity`].
pub fn compose<S: 'static, A: Action>(enhancers: Vec<StoreEnhancer<S, A>>) -> StoreEnhancer<S, A> {
    if enhancers.is_empty() {
        return identity();
    }
    Box::new(move |create: StoreCreator<S, A>| {
        enhancers
            .into_iter()
            .rev()
            .fold(create, |create, enhancer| enhancer(create))
    })
}
