//! dispatch-store: unidirectional state management with middleware
//!
//! One store owns the state. Actions are dispatched through an optional
//! middleware pipeline into a pure reducer, and subscribers are notified
//! after every reduction. Store creation can be wrapped by enhancers, which
//! is how middleware gets installed.
//!
//! # Example
//! ```ignore
//! use dispatch_store::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//!     Decrement,
//! }
//!
//! fn counter(count: &i32, action: &CounterAction) -> i32 {
//!     match action {
//!         CounterAction::Increment => count + 1,
//!         CounterAction::Decrement => count - 1,
//!     }
//! }
//!
//! let store = create_store(
//!     reducer(counter),
//!     0,
//!     Some(apply_middleware(vec![Box::new(LoggingMiddleware::new())])),
//! );
//! store.dispatch(CounterAction::Increment)?;
//! ```

// Re-export everything from core
pub use dispatch_store_core::*;

// Re-export derive macros
pub use dispatch_store_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    pub use dispatch_store_core::prelude::*;

    // Derive macros
    pub use dispatch_store_macros::Action;
}
