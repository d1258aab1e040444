//! Core store, middleware and enhancer types for dispatch-store
//!
//! A single store holds the application state. State only changes by
//! dispatching an action, which a pure reducer folds into the next state.
//!
//! # Core Concepts
//!
//! - **Action**: a value describing what happened
//! - **Reducer**: a pure function `(state, action) -> state`
//! - **Store**: holds the current state snapshot and notifies listeners
//! - **Middleware**: intercepts dispatch, e.g. for logging or persistence
//! - **Enhancer**: wraps store creation; [`apply_middleware`] is one
//! - **Runtime**: the action queue that brings background results back in
//!
//! # Basic Example
//!
//! ```ignore
//! use dispatch_store_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! impl Action for CounterAction {
//!     fn name(&self) -> &'static str {
//!         "Increment"
//!     }
//! }
//!
//! let store = create_store(
//!     reducer(|count: &i32, _: &CounterAction| count + 1),
//!     0,
//!     Some(apply_middleware(vec![Box::new(LoggingMiddleware::new())])),
//! );
//!
//! let _subscription = store.subscribe(|| println!("changed"))?;
//! store.dispatch(CounterAction::Increment)?;
//! assert_eq!(*store.get_state()?, 1);
//! ```
//!
//! # Async Work
//!
//! The store is single-threaded and `next` in a middleware is synchronous.
//! Slow work (disk, network) runs on a Tokio task and reports back by sending
//! a result action to the [`DispatchRuntime`] queue, which dispatches it as
//! a new top-level action. [`SettingsMiddleware`] follows this pattern:
//!
//! 1. **Intent actions** start the work (`LoadAll`)
//! 2. **Result actions** carry the outcome back (`Loaded`, `SettingsFailed`)

pub mod action;
pub mod enhancer;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod runtime;
pub mod settings;
pub mod store;
pub mod testing;

// Actions
pub use action::{
    parse_action, Action, ActionSummary, StoreAction, ACTION_TAG, INIT_ACTION, REPLACE_ACTION,
};

// Errors
pub use error::{Operation, StoreError};

// Store
pub use store::{reducer, reducer_fn, Dispatch, Reducer, Store, StoreHandle, Subscription};

// Middleware and enhancers
pub use enhancer::{compose, create_base_store, create_store, identity, StoreCreator, StoreEnhancer};
pub use middleware::{
    apply_middleware, from_fn, FnMiddleware, LoggingMiddleware, Middleware, MiddlewareApi, Next,
    NoopMiddleware,
};

// Logging
pub use logger::{
    ActionLog, ActionLogConfig, ActionLogEntry, ActionLogHandle, ActionLoggerConfig,
    ActionLoggerMiddleware,
};

// Runtime
pub use runtime::{action_channel, ActionReceiver, ActionSender, DispatchRuntime};

// Settings persistence
pub use settings::{
    MemorySettingsRepository, Settings, SettingsAction, SettingsConfig, SettingsError,
    SettingsFailure, SettingsIntent, SettingsMiddleware, SettingsOperation, SettingsRepository,
};

// Testing
pub use testing::{ActionRecorder, RecordingMiddleware, TestHarness};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{parse_action, Action, ActionSummary, StoreAction};
    pub use crate::enhancer::{compose, create_store, StoreEnhancer};
    pub use crate::error::StoreError;
    pub use crate::logger::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
    pub use crate::middleware::{
        apply_middleware, from_fn, LoggingMiddleware, Middleware, MiddlewareApi, Next,
        NoopMiddleware,
    };
    pub use crate::runtime::{ActionSender, DispatchRuntime};
    pub use crate::settings::{
        Settings, SettingsAction, SettingsConfig, SettingsIntent, SettingsMiddleware,
        SettingsRepository,
    };
    pub use crate::store::{reducer, reducer_fn, Dispatch, Reducer, Store, Subscription};
}
