//! Error types for store usage violations

use std::fmt;

use thiserror::Error;

/// Store operation that can be rejected by the re-entrancy guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Dispatch,
    GetState,
    Subscribe,
    Unsubscribe,
    ReplaceReducer,
}

impl Operation {
    /// Name of the store method, as it appears in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Dispatch => "dispatch",
            Operation::GetState => "get_state",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
            Operation::ReplaceReducer => "replace_reducer",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by store operations.
///
/// Every variant is a programming error in the host application: they are
/// returned to the offending caller and never swallowed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A store operation was called while a reducer was running.
    #[error("`{0}` called while the reducer is running; reducers receive state as an argument and must not touch the store")]
    Reentrant(Operation),

    /// A value at the serialization boundary is not a valid tagged action.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The store behind a handle has already been dropped.
    #[error("the store has been dropped")]
    StoreDropped,
}

impl StoreError {
    /// Whether this error was raised by the re-entrancy guard.
    pub fn is_reentrant(&self) -> bool {
        matches!(self, StoreError::Reentrant(_))
    }
}
