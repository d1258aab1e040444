//! Action trait and the reserved actions the store sends to reducers

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;

/// Field that carries the action tag at the JSON boundary.
pub const ACTION_TAG: &str = "type";

/// Tag of the action dispatched once when a store is created.
pub const INIT_ACTION: &str = "@@dispatch-store/INIT";

/// Tag of the action dispatched after every reducer replacement.
pub const REPLACE_ACTION: &str = "@@dispatch-store/REPLACE";

/// Marker trait for actions that can be dispatched to the store
///
/// Actions describe events. They should be plain data:
/// - Clone: Actions may be logged, replayed, or sent to multiple handlers
/// - Debug: For debugging and logging
/// - Send + 'static: Background middleware sends them back across threads
///
/// Use `#[derive(Action)]` from `dispatch-store-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + Send + 'static {
    /// Get the action tag for logging and filtering
    fn name(&self) -> &'static str;
}

/// Short human readable form of an action, used by the action logger.
///
/// The default uses the `Debug` output. Override it for data-heavy actions.
pub trait ActionSummary: Action {
    fn summary(&self) -> String {
        format!("{:?}", self)
    }
}

/// What a reducer receives: an application action or one of the reserved
/// store actions.
///
/// Reducers that do not care about the reserved actions can be built with
/// [`reducer`](crate::store::reducer), which returns the state unchanged for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction<A> {
    /// Sent once when the store is created so reducers can set up defaults.
    Init,
    /// Sent after [`Store::replace_reducer`](crate::Store::replace_reducer).
    ReplaceReducer,
    /// An action dispatched by the application.
    App(A),
}

impl<A: Action> StoreAction<A> {
    /// Tag of the wrapped action, or the reserved tag.
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::Init => INIT_ACTION,
            StoreAction::ReplaceReducer => REPLACE_ACTION,
            StoreAction::App(action) => action.name(),
        }
    }

    /// Whether this is one of the store's own actions.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, StoreAction::App(_))
    }

    /// The application action, if any.
    pub fn as_app(&self) -> Option<&A> {
        match self {
            StoreAction::App(action) => Some(action),
            _ => None,
        }
    }
}

/// Parse an action received at a serialization boundary.
///
/// Inside the process actions are a closed enum and cannot be anything but
/// data. Values coming from outside (IPC, replay files, devtools) are checked
/// here: they must be JSON objects with a string `type` tag that is not one of
/// the reserved tags, and must deserialize into `A`.
///
/// # Example
/// ```
/// use dispatch_store_core::action::parse_action;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, Debug, PartialEq)]
/// #[serde(tag = "type")]
/// enum Msg {
///     #[serde(rename = "INC")]
///     Inc,
/// }
///
/// let msg: Msg = parse_action(serde_json::json!({ "type": "INC" })).unwrap();
/// assert_eq!(msg, Msg::Inc);
/// assert!(parse_action::<Msg>(serde_json::json!("INC")).is_err());
/// ```
pub fn parse_action<A: DeserializeOwned>(value: Value) -> Result<A, StoreError> {
    let tag = match &value {
        Value::Object(fields) => match fields.get(ACTION_TAG) {
            Some(Value::String(tag)) => tag.clone(),
            Some(other) => {
                return Err(StoreError::InvalidAction(format!(
                    "`{ACTION_TAG}` must be a string, got {}",
                    json_kind(other)
                )))
            }
            None => {
                return Err(StoreError::InvalidAction(format!(
                    "missing `{ACTION_TAG}` field"
                )))
            }
        },
        other => {
            return Err(StoreError::InvalidAction(format!(
                "expected a tagged object, got {}",
                json_kind(other)
            )))
        }
    };

    if tag == INIT_ACTION || tag == REPLACE_ACTION {
        return Err(StoreError::InvalidAction(format!(
            "`{tag}` is reserved for the store"
        )));
    }

    serde_json::from_value(value).map_err(|e| StoreError::InvalidAction(format!("{tag}: {e}")))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
