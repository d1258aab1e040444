//! Settings persistence middleware
//!
//! Persists settings changes and loads stored settings without blocking
//! dispatch:
//!
//! - A settings change is forwarded to the reducer first and queued for
//!   writing once the rest of the chain accepted it. State updates do not
//!   wait on I/O, and a rejected change is never written.
//! - A load request reads every configured field on a background worker and
//!   sends a "loaded" action back through the runtime queue. That action is a
//!   new top-level dispatch, never nested in the request's dispatch.
//! - Failures become "failed" actions; nothing is thrown across tasks.
//!
//! One worker task handles jobs in order, each on `spawn_blocking`, so a
//! load queued after a write observes that write.
//!
//! # Example
//! ```ignore
//! impl SettingsAction for AppAction {
//!     fn settings_intent(&self) -> Option<SettingsIntent> {
//!         match self {
//!             AppAction::SetNumRounds(n) => Some(SettingsIntent::save("numRounds", *n)),
//!             AppAction::LoadAll => Some(SettingsIntent::LoadAll),
//!             _ => None,
//!         }
//!     }
//!
//!     fn settings_loaded(settings: Settings) -> Self {
//!         AppAction::Loaded(settings)
//!     }
//!
//!     fn settings_failed(failure: SettingsFailure) -> Self {
//!         AppAction::SettingsFailed(failure)
//!     }
//! }
//!
//! let mut runtime = DispatchRuntime::build(|action_tx| {
//!     let settings = SettingsMiddleware::spawn(
//!         repository,
//!         action_tx,
//!         SettingsConfig::new(["numRounds", "sound"]),
//!     );
//!     create_store(reducer, AppState::default(), Some(apply_middleware(vec![Box::new(settings)])))
//! });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::action::Action;
use crate::error::StoreError;
use crate::middleware::{Middleware, MiddlewareApi, Next};
use crate::runtime::ActionSender;

/// Errors raised by a settings backend or by the settings worker.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backend could not read or write.
    #[error("Settings backend error: {0}")]
    Backend(String),

    /// A stored value does not have the expected shape.
    #[error("Invalid setting value: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The background worker has stopped.
    #[error("Settings worker is not running")]
    WorkerGone,
}

/// Named settings fields and their values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialize a field into `T`. Missing fields give `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        self.0
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(SettingsError::from)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Storage for settings, keyed by field name.
///
/// Calls are made from a blocking worker thread, so implementations may do
/// synchronous I/O.
pub trait SettingsRepository: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError>;

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;

    /// Read several fields. Fields that were never stored are left out.
    fn load(&self, keys: &[String]) -> Result<Settings, SettingsError> {
        let mut settings = Settings::new();
        for key in keys {
            if let Some(value) = self.get(key)? {
                settings.insert(key.clone(), value);
            }
        }
        Ok(settings)
    }
}

/// In-memory [`SettingsRepository`].
#[derive(Debug, Default)]
pub struct MemorySettingsRepository {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with `settings`.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            values: RwLock::new(settings.0),
        }
    }

    /// Copy of everything stored.
    pub fn snapshot(&self) -> Result<Settings, SettingsError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(Settings(values.clone()))
    }
}

fn poisoned() -> SettingsError {
    SettingsError::Backend("settings lock poisoned".to_string())
}

impl SettingsRepository for MemorySettingsRepository {
    fn get(&self, key: &str) -> Result<Option<Value>, SettingsError> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}

/// What an action asks the settings middleware to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsIntent {
    /// Persist one field.
    Save { key: String, value: Value },
    /// Read every configured field.
    LoadAll,
}

impl SettingsIntent {
    pub fn save(key: impl Into<String>, value: impl Into<Value>) -> Self {
        SettingsIntent::Save {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsOperation {
    Save,
    Load,
}

/// Payload of the action dispatched when persistence fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsFailure {
    pub operation: SettingsOperation,
    /// Field being saved, `None` for loads.
    pub key: Option<String>,
    pub message: String,
}

/// Connects an application's action type to the settings middleware.
pub trait SettingsAction: Action {
    /// The persistence work this action triggers, if any.
    fn settings_intent(&self) -> Option<SettingsIntent>;

    /// Action carrying freshly loaded settings.
    fn settings_loaded(settings: Settings) -> Self;

    /// Action reporting a failed read or write.
    fn settings_failed(failure: SettingsFailure) -> Self;
}

/// Settings middleware configuration
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Fields read on a load request
    pub fields: Vec<String>,
    /// Whether load requests also reach the reducer (e.g. to show a spinner)
    pub forward_load_requests: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            forward_load_requests: true,
        }
    }
}

impl SettingsConfig {
    /// Config loading the given fields
    pub fn new<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set whether load requests are forwarded to the reducer
    pub fn forward_load_requests(mut self, forward: bool) -> Self {
        self.forward_load_requests = forward;
        self
    }
}

enum Job {
    Save { key: String, value: Value },
    Load { keys: Vec<String> },
}

enum JobOutcome {
    Saved { key: String },
    Loaded(Settings),
    Failed(SettingsFailure),
}

impl Job {
    fn operation(&self) -> SettingsOperation {
        match self {
            Job::Save { .. } => SettingsOperation::Save,
            Job::Load { .. } => SettingsOperation::Load,
        }
    }

    fn key(&self) -> Option<String> {
        match self {
            Job::Save { key, .. } => Some(key.clone()),
            Job::Load { .. } => None,
        }
    }

    fn run(self, repository: &dyn SettingsRepository) -> JobOutcome {
        match self {
            Job::Save { key, value } => match repository.set(&key, value) {
                Ok(()) => JobOutcome::Saved { key },
                Err(error) => JobOutcome::Failed(SettingsFailure {
                    operation: SettingsOperation::Save,
                    key: Some(key),
                    message: error.to_string(),
                }),
            },
            Job::Load { keys } => match repository.load(&keys) {
                Ok(settings) => JobOutcome::Loaded(settings),
                Err(error) => JobOutcome::Failed(SettingsFailure {
                    operation: SettingsOperation::Load,
                    key: None,
                    message: error.to_string(),
                }),
            },
        }
    }
}

async fn run_worker<A: SettingsAction>(
    repository: Arc<dyn SettingsRepository>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    action_tx: ActionSender<A>,
) {
    while let Some(job) = jobs.recv().await {
        let operation = job.operation();
        let key = job.key();
        let repository = Arc::clone(&repository);

        let outcome = match tokio::task::spawn_blocking(move || job.run(&*repository)).await
        {
            Ok(outcome) => outcome,
            Err(error) => JobOutcome::Failed(SettingsFailure {
                operation,
                key,
                message: format!("settings job aborted: {error}"),
            }),
        };

        let action = match outcome {
            JobOutcome::Saved { key } => {
                tracing::trace!(%key, "Setting saved");
                continue;
            }
            JobOutcome::Loaded(settings) => {
                tracing::debug!(fields = settings.len(), "Settings loaded");
                A::settings_loaded(settings)
            }
            JobOutcome::Failed(failure) => {
                tracing::warn!(
                    operation = ?failure.operation,
                    key = ?failure.key,
                    error = %failure.message,
                    "Settings operation failed"
                );
                A::settings_failed(failure)
            }
        };

        if action_tx.send(action).is_err() {
            tracing::warn!("Dispatch runtime is gone, stopping settings worker");
            break;
        }
    }
}

/// Middleware persisting settings on a background worker.
pub struct SettingsMiddleware<A> {
    config: SettingsConfig,
    jobs: mpsc::UnboundedSender<Job>,
    action_tx: ActionSender<A>,
}

impl<A: SettingsAction> SettingsMiddleware<A> {
    /// Start the background worker and create the middleware.
    ///
    /// Must be called from within a Tokio runtime. Results are sent to
    /// `action_tx`, normally the sender of the store's
    /// [`DispatchRuntime`](crate::runtime::DispatchRuntime).
    pub fn spawn(
        repository: Arc<dyn SettingsRepository>,
        action_tx: ActionSender<A>,
        config: SettingsConfig,
    ) -> Self {
        let (jobs, job_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(repository, job_rx, action_tx.clone()));
        Self {
            config,
            jobs,
            action_tx,
        }
    }

    fn submit(&self, job: Job) {
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            let failure = SettingsFailure {
                operation: job.operation(),
                key: job.key(),
                message: SettingsError::WorkerGone.to_string(),
            };
            tracing::warn!(operation = ?failure.operation, "Settings worker is not running");
            let _ = self.action_tx.send(A::settings_failed(failure));
        }
    }
}

impl<S, A: SettingsAction> Middleware<S, A> for SettingsMiddleware<A> {
    fn handle(
        &self,
        _api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        match action.settings_intent() {
            Some(SettingsIntent::Save { key, value }) => {
                // Only persist values the rest of the chain accepted.
                let action = next.run(action)?;
                tracing::debug!(%key, "Queueing settings write");
                self.submit(Job::Save { key, value });
                Ok(action)
            }
            Some(SettingsIntent::LoadAll) => {
                tracing::debug!(fields = self.config.fields.len(), "Queueing settings load");
                self.submit(Job::Load {
                    keys: self.config.fields.clone(),
                });
                if self.config.forward_load_requests {
                    next.run(action)
                } else {
                    Ok(action)
                }
            }
            None => next.run(action),
        }
    }
}
