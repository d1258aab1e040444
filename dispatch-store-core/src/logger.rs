//! Action logging middleware with name filters and an optional history buffer
//!
//! [`ActionLoggerMiddleware`] writes every dispatched action that passes its
//! filter to `tracing`. With a history attached it also keeps the most recent
//! actions in an [`ActionLog`], recording whether each one changed state.
//!
//! # Example
//! ```ignore
//! let filter = ActionLoggerConfig::new(None, Some("Tick"));
//! let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::new(50, filter));
//! let history = logger.log_handle().unwrap();
//!
//! let store = create_store(reducer, AppState::default(), Some(apply_middleware(vec![Box::new(logger)])));
//! store.dispatch(AppAction::SetNumRounds(5))?;
//!
//! for entry in history.borrow().recent(10) {
//!     println!("#{} {} changed={:?}", entry.sequence, entry.summary, entry.state_changed);
//! }
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::action::ActionSummary;
use crate::error::StoreError;
use crate::middleware::{Middleware, MiddlewareApi, Next};

fn split_patterns(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(String::from)
        .collect()
}

/// Which action names get logged.
///
/// Patterns are globs over [`Action::name`](crate::Action::name): `*` matches
/// any run of characters and `?` exactly one. `Settings*` matches
/// `SettingsLoaded` and `SettingsFailed`; `*Failed` matches anything ending
/// in `Failed`.
///
/// The default config has no patterns and logs every action.
#[derive(Debug, Clone, Default)]
pub struct ActionLoggerConfig {
    /// When non-empty, a name must match one of these
    pub include_patterns: Vec<String>,
    /// Names matching any of these are dropped, even if included
    pub exclude_patterns: Vec<String>,
}

impl ActionLoggerConfig {
    /// Build from comma-separated pattern lists, e.g. from CLI flags.
    ///
    /// `None` for `include` logs everything; `None` for `exclude` drops
    /// nothing.
    ///
    /// ```
    /// use dispatch_store_core::logger::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Settings*, Increment"), None);
    /// assert!(config.should_log("SettingsLoaded"));
    /// assert!(config.should_log("Increment"));
    /// assert!(!config.should_log("Decrement"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    pub fn should_log(&self, name: &str) -> bool {
        let included = self.include_patterns.is_empty()
            || self.include_patterns.iter().any(|p| glob_match(p, name));
        included && !self.exclude_patterns.iter().any(|p| glob_match(p, name))
    }
}

/// One logged action
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub name: &'static str,
    /// From [`ActionSummary::summary`]
    pub summary: String,
    /// Monotonic across the log's lifetime, including evicted entries
    pub sequence: u64,
    /// `None` until dispatch returns; stays `None` if dispatch failed
    pub state_changed: Option<bool>,
}

/// History buffer settings
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Entries kept before the oldest is evicted
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            filter: ActionLoggerConfig::default(),
        }
    }
}

impl ActionLogConfig {
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }
}

/// Bounded history of recent actions, oldest evicted first.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    next_sequence: u64,
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.capacity),
            config,
            next_sequence: 0,
        }
    }

    /// Record `action` if the filter accepts it, returning its sequence number.
    pub fn record<A: ActionSummary>(&mut self, action: &A) -> Option<u64> {
        let name = action.name();
        if self.config.capacity == 0 || !self.config.filter.should_log(name) {
            return None;
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        while self.entries.len() >= self.config.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActionLogEntry {
            name,
            summary: action.summary(),
            sequence,
            state_changed: None,
        });
        Some(sequence)
    }

    /// Set `state_changed` on the entry with `sequence`, if still buffered.
    ///
    /// Nested dispatches can log entries after the one being completed, so
    /// entries are looked up by sequence rather than position.
    pub fn mark_state_changed(&mut self, sequence: u64, changed: bool) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .rev()
            .find(|entry| entry.sequence == sequence)
        {
            entry.state_changed = Some(changed);
        }
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter()
    }

    /// Newest first, at most `count`
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.entries.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared handle to a middleware's history.
pub type ActionLogHandle = Rc<RefCell<ActionLog>>;

/// Middleware logging each action's name via `tracing::debug!`.
///
/// The action is always forwarded; logging never changes dispatch.
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    config: ActionLoggerConfig,
    log: Option<ActionLogHandle>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing output only
    pub fn new(config: ActionLoggerConfig) -> Self {
        Self {
            config,
            log: None,
            active: true,
        }
    }

    /// Tracing output plus a history buffer using the same filter
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            config: config.filter.clone(),
            log: Some(Rc::new(RefCell::new(ActionLog::new(config)))),
            active: true,
        }
    }

    /// Turn the middleware into a pass-through, e.g. `.active(args.debug)`.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// History handle, if this middleware keeps one.
    ///
    /// Clone it before handing the middleware to
    /// [`apply_middleware`](crate::middleware::apply_middleware).
    pub fn log_handle(&self) -> Option<ActionLogHandle> {
        self.log.clone()
    }
}

impl<S, A> Middleware<S, A> for ActionLoggerMiddleware
where
    S: PartialEq + 'static,
    A: ActionSummary,
{
    fn handle(
        &self,
        api: &MiddlewareApi<S, A>,
        action: A,
        next: Next<'_, S, A>,
    ) -> Result<A, StoreError> {
        if !self.active {
            return next.run(action);
        }

        let name = action.name();
        if self.config.should_log(name) {
            tracing::debug!(action = %name, "action");
        }

        let Some(log) = &self.log else {
            return next.run(action);
        };

        let recorded = log.borrow_mut().record(&action);
        let Some(sequence) = recorded else {
            return next.run(action);
        };

        let before = api.get_state().ok();
        let result = next.run(action)?;
        let after = api.get_state().ok();

        if let (Some(before), Some(after)) = (before, after) {
            log.borrow_mut()
                .mark_state_changed(sequence, *before != *after);
        }
        Ok(result)
    }
}

/// Glob match over characters: `*` matches any run, `?` exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen, and the text position it is matched up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some(&'*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::enhancer::create_store;
    use crate::middleware::apply_middleware;
    use crate::store::reducer;

    #[derive(Clone, Debug)]
    enum TestAction {
        Tick,
        Increment,
        Noop,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Tick => "Tick",
                TestAction::Increment => "Increment",
                TestAction::Noop => "Noop",
            }
        }
    }

    impl ActionSummary for TestAction {}

    #[test]
    fn test_glob_match() {
        assert!(glob_match("Tick", "Tick"));
        assert!(!glob_match("Tick", "TickTock"));
        assert!(glob_match("Settings*", "SettingsLoaded"));
        assert!(glob_match("Settings*", "Settings"));
        assert!(!glob_match("Settings*", "LoadSettings"));
        assert!(glob_match("*Failed", "SettingsFailed"));
        assert!(glob_match("*a*b*", "xxaxxbxx"));
        assert!(glob_match("Tick?", "Ticks"));
        assert!(!glob_match("Tick?", "Tick"));
        assert!(glob_match("*", ""));
        assert!(!glob_match("?", ""));
    }

    #[test]
    fn test_config_include_and_exclude() {
        let config = ActionLoggerConfig::new(Some("Settings*"), Some("SettingsFailed"));
        assert!(config.should_log("SettingsLoaded"));
        assert!(!config.should_log("SettingsFailed"));
        assert!(!config.should_log("Increment"));

        // Nothing is filtered unless asked for.
        let defaults = ActionLoggerConfig::default();
        assert!(defaults.should_log("Tick"));
        assert!(defaults.should_log("Render"));
        assert!(ActionLoggerConfig::new(None, None).should_log("Tick"));
        assert!(!ActionLoggerConfig::new(None, Some("Tick, Render")).should_log("Render"));
    }

    #[test]
    fn test_log_evicts_oldest() {
        let mut log = ActionLog::new(ActionLogConfig::new(2, ActionLoggerConfig::default()));
        for _ in 0..3 {
            log.record(&TestAction::Increment);
        }
        let sequences: Vec<u64> = log.entries().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(log.recent(1).next().unwrap().sequence, 2);
        assert_eq!(log.entries().next().unwrap().summary, "Increment");
    }

    #[test]
    fn test_middleware_records_state_changes() {
        let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::new(
            100,
            ActionLoggerConfig::new(None, Some("Tick")),
        ));
        let history = logger.log_handle().unwrap();

        let store = create_store(
            reducer(|state: &i32, action: &TestAction| match action {
                TestAction::Increment => state + 1,
                TestAction::Tick | TestAction::Noop => *state,
            }),
            0,
            Some(apply_middleware(vec![Box::new(logger)])),
        );

        store.dispatch(TestAction::Increment).unwrap();
        store.dispatch(TestAction::Tick).unwrap();
        store.dispatch(TestAction::Noop).unwrap();

        let history = history.borrow();
        let entries: Vec<_> = history
            .entries()
            .map(|e| (e.name, e.state_changed))
            .collect();
        assert_eq!(
            entries,
            vec![("Increment", Some(true)), ("Noop", Some(false))]
        );
        assert_eq!(*store.get_state().unwrap(), 1);
    }

    #[test]
    fn test_default_history_keeps_every_action() {
        let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::default());
        let history = logger.log_handle().unwrap();
        let store = create_store(
            reducer(|state: &i32, _: &TestAction| *state),
            0,
            Some(apply_middleware(vec![Box::new(logger)])),
        );

        store.dispatch(TestAction::Tick).unwrap();
        store.dispatch(TestAction::Noop).unwrap();

        let names: Vec<_> = history.borrow().entries().map(|e| e.name).collect();
        assert_eq!(names, vec!["Tick", "Noop"]);
    }

    #[test]
    fn test_inactive_middleware_passes_through() {
        let logger = ActionLoggerMiddleware::with_log(ActionLogConfig::default()).active(false);
        let history = logger.log_handle().unwrap();
        let store = create_store(
            reducer(|state: &i32, _: &TestAction| state + 1),
            0,
            Some(apply_middleware(vec![Box::new(logger)])),
        );

        store.dispatch(TestAction::Increment).unwrap();
        assert_eq!(*store.get_state().unwrap(), 1);
        assert!(history.borrow().is_empty());
    }
}
