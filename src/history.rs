//! Navigation history.
//!
//! [`NavigationHistory`] owns the authoritative [`UrlState`]. Every
//! accepted state goes through [`on_new_url_state`](NavigationHistory::on_new_url_state),
//! which decides between push and replace semantics and then notifies
//! listeners synchronously, even when nothing changed. Consumers that want
//! idempotent rebuilds compare the state hash themselves.
//!
//! A listener may read the history while it is being notified but must not
//! feed it another state; such a nested update is rejected with
//! [`NavigationError::ReentrantUpdate`].

use crate::error::NavigationError;
use crate::signal::{RebuildSignal, Subscription};
use crate::state::UrlState;
use crate::{debug_log, warn_log};
use std::cell::RefCell;
use std::collections::VecDeque;

/// How many previous states are kept for back navigation.
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone)]
struct HistoryInner {
    current: UrlState,
    back: VecDeque<UrlState>,
}

/// A saved copy of every history entry, taken with
/// [`NavigationHistory::snapshot`].
#[derive(Debug, Clone)]
pub struct HistorySnapshot(HistoryInner);

/// Owner of the current [`UrlState`] and its back list.
///
/// # Example
///
/// ```
/// use route_reconciler::{NavigationHistory, RouteMatch, UrlState};
///
/// let history = NavigationHistory::new();
/// let home = UrlState::new("/home", vec![RouteMatch::new("HomeRoute", "home", "/home")]);
/// history.on_new_url_state(home).unwrap();
///
/// assert_eq!(history.url_state().path(), "/home");
/// assert!(history.can_navigate_back());
/// ```
#[derive(Debug)]
pub struct NavigationHistory {
    inner: RefCell<HistoryInner>,
    signal: RebuildSignal,
    limit: usize,
}

impl NavigationHistory {
    /// Start at the empty root state.
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Start at the empty root state, keeping at most `limit` back entries.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            inner: RefCell::new(HistoryInner {
                current: UrlState::empty(),
                back: VecDeque::new(),
            }),
            signal: RebuildSignal::new(),
            limit,
        }
    }

    /// Accept a new state and notify listeners.
    ///
    /// The state replaces the current entry when it is flagged
    /// [`should_replace`](UrlState::should_replace) or when its path equals
    /// the current path; otherwise the current entry moves to the back list.
    /// The replace flag is consumed: the stored state never carries it.
    pub fn on_new_url_state(&self, state: UrlState) -> Result<(), NavigationError> {
        if self.signal.is_notifying() {
            warn_log!(
                "Rejected history update to '{}' issued from a history listener",
                state.path()
            );
            return Err(NavigationError::ReentrantUpdate);
        }

        {
            let mut inner = self.inner.borrow_mut();
            let replace = state.should_replace() || state.path() == inner.current.path();
            let state = state.with_replace(false);

            if replace {
                debug_log!(
                    "History replace: '{}' → '{}'",
                    inner.current.path(),
                    state.path()
                );
                inner.current = state;
            } else {
                debug_log!(
                    "History push: '{}' → '{}'",
                    inner.current.path(),
                    state.path()
                );
                let previous = std::mem::replace(&mut inner.current, state);
                inner.back.push_back(previous);
                if inner.back.len() > self.limit {
                    inner.back.pop_front();
                }
            }
        }

        self.signal.notify();
        Ok(())
    }

    /// The current state.
    pub fn url_state(&self) -> UrlState {
        self.inner.borrow().current.clone()
    }

    /// Check if the rendered path is `path` (normalized, query ignored).
    pub fn is_url_state_matching_path(&self, path: &str) -> bool {
        let (path, _) = crate::state::split_location(path);
        self.inner.borrow().current.path() == crate::matching::normalize_path(path)
    }

    pub fn can_navigate_back(&self) -> bool {
        !self.inner.borrow().back.is_empty()
    }

    /// Restore the previous state and notify listeners.
    ///
    /// Returns the restored state, or `None` when there is nothing to go back to.
    pub fn back(&self) -> Result<Option<UrlState>, NavigationError> {
        if self.signal.is_notifying() {
            return Err(NavigationError::ReentrantUpdate);
        }

        let restored = {
            let mut inner = self.inner.borrow_mut();
            let Some(previous) = inner.back.pop_back() else {
                return Ok(None);
            };
            inner.current = previous.clone();
            previous
        };

        debug_log!("History back to '{}'", restored.path());
        self.signal.notify();
        Ok(Some(restored))
    }

    /// Copy the current entry and the back list.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot(self.inner.borrow().clone())
    }

    /// Put back every entry saved in `snapshot` and notify listeners.
    ///
    /// Entries accepted since the snapshot was taken are dropped.
    pub fn restore(&self, snapshot: HistorySnapshot) -> Result<(), NavigationError> {
        if self.signal.is_notifying() {
            return Err(NavigationError::ReentrantUpdate);
        }

        debug_log!(
            "History restore: '{}' → '{}'",
            self.inner.borrow().current.path(),
            snapshot.0.current.path()
        );
        *self.inner.borrow_mut() = snapshot.0;
        self.signal.notify();
        Ok(())
    }

    /// Number of entries, current one included.
    pub fn len(&self) -> usize {
        self.inner.borrow().back.len() + 1
    }

    /// Register a listener notified on every accepted state.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.signal.subscribe(listener)
    }

    /// The underlying change channel.
    pub fn signal(&self) -> &RebuildSignal {
        &self.signal
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::RouteMatch;
    use std::cell::Cell;
    use std::rc::Rc;

    fn state(path: &str) -> UrlState {
        UrlState::new(path, vec![RouteMatch::new(path, path, path)])
    }

    #[test]
    fn test_push_and_back() {
        let history = NavigationHistory::new();
        history.on_new_url_state(state("/users")).unwrap();
        history.on_new_url_state(state("/users/1")).unwrap();

        assert_eq!(history.url_state().path(), "/users/1");
        assert_eq!(history.len(), 3);

        let restored = history.back().unwrap();
        assert_eq!(restored.map(|s| s.path().to_string()), Some("/users".to_string()));
        assert_eq!(history.url_state().path(), "/users");
    }

    #[test]
    fn test_replace_flag_replaces_and_is_consumed() {
        let history = NavigationHistory::new();
        history.on_new_url_state(state("/a")).unwrap();
        history
            .on_new_url_state(state("/b").with_replace(true))
            .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.url_state().path(), "/b");
        assert!(!history.url_state().should_replace());
    }

    #[test]
    fn test_same_path_replaces() {
        let history = NavigationHistory::new();
        history.on_new_url_state(state("/a")).unwrap();
        history.on_new_url_state(state("/a")).unwrap();
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_notifies_even_when_unchanged() {
        let history = NavigationHistory::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = history.subscribe(move || c.set(c.get() + 1));

        history.on_new_url_state(state("/a")).unwrap();
        history.on_new_url_state(state("/a")).unwrap();

        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_listener_cannot_mutate_during_delivery() {
        let history = Rc::new(NavigationHistory::new());
        let outcome = Rc::new(RefCell::new(None));

        let h = Rc::clone(&history);
        let o = Rc::clone(&outcome);
        let _sub = history.subscribe(move || {
            // reading is allowed
            let _ = h.url_state();
            *o.borrow_mut() = Some(h.on_new_url_state(state("/nested")));
        });

        history.on_new_url_state(state("/a")).unwrap();

        assert_eq!(
            outcome.borrow_mut().take(),
            Some(Err(NavigationError::ReentrantUpdate))
        );
        assert_eq!(history.url_state().path(), "/a");
    }

    #[test]
    fn test_limit_drops_oldest() {
        let history = NavigationHistory::with_limit(2);
        for path in ["/a", "/b", "/c", "/d"] {
            history.on_new_url_state(state(path)).unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.back().unwrap().map(|s| s.path().to_string()), Some("/c".into()));
        assert_eq!(history.back().unwrap().map(|s| s.path().to_string()), Some("/b".into()));
        assert_eq!(history.back().unwrap(), None);
    }

    #[test]
    fn test_restore_drops_later_entries() {
        let history = NavigationHistory::new();
        history.on_new_url_state(state("/a")).unwrap();
        let saved = history.snapshot();

        history.on_new_url_state(state("/b")).unwrap();
        history.on_new_url_state(state("/c")).unwrap();
        history.restore(saved).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.url_state().path(), "/a");
        assert_eq!(history.back().unwrap().map(|s| s.path().to_string()), Some("/".into()));
    }

    #[test]
    fn test_restore_notifies() {
        let history = NavigationHistory::new();
        let saved = history.snapshot();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = history.subscribe(move || c.set(c.get() + 1));

        history.restore(saved).unwrap();

        assert_eq!(count.get(), 1);
        assert!(history.url_state().is_root());
    }

    #[test]
    fn test_is_url_state_matching_path() {
        let history = NavigationHistory::new();
        history.on_new_url_state(state("/users/1")).unwrap();
        assert!(history.is_url_state_matching_path("/users/1/"));
        assert!(history.is_url_state_matching_path("/users/1?tab=a"));
        assert!(!history.is_url_state_matching_path("/users"));
    }
}
