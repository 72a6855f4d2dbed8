//! The control loop between an incoming [`UrlState`] and the page stack.
//!
//! [`RouteReconciler`] owns no navigation state. It holds the
//! [`StackController`] handle, a [`RouteMatcher`], and a lock that keeps
//! reconciliations for one controller strictly sequential. The history it
//! updates is passed in by the caller.
//!
//! # One pass
//!
//! 1. A non-root target without segments is a match failure: the stack is
//!    left exactly as it was and [`NavigationError::RouteNotFound`] is
//!    returned.
//! 2. Pageless entries (dialogs, overlays) on top of the top-most router are
//!    popped, so the navigation always targets a real page.
//! 3. The root target without segments only notifies history listeners.
//! 4. Otherwise the target is flattened, recorded in history and the whole
//!    stack is asked to mirror it.
//!
//! A guard rejection is not an error: history is restored to what it was
//! before the pass and the pass completes. A guard redirect is re-matched
//! and retried, at most [`MAX_REDIRECT_DEPTH`] times.

use crate::error::{NavigationError, NavigationResult};
use crate::history::NavigationHistory;
use crate::matching::RouteMatcher;
use crate::stack::{PageRouteRequest, StackController};
use crate::state::UrlState;
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use futures::lock::Mutex;
use std::rc::Rc;

/// How many guard redirects one navigation may follow.
pub const MAX_REDIRECT_DEPTH: usize = 5;

/// Drives a [`StackController`] from [`UrlState`] targets.
///
/// ```
/// use route_reconciler::{
///     MemoryStack, NavigationHistory, Route, RouteReconciler, RouteTree,
/// };
/// use std::rc::Rc;
///
/// let tree = RouteTree::new(vec![
///     Route::new("users/:id")
///         .name("UserRoute")
///         .children(vec![Route::new("profile").name("ProfileRoute")]),
/// ]);
/// let stack = Rc::new(MemoryStack::new());
/// let reconciler = RouteReconciler::new(stack.clone(), tree);
/// let history = NavigationHistory::new();
///
/// pollster::block_on(reconciler.navigate_to_path(&history, "/users/42/profile")).unwrap();
///
/// assert_eq!(stack.labels(), ["UserRoute", "ProfileRoute"]);
/// assert_eq!(history.url_state().path(), "/users/42/profile");
/// ```
pub struct RouteReconciler<M> {
    controller: Rc<dyn StackController>,
    matcher: M,
    in_flight: Mutex<()>,
}

impl<M: RouteMatcher> RouteReconciler<M> {
    pub fn new(controller: Rc<dyn StackController>, matcher: M) -> Self {
        Self {
            controller,
            matcher,
            in_flight: Mutex::new(()),
        }
    }

    pub fn controller(&self) -> &Rc<dyn StackController> {
        &self.controller
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }

    /// Check if a reconciliation is currently in flight.
    pub fn is_reconciling(&self) -> bool {
        self.in_flight.try_lock().is_none()
    }

    /// Make the stack mirror `target`.
    ///
    /// Waits for any reconciliation already in flight on this reconciler.
    pub async fn reconcile(
        &self,
        history: &NavigationHistory,
        target: UrlState,
    ) -> Result<(), NavigationError> {
        let _serial = self.in_flight.lock().await;
        self.reconcile_locked(history, target).await
    }

    /// Match `location` exactly and reconcile to the result.
    pub async fn navigate_to_path(
        &self,
        history: &NavigationHistory,
        location: &str,
    ) -> Result<(), NavigationError> {
        let segments = self.matcher.match_path(location, false);
        self.reconcile(history, UrlState::new(location, segments)).await
    }

    /// Prefix-match `link` and push the matched pages on top of the stack.
    ///
    /// Fails with [`NavigationError::RouteNotFound`] when no route accepts
    /// the first segment of `link`; index routes alone do not count.
    pub async fn push_deep_link(
        &self,
        history: &NavigationHistory,
        link: &str,
    ) -> Result<(), NavigationError> {
        let segments = self.matcher.match_path(link, true);
        if segments.is_empty() {
            warn_log!("Deep link '{}' matched no route", link);
            return Err(NavigationError::RouteNotFound {
                path: link.to_string(),
            });
        }

        let routes = segments
            .iter()
            .map(crate::matching::RouteMatch::to_page_route_request)
            .collect();
        self.push_routes(history, routes).await
    }

    /// Append `routes` to the stack and record the resulting location.
    pub async fn push_routes(
        &self,
        history: &NavigationHistory,
        routes: Vec<PageRouteRequest>,
    ) -> Result<(), NavigationError> {
        let _serial = self.in_flight.lock().await;
        let outcome = self.controller.push_all(routes).await;
        self.settle(history, outcome).await
    }

    /// Replace the whole stack with a declaratively built list.
    pub async fn replace_routes(
        &self,
        history: &NavigationHistory,
        routes: Vec<PageRouteRequest>,
    ) -> Result<(), NavigationError> {
        let _serial = self.in_flight.lock().await;
        let outcome = self.controller.update_declarative_routes(routes).await;
        self.settle(history, outcome).await
    }

    /// Finish a list-driven mutation: record the new location, or follow a
    /// guard redirect.
    async fn settle(
        &self,
        history: &NavigationHistory,
        outcome: NavigationResult,
    ) -> Result<(), NavigationError> {
        match outcome {
            NavigationResult::Success { path } => {
                info_log!("Applied route list, top is now '{}'", path);
                self.sync_history(history)
            }
            NavigationResult::Blocked {
                reason,
                redirect: None,
            } => {
                warn_log!("Route list blocked by guard: {}", reason);
                Ok(())
            }
            NavigationResult::Blocked {
                redirect: Some(to), ..
            } => {
                let target = self.redirect_target(&to)?;
                self.navigate_locked(history, target).await
            }
        }
    }

    /// Record what the stack currently shows as the current history entry.
    pub fn sync_history(&self, history: &NavigationHistory) -> Result<(), NavigationError> {
        let shown = UrlState::from_segments(self.controller.current_segments());
        history.on_new_url_state(shown)
    }

    /// Pop pageless entries off the top-most router and off the root.
    pub fn clear_pageless_top(&self) {
        let top = self
            .controller
            .top_most_router()
            .unwrap_or_else(|| Rc::clone(&self.controller));

        for router in [top, Rc::clone(&self.controller)] {
            if router.has_pageless_top_route() {
                debug_log!("Popping pageless entries before navigating");
                router.pop_until(&|entry| !entry.is_pageless());
            }
        }
    }

    async fn reconcile_locked(
        &self,
        history: &NavigationHistory,
        target: UrlState,
    ) -> Result<(), NavigationError> {
        trace_log!("Reconciling to '{}'", target.path());

        if !target.has_segments() && !target.is_root() {
            warn_log!("No route matched '{}', stack left unchanged", target.path());
            return Err(NavigationError::RouteNotFound {
                path: target.path().to_string(),
            });
        }

        self.clear_pageless_top();

        if !target.has_segments() {
            debug_log!("Empty target, notifying listeners only");
            history.signal().notify();
            return Ok(());
        }

        self.navigate_locked(history, target.flatten()).await
    }

    /// Navigate to an already flattened state, following guard redirects.
    ///
    /// History is left as it was found unless the controller accepts a
    /// target.
    async fn navigate_locked(
        &self,
        history: &NavigationHistory,
        mut canonical: UrlState,
    ) -> Result<(), NavigationError> {
        let before = history.snapshot();
        let mut redirects = 0;

        loop {
            history.on_new_url_state(canonical.clone())?;

            match self.controller.navigate_all(canonical.segments()).await {
                NavigationResult::Success { path } => {
                    info_log!("Reconciled stack to '{}'", path);
                    return Ok(());
                }
                NavigationResult::Blocked {
                    reason,
                    redirect: None,
                } => {
                    warn_log!("Navigation to '{}' blocked: {}", canonical.path(), reason);
                    return history.restore(before);
                }
                NavigationResult::Blocked {
                    redirect: Some(to), ..
                } => {
                    redirects += 1;
                    if redirects > MAX_REDIRECT_DEPTH {
                        error_log!(
                            "Redirect loop at '{}' after {} redirects",
                            to,
                            MAX_REDIRECT_DEPTH
                        );
                        history.restore(before)?;
                        return Err(NavigationError::RedirectLoop {
                            path: to,
                            depth: MAX_REDIRECT_DEPTH,
                        });
                    }
                    debug_log!("Following guard redirect '{}' → '{}'", canonical.path(), to);
                    canonical = match self.redirect_target(&to) {
                        Ok(next) => next.with_replace(true),
                        Err(err) => {
                            history.restore(before)?;
                            return Err(err);
                        }
                    };
                }
            }
        }
    }

    /// Match a guard redirect location exactly.
    fn redirect_target(&self, to: &str) -> Result<UrlState, NavigationError> {
        let segments = self.matcher.match_path(to, false);
        if segments.is_empty() {
            warn_log!("Guard redirect target '{}' matched no route", to);
            return Err(NavigationError::RouteNotFound {
                path: to.to_string(),
            });
        }
        Ok(UrlState::new(to, segments).flatten())
    }
}

impl<M> std::fmt::Debug for RouteReconciler<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteReconciler")
            .field("state_hash", &self.controller.state_hash())
            .finish_non_exhaustive()
    }
}
