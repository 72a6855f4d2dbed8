//! The page stack the reconciler drives.
//!
//! [`StackController`] is the capability the reconciler consumes: the live
//! page list belongs to the controller, the reconciler only asks it to push,
//! navigate, or pop. Hosts with their own navigator implement the trait over
//! it; [`MemoryStack`] is a complete in-memory implementation for hosts
//! that render straight from a page list, and for tests.
//!
//! Navigation entry points are asynchronous because a page guard may
//! suspend before answering (see [`PageGuard`]).
//!
//! # Entries
//!
//! A [`StackEntry`] either carries a page (a [`RouteMatch`]) or is
//! *pageless*: a dialog or overlay with no addressable route. Pageless
//! entries never contribute to the reported URL.

use crate::error::NavigationResult;
#[cfg(feature = "guard")]
use crate::guards::{run_guards, NavigationAction, NavigationRequest, PageGuard};
use crate::matching::{flatten_matches, RouteMatch};
use crate::params::{QueryParams, RouteParams};
use crate::signal::{Listener, RebuildSignal, StateHash, Subscription};
use crate::{debug_log, trace_log};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// ============================================================================
// PageRouteRequest
// ============================================================================

/// A request to show one page (and, optionally, pages of its nested router).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRouteRequest {
    pub name: String,
    pub path: String,
    pub params: RouteParams,
    pub query: QueryParams,
    pub children: Vec<PageRouteRequest>,
}

impl PageRouteRequest {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            params: RouteParams::new(),
            query: QueryParams::new(),
            children: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn with_children(mut self, children: Vec<PageRouteRequest>) -> Self {
        self.children = children;
        self
    }

    /// Convert into the match the page will be tracked as.
    ///
    /// Requests don't know their route pattern; the concrete path stands in.
    pub fn to_route_match(&self) -> RouteMatch {
        RouteMatch::new(self.name.clone(), self.path.clone(), self.path.clone())
            .with_params(self.params.clone())
            .with_query(self.query.clone())
            .with_children(
                self.children
                    .iter()
                    .map(PageRouteRequest::to_route_match)
                    .collect(),
            )
    }
}

// ============================================================================
// StackEntry
// ============================================================================

/// One entry of the live stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackEntry {
    /// Unique, never reused within one stack.
    pub key: u64,
    /// `None` for pageless entries (dialogs, overlays).
    pub page: Option<RouteMatch>,
    /// Human-readable label, the route name for pages.
    pub label: String,
}

impl StackEntry {
    pub fn is_pageless(&self) -> bool {
        self.page.is_none()
    }

    pub fn page(&self) -> Option<&RouteMatch> {
        self.page.as_ref()
    }
}

// ============================================================================
// StackController
// ============================================================================

/// Operations the reconciler needs from the page stack.
#[async_trait(?Send)]
pub trait StackController {
    /// Append pages on top of the current stack.
    async fn push_all(&self, routes: Vec<PageRouteRequest>) -> NavigationResult;

    /// Make the whole stack (all nesting levels) mirror `matches`.
    ///
    /// Pages already in place are kept, extra entries are removed, missing
    /// ones are pushed. Calling it with a stack that already mirrors
    /// `matches` must not mutate anything.
    async fn navigate_all(&self, matches: &[RouteMatch]) -> NavigationResult;

    /// Replace the stack with a declaratively built page list.
    async fn update_declarative_routes(&self, routes: Vec<PageRouteRequest>) -> NavigationResult {
        let matches: Vec<RouteMatch> = routes.iter().map(PageRouteRequest::to_route_match).collect();
        self.navigate_all(&matches).await
    }

    /// Pop entries until `predicate` holds for the top entry.
    fn pop_until(&self, predicate: &dyn Fn(&StackEntry) -> bool);

    /// Pop the top entry if it is not the last page. Returns the popped entry.
    fn maybe_pop(&self) -> Option<StackEntry>;

    fn has_entries(&self) -> bool;

    /// Check if the top entry is pageless.
    fn has_pageless_top_route(&self) -> bool;

    /// The deepest active nested router, or `None` when this controller is
    /// itself the top-most one.
    fn top_most_router(&self) -> Option<Rc<dyn StackController>> {
        None
    }

    /// Fingerprint of the controller's current revision.
    fn state_hash(&self) -> StateHash;

    /// Flat list of the pages currently on the stack, bottom first.
    fn current_segments(&self) -> Vec<RouteMatch>;

    /// Listen for mutations. Controllers without change tracking return `None`.
    fn subscribe(&self, _listener: Listener) -> Option<Subscription> {
        None
    }
}

// ============================================================================
// MemoryStack
// ============================================================================

/// In-memory [`StackController`].
///
/// Keeps a flat list of entries: nested matches are flattened depth-first,
/// one entry per level. Every real mutation bumps the revision and notifies
/// subscribers; a no-op navigation does neither.
///
/// ```
/// use route_reconciler::{MemoryStack, RouteMatch, StackController};
///
/// let stack = MemoryStack::new();
/// let home = RouteMatch::new("HomeRoute", "", "/");
///
/// pollster::block_on(stack.navigate_all(&[home.clone()]));
/// let revision = stack.revision();
/// pollster::block_on(stack.navigate_all(&[home]));
///
/// assert_eq!(stack.len(), 1);
/// assert_eq!(stack.revision(), revision);
/// ```
#[derive(Default)]
pub struct MemoryStack {
    entries: RefCell<Vec<StackEntry>>,
    revision: Cell<u64>,
    next_key: Cell<u64>,
    signal: RebuildSignal,
    nested: RefCell<Option<Rc<dyn StackController>>>,
    #[cfg(feature = "guard")]
    guards: RefCell<Vec<(String, Rc<dyn PageGuard>)>>,
}

impl MemoryStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Guard every page of route `route_name`.
    #[cfg(feature = "guard")]
    pub fn add_guard(&self, route_name: impl Into<String>, guard: impl PageGuard + 'static) {
        self.guards
            .borrow_mut()
            .push((route_name.into(), Rc::new(guard)));
    }

    /// Attach (or detach) the active nested router.
    pub fn set_nested_router(&self, nested: Option<Rc<dyn StackController>>) {
        *self.nested.borrow_mut() = nested;
    }

    /// Push a pageless entry (dialog, overlay) on top.
    pub fn push_pageless(&self, label: impl Into<String>) {
        let label = label.into();
        trace_log!("Pushing pageless entry '{}'", label);
        let entry = StackEntry {
            key: self.allocate_key(),
            page: None,
            label,
        };
        self.entries.borrow_mut().push(entry);
        self.commit();
    }

    /// Snapshot of all entries, bottom first.
    pub fn entries(&self) -> Vec<StackEntry> {
        self.entries.borrow().clone()
    }

    /// Route names of all entries (pageless entries by label), bottom first.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|e| e.label.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision.get()
    }

    fn allocate_key(&self) -> u64 {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        key
    }

    fn page_entry(&self, page: RouteMatch) -> StackEntry {
        StackEntry {
            key: self.allocate_key(),
            label: page.name.clone(),
            page: Some(page),
        }
    }

    fn top_path(&self) -> Option<String> {
        self.entries
            .borrow()
            .iter()
            .rev()
            .find_map(|e| e.page.as_ref().map(|p| p.path.clone()))
    }

    /// Length of the leading run of entries that already show `target`.
    fn common_prefix(&self, target: &[RouteMatch]) -> usize {
        self.entries
            .borrow()
            .iter()
            .zip(target)
            .take_while(|(entry, wanted)| entry.page().is_some_and(|p| p.is_same_page(wanted)))
            .count()
    }

    /// Bump the revision and tell subscribers. No borrow may be held.
    fn commit(&self) {
        self.revision.set(self.revision.get() + 1);
        self.signal.notify();
    }

    /// Ask the guards of every page in `pages`.
    ///
    /// Returns `Some(outcome)` when a guard refused.
    #[cfg(feature = "guard")]
    async fn check_guards(&self, pages: &[RouteMatch]) -> Option<NavigationResult> {
        let from = self.top_path();

        for page in pages {
            let guards: Vec<Rc<dyn PageGuard>> = self
                .guards
                .borrow()
                .iter()
                .filter(|(name, _)| *name == page.name)
                .map(|(_, g)| Rc::clone(g))
                .collect();
            if guards.is_empty() {
                continue;
            }

            let mut request = NavigationRequest::new(page.name.clone(), page.path.clone())
                .with_params(page.params.clone());
            request.from = from.clone();

            let refs: Vec<&dyn PageGuard> = guards.iter().map(AsRef::as_ref).collect();
            match run_guards(&refs, &request).await {
                NavigationAction::Continue => {}
                NavigationAction::Deny { reason } => {
                    debug_log!("Guard denied '{}': {}", page.path, reason);
                    return Some(NavigationResult::Blocked {
                        reason,
                        redirect: None,
                    });
                }
                NavigationAction::Redirect { to, reason } => {
                    debug_log!("Guard redirected '{}' → '{}'", page.path, to);
                    return Some(NavigationResult::Blocked {
                        reason: reason.unwrap_or_else(|| format!("Redirected to {}", to)),
                        redirect: Some(to),
                    });
                }
            }
        }

        None
    }

    #[cfg(not(feature = "guard"))]
    #[allow(clippy::unused_async)]
    async fn check_guards(&self, _pages: &[RouteMatch]) -> Option<NavigationResult> {
        None
    }
}

#[async_trait(?Send)]
impl StackController for MemoryStack {
    async fn push_all(&self, routes: Vec<PageRouteRequest>) -> NavigationResult {
        let matches: Vec<RouteMatch> = routes.iter().map(PageRouteRequest::to_route_match).collect();
        let pages = flatten_matches(&matches);

        if let Some(blocked) = self.check_guards(&pages).await {
            return blocked;
        }

        let path = pages
            .last()
            .map(|p| p.path.clone())
            .or_else(|| self.top_path())
            .unwrap_or_else(|| "/".to_string());

        if pages.is_empty() {
            return NavigationResult::Success { path };
        }

        debug_log!("Pushing {} pages, top '{}'", pages.len(), path);
        {
            let new_entries: Vec<StackEntry> =
                pages.into_iter().map(|p| self.page_entry(p)).collect();
            self.entries.borrow_mut().extend(new_entries);
        }
        self.commit();

        NavigationResult::Success { path }
    }

    async fn navigate_all(&self, matches: &[RouteMatch]) -> NavigationResult {
        let target = flatten_matches(matches);
        let path = target
            .last()
            .map(|p| p.path.clone())
            .unwrap_or_else(|| "/".to_string());

        // Pages from `checked` on have passed their guards. A guard may
        // suspend while the host pops entries, so measure the live list again
        // and check whatever that exposed.
        let mut checked = target.len();
        let mut keep = self.common_prefix(&target);
        while keep < checked {
            if let Some(blocked) = self.check_guards(&target[keep..checked]).await {
                return blocked;
            }
            checked = keep;
            keep = self.common_prefix(&target);
        }

        if keep == target.len() && keep == self.len() {
            trace_log!("Stack already mirrors '{}'", path);
            return NavigationResult::Success { path };
        }

        debug_log!(
            "Navigating to '{}': keeping {} entries, pushing {}",
            path,
            keep,
            target.len() - keep
        );
        {
            let new_entries: Vec<StackEntry> = target[keep..]
                .iter()
                .cloned()
                .map(|p| self.page_entry(p))
                .collect();
            let mut entries = self.entries.borrow_mut();
            entries.truncate(keep);
            entries.extend(new_entries);
        }
        self.commit();

        NavigationResult::Success { path }
    }

    fn pop_until(&self, predicate: &dyn Fn(&StackEntry) -> bool) {
        let mut popped = 0;
        loop {
            let top = self.entries.borrow().last().cloned();
            match top {
                Some(entry) if !predicate(&entry) => {
                    trace_log!("Popping '{}'", entry.label);
                    self.entries.borrow_mut().pop();
                    popped += 1;
                }
                _ => break,
            }
        }
        if popped > 0 {
            self.commit();
        }
    }

    fn maybe_pop(&self) -> Option<StackEntry> {
        let popped = {
            let mut entries = self.entries.borrow_mut();
            let pages = entries.iter().filter(|e| !e.is_pageless()).count();
            let top_is_pageless = entries.last().is_some_and(StackEntry::is_pageless);
            if top_is_pageless || pages > 1 {
                entries.pop()
            } else {
                None
            }
        };
        if popped.is_some() {
            self.commit();
        }
        popped
    }

    fn has_entries(&self) -> bool {
        !self.entries.borrow().is_empty()
    }

    fn has_pageless_top_route(&self) -> bool {
        self.entries
            .borrow()
            .last()
            .is_some_and(StackEntry::is_pageless)
    }

    fn top_most_router(&self) -> Option<Rc<dyn StackController>> {
        let nested = self.nested.borrow().clone()?;
        Some(nested.top_most_router().unwrap_or(nested))
    }

    fn state_hash(&self) -> StateHash {
        StateHash::from_revision(self.revision.get())
    }

    fn current_segments(&self) -> Vec<RouteMatch> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| e.page.clone())
            .collect()
    }

    fn subscribe(&self, listener: Listener) -> Option<Subscription> {
        Some(self.signal.subscribe_rc(listener))
    }
}

impl std::fmt::Debug for MemoryStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStack")
            .field("labels", &self.labels())
            .field("revision", &self.revision.get())
            .finish_non_exhaustive()
    }
}
