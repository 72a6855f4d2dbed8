//! The hosting adapter's entry point.
//!
//! [`RouterDelegate`] ties a [`RouteReconciler`], a [`NavigationHistory`]
//! and a [`PendingRouteQueue`] together and exposes the two directions of
//! synchronization:
//!
//! - platform → stack: [`set_initial_route_path`](RouterDelegate::set_initial_route_path)
//!   once, then [`set_new_route_path`](RouterDelegate::set_new_route_path)
//!   for every platform-driven location change;
//! - stack → platform: [`current_configuration`](RouterDelegate::current_configuration),
//!   re-read after every rebuild notification.
//!
//! # Initial route
//!
//! The first page is picked once per delegate, first match wins:
//!
//! 1. [`DelegateOptions::initial_routes`], pushed as-is;
//! 2. [`DelegateOptions::initial_deep_link`], prefix-matched and pushed;
//! 3. the platform's location, reconciled (or queued in declarative mode);
//! 4. otherwise [`NavigationError::Resolution`].
//!
//! Calling it again, or calling it on a controller that already has
//! entries, is a no-op.
//!
//! # Input sources
//!
//! In [`InputSource::Url`] mode locations are matched and reconciled. In
//! [`InputSource::Declarative`] mode a location only fills the pending
//! queue; the host then runs [`apply_declarative_routes`](RouterDelegate::apply_declarative_routes)
//! on its next build pass, where the routes builder decides the final page list.
//!
//! # Example
//!
//! ```
//! use route_reconciler::{
//!     DelegateOptions, MemoryStack, Route, RouteInformationParser, RouteTree, RouterDelegate,
//! };
//! use std::rc::Rc;
//!
//! let tree = Rc::new(RouteTree::new(vec![
//!     Route::new("").name("HomeRoute"),
//!     Route::new("settings").name("SettingsRoute"),
//! ]));
//! let parser = RouteInformationParser::new(tree.clone());
//! let stack = Rc::new(MemoryStack::new());
//!
//! let delegate = RouterDelegate::new(stack.clone(), tree, DelegateOptions::new()).unwrap();
//!
//! pollster::block_on(delegate.set_initial_route_path(parser.parse("/"))).unwrap();
//! pollster::block_on(delegate.set_new_route_path(parser.parse("/settings"))).unwrap();
//!
//! assert_eq!(stack.labels(), ["SettingsRoute"]);
//! assert_eq!(parser.restore(&delegate.current_configuration()), "/settings");
//! ```

use crate::error::NavigationError;
use crate::history::NavigationHistory;
use crate::matching::{flatten_matches, RouteMatch, RouteMatcher};
use crate::queue::PendingRouteQueue;
use crate::reconcile::RouteReconciler;
use crate::signal::{RebuildSignal, StateHash, Subscription};
use crate::stack::{PageRouteRequest, StackController, StackEntry};
use crate::state::UrlState;
use crate::{debug_log, error_log, info_log, warn_log};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Builds the page list in declarative mode. May drain the pending queue.
pub type RoutesBuilder = Box<dyn Fn(&mut PendingRouteQueue) -> Vec<PageRouteRequest>>;

/// Observer of every reconciled location.
pub type NavigateObserver = Box<dyn Fn(&UrlState)>;

/// Observer of recoverable failures (unmatched locations).
pub type ErrorObserver = Box<dyn Fn(&NavigationError)>;

/// Observer of entries popped through [`RouterDelegate::pop_route`].
pub type PopObserver = Box<dyn Fn(&StackEntry)>;

/// Where the page list comes from.
#[derive(Default)]
pub enum InputSource {
    /// Locations are matched and the stack reconciled against the matches.
    #[default]
    Url,
    /// Locations fill the pending queue; `routes` builds the page list.
    Declarative { routes: RoutesBuilder },
}

impl InputSource {
    pub fn is_declarative(&self) -> bool {
        matches!(self, Self::Declarative { .. })
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url => f.write_str("Url"),
            Self::Declarative { .. } => f.write_str("Declarative"),
        }
    }
}

// ============================================================================
// DelegateOptions
// ============================================================================

/// Construction options for [`RouterDelegate`].
///
/// Empty initial routes and an empty deep link count as not supplied.
///
/// ```
/// use route_reconciler::{DelegateOptions, PageRouteRequest};
///
/// let options = DelegateOptions::new()
///     .initial_routes(vec![PageRouteRequest::new("HomeRoute", "/")])
///     .on_navigate(|state| println!("now at {}", state.path()));
/// assert!(options.validate().is_ok());
///
/// let conflicting = DelegateOptions::new()
///     .initial_routes(vec![PageRouteRequest::new("HomeRoute", "/")])
///     .initial_deep_link("/settings");
/// assert!(conflicting.validate().is_err());
/// ```
#[derive(Default)]
pub struct DelegateOptions {
    initial_routes: Option<Vec<PageRouteRequest>>,
    initial_deep_link: Option<String>,
    on_navigate: Option<NavigateObserver>,
    on_error: Option<ErrorObserver>,
    on_pop_route: Option<PopObserver>,
    input: InputSource,
}

impl DelegateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages to show first, regardless of the platform location.
    pub fn initial_routes(mut self, routes: Vec<PageRouteRequest>) -> Self {
        self.initial_routes = Some(routes).filter(|r| !r.is_empty());
        self
    }

    /// Location to deep-link into first, regardless of the platform location.
    pub fn initial_deep_link(mut self, link: impl Into<String>) -> Self {
        self.initial_deep_link = Some(link.into()).filter(|l| !l.is_empty());
        self
    }

    /// Called after every successful reconciliation with the incoming state.
    pub fn on_navigate(mut self, observer: impl Fn(&UrlState) + 'static) -> Self {
        self.on_navigate = Some(Box::new(observer));
        self
    }

    /// Called with every match failure before it is returned.
    pub fn on_error(mut self, observer: impl Fn(&NavigationError) + 'static) -> Self {
        self.on_error = Some(Box::new(observer));
        self
    }

    /// Called with every entry popped by the host's back action.
    pub fn on_pop_route(mut self, observer: impl Fn(&StackEntry) + 'static) -> Self {
        self.on_pop_route = Some(Box::new(observer));
        self
    }

    /// Switch to declarative mode.
    pub fn declarative(
        mut self,
        routes: impl Fn(&mut PendingRouteQueue) -> Vec<PageRouteRequest> + 'static,
    ) -> Self {
        self.input = InputSource::Declarative {
            routes: Box::new(routes),
        };
        self
    }

    /// Check the options for contradictions.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if self.initial_routes.is_some() && self.initial_deep_link.is_some() {
            return Err(NavigationError::Construction {
                message: "initial routes and an initial deep link cannot both be supplied"
                    .to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for DelegateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateOptions")
            .field("initial_routes", &self.initial_routes)
            .field("initial_deep_link", &self.initial_deep_link)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouterDelegate
// ============================================================================

/// Keeps a [`StackController`] and the reported location in sync.
pub struct RouterDelegate<M> {
    reconciler: RouteReconciler<M>,
    history: NavigationHistory,
    pending: RefCell<PendingRouteQueue>,
    signal: RebuildSignal,
    initialized: Cell<bool>,
    options: DelegateOptions,
    _forwarders: Vec<Subscription>,
}

impl<M: RouteMatcher> RouterDelegate<M> {
    /// Create a delegate.
    ///
    /// Fails with [`NavigationError::Construction`] when the options both
    /// supply initial routes and an initial deep link.
    pub fn new(
        controller: Rc<dyn StackController>,
        matcher: M,
        options: DelegateOptions,
    ) -> Result<Self, NavigationError> {
        if let Err(err) = options.validate() {
            error_log!("Invalid delegate options: {}", err);
            return Err(err);
        }

        let history = NavigationHistory::new();
        let signal = RebuildSignal::new();

        let mut forwarders = Vec::with_capacity(2);
        let forward = signal.clone();
        forwarders.push(history.subscribe(move || forward.notify()));
        let forward = signal.clone();
        if let Some(sub) = controller.subscribe(Rc::new(move || forward.notify())) {
            forwarders.push(sub);
        }

        Ok(Self {
            reconciler: RouteReconciler::new(controller, matcher),
            history,
            pending: RefCell::new(PendingRouteQueue::new()),
            signal,
            initialized: Cell::new(false),
            options,
            _forwarders: forwarders,
        })
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn reconciler(&self) -> &RouteReconciler<M> {
        &self.reconciler
    }

    pub fn controller(&self) -> &Rc<dyn StackController> {
        self.reconciler.controller()
    }

    pub fn is_declarative(&self) -> bool {
        self.options.input.is_declarative()
    }

    /// Resolve the first page. Only the first call on an empty controller
    /// does anything.
    pub async fn set_initial_route_path(&self, platform: UrlState) -> Result<(), NavigationError> {
        if self.initialized.replace(true) {
            debug_log!("Initial route already resolved, ignoring '{}'", platform.path());
            return Ok(());
        }
        if self.controller().has_entries() {
            debug_log!("Controller already has entries, skipping initial route");
            return Ok(());
        }

        // Declarative locations are only queued; the stack fills on the
        // next build pass.
        let expects_page = if let Some(routes) = &self.options.initial_routes {
            info_log!("Resolving initial route from {} override routes", routes.len());
            self.reconciler
                .push_routes(&self.history, routes.clone())
                .await?;
            true
        } else if let Some(link) = &self.options.initial_deep_link {
            info_log!("Resolving initial route from deep link '{}'", link);
            self.reconciler
                .push_deep_link(&self.history, link)
                .await
                .map_err(|err| match err {
                    NavigationError::RouteNotFound { path } => NavigationError::Resolution {
                        message: format!("initial deep link '{}' matched no route", path),
                    },
                    other => other,
                })?;
            true
        } else if platform.has_segments() {
            info_log!("Resolving initial route from platform location '{}'", platform.path());
            self.accept_location(platform.clone()).await?;
            !self.is_declarative()
        } else {
            error_log!("No initial route for platform location '{}'", platform.path());
            return Err(NavigationError::Resolution {
                message: format!("no route matches initial location '{}'", platform.path()),
            });
        };

        if expects_page && !self.controller().has_entries() {
            error_log!("Initial route for '{}' was blocked, no page to show", platform.path());
            return Err(NavigationError::Resolution {
                message: format!("initial route for '{}' was blocked by a guard", platform.path()),
            });
        }

        self.notify_navigate(&platform);
        Ok(())
    }

    /// Follow a platform-driven location change.
    ///
    /// Match failures are passed to the error observer and returned; the
    /// stack is left unchanged.
    pub async fn set_new_route_path(&self, target: UrlState) -> Result<(), NavigationError> {
        match self.accept_location(target.clone()).await {
            Ok(()) => {
                self.notify_navigate(&target);
                Ok(())
            }
            Err(err) => {
                if err.is_not_found() {
                    if let Some(on_error) = &self.options.on_error {
                        on_error(&err);
                    }
                }
                Err(err)
            }
        }
    }

    /// Route a location through the configured input source.
    async fn accept_location(&self, target: UrlState) -> Result<(), NavigationError> {
        match &self.options.input {
            InputSource::Url => self.reconciler.reconcile(&self.history, target).await,
            InputSource::Declarative { .. } => {
                if !target.has_segments() && !target.is_root() {
                    warn_log!("No route matched '{}', nothing queued", target.path());
                    return Err(NavigationError::RouteNotFound {
                        path: target.path().to_string(),
                    });
                }
                if target.has_segments() {
                    let routes = flatten_matches(target.segments())
                        .iter()
                        .map(RouteMatch::to_page_route_request)
                        .collect();
                    self.pending.borrow_mut().set_pending(routes);
                }
                self.signal.notify();
                Ok(())
            }
        }
    }

    /// Declarative build pass: let the routes builder produce the page list
    /// and make the stack show it. A no-op in URL mode.
    pub async fn apply_declarative_routes(&self) -> Result<(), NavigationError> {
        let InputSource::Declarative { routes } = &self.options.input else {
            return Ok(());
        };

        let list = {
            let mut pending = self.pending.borrow_mut();
            routes(&mut *pending)
        };
        debug_log!("Applying {} declarative routes", list.len());
        self.reconciler.replace_routes(&self.history, list).await
    }

    /// Snapshot of the pending declarative routes.
    pub fn pending_routes(&self) -> Option<Vec<PageRouteRequest>> {
        self.pending.borrow().peek().map(<[PageRouteRequest]>::to_vec)
    }

    /// The location to report to the platform.
    pub fn current_configuration(&self) -> UrlState {
        self.history.url_state()
    }

    /// Fingerprint of the controller's current revision.
    pub fn url_state_hash(&self) -> StateHash {
        self.controller().state_hash()
    }

    /// Check if the controller changed since the last call.
    ///
    /// The first call always reports a change.
    pub fn should_rebuild(&self) -> bool {
        self.signal.observe_hash(self.url_state_hash())
    }

    /// Listen for anything that requires a rebuild: history updates, stack
    /// mutations, forced rebuilds.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.signal.subscribe(listener)
    }

    pub fn force_rebuild(&self) {
        self.signal.notify();
    }

    /// Re-derive the reported location from what the stack shows.
    ///
    /// Call after mutating the controller directly.
    pub fn notify_url_changed(&self) -> Result<(), NavigationError> {
        self.reconciler.sync_history(&self.history)
    }

    /// Back action: pop the top entry of the top-most router.
    ///
    /// Returns `false` when there was nothing to pop.
    pub fn pop_route(&self) -> Result<bool, NavigationError> {
        let root = Rc::clone(self.controller());
        let popped = match root.top_most_router() {
            Some(nested) => nested.maybe_pop().or_else(|| root.maybe_pop()),
            None => root.maybe_pop(),
        };

        let Some(entry) = popped else {
            debug_log!("Nothing to pop");
            return Ok(false);
        };

        debug_log!("Popped '{}'", entry.label);
        if let Some(on_pop_route) = &self.options.on_pop_route {
            on_pop_route(&entry);
        }
        self.notify_url_changed()?;
        Ok(true)
    }

    fn notify_navigate(&self, state: &UrlState) {
        if let Some(on_navigate) = &self.options.on_navigate {
            on_navigate(state);
        }
    }
}

impl<M> fmt::Debug for RouterDelegate<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterDelegate")
            .field("url_state", &self.history.url_state())
            .field("initialized", &self.initialized.get())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
