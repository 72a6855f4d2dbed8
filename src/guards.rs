//! Page guards.
//!
//! A guard is attached to a route name on a stack controller and is
//! consulted before a page for that route enters the stack. Guards decide
//! whether the transition continues, is denied, or is redirected.
//!
//! Guard checks are **asynchronous**: a guard may await its own lifecycle
//! (a confirmation prompt, a session refresh) before answering. The
//! reconciler awaits that answer before it reports completion.
//!
//! # Execution order
//!
//! Guards run in **priority order** (higher value first). The first
//! non-[`Continue`](NavigationAction::Continue) result short-circuits
//! evaluation.
//!
//! # Example
//!
//! ```
//! use route_reconciler::{guard_fn, NavigationAction, PageGuard};
//!
//! let guard = guard_fn(|request| {
//!     if request.to.starts_with("/admin") {
//!         NavigationAction::redirect("/login")
//!     } else {
//!         NavigationAction::Continue
//!     }
//! });
//! assert_eq!(guard.name(), "FnGuard");
//! ```

use crate::params::RouteParams;
use async_trait::async_trait;

// ============================================================================
// NavigationAction
// ============================================================================

/// Result of a guard check.
///
/// ```
/// use route_reconciler::NavigationAction;
///
/// let action = NavigationAction::deny("Not authorized");
/// assert!(action.is_deny());
///
/// let action = NavigationAction::redirect("/login");
/// assert_eq!(action.redirect_path(), Some("/login"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Allow navigation to proceed.
    Continue,

    /// Deny navigation with a reason.
    Deny {
        /// Human-readable reason for denying navigation.
        reason: String,
    },

    /// Redirect to a different path.
    Redirect {
        /// Path to redirect to.
        to: String,
        /// Optional human-readable reason for redirecting.
        reason: Option<String>,
    },
}

impl NavigationAction {
    /// Create a result that blocks navigation with a human-readable reason.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// Create a result that redirects navigation to a different path.
    pub fn redirect(to: impl Into<String>) -> Self {
        Self::Redirect {
            to: to.into(),
            reason: None,
        }
    }

    /// Create a redirect result with a human-readable reason.
    pub fn redirect_with_reason(to: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Redirect {
            to: to.into(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
    }

    /// Get the redirect path, if this is a redirect action.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirect { to, .. } => Some(to.as_str()),
            _ => None,
        }
    }
}

// ============================================================================
// NavigationRequest
// ============================================================================

/// What a guard gets to inspect.
///
/// ```
/// use route_reconciler::NavigationRequest;
///
/// let request = NavigationRequest::new("SettingsRoute", "/settings").with_from("/home");
/// assert_eq!(request.from.as_deref(), Some("/home"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Path of the current top page, if any.
    pub from: Option<String>,
    /// Name of the route being entered.
    pub route_name: String,
    /// Path of the page being entered.
    pub to: String,
    /// Parameters of the page being entered.
    pub params: RouteParams,
}

impl NavigationRequest {
    pub fn new(route_name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: None,
            route_name: route_name.into(),
            to: to.into(),
            params: RouteParams::new(),
        }
    }

    /// Set the source path.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set route parameters.
    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }
}

// ============================================================================
// PageGuard trait
// ============================================================================

/// Controls whether a page may enter the stack.
#[async_trait(?Send)]
pub trait PageGuard {
    /// Check if navigation should be allowed.
    async fn check(&self, request: &NavigationRequest) -> NavigationAction;

    /// Guard name for debugging and error messages.
    fn name(&self) -> &'static str {
        "PageGuard"
    }

    /// Priority for execution order. Higher runs first. Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

/// Create a guard from a synchronous closure.
pub const fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&NavigationRequest) -> NavigationAction + 'static,
{
    FnGuard { f }
}

/// Guard created from a closure.
pub struct FnGuard<F> {
    f: F,
}

#[async_trait(?Send)]
impl<F> PageGuard for FnGuard<F>
where
    F: Fn(&NavigationRequest) -> NavigationAction + 'static,
{
    async fn check(&self, request: &NavigationRequest) -> NavigationAction {
        (self.f)(request)
    }

    fn name(&self) -> &'static str {
        "FnGuard"
    }
}

/// Run `guards` against `request` in descending priority order.
///
/// Returns the first non-`Continue` answer, or `Continue`.
pub async fn run_guards(guards: &[&dyn PageGuard], request: &NavigationRequest) -> NavigationAction {
    let mut ordered: Vec<&dyn PageGuard> = guards.to_vec();
    ordered.sort_by_key(|g| std::cmp::Reverse(g.priority()));

    for guard in ordered {
        let action = guard.check(request).await;
        crate::trace_log!(
            "Guard '{}' (priority {}) → {:?} for '{}'",
            guard.name(),
            guard.priority(),
            action,
            request.to
        );
        if !action.is_continue() {
            return action;
        }
    }

    NavigationAction::Continue
}
