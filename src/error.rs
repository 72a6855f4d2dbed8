//! Error handling for the reconciler.
//!
//! Two types cover every failure path:
//!
//! - [`NavigationError`]: what went wrong. Construction and resolution
//!   errors are fatal for the hosting adapter; a missing route is reported
//!   but leaves the stack untouched; guard rejections are recovered inside
//!   the stack controller and never escape [`RouteReconciler`](crate::RouteReconciler).
//! - [`NavigationResult`]: the outcome a
//!   [`StackController`](crate::StackController) reports for one mutation.
//!
//! # Examples
//!
//! ```
//! use route_reconciler::{NavigationError, NavigationResult};
//!
//! let err = NavigationError::RouteNotFound { path: "/unknown".into() };
//! assert_eq!(err.to_string(), "Route not found: /unknown");
//! assert!(!err.is_fatal());
//!
//! let blocked = NavigationResult::Blocked {
//!     reason: "Not authenticated".into(),
//!     redirect: Some("/login".into()),
//! };
//! assert_eq!(blocked.redirect_path(), Some("/login"));
//! ```

use thiserror::Error;

/// Failure raised while resolving or reconciling a navigation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// The delegate was configured with mutually exclusive options.
    #[error("Invalid router configuration: {message}")]
    Construction { message: String },

    /// No first page could be determined during initial resolution.
    #[error("Can not resolve initial route: {message}")]
    Resolution { message: String },

    /// A non-empty path matched zero routes.
    #[error("Route not found: {path}")]
    RouteNotFound { path: String },

    /// Guard redirects kept bouncing between routes.
    #[error("Redirect loop detected (depth {depth}): target '{path}'")]
    RedirectLoop { path: String, depth: usize },

    /// A history listener tried to mutate the history it is being notified about.
    #[error("Navigation history mutated while notifying listeners")]
    ReentrantUpdate,
}

impl NavigationError {
    /// Fatal errors leave the hosting adapter without a page to show.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NavigationError::Construction { .. } | NavigationError::Resolution { .. }
        )
    }

    /// Check if this is a match failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, NavigationError::RouteNotFound { .. })
    }
}

/// Outcome of a single stack mutation.
///
/// Stack controllers return this from every navigation entry point. A
/// `Blocked` outcome means the controller kept its previous pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// The stack now mirrors the requested pages.
    Success { path: String },
    /// A guard refused the transition
    Blocked {
        reason: String,
        redirect: Option<String>,
    },
}

impl NavigationResult {
    /// Check if navigation was successful
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success { .. })
    }

    /// Check if navigation was blocked
    pub fn is_blocked(&self) -> bool {
        matches!(self, NavigationResult::Blocked { .. })
    }

    /// Get redirect path if blocked with redirect
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            NavigationResult::Blocked {
                redirect: Some(path),
                ..
            } => Some(path),
            _ => None,
        }
    }
}
