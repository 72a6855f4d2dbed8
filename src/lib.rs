//! # Route Reconciler
//!
//! Keeps a URL-like location and an imperative stack of pages in sync, in
//! both directions:
//!
//! - **Platform → stack**: a location reported by the platform (address
//!   bar, deep link, back button) is matched against a route tree and the
//!   whole page stack is made to mirror the match, popping dialogs first.
//! - **Stack → platform**: every stack mutation produces a new
//!   [`UrlState`] the hosting adapter reports back.
//! - **Initial route** - override routes, override deep link, or the
//!   platform location, resolved exactly once.
//! - **Declarative mode** - an explicit page list instead of a matched URL,
//!   queued until the next build pass.
//! - **Page guards** - async per-route checks that deny or redirect.
//! - **Rebuild signal** - payload-free change notification with a cheap
//!   revision hash.
//!
//! Rendering, animation and the concrete navigator live outside this crate;
//! it talks to them through [`StackController`] and [`RouteMatcher`].
//!
//! # Quick Start
//!
//! ```
//! use route_reconciler::{
//!     DelegateOptions, MemoryStack, Route, RouteInformationParser, RouteTree, RouterDelegate,
//! };
//! use std::rc::Rc;
//!
//! let tree = Rc::new(RouteTree::new(vec![
//!     Route::new("").name("HomeRoute"),
//!     Route::new("users/:id")
//!         .name("UserRoute")
//!         .children(vec![Route::new("profile").name("ProfileRoute")]),
//! ]));
//! let parser = RouteInformationParser::new(tree.clone());
//! let stack = Rc::new(MemoryStack::new());
//! let delegate = RouterDelegate::new(stack.clone(), tree, DelegateOptions::new()).unwrap();
//!
//! pollster::block_on(async {
//!     delegate.set_initial_route_path(parser.parse("/")).await.unwrap();
//!     delegate
//!         .set_new_route_path(parser.parse("/users/42/profile"))
//!         .await
//!         .unwrap();
//! });
//!
//! let pages = stack.labels();
//! assert_eq!(pages, ["UserRoute", "ProfileRoute"]);
//! assert_eq!(delegate.current_configuration().path(), "/users/42/profile");
//! ```
//!
//! # Pageless entries
//!
//! Dialogs and overlays pushed with [`MemoryStack::push_pageless`] have no
//! location. A platform-driven navigation pops them before anything else:
//!
//! ```
//! use route_reconciler::{MemoryStack, NavigationHistory, Route, RouteReconciler, RouteTree};
//! use std::rc::Rc;
//!
//! let stack = Rc::new(MemoryStack::new());
//! let reconciler = RouteReconciler::new(
//!     stack.clone(),
//!     RouteTree::new(vec![Route::new("home").name("HomeRoute")]),
//! );
//! let history = NavigationHistory::new();
//!
//! stack.push_pageless("ConfirmDialog");
//! pollster::block_on(reconciler.navigate_to_path(&history, "/home")).unwrap();
//!
//! assert_eq!(stack.labels(), ["HomeRoute"]);
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `guard` (default) - Evaluates [`PageGuard`]s in [`MemoryStack`]
//! - `cache` (default) - LRU [`CachedMatcher`](cache::CachedMatcher) in front of any matcher

// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Location model
pub mod matching;
pub mod params;
pub mod parser;
pub mod route;
pub mod state;

// Error handling
pub mod error;

// Change tracking
pub mod history;
pub mod signal;

// Page stack
pub mod guards;
pub mod queue;
pub mod stack;

// Reconciliation
pub mod delegate;
pub mod reconcile;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, CachedMatcher};
pub use delegate::{DelegateOptions, InputSource, RouterDelegate};
pub use error::{NavigationError, NavigationResult};
pub use guards::{guard_fn, FnGuard, NavigationAction, NavigationRequest, PageGuard};
pub use history::{HistorySnapshot, NavigationHistory};
pub use matching::{RouteMatch, RouteMatcher};
pub use params::{QueryParams, RouteParams};
pub use parser::RouteInformationParser;
pub use queue::PendingRouteQueue;
pub use reconcile::{RouteReconciler, MAX_REDIRECT_DEPTH};
pub use route::{Route, RouteTree};
pub use signal::{RebuildSignal, StateHash, Subscription};
pub use stack::{MemoryStack, PageRouteRequest, StackController, StackEntry};
pub use state::UrlState;
