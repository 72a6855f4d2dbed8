//! Route definitions and a segment-based [`RouteMatcher`].
//!
//! [`RouteTree`] is the matcher most hosts plug into the reconciler. It
//! walks a tree of [`Route`]s one segment at a time:
//!
//! - literal segments must be equal (`users`)
//! - `:name` segments capture a parameter (`:id`)
//! - a `*` / `*name` segment swallows the rest of the path
//! - an empty path (`""`) is an index route, or a layout when it has children
//! - [`Route::redirect`] re-matches another absolute path
//!
//! # Prefix matching
//!
//! With `prefix_only = false` the first route chain that consumes the whole
//! path wins. With `prefix_only = true` every top-level route that matches a
//! leading part of the path is returned, in declaration order, until one
//! consumes the whole path. This is how a deep link such as `/books/7`
//! becomes the stack `[Home, Books, Book(7)]`. A path whose first segment
//! no route accepts has no prefix match, even when an index route exists.
//!
//! ```
//! use route_reconciler::{Route, RouteMatcher, RouteTree};
//!
//! let tree = RouteTree::new(vec![
//!     Route::new("").name("HomeRoute"),
//!     Route::new("books").name("BooksRoute"),
//!     Route::new("books/:id").name("BookRoute"),
//! ]);
//!
//! let exact = tree.match_path("/books/7", false);
//! assert_eq!(exact.len(), 1);
//! assert_eq!(exact[0].params.get("id"), Some("7"));
//!
//! let names: Vec<_> = tree
//!     .match_path("/books/7", true)
//!     .into_iter()
//!     .map(|m| m.name)
//!     .collect();
//! assert_eq!(names, ["HomeRoute", "BooksRoute", "BookRoute"]);
//! ```

use crate::matching::{
    extract_param_name, is_wildcard_segment, join_path, split_path, RouteMatch, RouteMatcher,
};
use crate::params::{QueryParams, RouteParams};
use crate::{trace_log, warn_log};

/// Maximum nesting depth (including redirect hops) to prevent infinite recursion
const MAX_DEPTH: usize = 16;

/// A route definition: a path pattern, an optional name, nested routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    name: Option<String>,
    children: Vec<Route>,
    redirect_to: Option<String>,
}

impl Route {
    /// Create a route for a path pattern, relative to its parent.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            children: Vec::new(),
            redirect_to: None,
        }
    }

    /// Create a route that re-matches `to` (an absolute path) when `from`
    /// matches the whole remaining path.
    pub fn redirect(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            redirect_to: Some(to.into()),
            ..Self::new(from)
        }
    }

    /// Set the route name. Defaults to the path pattern.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the nested routes.
    pub fn children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The route name, falling back to the path pattern.
    pub fn route_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.path)
    }

    pub fn child_routes(&self) -> &[Route] {
        &self.children
    }

    pub fn redirect_target(&self) -> Option<&str> {
        self.redirect_to.as_deref()
    }
}

/// Result of matching one router level.
struct LevelMatch {
    matches: Vec<RouteMatch>,
    consumed: usize,
}

impl LevelMatch {
    const fn none() -> Self {
        Self {
            matches: Vec::new(),
            consumed: 0,
        }
    }
}

/// A tree of [`Route`]s usable as the reconciler's [`RouteMatcher`].
#[derive(Debug, Clone, Default)]
pub struct RouteTree {
    routes: Vec<Route>,
}

impl RouteTree {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Top-level routes.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn match_level(
        &self,
        routes: &[Route],
        segments: &[&str],
        parent_path: &str,
        inherited: &RouteParams,
        prefix_only: bool,
        depth: usize,
    ) -> LevelMatch {
        if depth >= MAX_DEPTH {
            warn_log!(
                "Maximum route nesting depth ({}) exceeded at '{}'. Check for redirect cycles.",
                MAX_DEPTH,
                parent_path
            );
            return LevelMatch::none();
        }

        let mut level = LevelMatch::none();

        for route in routes {
            if let Some(target) = route.redirect_target() {
                let Some((_, consumed)) = match_segments(route, segments, inherited) else {
                    continue;
                };
                if consumed != segments.len() {
                    continue;
                }
                let from = join_path(parent_path, &segments.join("/"));
                trace_log!("Route '{}' redirects '{}' → '{}'", route.path(), from, target);
                let redirected = self.match_level(
                    &self.routes,
                    &split_path(target),
                    "/",
                    &RouteParams::new(),
                    prefix_only,
                    depth + 1,
                );
                if redirected.matches.is_empty() {
                    continue;
                }
                level.matches.extend(redirected.matches.into_iter().map(|mut m| {
                    m.redirected_from = Some(from.clone());
                    m
                }));
                level.consumed = segments.len();
                return level;
            }

            let Some((route_match, consumed)) =
                self.match_route(route, segments, parent_path, inherited, prefix_only, depth)
            else {
                continue;
            };

            let complete = consumed == segments.len();
            if complete || prefix_only {
                level.consumed = level.consumed.max(consumed);
                level.matches.push(route_match);
            }
            if complete {
                return level;
            }
        }

        if prefix_only {
            level
        } else {
            LevelMatch::none()
        }
    }

    fn match_route(
        &self,
        route: &Route,
        segments: &[&str],
        parent_path: &str,
        inherited: &RouteParams,
        prefix_only: bool,
        depth: usize,
    ) -> Option<(RouteMatch, usize)> {
        let (params, mut consumed) = match_segments(route, segments, inherited)?;

        // A childless index route only stands for the empty remainder; in
        // prefix mode it also stands for the start of a longer path.
        if route.path().trim_matches('/').is_empty()
            && route.child_routes().is_empty()
            && !segments.is_empty()
            && !prefix_only
        {
            return None;
        }

        let path = join_path(parent_path, &segments[..consumed].join("/"));
        let mut route_match = RouteMatch::new(route.route_name(), route.path(), path)
            .with_params(params);

        if !route.child_routes().is_empty() {
            let remaining = &segments[consumed..];
            let children = self.match_level(
                route.child_routes(),
                remaining,
                &route_match.path,
                &route_match.params,
                prefix_only,
                depth + 1,
            );
            if children.matches.is_empty() && !remaining.is_empty() && !prefix_only {
                return None;
            }
            consumed += children.consumed;
            route_match.children = children.matches;
        }

        Some((route_match, consumed))
    }
}

/// Match the route's own pattern against the leading segments.
///
/// Returns the accumulated parameters and the number of consumed segments.
fn match_segments(
    route: &Route,
    segments: &[&str],
    inherited: &RouteParams,
) -> Option<(RouteParams, usize)> {
    let pattern = split_path(route.path());
    let mut params = inherited.clone();

    for (i, pattern_seg) in pattern.iter().enumerate() {
        if is_wildcard_segment(pattern_seg) {
            let name = &pattern_seg[1..];
            if !name.is_empty() {
                params.insert(name, segments[i.min(segments.len())..].join("/"));
            }
            return Some((params, segments.len()));
        }

        let segment = segments.get(i)?;
        if let Some(name) = extract_param_name(pattern_seg) {
            params.insert(name, *segment);
        } else if pattern_seg != segment {
            return None;
        }
    }

    Some((params, pattern.len()))
}

impl RouteMatcher for RouteTree {
    fn match_path(&self, path: &str, prefix_only: bool) -> Vec<RouteMatch> {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, QueryParams::from_query_string(query)),
            None => (path, QueryParams::new()),
        };

        let segments = split_path(path);
        let level = self.match_level(
            &self.routes,
            &segments,
            "/",
            &RouteParams::new(),
            prefix_only,
            0,
        );

        // Index routes alone are not a prefix of an unrelated path.
        if level.consumed == 0 && !segments.is_empty() {
            trace_log!("No route consumed any segment of '{}'", path);
            return Vec::new();
        }
        let mut matches = level.matches;

        if !query.is_empty() {
            if let Some(last) = matches.last_mut() {
                attach_query(last, query);
            }
        }

        trace_log!(
            "Matched '{}' (prefix: {}) → [{}]",
            path,
            prefix_only,
            matches
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        matches
    }
}

fn attach_query(route_match: &mut RouteMatch, query: QueryParams) {
    match route_match.children.last_mut() {
        Some(child) => attach_query(child, query),
        None => route_match.query = query,
    }
}
