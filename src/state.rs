//! The "where the app currently is" value.
//!
//! A [`UrlState`] pairs the raw location reported by the platform with the
//! ordered segment tree the route matcher produced for it. It is immutable;
//! every transformation returns a new value.
//!
//! # Canonicalization
//!
//! [`flatten`](UrlState::flatten) reduces the segment tree to a flat,
//! depth-first list and takes the deepest segment's path as the canonical
//! path. When the platform's raw path differs (trailing slash, redirect,
//! partially matched deep link) the result is flagged
//! [`should_replace`](UrlState::should_replace): the displayed URL must be
//! corrected without adding a history entry.
//!
//! ```
//! use route_reconciler::{RouteMatch, UrlState};
//!
//! let home = RouteMatch::new("HomeRoute", "home", "/home");
//! let state = UrlState::new("/", vec![home.clone()]);
//!
//! let canonical = state.flatten();
//! assert_eq!(canonical.path(), "/home");
//! assert!(canonical.should_replace());
//!
//! let exact = UrlState::new("/home", vec![home]).flatten();
//! assert!(!exact.should_replace());
//! ```

use crate::matching::{flatten_matches, normalize_path, RouteMatch};
use crate::params::QueryParams;

/// Current address: raw path, query, matched segments, replace flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlState {
    path: String,
    query: QueryParams,
    segments: Vec<RouteMatch>,
    should_replace: bool,
}

impl UrlState {
    /// Create a state from a raw location and its matched segments.
    ///
    /// A `?query` suffix on `location` is parsed into [`query`](Self::query).
    pub fn new(location: impl AsRef<str>, segments: Vec<RouteMatch>) -> Self {
        let (path, query) = split_location(location.as_ref());
        Self {
            path: normalize_path(path).into_owned(),
            query,
            segments,
            should_replace: false,
        }
    }

    /// The state of an app that shows nothing yet (`/`, no segments).
    pub fn empty() -> Self {
        Self::new("/", Vec::new())
    }

    /// Build a state whose path and query come from the deepest segment.
    pub fn from_segments(segments: Vec<RouteMatch>) -> Self {
        let (path, query) = segments
            .last()
            .map(RouteMatch::deepest)
            .map(|deepest| (deepest.path.clone(), deepest.query.clone()))
            .unwrap_or_else(|| ("/".to_string(), QueryParams::new()));

        Self {
            path,
            query,
            segments,
            should_replace: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn segments(&self) -> &[RouteMatch] {
        &self.segments
    }

    /// Check if any route matched this location.
    pub fn has_segments(&self) -> bool {
        !self.segments.is_empty()
    }

    /// The location must replace the current history entry instead of
    /// pushing a new one.
    pub fn should_replace(&self) -> bool {
        self.should_replace
    }

    /// Check if this is the root location (`/`).
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Return a copy with the replace flag set to `replace`.
    #[must_use]
    pub fn with_replace(mut self, replace: bool) -> Self {
        self.should_replace = replace;
        self
    }

    /// The deepest matched segment.
    pub fn top_match(&self) -> Option<&RouteMatch> {
        self.segments.last().map(RouteMatch::deepest)
    }

    /// Canonical flat form of this state.
    ///
    /// The replace flag is derived from the path comparison alone, so
    /// flattening an already flattened state never stacks a second replace
    /// on top of the first.
    #[must_use]
    pub fn flatten(&self) -> Self {
        let canonical = Self::from_segments(flatten_matches(&self.segments));
        let differs = self.has_segments() && canonical.path != self.path;
        canonical.with_replace(differs)
    }

    /// Render `path?query` for reporting back to the platform.
    pub fn location(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query.to_query_string())
        }
    }
}

impl Default for UrlState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Split `path?query` into its two halves.
pub(crate) fn split_location(location: &str) -> (&str, QueryParams) {
    match location.split_once('?') {
        Some((path, query)) => (path, QueryParams::from_query_string(query)),
        None => (location, QueryParams::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RouteParams;
    use proptest::prelude::*;

    fn user_profile(id: &str) -> RouteMatch {
        let params: RouteParams = [("id", id)].into_iter().collect();
        RouteMatch::new("UserRoute", "users/:id", format!("/users/{id}"))
            .with_params(params.clone())
            .with_children(vec![RouteMatch::new(
                "ProfileRoute",
                "profile",
                format!("/users/{id}/profile"),
            )
            .with_params(params)])
    }

    #[test]
    fn test_has_segments() {
        assert!(!UrlState::empty().has_segments());
        assert!(UrlState::new("/users/1/profile", vec![user_profile("1")]).has_segments());
    }

    #[test]
    fn test_new_splits_query() {
        let state = UrlState::new("/search?q=rust&page=2", Vec::new());
        assert_eq!(state.path(), "/search");
        assert_eq!(state.query().get("q"), Some("rust"));
        assert_eq!(state.location(), "/search?page=2&q=rust");
    }

    #[test]
    fn test_flatten_is_tail_biased() {
        let state = UrlState::new("/users/42/profile", vec![user_profile("42")]);
        let flat = state.flatten();

        assert_eq!(flat.segments().len(), 2);
        assert!(flat.segments().iter().all(RouteMatch::is_leaf));
        assert_eq!(flat.path(), "/users/42/profile");
        assert!(!flat.should_replace());
        assert_eq!(flat.top_match().map(|m| m.name.as_str()), Some("ProfileRoute"));
    }

    #[test]
    fn test_flatten_flags_partial_match() {
        let partial = RouteMatch::new("UserRoute", "users/:id", "/users/42");
        let flat = UrlState::new("/users/42/unknown", vec![partial]).flatten();
        assert_eq!(flat.path(), "/users/42");
        assert!(flat.should_replace());
    }

    #[test]
    fn test_flatten_does_not_accumulate_replace() {
        let partial = RouteMatch::new("UserRoute", "users/:id", "/users/42");
        let once = UrlState::new("/users/42/", vec![partial]).flatten();
        assert_eq!(once.path(), "/users/42");
        // trailing slash normalized away at construction
        assert!(!once.should_replace());

        let redirected = RouteMatch::new("HomeRoute", "home", "/home");
        let once = UrlState::new("/", vec![redirected]).flatten();
        let twice = once.flatten();
        assert!(once.should_replace());
        assert!(!twice.should_replace());
    }

    #[test]
    fn test_flatten_without_segments_keeps_no_replace() {
        let flat = UrlState::new("/nowhere", Vec::new()).flatten();
        assert!(!flat.should_replace());
        assert!(!flat.has_segments());
    }

    proptest! {
        #[test]
        fn prop_replace_iff_paths_differ(
            raw in "(/[a-z]{1,6}){0,3}",
            matched in "(/[a-z]{1,6}){1,3}",
        ) {
            let state = UrlState::new(&raw, vec![RouteMatch::new("Route", "x", matched.clone())]);
            let flat = state.flatten();
            prop_assert_eq!(flat.path(), matched.as_str());
            prop_assert_eq!(flat.should_replace(), state.path() != matched);
        }
    }
}
