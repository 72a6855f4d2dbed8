//! Matched segments and the route-matching capability.
//!
//! A [`RouteMatch`] is one level of a matched path. Matching is
//! hierarchical: a parent match owns the ordered matches of its nested
//! router in [`children`](RouteMatch::children). Matches are immutable once
//! produced and are converted into [`PageRouteRequest`]s when they reach the
//! stack.
//!
//! The reconciler does not match paths itself. It consumes any
//! [`RouteMatcher`]. The crate ships [`RouteTree`](crate::RouteTree) as a
//! segment-based implementation, and
//! [`CachedMatcher`](crate::cache::CachedMatcher) as an LRU decorator.

use crate::params::{QueryParams, RouteParams};
use crate::stack::PageRouteRequest;
use std::borrow::Cow;

/// A single matched segment of a location.
///
/// `path` is the concrete path up to and including this segment, so the
/// deepest match of a chain always carries the full matched path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteMatch {
    /// Route name, unique within its route tree.
    pub name: String,
    /// Path pattern of the matched route (e.g. `users/:id`).
    pub template: String,
    /// Concrete accumulated path (e.g. `/users/42`).
    pub path: String,
    /// Accumulated path parameters (parent values included).
    pub params: RouteParams,
    /// Query parameters; only the deepest match of a location carries them.
    pub query: QueryParams,
    /// Matches of the nested router, in order.
    pub children: Vec<RouteMatch>,
    /// Set when this match was reached through a redirect route.
    pub redirected_from: Option<String>,
}

impl RouteMatch {
    /// Create a leaf match with no parameters.
    pub fn new(
        name: impl Into<String>,
        template: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let path: String = path.into();
        Self {
            name: name.into(),
            template: template.into(),
            path: normalize_path(&path).into_owned(),
            params: RouteParams::new(),
            query: QueryParams::new(),
            children: Vec::new(),
            redirected_from: None,
        }
    }

    /// Attach path parameters.
    pub fn with_params(mut self, params: RouteParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Attach nested matches.
    pub fn with_children(mut self, children: Vec<RouteMatch>) -> Self {
        self.children = children;
        self
    }

    /// Check if this match has no nested matches.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Follow the last nested match of every level down to the deepest one.
    pub fn deepest(&self) -> &RouteMatch {
        let mut current = self;
        while let Some(last) = current.children.last() {
            current = last;
        }
        current
    }

    /// Depth-first list of this match and all of its descendants, each
    /// with its `children` cleared.
    pub fn flatten(&self) -> Vec<RouteMatch> {
        let mut out = Vec::new();
        flatten_into(std::slice::from_ref(self), &mut out);
        out
    }

    /// Check whether two matches point at the same page (same route, same
    /// concrete path and parameters). Nested matches are not compared.
    pub fn is_same_page(&self, other: &RouteMatch) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.params == other.params
            && self.query == other.query
    }

    /// Convert this match (and its nested matches) into a page-route request.
    pub fn to_page_route_request(&self) -> PageRouteRequest {
        PageRouteRequest {
            name: self.name.clone(),
            path: self.path.clone(),
            params: self.params.clone(),
            query: self.query.clone(),
            children: self
                .children
                .iter()
                .map(RouteMatch::to_page_route_request)
                .collect(),
        }
    }
}

/// Flatten an ordered sequence of match trees, depth-first.
pub fn flatten_matches(matches: &[RouteMatch]) -> Vec<RouteMatch> {
    let mut out = Vec::new();
    flatten_into(matches, &mut out);
    out
}

fn flatten_into(matches: &[RouteMatch], out: &mut Vec<RouteMatch>) {
    for m in matches {
        let mut node = m.clone();
        let children = std::mem::take(&mut node.children);
        out.push(node);
        flatten_into(&children, out);
    }
}

/// The route-definition capability consumed by the reconciler.
///
/// Given a path, return the ordered top-level matches (each possibly with
/// nested children). An empty result means nothing matched. With
/// `prefix_only` set, the implementation may stop at the longest matched
/// prefix instead of requiring every segment to be consumed.
pub trait RouteMatcher {
    fn match_path(&self, path: &str, prefix_only: bool) -> Vec<RouteMatch>;
}

impl<M: RouteMatcher + ?Sized> RouteMatcher for std::rc::Rc<M> {
    fn match_path(&self, path: &str, prefix_only: bool) -> Vec<RouteMatch> {
        (**self).match_path(path, prefix_only)
    }
}

impl<M: RouteMatcher + ?Sized> RouteMatcher for std::sync::Arc<M> {
    fn match_path(&self, path: &str, prefix_only: bool) -> Vec<RouteMatch> {
        (**self).match_path(path, prefix_only)
    }
}

/// Split a path into segments, filtering empty segments
///
/// ```
/// use route_reconciler::matching::split_path;
///
/// assert_eq!(split_path("/users/123"), vec!["users", "123"]);
/// assert!(split_path("/").is_empty());
/// assert_eq!(split_path("/users/"), vec!["users"]);
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Normalize a path: leading slash, no trailing slash, no empty segments.
///
/// Returns the input unchanged (borrowed) when it is already normalized.
///
/// ```
/// use route_reconciler::matching::normalize_path;
///
/// assert_eq!(normalize_path("users//42/"), "/users/42");
/// assert_eq!(normalize_path(""), "/");
/// assert_eq!(normalize_path("/home"), "/home");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    let already_normal = path.starts_with('/')
        && (path.len() == 1 || !path.ends_with('/'))
        && !path.contains("//");
    if already_normal {
        return Cow::Borrowed(path);
    }

    let segments = split_path(path);
    if segments.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", segments.join("/")))
    }
}

/// Join a parent path and a child segment.
pub fn join_path(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_matches('/');
    match (parent.is_empty(), child.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{}", child),
        (false, true) => parent.to_string(),
        (false, false) => format!("{}/{}", parent, child),
    }
}

/// Extract parameter name from a route segment
///
/// ```
/// use route_reconciler::matching::extract_param_name;
///
/// assert_eq!(extract_param_name(":id"), Some("id"));
/// assert_eq!(extract_param_name("users"), None);
/// ```
pub fn extract_param_name(segment: &str) -> Option<&str> {
    segment.strip_prefix(':').filter(|name| !name.is_empty())
}

/// Check if a route segment is a wildcard
pub fn is_wildcard_segment(segment: &str) -> bool {
    segment.starts_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_profile() -> RouteMatch {
        let params: RouteParams = [("id", "42")].into_iter().collect();
        RouteMatch::new("UserRoute", "users/:id", "/users/42")
            .with_params(params.clone())
            .with_children(vec![
                RouteMatch::new("ProfileRoute", "profile", "/users/42/profile").with_params(params),
            ])
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/users/123/profile"), vec!["users", "123", "profile"]);
        assert_eq!(split_path(""), Vec::<&str>::new());
        assert_eq!(split_path("users"), vec!["users"]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/", "users"), "/users");
        assert_eq!(join_path("/users/42", "profile"), "/users/42/profile");
        assert_eq!(join_path("/users", ""), "/users");
        assert_eq!(join_path("", ""), "/");
    }

    #[test]
    fn test_extract_param_name() {
        assert_eq!(extract_param_name(":userId"), Some("userId"));
        assert_eq!(extract_param_name(":"), None);
        assert_eq!(extract_param_name(""), None);
    }

    #[test]
    fn test_is_wildcard_segment() {
        assert!(is_wildcard_segment("*"));
        assert!(is_wildcard_segment("*rest"));
        assert!(!is_wildcard_segment(":id"));
    }

    #[test]
    fn test_flatten_depth_first() {
        let flat = users_profile().flatten();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].name, "UserRoute");
        assert!(flat[0].children.is_empty());
        assert_eq!(flat[1].path, "/users/42/profile");
    }

    #[test]
    fn test_deepest() {
        let m = users_profile();
        assert_eq!(m.deepest().name, "ProfileRoute");
    }

    #[test]
    fn test_same_page_ignores_children() {
        let with_children = users_profile();
        let mut without = users_profile();
        without.children.clear();
        assert!(with_children.is_same_page(&without));
        assert_ne!(with_children, without);
    }

    #[test]
    fn test_to_page_route_request_keeps_nesting() {
        let request = users_profile().to_page_route_request();
        assert_eq!(request.name, "UserRoute");
        assert_eq!(request.params.get("id"), Some("42"));
        assert_eq!(request.children.len(), 1);
        assert_eq!(request.children[0].path, "/users/42/profile");
    }
}
