//! Raw platform location → [`UrlState`].
//!
//! The parser is the only place that calls the route matcher for
//! platform-driven input. It never fails: a location nothing matches comes
//! back as a state without segments, and the reconciler decides whether
//! that is an index no-op or a match failure.

use crate::matching::RouteMatcher;
use crate::state::UrlState;
use crate::trace_log;

/// Turns platform locations into [`UrlState`]s and back.
///
/// ```
/// use route_reconciler::{Route, RouteInformationParser, RouteTree};
///
/// let parser = RouteInformationParser::new(RouteTree::new(vec![Route::new("users/:id")]));
/// let state = parser.parse("/users/42?tab=posts");
///
/// assert_eq!(state.segments()[0].params.get("id"), Some("42"));
/// assert_eq!(parser.restore(&state), "/users/42?tab=posts");
/// ```
#[derive(Debug, Clone)]
pub struct RouteInformationParser<M> {
    matcher: M,
    include_prefix_matches: bool,
}

impl<M: RouteMatcher> RouteInformationParser<M> {
    /// Exact matching by default.
    pub fn new(matcher: M) -> Self {
        Self {
            matcher,
            include_prefix_matches: false,
        }
    }

    /// Accept the longest matched prefix of a location, pushing every
    /// prefix route along the way.
    pub fn include_prefix_matches(mut self, include: bool) -> Self {
        self.include_prefix_matches = include;
        self
    }

    pub fn parse(&self, location: &str) -> UrlState {
        let segments = self
            .matcher
            .match_path(location, self.include_prefix_matches);
        trace_log!(
            "Parsed location '{}' into {} top-level segments",
            location,
            segments.len()
        );
        UrlState::new(location, segments)
    }

    /// Location string to report back to the platform.
    pub fn restore(&self, state: &UrlState) -> String {
        state.location()
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Route, RouteTree};

    fn tree() -> RouteTree {
        RouteTree::new(vec![
            Route::new("").name("HomeRoute"),
            Route::new("books").name("BooksRoute"),
            Route::new("books/:id").name("BookRoute"),
        ])
    }

    #[test]
    fn test_parse_exact() {
        let state = RouteInformationParser::new(tree()).parse("/books/3");
        assert_eq!(state.path(), "/books/3");
        assert_eq!(state.segments().len(), 1);
        assert_eq!(state.segments()[0].name, "BookRoute");
    }

    #[test]
    fn test_parse_with_prefix_matches() {
        let state = RouteInformationParser::new(tree())
            .include_prefix_matches(true)
            .parse("/books/3");
        let names: Vec<_> = state.segments().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["HomeRoute", "BooksRoute", "BookRoute"]);
    }

    #[test]
    fn test_parse_unknown_has_no_segments() {
        let state = RouteInformationParser::new(tree()).parse("/unknown");
        assert!(!state.has_segments());
        assert_eq!(state.path(), "/unknown");
    }

    #[test]
    fn test_query_reaches_deepest_segment() {
        let state = RouteInformationParser::new(tree()).parse("/books?sort=title");
        assert_eq!(state.segments()[0].query.get("sort"), Some("title"));
        assert_eq!(state.flatten().query().get("sort"), Some("title"));
    }
}
