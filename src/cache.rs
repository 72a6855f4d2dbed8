//! Match-result caching.
//!
//! [`CachedMatcher`] wraps any [`RouteMatcher`] with an LRU cache keyed by
//! `(path, prefix_only)`, so the reconciler, parser, and deep-link pushes
//! never re-walk the route tree for a location they already matched. It is
//! gated behind the `cache` feature flag and uses the [`lru`] crate.
//!
//! [`CacheStats`] tracks hits, misses, and invalidations.
//!
//! # Examples
//!
//! ```
//! use route_reconciler::cache::CachedMatcher;
//! use route_reconciler::{Route, RouteMatcher, RouteTree};
//!
//! let matcher = CachedMatcher::new(RouteTree::new(vec![Route::new("home")]));
//! matcher.match_path("/home", false);
//! matcher.match_path("/home", false);
//!
//! assert_eq!(matcher.stats().hits, 1);
//! assert_eq!(matcher.stats().misses, 1);
//! ```

use crate::matching::{RouteMatch, RouteMatcher};
use crate::{debug_log, trace_log};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchCacheKey {
    path: String,
    prefix_only: bool,
}

/// Counters tracking cache hit/miss rates and invalidations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    /// Number of full cache invalidations (via [`CachedMatcher::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if no lookups have been performed.
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache in front of a [`RouteMatcher`].
///
/// Default capacity is 256 entries. Empty results are cached too, so a
/// repeatedly requested unknown path costs one tree walk.
#[derive(Debug)]
pub struct CachedMatcher<M> {
    inner: M,
    cache: RefCell<LruCache<MatchCacheKey, Vec<RouteMatch>>>,
    stats: RefCell<CacheStats>,
}

impl<M: RouteMatcher> CachedMatcher<M> {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
        Some(cap) => cap,
        None => NonZeroUsize::MIN,
    };

    /// Wrap a matcher with the default capacity.
    pub fn new(inner: M) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    /// Wrap a matcher with a custom capacity.
    pub fn with_capacity(inner: M, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: RefCell::new(LruCache::new(capacity)),
            stats: RefCell::new(CacheStats::default()),
        }
    }

    /// Drop every cached result, e.g. after the route tree changed.
    pub fn clear(&self) {
        let removed = self.cache.borrow().len();
        self.cache.borrow_mut().clear();
        let mut stats = self.stats.borrow_mut();
        stats.invalidations += 1;
        debug_log!(
            "Match cache cleared: {} entries removed ({} total invalidations, hit rate: {:.1}%)",
            removed,
            stats.invalidations,
            stats.hit_rate() * 100.0
        );
    }

    /// Snapshot of the current counters.
    pub fn stats(&self) -> CacheStats {
        self.stats.borrow().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = CacheStats::default();
    }

    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }

    /// The wrapped matcher.
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: RouteMatcher> RouteMatcher for CachedMatcher<M> {
    fn match_path(&self, path: &str, prefix_only: bool) -> Vec<RouteMatch> {
        let key = MatchCacheKey {
            path: path.to_string(),
            prefix_only,
        };

        if let Some(hit) = self.cache.borrow_mut().get(&key) {
            self.stats.borrow_mut().hits += 1;
            trace_log!("Match cache hit for '{}' (prefix: {})", path, prefix_only);
            return hit.clone();
        }

        self.stats.borrow_mut().misses += 1;
        trace_log!("Match cache miss for '{}' (prefix: {})", path, prefix_only);
        let matches = self.inner.match_path(path, prefix_only);
        self.cache.borrow_mut().push(key, matches.clone());
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{Route, RouteTree};

    fn matcher() -> CachedMatcher<RouteTree> {
        CachedMatcher::new(RouteTree::new(vec![
            Route::new("").name("HomeRoute"),
            Route::new("settings").name("SettingsRoute"),
        ]))
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let m = matcher();
        let first = m.match_path("/settings", false);
        let second = m.match_path("/settings", false);
        assert_eq!(first, second);
        assert_eq!(m.stats().misses, 1);
        assert_eq!(m.stats().hits, 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_prefix_flag_is_part_of_key() {
        let m = matcher();
        m.match_path("/settings", false);
        m.match_path("/settings", true);
        assert_eq!(m.stats().misses, 2);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_empty_results_are_cached() {
        let m = matcher();
        assert!(m.match_path("/missing", false).is_empty());
        assert!(m.match_path("/missing", false).is_empty());
        assert_eq!(m.stats().hits, 1);
    }

    #[test]
    fn test_cache_clear() {
        let m = matcher();
        m.match_path("/", false);
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.stats().invalidations, 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let m = CachedMatcher::with_capacity(
            RouteTree::new(vec![Route::new("a"), Route::new("b")]),
            NonZeroUsize::MIN,
        );
        m.match_path("/a", false);
        m.match_path("/b", false);
        m.match_path("/a", false);
        assert_eq!(m.stats().misses, 3);
        assert!((m.stats().hit_rate() - 0.0).abs() < f64::EPSILON);
    }
}
