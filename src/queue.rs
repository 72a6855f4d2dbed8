//! Pending route list for declarative mode.
//!
//! In declarative mode nothing is matched against the stack when a URL
//! arrives. The delegate stores the derived page list in a
//! [`PendingRouteQueue`] and the next build pass pulls it out, when it is
//! safe to mutate the stack.
//!
//! The queue holds at most one batch. A second `set_pending` before a
//! drain discards the first batch.

use crate::debug_log;
use crate::stack::PageRouteRequest;

/// Single-slot, last-writer-wins buffer of page-route requests.
///
/// ```
/// use route_reconciler::{PageRouteRequest, PendingRouteQueue};
///
/// let mut queue = PendingRouteQueue::new();
/// queue.set_pending(vec![PageRouteRequest::new("HomeRoute", "/")]);
/// queue.set_pending(vec![PageRouteRequest::new("SettingsRoute", "/settings")]);
///
/// let drained = queue.take().unwrap();
/// assert_eq!(drained[0].name, "SettingsRoute");
/// assert!(queue.take().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct PendingRouteQueue {
    pending: Option<Vec<PageRouteRequest>>,
}

impl PendingRouteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a batch, replacing any batch not yet drained.
    pub fn set_pending(&mut self, routes: Vec<PageRouteRequest>) {
        if let Some(discarded) = self.pending.replace(routes) {
            debug_log!(
                "Discarding {} undrained pending routes in favour of a newer batch",
                discarded.len()
            );
        }
    }

    /// Drain the batch. Subsequent calls return `None` until the next `set_pending`.
    pub fn take(&mut self) -> Option<Vec<PageRouteRequest>> {
        self.pending.take()
    }

    /// Look at the batch without draining it.
    pub fn peek(&self) -> Option<&[PageRouteRequest]> {
        self.pending.as_deref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(names: &[&str]) -> Vec<PageRouteRequest> {
        names
            .iter()
            .map(|n| PageRouteRequest::new(*n, format!("/{}", n.to_lowercase())))
            .collect()
    }

    #[test]
    fn test_take_is_read_once() {
        let mut queue = PendingRouteQueue::new();
        assert!(!queue.has_pending());

        queue.set_pending(batch(&["Home"]));
        assert!(queue.has_pending());
        assert_eq!(queue.take().map(|b| b.len()), Some(1));
        assert!(queue.take().is_none());
        assert!(!queue.has_pending());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut queue = PendingRouteQueue::new();
        queue.set_pending(batch(&["Home", "Users"]));
        queue.set_pending(batch(&["Settings"]));

        let drained = queue.take().unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].name, "Settings");
    }

    #[test]
    fn test_peek_does_not_drain() {
        let mut queue = PendingRouteQueue::new();
        queue.set_pending(batch(&["Home"]));
        assert_eq!(queue.peek().map(<[PageRouteRequest]>::len), Some(1));
        assert!(queue.has_pending());
        queue.clear();
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_empty_batch_is_still_pending() {
        let mut queue = PendingRouteQueue::new();
        queue.set_pending(Vec::new());
        assert!(queue.has_pending());
        assert_eq!(queue.take(), Some(Vec::new()));
    }
}
