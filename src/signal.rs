//! Change notification for the hosting adapter.
//!
//! [`RebuildSignal`] is a payload-free observer channel. History updates,
//! stack mutations and forced rebuilds all end up as one `notify()`; the
//! consumer recomputes whatever it derives (reported URL, state hash) on
//! every notification.
//!
//! Subscribing returns a [`Subscription`] token. Dropping the token
//! unsubscribes; [`detach`](Subscription::detach) keeps the listener for
//! the lifetime of the signal.
//!
//! ```
//! use route_reconciler::RebuildSignal;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let signal = RebuildSignal::new();
//! let count = Rc::new(Cell::new(0));
//!
//! let counter = Rc::clone(&count);
//! let subscription = signal.subscribe(move || counter.set(counter.get() + 1));
//!
//! signal.notify();
//! drop(subscription);
//! signal.notify();
//!
//! assert_eq!(count.get(), 1);
//! ```

use crate::trace_log;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// A rebuild listener.
pub type Listener = Rc<dyn Fn()>;

/// Revision-derived fingerprint of a stack controller.
///
/// Only meant for "did anything change" comparisons; it is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateHash(u64);

impl StateHash {
    /// Derive a hash from a controller's revision counter.
    pub const fn from_revision(revision: u64) -> Self {
        Self(revision)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct SignalInner {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    notifying: Cell<usize>,
    last_hash: Cell<Option<StateHash>>,
}

impl SignalInner {
    fn remove(&self, id: u64) {
        self.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
    }
}

/// Payload-free, single-threaded observer channel.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone, Default)]
pub struct RebuildSignal {
    inner: Rc<SignalInner>,
}

impl RebuildSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: impl Fn() + 'static) -> Subscription {
        self.subscribe_rc(Rc::new(listener))
    }

    /// Register an already shared listener.
    pub fn subscribe_rc(&self, listener: Listener) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, listener));
        Subscription {
            id,
            signal: Rc::downgrade(&self.inner),
            detached: false,
        }
    }

    /// Deliver one notification to every current listener, synchronously.
    ///
    /// Listeners registered or removed during delivery take effect on the
    /// next notification.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        trace_log!("Delivering rebuild notification to {} listeners", snapshot.len());

        let _delivery = DeliveryGuard::enter(&self.inner.notifying);
        for listener in snapshot {
            listener();
        }
    }

    /// Check if a notification is currently being delivered.
    pub fn is_notifying(&self) -> bool {
        self.inner.notifying.get() > 0
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Record `hash` and report whether it differs from the previously
    /// observed one. The first observation always reports a change.
    pub fn observe_hash(&self, hash: StateHash) -> bool {
        let changed = self.inner.last_hash.get() != Some(hash);
        self.inner.last_hash.set(Some(hash));
        changed
    }
}

impl fmt::Debug for RebuildSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildSignal")
            .field("listeners", &self.listener_count())
            .field("notifying", &self.is_notifying())
            .finish_non_exhaustive()
    }
}

struct DeliveryGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DeliveryGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self { depth }
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

/// Disposer token returned by [`RebuildSignal::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately; call `detach` to keep it"]
pub struct Subscription {
    id: u64,
    signal: Weak<SignalInner>,
    detached: bool,
}

impl Subscription {
    /// Remove the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the listener registered for as long as the signal lives.
    pub fn detach(mut self) {
        self.detached = true;
    }

    /// Check if the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.signal.upgrade().is_some_and(|inner| {
            inner
                .listeners
                .borrow()
                .iter()
                .any(|(id, _)| *id == self.id)
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(inner) = self.signal.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("detached", &self.detached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn test_notify_reaches_every_listener() {
        let signal = RebuildSignal::new();
        let (a, fa) = counter();
        let (b, fb) = counter();
        let _sa = signal.subscribe(fa);
        let _sb = signal.subscribe(fb);

        signal.notify();
        signal.notify();

        assert_eq!(a.get(), 2);
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let signal = RebuildSignal::new();
        let (count, f) = counter();
        let sub = signal.subscribe(f);
        assert!(sub.is_active());

        sub.unsubscribe();
        signal.notify();

        assert_eq!(count.get(), 0);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_detach_keeps_listener() {
        let signal = RebuildSignal::new();
        let (count, f) = counter();
        signal.subscribe(f).detach();

        signal.notify();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_may_subscribe_during_delivery() {
        let signal = RebuildSignal::new();
        let late = Rc::new(RefCell::new(Vec::new()));
        let (count, f) = counter();
        let f: Listener = Rc::new(f);

        let handle = signal.clone();
        let late_subs = Rc::clone(&late);
        let _sub = signal.subscribe(move || {
            assert!(handle.is_notifying());
            late_subs
                .borrow_mut()
                .push(handle.subscribe_rc(Rc::clone(&f)));
        });

        signal.notify();
        assert_eq!(count.get(), 0);
        assert!(!signal.is_notifying());

        signal.notify();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_observe_hash() {
        let signal = RebuildSignal::new();
        assert!(signal.observe_hash(StateHash::from_revision(1)));
        assert!(!signal.observe_hash(StateHash::from_revision(1)));
        assert!(signal.observe_hash(StateHash::from_revision(2)));
    }

    #[test]
    fn test_subscription_outlives_signal() {
        let signal = RebuildSignal::new();
        let (_count, f) = counter();
        let sub = signal.subscribe(f);
        drop(signal);
        assert!(!sub.is_active());
    }
}
