//! Multicast and cascading delegates
//!
//! A delegate is an ordered list of subscriber callbacks. Subscribers run in
//! registration order. [`MulticastDelegate`] always runs every subscriber;
//! [`CascadingDelegate`] lets a subscriber return [`Propagation::Stop`] to veto
//! the event, in which case later subscribers are not called.
//!
//! Delegates are single-threaded (`!Send`, `!Sync`). Binding or unbinding from
//! inside a running callback is allowed: new subscribers are picked up by the
//! next `execute`, removed subscribers are skipped for the rest of the current
//! pass, and a subscriber that re-enters the delegate it is running in is
//! skipped for the nested pass.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Opaque handle returned by `bind`, used for targeted unbinding
    pub struct DelegateHandle;
}

/// Result of a cascading subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// Let the next subscriber see the event
    Continue,
    /// Veto the event; no further subscribers run
    Stop,
}

impl Propagation {
    /// `Stop` when `veto` is true, `Continue` otherwise
    pub fn stop_if(veto: bool) -> Self {
        if veto {
            Self::Stop
        } else {
            Self::Continue
        }
    }
}

/// Result of running a [`CascadingDelegate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// Every subscriber ran and none of them stopped the cascade
    Completed,
    /// The subscriber at `index` (in call order) returned `Stop`
    Stopped {
        /// Position of the vetoing subscriber in this pass
        index: usize,
    },
}

impl CascadeOutcome {
    /// True if the event was not vetoed
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// True if some subscriber vetoed the event
    pub fn is_stopped(self) -> bool {
        !self.is_completed()
    }
}

struct Subscriber<F: ?Sized> {
    handle: DelegateHandle,
    bound: Cell<bool>,
    callback: RefCell<F>,
}

impl<F: ?Sized> Subscriber<F> {
    /// Run the callback unless it was unbound or is already running
    fn try_call<R>(&self, call: impl FnOnce(&mut F) -> R) -> Option<R> {
        if !self.bound.get() {
            return None;
        }
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => Some(call(&mut callback)),
            Err(_) => {
                log::trace!("Skipping re-entrant delegate subscriber {:?}", self.handle);
                None
            }
        }
    }
}

struct SubscriberList<F: ?Sized> {
    keys: RefCell<SlotMap<DelegateHandle, ()>>,
    entries: RefCell<Vec<Rc<Subscriber<F>>>>,
}

impl<F: ?Sized> SubscriberList<F> {
    fn new() -> Self {
        Self {
            keys: RefCell::new(SlotMap::with_key()),
            entries: RefCell::new(Vec::new()),
        }
    }

    fn allocate(&self) -> DelegateHandle {
        self.keys.borrow_mut().insert(())
    }

    fn push(&self, subscriber: Rc<Subscriber<F>>) {
        self.entries.borrow_mut().push(subscriber);
    }

    fn remove(&self, handle: DelegateHandle) -> bool {
        if self.keys.borrow_mut().remove(handle).is_none() {
            return false;
        }
        self.entries.borrow_mut().retain(|subscriber| {
            if subscriber.handle == handle {
                subscriber.bound.set(false);
                false
            } else {
                true
            }
        });
        true
    }

    fn clear(&self) {
        for subscriber in self.entries.borrow_mut().drain(..) {
            subscriber.bound.set(false);
        }
        self.keys.borrow_mut().clear();
    }

    fn contains(&self, handle: DelegateHandle) -> bool {
        self.keys.borrow().contains_key(handle)
    }

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn snapshot(&self) -> Vec<Rc<Subscriber<F>>> {
        self.entries.borrow().clone()
    }
}

type Callback<A> = dyn FnMut(&A);
type CascadingCallback<A> = dyn FnMut(&A) -> Propagation;

/// Delegate that calls every subscriber
pub struct MulticastDelegate<A> {
    list: SubscriberList<Callback<A>>,
}

impl<A> MulticastDelegate<A> {
    /// Create a delegate with no subscribers
    pub fn new() -> Self {
        Self {
            list: SubscriberList::new(),
        }
    }

    /// Register a subscriber
    pub fn bind<H>(&self, handler: H) -> DelegateHandle
    where
        H: FnMut(&A) + 'static,
    {
        let handle = self.list.allocate();
        let subscriber: Rc<Subscriber<Callback<A>>> = Rc::new(Subscriber {
            handle,
            bound: Cell::new(true),
            callback: RefCell::new(handler),
        });
        self.list.push(subscriber);
        handle
    }

    /// Call every subscriber in registration order
    pub fn execute(&self, args: &A) {
        for subscriber in self.list.snapshot() {
            subscriber.try_call(|callback| callback(args));
        }
    }

    /// Remove one subscriber; returns false if the handle was not bound
    pub fn unbind(&self, handle: DelegateHandle) -> bool {
        self.list.remove(handle)
    }

    /// Remove every subscriber. No subscriber runs after this returns.
    pub fn unbind_all(&self) {
        self.list.clear();
    }

    /// Whether `handle` is still bound
    pub fn is_bound(&self, handle: DelegateHandle) -> bool {
        self.list.contains(handle)
    }

    /// Number of bound subscribers
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Default for MulticastDelegate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for MulticastDelegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("subscribers", &self.len())
            .finish()
    }
}

/// Delegate whose subscribers can stop propagation
pub struct CascadingDelegate<A> {
    list: SubscriberList<CascadingCallback<A>>,
}

impl<A> CascadingDelegate<A> {
    /// Create a delegate with no subscribers
    pub fn new() -> Self {
        Self {
            list: SubscriberList::new(),
        }
    }

    /// Register a subscriber
    pub fn bind<H>(&self, handler: H) -> DelegateHandle
    where
        H: FnMut(&A) -> Propagation + 'static,
    {
        let handle = self.list.allocate();
        let subscriber: Rc<Subscriber<CascadingCallback<A>>> = Rc::new(Subscriber {
            handle,
            bound: Cell::new(true),
            callback: RefCell::new(handler),
        });
        self.list.push(subscriber);
        handle
    }

    /// Call subscribers in registration order until one returns `Stop`
    pub fn execute(&self, args: &A) -> CascadeOutcome {
        for (index, subscriber) in self.list.snapshot().iter().enumerate() {
            if subscriber.try_call(|callback| callback(args)) == Some(Propagation::Stop) {
                return CascadeOutcome::Stopped { index };
            }
        }
        CascadeOutcome::Completed
    }

    /// Remove one subscriber; returns false if the handle was not bound
    pub fn unbind(&self, handle: DelegateHandle) -> bool {
        self.list.remove(handle)
    }

    /// Remove every subscriber. No subscriber runs after this returns.
    pub fn unbind_all(&self) {
        self.list.clear();
    }

    /// Whether `handle` is still bound
    pub fn is_bound(&self, handle: DelegateHandle) -> bool {
        self.list.contains(handle)
    }

    /// Number of bound subscribers
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// True if nothing is bound
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A> Default for CascadingDelegate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for CascadingDelegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadingDelegate")
            .field("subscribers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_multicast_runs_in_registration_order() {
        let delegate = MulticastDelegate::<i32>::new();
        let calls = recorder();

        for name in ["first", "second", "third"] {
            let calls = calls.clone();
            delegate.bind(move |_| calls.borrow_mut().push(name));
        }
        delegate.execute(&7);

        assert_eq!(*calls.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_multicast_passes_arguments() {
        let delegate = MulticastDelegate::<(i32, i32)>::new();
        let sum = Rc::new(Cell::new(0));
        let sink = sum.clone();
        delegate.bind(move |(a, b)| sink.set(a + b));

        delegate.execute(&(3, 4));
        assert_eq!(sum.get(), 7);
    }

    #[test]
    fn test_cascade_stops_on_veto() {
        let delegate = CascadingDelegate::<()>::new();
        let calls = recorder();

        let c = calls.clone();
        delegate.bind(move |()| {
            c.borrow_mut().push("allow");
            Propagation::Continue
        });
        let c = calls.clone();
        delegate.bind(move |()| {
            c.borrow_mut().push("veto");
            Propagation::Stop
        });
        let c = calls.clone();
        delegate.bind(move |()| {
            c.borrow_mut().push("never");
            Propagation::Continue
        });

        let outcome = delegate.execute(&());
        assert_eq!(outcome, CascadeOutcome::Stopped { index: 1 });
        assert!(outcome.is_stopped());
        assert_eq!(*calls.borrow(), vec!["allow", "veto"]);
    }

    #[test]
    fn test_cascade_without_subscribers_completes() {
        let delegate = CascadingDelegate::<u8>::new();
        assert!(delegate.execute(&0).is_completed());
    }

    #[test]
    fn test_unbind_single_subscriber() {
        let delegate = CascadingDelegate::<()>::new();
        let hits = Rc::new(Cell::new(0));

        let h = hits.clone();
        let veto = delegate.bind(|()| Propagation::Stop);
        delegate.bind(move |()| {
            h.set(h.get() + 1);
            Propagation::Continue
        });

        assert!(delegate.execute(&()).is_stopped());
        assert!(delegate.unbind(veto));
        assert!(!delegate.unbind(veto));
        assert!(!delegate.is_bound(veto));

        assert!(delegate.execute(&()).is_completed());
        assert_eq!(hits.get(), 1);
        assert_eq!(delegate.len(), 1);
    }

    #[test]
    fn test_unbind_all_clears_everything() {
        let delegate = MulticastDelegate::<()>::new();
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let h = hits.clone();
            delegate.bind(move |()| h.set(h.get() + 1));
        }

        delegate.unbind_all();
        delegate.execute(&());

        assert!(delegate.is_empty());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_bind_during_execute_runs_next_pass() {
        let delegate = Rc::new(MulticastDelegate::<()>::new());
        let late_hits = Rc::new(Cell::new(0));

        let d = Rc::downgrade(&delegate);
        let late = late_hits.clone();
        let mut bound_once = false;
        delegate.bind(move |()| {
            if !bound_once {
                bound_once = true;
                if let Some(d) = d.upgrade() {
                    let late = late.clone();
                    d.bind(move |()| late.set(late.get() + 1));
                }
            }
        });

        delegate.execute(&());
        assert_eq!(late_hits.get(), 0);
        assert_eq!(delegate.len(), 2);

        delegate.execute(&());
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_unbind_all_during_execute_skips_remaining() {
        let delegate = Rc::new(CascadingDelegate::<()>::new());
        let hits = Rc::new(Cell::new(0));

        let d = Rc::downgrade(&delegate);
        delegate.bind(move |()| {
            if let Some(d) = d.upgrade() {
                d.unbind_all();
            }
            Propagation::Continue
        });
        let h = hits.clone();
        delegate.bind(move |()| {
            h.set(h.get() + 1);
            Propagation::Continue
        });

        assert!(delegate.execute(&()).is_completed());
        assert_eq!(hits.get(), 0);
        assert!(delegate.is_empty());
    }

    #[test]
    fn test_reentrant_execute_does_not_panic() {
        let delegate = Rc::new(MulticastDelegate::<u32>::new());
        let depth_hits = Rc::new(Cell::new(0));

        let d = Rc::downgrade(&delegate);
        let hits = depth_hits.clone();
        delegate.bind(move |depth| {
            hits.set(hits.get() + 1);
            if *depth == 0 {
                if let Some(d) = d.upgrade() {
                    d.execute(&1);
                }
            }
        });

        delegate.execute(&0);
        // The nested pass skips the subscriber that is already running.
        assert_eq!(depth_hits.get(), 1);
    }

    #[test]
    fn test_stop_if() {
        assert_eq!(Propagation::stop_if(true), Propagation::Stop);
        assert_eq!(Propagation::stop_if(false), Propagation::Continue);
    }
}
