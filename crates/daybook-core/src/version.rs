//! Data-version invalidation service
//!
//! A single monotonic counter, bumped exactly once per bulk merge, is the
//! only cross-binding invalidation channel. Rather than an ambient global,
//! the counter is an explicit service: collections subscribe on creation and
//! unsubscribe when dropped, and a bump flags every live subscription as
//! stale so it reloads on next access.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Monotonic data-version counter with explicit subscriptions
#[derive(Default)]
pub struct DataVersion {
    counter: Cell<u64>,
    next_token: Cell<u64>,
    subscribers: RefCell<Vec<Subscriber>>,
}

struct Subscriber {
    token: u64,
    stale: Rc<Cell<bool>>,
}

impl DataVersion {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Current counter value
    pub fn current(&self) -> u64 {
        self.counter.get()
    }

    /// Increment the counter and flag every live subscription stale.
    ///
    /// Called exactly once per bulk/import merge.
    pub fn bump(&self) {
        self.counter.set(self.counter.get() + 1);
        for subscriber in self.subscribers.borrow().iter() {
            subscriber.stale.set(true);
        }
        tracing::debug!(version = self.counter.get(), "data version bumped");
    }

    /// Register a new subscription, initially fresh
    pub fn subscribe(self: &Rc<Self>) -> Subscription {
        let token = self.next_token.get();
        self.next_token.set(token + 1);

        let stale = Rc::new(Cell::new(false));
        self.subscribers.borrow_mut().push(Subscriber {
            token,
            stale: Rc::clone(&stale),
        });

        Subscription {
            owner: Rc::downgrade(self),
            token,
            stale,
        }
    }

    fn unsubscribe(&self, token: u64) {
        self.subscribers.borrow_mut().retain(|s| s.token != token);
    }
}

/// A live registration with the data-version service.
///
/// Dropping the subscription unregisters it.
pub struct Subscription {
    owner: Weak<DataVersion>,
    token: u64,
    stale: Rc<Cell<bool>>,
}

impl Subscription {
    /// Whether a bump happened since the last [`clear`](Self::clear)
    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    /// Mark the current version as seen
    pub fn clear(&self) {
        self.stale.set(false);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.unsubscribe(self.token);
        }
    }
}
