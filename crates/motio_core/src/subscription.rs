//! Ordered callback lists that tolerate removal during dispatch

use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifier returned by [`SubscriptionManager::add`]
pub type HandlerId = u64;

type Handler<A> = Rc<dyn Fn(&A)>;

/// A list of handlers notified in insertion order.
///
/// `notify` walks a snapshot, and skips handlers removed by an earlier
/// handler in the same dispatch.
pub struct SubscriptionManager<A: ?Sized> {
    handlers: RefCell<SmallVec<[(HandlerId, Handler<A>); 2]>>,
    next_id: Cell<HandlerId>,
}

impl<A: ?Sized> SubscriptionManager<A> {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(SmallVec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn add<F: Fn(&A) + 'static>(&self, handler: F) -> HandlerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let handler: Handler<A> = Rc::new(handler);
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    /// Returns whether the handler was registered
    pub fn remove(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        match handlers.iter().position(|(handler_id, _)| *handler_id == id) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: HandlerId) -> bool {
        self.handlers.borrow().iter().any(|(handler_id, _)| *handler_id == id)
    }

    pub fn notify(&self, arg: &A) {
        let snapshot: SmallVec<[(HandlerId, Handler<A>); 2]> = self.handlers.borrow().clone();
        match snapshot.len() {
            0 => {}
            1 => (snapshot[0].1)(arg),
            _ => {
                for (id, handler) in snapshot {
                    if self.contains(id) {
                        handler(arg);
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

impl<A: ?Sized> Default for SubscriptionManager<A> {
    fn default() -> Self {
        Self::new()
    }
}
