//! Typed publish/subscribe bus for overlay events
//!
//! Handlers are keyed by the concrete event type and identified by their `Rc`
//! allocation, so subscribing the same handler twice registers it once. The bus
//! is `!Send`; it lives on the thread that owns the overlay session.

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Event handler for events of type `T`
pub type Handler<T> = Rc<dyn Fn(&T) -> anyhow::Result<()>>;

/// Wrap a closure as a [`Handler`]
pub fn handler<T, F>(f: F) -> Handler<T>
where
    F: Fn(&T) -> anyhow::Result<()> + 'static,
{
    Rc::new(f)
}

struct Registration {
    key: *const (),
    /// Always a `Handler<T>` for the `TypeId` this registration is stored under
    handler: Box<dyn Any>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: RefCell<HashMap<TypeId, Vec<Registration>>>,
}

fn handler_key<T: 'static>(handler: &Handler<T>) -> *const () {
    Rc::as_ptr(handler).cast::<()>()
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `T`. Returns false if it was already registered.
    pub fn subscribe<T: 'static>(&self, handler: &Handler<T>) -> bool {
        let key = handler_key(handler);
        let mut subscribers = self.subscribers.borrow_mut();
        let list = subscribers.entry(TypeId::of::<T>()).or_default();
        if list.iter().any(|r| r.key == key) {
            log::debug!("Handler already subscribed to {}", type_name::<T>());
            return false;
        }
        list.push(Registration {
            key,
            handler: Box::new(handler.clone()),
        });
        true
    }

    /// Remove `handler` for `T`. Returns false if it was not registered.
    pub fn unsubscribe<T: 'static>(&self, handler: &Handler<T>) -> bool {
        let key = handler_key(handler);
        let mut subscribers = self.subscribers.borrow_mut();
        let Some(list) = subscribers.get_mut(&TypeId::of::<T>()) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.key != key);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&TypeId::of::<T>());
        }
        removed
    }

    /// Deliver `event` to every handler registered for `T` when the call starts.
    ///
    /// A failing handler is logged and does not stop delivery to the rest.
    /// Returns the number of handlers that completed successfully.
    pub fn publish<T: 'static>(&self, event: &T) -> usize {
        let snapshot: Vec<Handler<T>> = {
            let subscribers = self.subscribers.borrow();
            match subscribers.get(&TypeId::of::<T>()) {
                Some(list) => list
                    .iter()
                    .filter_map(|r| r.handler.downcast_ref::<Handler<T>>().cloned())
                    .collect(),
                None => Vec::new(),
            }
        };

        if snapshot.is_empty() {
            log::trace!("No subscribers for {}", type_name::<T>());
            return 0;
        }

        let mut delivered = 0;
        for handler in snapshot {
            match handler(event) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    log::error!("Handler for {} failed: {:?}", type_name::<T>(), err);
                }
            }
        }
        delivered
    }

    /// Drop every registration, used at session teardown
    pub fn clear_all(&self) {
        self.subscribers.borrow_mut().clear();
    }

    pub fn subscriber_count<T: 'static>(&self) -> usize {
        self.subscribers
            .borrow()
            .get(&TypeId::of::<T>())
            .map_or(0, Vec::len)
    }
}
