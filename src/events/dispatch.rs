//! Redispatch of events from background threads onto the owning thread
//!
//! Timers and worker threads must never touch session state directly. They
//! post events through a [`DispatchHandle`]; the owning thread drains the
//! queue with [`DispatchQueue::pump`], which publishes each event on its bus.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use super::bus::EventBus;

type Queued = Box<dyn FnOnce(&EventBus) -> usize + Send>;

/// Sending side, cheap to clone and safe to move to other threads
#[derive(Clone)]
pub struct DispatchHandle {
    tx: Sender<Queued>,
}

impl DispatchHandle {
    /// Queue an event for publication on the owning thread.
    ///
    /// Returns false if the owning session has already been torn down.
    pub fn post<T: Send + 'static>(&self, event: T) -> bool {
        let queued: Queued = Box::new(move |bus: &EventBus| bus.publish(&event));
        if self.tx.send(queued).is_err() {
            log::debug!(
                "Dropping {}: session is gone",
                std::any::type_name::<T>()
            );
            return false;
        }
        true
    }
}

/// Receiving side, owned by the overlay session's thread
pub struct DispatchQueue {
    tx: Sender<Queued>,
    rx: Receiver<Queued>,
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            tx: self.tx.clone(),
        }
    }

    /// Publish every queued event on `bus`, in posting order.
    /// Returns the number of events published.
    pub fn pump(&self, bus: &EventBus) -> usize {
        let mut published = 0;
        loop {
            match self.rx.try_recv() {
                Ok(queued) => {
                    queued(bus);
                    published += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        published
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
