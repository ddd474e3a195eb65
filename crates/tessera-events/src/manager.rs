//! The event queue and client registry.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::client::EventClient;
use crate::event::Event;

/// FIFO queue of pending events plus weak references to clients.
///
/// Only reachable through the `Rc` returned by [`make`](Self::make). Not
/// thread-safe.
pub struct EventManager {
    clients: RefCell<Vec<Weak<EventClient>>>,
    events: RefCell<VecDeque<Event>>,
}

impl EventManager {
    /// Create a manager with no clients and an empty queue.
    pub fn make() -> Rc<Self> {
        Rc::new(Self {
            clients: RefCell::new(Vec::new()),
            events: RefCell::new(VecDeque::new()),
        })
    }

    /// Create a client owned by the caller. The manager keeps only a weak
    /// reference, so the client is unregistered once the caller drops it.
    pub fn make_client(self: &Rc<Self>) -> Rc<EventClient> {
        let client = Rc::new(EventClient::new(Rc::clone(self)));
        self.clients.borrow_mut().push(Rc::downgrade(&client));
        client
    }

    /// Queue `value` for the next [`notify_clients`](Self::notify_clients).
    pub fn emit<T: 'static>(&self, value: T) {
        self.emit_event(Event::new(value));
    }

    /// Queue an already wrapped event.
    pub fn emit_event(&self, event: Event) {
        self.events.borrow_mut().push_back(event);
    }

    /// Whether any event is waiting for delivery.
    #[inline]
    pub fn has_pending_events(&self) -> bool {
        !self.events.borrow().is_empty()
    }

    /// Number of queued events.
    #[inline]
    pub fn pending_events(&self) -> usize {
        self.events.borrow().len()
    }

    /// Number of registered clients that are still alive.
    pub fn client_count(&self) -> usize {
        self.clients
            .borrow()
            .iter()
            .filter(|client| client.strong_count() > 0)
            .count()
    }

    /// Deliver every queued event, oldest first, to every live client in
    /// registration order. The queue is empty afterwards.
    ///
    /// Dead clients are pruned first. Events emitted by callbacks are
    /// delivered in the same call, after the ones already queued. Clients
    /// created during delivery receive the events that follow.
    pub fn notify_clients(&self) {
        let pruned = {
            let mut clients = self.clients.borrow_mut();
            let before = clients.len();
            clients.retain(|client| client.strong_count() > 0);
            before - clients.len()
        };
        if pruned > 0 {
            tracing::debug!(pruned, "pruned dead event clients");
        }
        tracing::trace!(
            events = self.pending_events(),
            clients = self.clients.borrow().len(),
            "notifying event clients"
        );

        loop {
            let Some(event) = self.events.borrow_mut().pop_front() else {
                break;
            };
            let clients: Vec<Rc<EventClient>> = self
                .clients
                .borrow()
                .iter()
                .filter_map(Weak::upgrade)
                .collect();
            for client in &clients {
                client.notify(&event);
            }
        }
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("clients", &self.client_count())
            .field("pending_events", &self.pending_events())
            .finish()
    }
}
