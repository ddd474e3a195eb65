//! Event clients: typed subscriptions plus a handle back to the manager.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::event::Event;
use crate::manager::EventManager;

type Subscription = Rc<dyn Fn(&Event)>;

/// A subscriber/emitter attached to one [`EventManager`].
///
/// Created with [`EventManager::make_client`]. Keeps its manager alive.
pub struct EventClient {
    manager: Rc<EventManager>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl EventClient {
    pub(crate) fn new(manager: Rc<EventManager>) -> Self {
        Self {
            manager,
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// Call `callback` for every delivered event whose payload is a `T`.
    ///
    /// A client may subscribe any number of times, to any number of types.
    /// Callbacks run in subscription order.
    pub fn subscribe<T: 'static>(&self, callback: impl Fn(&T) + 'static) {
        self.subscriptions
            .borrow_mut()
            .push(Rc::new(move |event: &Event| {
                if let Some(value) = event.downcast_ref::<T>() {
                    callback(value);
                }
            }));
    }

    /// Queue `value` on the manager.
    pub fn emit<T: 'static>(&self, value: T) {
        self.manager.emit(value);
    }

    /// Number of callbacks registered on this client.
    #[inline]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    /// The manager this client emits to.
    #[inline]
    pub fn manager(&self) -> &Rc<EventManager> {
        &self.manager
    }

    /// Run every subscription against `event`.
    ///
    /// Works on a snapshot so callbacks may subscribe on this client.
    pub(crate) fn notify(&self, event: &Event) {
        let subscriptions: Vec<Subscription> = self.subscriptions.borrow().clone();
        for subscription in &subscriptions {
            subscription(event);
        }
    }
}

impl fmt::Debug for EventClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventClient")
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Hello(&'static str);
    struct Bye;

    #[test]
    fn callbacks_filter_by_type() {
        let manager = EventManager::make();
        let client = manager.make_client();
        let log = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&log);
        client.subscribe::<Hello>(move |h| sink.borrow_mut().push(h.0));
        let sink = Rc::clone(&log);
        client.subscribe::<Bye>(move |_| sink.borrow_mut().push("bye"));
        assert_eq!(client.subscription_count(), 2);

        client.notify(&Event::new(Hello("hi")));
        client.notify(&Event::new(Bye));
        client.notify(&Event::new(3u8));
        assert_eq!(*log.borrow(), vec!["hi", "bye"]);
    }

    #[test]
    fn several_subscriptions_for_one_type_run_in_order() {
        let manager = EventManager::make();
        let client = manager.make_client();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let sink = Rc::clone(&log);
            client.subscribe::<Bye>(move |_| sink.borrow_mut().push(tag));
        }
        client.notify(&Event::new(Bye));
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn emit_forwards_to_manager() {
        let manager = EventManager::make();
        let client = manager.make_client();
        client.emit(Bye);
        assert!(Rc::ptr_eq(client.manager(), &manager));
        assert_eq!(manager.pending_events(), 1);
    }

    #[test]
    fn subscribing_from_a_callback_is_allowed() {
        let manager = EventManager::make();
        let client = manager.make_client();
        let weak = Rc::downgrade(&client);
        client.subscribe::<Bye>(move |_| {
            if let Some(client) = weak.upgrade() {
                client.subscribe::<Hello>(|_| {});
            }
        });
        client.notify(&Event::new(Bye));
        assert_eq!(client.subscription_count(), 2);
    }
}
