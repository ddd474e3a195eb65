//! Property tests for event ownership and delivery.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;
use tessera_events::prelude::*;

/// Payload that counts its drops. `N` controls its size so both storage
/// paths are exercised.
struct Tracked<const N: usize> {
    id: u32,
    drops: Rc<Cell<usize>>,
    _pad: [u8; N],
}

impl<const N: usize> Drop for Tracked<N> {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

fn make(large: bool, id: u32, drops: &Rc<Cell<usize>>) -> Event {
    if large {
        Event::new(Tracked::<96> {
            id,
            drops: Rc::clone(drops),
            _pad: [0; 96],
        })
    } else {
        Event::new(Tracked::<0> {
            id,
            drops: Rc::clone(drops),
            _pad: [],
        })
    }
}

fn id_of(event: &Event) -> u32 {
    event
        .downcast_ref::<Tracked<0>>()
        .map(|t| t.id)
        .or_else(|| event.downcast_ref::<Tracked<96>>().map(|t| t.id))
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every payload is dropped exactly once, whether it is dropped with its
    /// event, moved around, or extracted.
    #[test]
    fn payloads_drop_exactly_once(
        cases in prop::collection::vec((any::<bool>(), any::<bool>()), 0..40),
    ) {
        let drops = Rc::new(Cell::new(0));
        let events: Vec<Event> = cases
            .iter()
            .enumerate()
            .map(|(i, &(large, _))| make(large, i as u32, &drops))
            .collect();
        prop_assert_eq!(drops.get(), 0);

        let mut processed = 0;
        for (event, &(large, extract)) in events.into_iter().zip(&cases) {
            prop_assert_eq!(event.is_inline(), !large);
            if extract {
                if large {
                    let value = event.into_inner::<Tracked<96>>().ok().unwrap();
                    prop_assert_eq!(value.drops.get(), processed);
                } else {
                    let value = event.into_inner::<Tracked<0>>().ok().unwrap();
                    prop_assert_eq!(value.drops.get(), processed);
                }
            } else {
                drop(event);
            }
            processed += 1;
            prop_assert_eq!(drops.get(), processed);
        }
        prop_assert_eq!(drops.get(), cases.len());
    }

    /// Queued events reach every live client once, in emission order, and
    /// are all dropped after delivery.
    #[test]
    fn delivery_is_fifo_and_complete(
        sizes in prop::collection::vec(any::<bool>(), 0..30),
        clients in 0..4usize,
        dropped in any::<bool>(),
    ) {
        let drops = Rc::new(Cell::new(0));
        let manager = EventManager::make();
        let logs: Vec<Rc<std::cell::RefCell<Vec<u32>>>> =
            (0..clients).map(|_| Rc::default()).collect();
        let mut handles: Vec<_> = logs
            .iter()
            .map(|log| {
                let client = manager.make_client();
                let sink = Rc::clone(log);
                client.subscribe::<Tracked<0>>(move |t| sink.borrow_mut().push(t.id));
                let sink = Rc::clone(log);
                client.subscribe::<Tracked<96>>(move |t| sink.borrow_mut().push(t.id));
                client
            })
            .collect();
        if dropped && !handles.is_empty() {
            handles.remove(0);
        }

        for (i, &large) in sizes.iter().enumerate() {
            let event = make(large, i as u32, &drops);
            prop_assert_eq!(id_of(&event), i as u32);
            manager.emit_event(event);
        }
        prop_assert_eq!(manager.pending_events(), sizes.len());

        manager.notify_clients();
        prop_assert!(!manager.has_pending_events());
        prop_assert_eq!(drops.get(), sizes.len());

        let expected: Vec<u32> = (0..sizes.len() as u32).collect();
        let skipped = usize::from(dropped && clients > 0);
        for (c, log) in logs.iter().enumerate() {
            if c < skipped {
                prop_assert!(log.borrow().is_empty());
            } else {
                prop_assert_eq!(&*log.borrow(), &expected);
            }
        }
        prop_assert_eq!(manager.client_count(), clients - skipped);
    }
}
