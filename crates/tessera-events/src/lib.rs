//! Tessera Events -- single-threaded publish/subscribe bus.
//!
//! An [`EventManager`] queues type-erased [`Event`]s and fans them out to its
//! [`EventClient`]s on [`notify_clients`](EventManager::notify_clients).
//! Clients subscribe per payload type; the manager only holds weak references
//! to them, so dropping the last handle to a client unsubscribes it.
//!
//! # Quick Start
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use tessera_events::prelude::*;
//!
//! struct Scored(u32);
//!
//! let manager = EventManager::make();
//! let sender = manager.make_client();
//! let receiver = manager.make_client();
//!
//! let total = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&total);
//! receiver.subscribe::<Scored>(move |e| sink.set(sink.get() + e.0));
//!
//! sender.emit(Scored(3));
//! sender.emit(Scored(4));
//! assert!(manager.has_pending_events());
//!
//! manager.notify_clients();
//! assert_eq!(total.get(), 7);
//! assert!(!manager.has_pending_events());
//! ```

#![deny(unsafe_code)]

pub mod client;
#[allow(unsafe_code)]
pub mod event;
pub mod manager;

pub use client::EventClient;
pub use event::Event;
pub use manager::EventManager;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by event access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The event's payload is not of the requested type.
    #[error("event payload type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::client::EventClient;
    pub use crate::event::Event;
    pub use crate::manager::EventManager;
    pub use crate::EventError;
}
