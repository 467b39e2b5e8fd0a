//! Neighbour-list change signals.
//!
//! Rather than back-pointers wiring the neighbour list directly into the
//! scheduler, the neighbour list only ever *appends* to a drain buffer
//! (`neighbourlist::NeighbourList::drain_signals`). The scheduler — the
//! sole owner of the main loop — drains that buffer once per event and
//! dispatches each signal through this bus to whichever sinks are
//! registered. No implicit callback graph, no back-pointer.

use crate::particle::ParticleId;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// One of the four notification channels the neighbour list can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
    /// `particle` crossed from `from_cell` into `to_cell`.
    CellCrossing {
        particle: ParticleId,
        from_cell: usize,
        to_cell: usize,
    },
    /// A new local element (wall, sink) entered `particle`'s neighbourhood.
    NewLocal { particle: ParticleId, local: usize },
    /// A new particle entered `particle`'s neighbourhood.
    NewParticle {
        particle: ParticleId,
        neighbour: ParticleId,
    },
    /// The neighbour list was rebuilt from scratch; every particle's
    /// predicted events must be re-derived.
    ReInit,
}

type Handler = Box<dyn FnMut(&ChangeSignal)>;

/// A registration that de-registers its sink on drop, replacing RAII
/// signal connections with an ordinary drop guard.
#[must_use = "dropping the token immediately de-registers the handler"]
pub struct SignalToken {
    id: u64,
    handlers: Weak<RefCell<Vec<(u64, Handler)>>>,
}

impl Drop for SignalToken {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

/// The sink registry. The core runs single-threaded cooperative; these
/// callbacks execute synchronously on the simulation thread and are not a
/// concurrency primitive, so `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>`
/// is the right tool here.
#[derive(Default)]
pub struct SignalBus {
    handlers: Rc<RefCell<Vec<(u64, Handler)>>>,
    next_id: Cell<u64>,
}

impl SignalBus {
    pub fn new() -> Self {
        SignalBus::default()
    }

    /// Registers a sink. A handler registered before any `dispatch` call
    /// is guaranteed to receive every subsequent signal exactly once.
    pub fn register(&self, handler: impl FnMut(&ChangeSignal) + 'static) -> SignalToken {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push((id, Box::new(handler)));
        SignalToken {
            id,
            handlers: Rc::downgrade(&self.handlers),
        }
    }

    /// Dispatches one signal to every currently registered sink, in
    /// registration order.
    pub fn dispatch(&self, signal: &ChangeSignal) {
        for (_, handler) in self.handlers.borrow_mut().iter_mut() {
            handler(signal);
        }
    }

    pub fn sink_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}
