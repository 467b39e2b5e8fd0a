//! The `Runtime` value: what would otherwise be process-wide mutable
//! globals, lifted into an explicit value passed through constructors.
//!
//! Holds the three things that would otherwise be ambient globals: the RNG
//! seed (for reproducible `init` generation), the cooperative stop flag the
//! main loop polls between events, and an optional handoff buffer for a
//! detached visualiser consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A `(x, y, z, radius)` quadruple array, one per particle, behind a single
/// mutex: the producer copies, releases, continues. A `std::sync::Mutex`
/// is the right tool here rather than a channel: the relationship is
/// producer-overwrites /
/// consumer-reads-in-place, not a queue of discrete messages — contrast
/// with `signal::SignalBus`, which is a queue of discrete `ChangeSignal`s.
#[derive(Clone, Default)]
pub struct HandoffBuffer {
    inner: Arc<Mutex<Vec<(f64, f64, f64, f64)>>>,
}

impl HandoffBuffer {
    pub fn new() -> Self {
        HandoffBuffer::default()
    }

    /// Overwrites the buffer with a fresh snapshot. Called by the
    /// simulation thread; never blocks on a reader for longer than the
    /// copy itself takes.
    pub fn publish(&self, frame: &[(f64, f64, f64, f64)]) {
        let mut guard = self.inner.lock().expect("handoff buffer mutex poisoned");
        guard.clear();
        guard.extend_from_slice(frame);
    }

    /// Copies out the most recently published frame. The consumer treats
    /// the result as read-only.
    pub fn read(&self) -> Vec<(f64, f64, f64, f64)> {
        self.inner.lock().expect("handoff buffer mutex poisoned").clone()
    }
}

/// A cooperative stop flag, checked by the scheduler's main loop between
/// events. Cloning shares the same underlying flag, so a signal handler or
/// a UI thread can hold one end while the simulation thread polls the
/// other.
#[derive(Clone, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        StopFlag::default()
    }

    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// The single explicit value threaded through constructors in place of the
/// process-wide globals (window registry, master control) the source wires
/// up. Every collaborator that needs the RNG seed, the stop flag, or the
/// handoff buffer takes a `&Runtime` rather than reaching for a static.
pub struct Runtime {
    pub rng_seed: u64,
    pub stop_flag: StopFlag,
    pub handoff: Option<HandoffBuffer>,
}

impl Runtime {
    pub fn new(rng_seed: u64) -> Self {
        Runtime {
            rng_seed,
            stop_flag: StopFlag::new(),
            handoff: None,
        }
    }

    pub fn with_handoff(mut self) -> Self {
        self.handoff = Some(HandoffBuffer::new());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_shared_across_clones() {
        let flag = StopFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_stopped());
        clone.request_stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn handoff_buffer_read_reflects_latest_publish() {
        let buf = HandoffBuffer::new();
        assert!(buf.read().is_empty());
        buf.publish(&[(1.0, 2.0, 3.0, 0.5)]);
        assert_eq!(buf.read(), vec![(1.0, 2.0, 3.0, 0.5)]);
        buf.publish(&[(4.0, 5.0, 6.0, 0.5), (7.0, 8.0, 9.0, 0.5)]);
        assert_eq!(buf.read().len(), 2);
    }
}
