//! Predicted events and the invalidation-counter mechanism.
//!
//! This is the crate's central data type: every prediction made by the
//! liouvillean, the neighbour list, or a registry entry is packaged as an
//! `Event` and pushed onto the scheduler. The `counter_at_prediction` field
//! is what lets a stale prediction be recognised lazily at pop time —
//! do not replace it with eager deletion.

use crate::particle::ParticleId;
use std::cmp::Ordering;

/// The counterparty of an event: another particle, a registered local
/// element, a registered global, the neighbour list itself (for cell
/// crossings), or the system event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counterparty {
    Particle(ParticleId),
    Local(usize),
    Global(usize),
    /// The particle's own cell boundary.
    CellBoundary,
    System,
}

impl Counterparty {
    /// A total order key used only to break exact time ties: order is
    /// defined by the pair (primary id, counterparty id) lexicographically.
    /// Variants are ordered by tag first so a
    /// particle-particle tie never compares equal to a particle-local tie
    /// by accident.
    fn tie_break_key(&self) -> (u8, usize) {
        match self {
            Counterparty::Particle(id) => (0, *id),
            Counterparty::Local(id) => (1, *id),
            Counterparty::Global(id) => (2, *id),
            Counterparty::CellBoundary => (3, 0),
            Counterparty::System => (4, 0),
        }
    }
}

/// The kind of transition an event represents. Carried separately from
/// `Counterparty` because e.g. a `Global` counterparty might resolve
/// either as a thermostat kick (Global) or as a neighbour-list
/// maintenance tick (System) depending on configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Interaction,
    CellCrossing,
    Local,
    Global,
    System,
}

/// A predicted future transition.
///
/// Events are immutable once constructed (there is no in-place mutation
/// transition between a prediction being live, validated, and discarded);
/// replacing a stale prediction means discarding the old `Event` and
/// pushing a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub fire_time: f64,
    pub kind: EventKind,
    pub primary: ParticleId,
    pub counterparty: Counterparty,
    /// Snapshot of the primary particle's invalidation counter at the
    /// moment this event was predicted.
    pub counter_at_prediction: u64,
    /// Snapshot of the counterparty's invalidation counter at prediction
    /// time, when the counterparty is itself a particle. Needed alongside
    /// `counter_at_prediction` because a pair prediction can go stale from
    /// either side changing, not just the bucket it happens to sit in — a
    /// particle that changes velocity only gets its own bucket
    /// re-predicted, so any *other* bucket still holding a stale reference
    /// to it must be able to detect that on its own.
    pub counterparty_counter_at_prediction: Option<u64>,
}

impl Event {
    pub fn new(
        fire_time: f64,
        kind: EventKind,
        primary: ParticleId,
        counterparty: Counterparty,
        counter_at_prediction: u64,
    ) -> Self {
        Event {
            fire_time,
            kind,
            primary,
            counterparty,
            counter_at_prediction,
            counterparty_counter_at_prediction: None,
        }
    }

    /// Builds an interaction event between two particles, snapshotting both
    /// sides' invalidation counters.
    pub fn new_interaction(
        fire_time: f64,
        primary: ParticleId,
        primary_counter: u64,
        counterparty: ParticleId,
        counterparty_counter: u64,
    ) -> Self {
        Event {
            fire_time,
            kind: EventKind::Interaction,
            primary,
            counterparty: Counterparty::Particle(counterparty),
            counter_at_prediction: primary_counter,
            counterparty_counter_at_prediction: Some(counterparty_counter),
        }
    }

    /// `true` if `self.fire_time` ties `other.fire_time` within the usual
    /// floating-point identity comparison (no epsilon fuzz — the tie-break
    /// rule only applies to exact ties; a liouvillean that predicts two
    /// events at times differing by float noise is not considered tied,
    /// and will simply fire in whichever order the heap produces for their
    /// distinct times).
    fn ties(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Orders events earliest-first by `fire_time`, breaking exact ties by
/// `(primary id, counterparty id)` lexicographically.
///
/// `fire_time` is assumed never to be NaN here: a liouvillean that predicts
/// NaN must be rejected before the event is ever constructed
/// (`PhysicsError::NotANumber`), so `partial_cmp().unwrap()` is safe at
/// this layer — reaching a NaN here would itself indicate the core failed
/// to enforce that precondition.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_time
            .partial_cmp(&other.fire_time)
            .expect("event fire_time must never be NaN")
            .then_with(|| {
                if self.ties(other) {
                    (self.primary, self.counterparty.tie_break_key())
                        .cmp(&(other.primary, other.counterparty.tie_break_key()))
                } else {
                    Ordering::Equal
                }
            })
    }
}
