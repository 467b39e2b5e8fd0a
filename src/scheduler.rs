//! The scheduler: two-level priority queue, system event list, and main
//! loop.
//!
//! The queue is two levels deep: a per-particle bucket (`per_particle[i]`,
//! a min-heap of every prediction currently outstanding with `i` as
//! primary) plus a `top` heap mirroring every prediction ever pushed, used
//! to find the globally smallest fire time without scanning every bucket.
//! Staleness is never checked eagerly — a prediction is validated only when
//! it reaches the front of the queue, against the invalidation counters it
//! carries. Eager deletion (walking a particle's bucket to remove stale
//! entries the moment a velocity changes) was deliberately rejected in
//! favour of this lazy check; see the invalidation-counter check in
//! `pop_next` below.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::boundary::BoundaryCondition;
use crate::error::{ConfigError, PhysicsError, SimError};
use crate::event::{Counterparty, Event, EventKind};
use crate::liouvillean::Liouvillean;
use crate::neighbourlist::NeighbourList;
use crate::particle::ParticleId;
use crate::registry::{find_neighbour_list_global, Global, Interaction, Local};
use crate::runtime::StopFlag;
use crate::signal::{ChangeSignal, SignalBus};
use crate::species::SpeciesDescriptor;
use crate::store::ParticleStore;

/// One fired event, retained for output plugins and for determinism checks
/// (identical seed and initial snapshot must produce an identical stream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub fire_time: f64,
    pub kind: EventKind,
    pub primary: ParticleId,
    pub counterparty: Counterparty,
}

pub struct Scheduler {
    per_particle: Vec<BinaryHeap<Reverse<Event>>>,
    top: BinaryHeap<Reverse<Event>>,
    system_events: Vec<Event>,
    signals: SignalBus,
    neighbour_list_global: usize,
    collisions: u64,
}

impl Scheduler {
    /// Locates the neighbour-list global by its well-known name and builds
    /// an empty queue. Fails if no such global is registered.
    pub fn new(particle_count: usize, globals: &[Box<dyn Global>]) -> Result<Self, ConfigError> {
        let neighbour_list_global =
            find_neighbour_list_global(globals).ok_or(ConfigError::MissingNeighbourList {
                name: crate::registry::NEIGHBOUR_LIST_GLOBAL_NAME,
            })?;

        Ok(Scheduler {
            per_particle: (0..particle_count).map(|_| BinaryHeap::new()).collect(),
            top: BinaryHeap::new(),
            system_events: Vec::new(),
            signals: SignalBus::new(),
            neighbour_list_global,
            collisions: 0,
        })
    }

    pub fn signal_bus(&self) -> &SignalBus {
        &self.signals
    }

    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    fn push(&mut self, event: Event) {
        self.per_particle[event.primary].push(Reverse(event));
        self.top.push(Reverse(event));
    }

    fn push_system(&mut self, event: Event) {
        self.system_events.push(event);
    }

    /// Re-derives every outstanding prediction for `particle`: interaction
    /// events against its current cell neighbours, local events against
    /// visible locals, and its next cell-crossing event. Every new
    /// prediction is pushed liberally — no attempt is made to
    /// deduplicate against what the counterparty's own bucket might
    /// already hold; the invalidation-counter check at pop time is what
    /// keeps the queue correct.
    pub fn add_events(
        &mut self,
        particle: ParticleId,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &BoundaryCondition,
        liouvillean: &Liouvillean,
        interactions: &[Box<dyn Interaction>],
        locals: &[Box<dyn Local>],
        neighbour_list: &NeighbourList,
    ) -> Result<(), PhysicsError> {
        let p = store.get(particle);
        let p_clock = store.clock(particle);
        let p_counter = store.counter(particle);

        let mut neighbours = Vec::new();
        neighbour_list.for_each_neighbour(particle, |q| neighbours.push(q));

        for q in neighbours {
            let qp = store.get(q);
            let q_clock = store.clock(q);
            let q_counter = store.counter(q);
            for interaction in interactions {
                if !interaction.applies_to(p.species_id, qp.species_id) {
                    continue;
                }
                if let Some(t) =
                    interaction.predict(liouvillean, p, p_clock, qp, q_clock, species, bc)?
                {
                    self.push(Event::new_interaction(t, particle, p_counter, q, q_counter));
                }
            }
        }

        let mut visible_locals = Vec::new();
        neighbour_list.for_each_local_element(particle, |l| visible_locals.push(l));
        for local_id in visible_locals {
            if let Some(local) = locals.get(local_id) {
                if let Some(t) = local.predict(p, p_clock) {
                    self.push(Event::new(
                        t,
                        EventKind::Local,
                        particle,
                        Counterparty::Local(local_id),
                        p_counter,
                    ));
                }
            }
        }

        let crossing = neighbour_list.next_cell_crossing(particle, p.position, p.velocity, p_clock);
        if crossing.is_finite() {
            self.push(Event::new(
                crossing,
                EventKind::CellCrossing,
                particle,
                Counterparty::CellBoundary,
                p_counter,
            ));
        }

        Ok(())
    }

    /// Whether `event` still reflects the current state of its
    /// participants.
    fn is_live(event: &Event, store: &ParticleStore) -> bool {
        if store.counter(event.primary) != event.counter_at_prediction {
            return false;
        }
        if let Counterparty::Particle(j) = event.counterparty {
            if let Some(expected) = event.counterparty_counter_at_prediction {
                if store.counter(j) != expected {
                    return false;
                }
            }
        }
        true
    }

    /// Pops the next live event, discarding stale entries from both levels
    /// of the queue along the way. Returns `None` once every bucket and the
    /// system list are exhausted; the caller, not this method, turns that
    /// into `PhysicsError::Stuck`, since an empty queue before `end_time` is
    /// only an error in the context of a bounded run.
    fn pop_next(&mut self, store: &ParticleStore) -> Option<Event> {
        loop {
            let system_idx = smallest_index(&self.system_events);
            let top_candidate = self.top.peek().map(|Reverse(e)| *e);

            let take_system = match (system_idx, top_candidate) {
                (Some(i), Some(top_ev)) => self.system_events[i] < top_ev,
                (Some(_), None) => true,
                _ => false,
            };

            if take_system {
                let event = self.system_events.remove(system_idx.unwrap());
                return Some(event);
            }

            let event = match top_candidate {
                Some(e) => e,
                None => return None,
            };

            let bucket = &mut self.per_particle[event.primary];
            match bucket.peek() {
                Some(Reverse(current_min)) if *current_min == event => {}
                _ => {
                    // Superseded by a fresher prediction already at the
                    // front of its bucket; this `top` entry is a stale
                    // duplicate left behind by an earlier `push`.
                    self.top.pop();
                    continue;
                }
            }

            self.top.pop();
            bucket.pop();

            if !Self::is_live(&event, store) {
                continue;
            }

            return Some(event);
        }
    }

    /// Drives the simulation forward from its current state until
    /// `end_time` is reached or `max_collisions` interaction events have
    /// fired, whichever comes first. Returns the recorded event stream.
    pub fn run(
        &mut self,
        store: &mut ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &BoundaryCondition,
        liouvillean: &Liouvillean,
        interactions: &[Box<dyn Interaction>],
        locals: &[Box<dyn Local>],
        _globals: &[Box<dyn Global>],
        neighbour_list: &mut NeighbourList,
        end_time: f64,
        max_collisions: Option<u64>,
        stop_flag: Option<&StopFlag>,
    ) -> Result<Vec<EventRecord>, SimError> {
        let mut records = Vec::new();

        loop {
            if let Some(limit) = max_collisions {
                if self.collisions >= limit {
                    break;
                }
            }

            if let Some(flag) = stop_flag {
                if flag.is_stopped() {
                    return Err(SimError::Shutdown);
                }
            }

            let event = match self.pop_next(store) {
                Some(e) => e,
                None => {
                    if records.is_empty() || store.len() == 0 {
                        break;
                    }
                    return Err(SimError::Physics(PhysicsError::Stuck { end_time }));
                }
            };

            if event.fire_time > end_time {
                break;
            }

            self.dispatch(event, store, species, bc, liouvillean, interactions, locals, neighbour_list)?;

            records.push(EventRecord {
                fire_time: event.fire_time,
                kind: event.kind,
                primary: event.primary,
                counterparty: event.counterparty,
            });

            for signal in neighbour_list.drain_signals() {
                self.signals.dispatch(&signal);
                self.handle_signal(signal, store, species, bc, liouvillean, interactions, locals, neighbour_list)?;
            }
        }

        Ok(records)
    }

    /// Applies one fired event's physical effect and re-derives the
    /// predictions it invalidates.
    fn dispatch(
        &mut self,
        event: Event,
        store: &mut ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &BoundaryCondition,
        liouvillean: &Liouvillean,
        interactions: &[Box<dyn Interaction>],
        locals: &[Box<dyn Local>],
        neighbour_list: &mut NeighbourList,
    ) -> Result<(), SimError> {
        match event.kind {
            EventKind::Interaction => {
                let j = match event.counterparty {
                    Counterparty::Particle(j) => j,
                    other => unreachable!("interaction event with non-particle counterparty {other:?}"),
                };
                store.update_to(event.primary, event.fire_time);
                store.update_to(j, event.fire_time);

                let mut delta = None;
                for interaction in interactions {
                    let candidate = interaction.resolve(liouvillean, &event, store, species, bc)?;
                    if !candidate.changed.is_empty() {
                        delta = Some(candidate);
                        break;
                    }
                }
                if let Some(delta) = delta {
                    store.apply_delta(&delta);
                    self.collisions += 1;
                    for &(id, _) in &delta.changed {
                        neighbour_list.move_particle(id, store.get(id).position);
                        self.add_events(id, store, species, bc, liouvillean, interactions, locals, neighbour_list)?;
                    }
                }
            }
            EventKind::Local => {
                let local_id = match event.counterparty {
                    Counterparty::Local(l) => l,
                    other => unreachable!("local event with non-local counterparty {other:?}"),
                };
                store.update_to(event.primary, event.fire_time);
                if let Some(local) = locals.get(local_id) {
                    let new_velocity = local.resolve(store.get(event.primary));
                    store.set_velocity(event.primary, new_velocity);
                    store.bump_counter(event.primary);
                    self.add_events(
                        event.primary,
                        store,
                        species,
                        bc,
                        liouvillean,
                        interactions,
                        locals,
                        neighbour_list,
                    )?;
                }
            }
            EventKind::CellCrossing => {
                store.update_to(event.primary, event.fire_time);
                let mut position = store.get(event.primary).position;
                bc.apply(&mut position);
                if !bc.is_within_primary_box(position) {
                    return Err(SimError::Physics(PhysicsError::OutsidePrimaryBox {
                        particle: event.primary,
                    }));
                }
                store.set_position(event.primary, position);
                neighbour_list.move_particle(event.primary, position);
                self.add_events(
                    event.primary,
                    store,
                    species,
                    bc,
                    liouvillean,
                    interactions,
                    locals,
                    neighbour_list,
                )?;
            }
            EventKind::Global | EventKind::System => {
                store.update_to(event.primary, event.fire_time);
                self.add_events(
                    event.primary,
                    store,
                    species,
                    bc,
                    liouvillean,
                    interactions,
                    locals,
                    neighbour_list,
                )?;
            }
        }
        Ok(())
    }

    /// Reacts to a drained neighbour-list change signal by re-deriving
    /// predictions for whichever particle the signal names.
    fn handle_signal(
        &mut self,
        signal: ChangeSignal,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &BoundaryCondition,
        liouvillean: &Liouvillean,
        interactions: &[Box<dyn Interaction>],
        locals: &[Box<dyn Local>],
        neighbour_list: &NeighbourList,
    ) -> Result<(), PhysicsError> {
        match signal {
            ChangeSignal::NewParticle { particle, .. } | ChangeSignal::NewLocal { particle, .. } => {
                self.add_events(particle, store, species, bc, liouvillean, interactions, locals, neighbour_list)
            }
            ChangeSignal::CellCrossing { .. } => Ok(()),
            ChangeSignal::ReInit => {
                for id in 0..store.len() {
                    self.add_events(id, store, species, bc, liouvillean, interactions, locals, neighbour_list)?;
                }
                Ok(())
            }
        }
    }

    /// Seeds the queue with every particle's initial predictions. Must be
    /// called exactly once before the first `run` call.
    pub fn initialise(
        &mut self,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &BoundaryCondition,
        liouvillean: &Liouvillean,
        interactions: &[Box<dyn Interaction>],
        locals: &[Box<dyn Local>],
        neighbour_list: &NeighbourList,
    ) -> Result<(), PhysicsError> {
        for id in 0..store.len() {
            self.add_events(id, store, species, bc, liouvillean, interactions, locals, neighbour_list)?;
        }
        Ok(())
    }
}

fn smallest_index(events: &[Event]) -> Option<usize> {
    events
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
}
