//! Particle store.
//!
//! Owns the authoritative particle vector plus two parallel arrays: the
//! per-particle local clock and the per-particle invalidation counter.
//! Kept as parallel `Vec`s rather than folded into `Particle` itself so
//! that `Particle` stays a small `Copy` value and bulk operations stay
//! cache-friendly, using a flat, struct-of-arrays-leaning data layout.

use crate::liouvillean::ResolutionDelta;
use crate::particle::{Particle, ParticleId};
use rayon::prelude::*;

pub struct ParticleStore {
    particles: Vec<Particle>,
    clocks: Vec<f64>,
    counters: Vec<u64>,
}

impl ParticleStore {
    /// Builds a store from an ordered particle sequence. Ids must match
    /// each particle's index; this is enforced with a debug assertion
    /// rather than a fallible check, since it's a loader-time invariant,
    /// not a runtime physics condition.
    pub fn new(particles: Vec<Particle>) -> Self {
        for (idx, p) in particles.iter().enumerate() {
            debug_assert_eq!(p.id, idx, "particle id must match its store index");
        }
        let n = particles.len();
        ParticleStore {
            particles,
            clocks: vec![0.0; n],
            counters: vec![0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, id: ParticleId) -> Particle {
        self.particles[id]
    }

    pub fn all(&self) -> &[Particle] {
        &self.particles
    }

    pub fn clock(&self, id: ParticleId) -> f64 {
        self.clocks[id]
    }

    pub fn counter(&self, id: ParticleId) -> u64 {
        self.counters[id]
    }

    /// Directly sets a particle's local clock without advancing its
    /// position. Intended for snapshot loading and tests; the hot path
    /// during a run is always `update_to`.
    pub fn set_clock(&mut self, id: ParticleId, time: f64) {
        self.clocks[id] = time;
    }

    /// Advances a single particle's position by free-flight kinematics up
    /// to `time` and bumps its local clock. O(1) — this is the hot path,
    /// called once per scheduler step for each participant of the fired
    /// event.
    pub fn update_to(&mut self, id: ParticleId, time: f64) {
        let dt = time - self.clocks[id];
        debug_assert!(
            dt >= -1e-9,
            "update_to must not move a particle's clock backwards: {} -> {}",
            self.clocks[id],
            time
        );
        let dt = dt.max(0.0);
        let p = &mut self.particles[id];
        p.position = p.position + p.velocity * dt;
        self.clocks[id] = time;
    }

    /// The position `id` would have at `time` under free flight, without
    /// mutating its stored clock. Used when a particle that hasn't
    /// participated in an event since some earlier clock value needs its
    /// position as of the *current* system time — e.g. serialising a
    /// snapshot, where every particle's local clock must read as the
    /// system time the snapshot was taken at.
    pub fn position_at(&self, id: ParticleId, time: f64) -> crate::vector::Vec3 {
        let dt = (time - self.clocks[id]).max(0.0);
        self.particles[id].position + self.particles[id].velocity * dt
    }

    /// Advances every particle to `time`. This is correctness-insensitive
    /// to ordering because each particle's free-flight projection is
    /// independent of every other particle's, so parallelising the update
    /// across particles with rayon cannot introduce a race.
    pub fn update_all(&mut self, time: f64) {
        let clocks = &self.clocks;
        self.particles
            .par_iter_mut()
            .enumerate()
            .for_each(|(id, p)| {
                let dt = (time - clocks[id]).max(0.0);
                p.position = p.position + p.velocity * dt;
            });
        self.clocks.par_iter_mut().for_each(|c| *c = time);
    }

    pub fn set_velocity(&mut self, id: ParticleId, velocity: crate::vector::Vec3) {
        self.particles[id].velocity = velocity;
    }

    /// Overwrites a particle's position directly, bypassing free-flight
    /// kinematics. Used by the scheduler after folding a boundary-crossing
    /// particle back into the primary cell, where the new position is not
    /// `old_position + velocity * dt` but a boundary-wrapped coordinate.
    pub fn set_position(&mut self, id: ParticleId, position: crate::vector::Vec3) {
        self.particles[id].position = position;
    }

    pub fn bump_counter(&mut self, id: ParticleId) {
        self.counters[id] += 1;
    }

    /// Applies a resolved collision delta: sets each changed particle's
    /// velocity and bumps its invalidation counter exactly once (spec
    /// §4.F step 5: "increment the counter of every particle whose
    /// velocity changed").
    pub fn apply_delta(&mut self, delta: &ResolutionDelta) {
        for &(id, velocity) in &delta.changed {
            self.set_velocity(id, velocity);
            self.bump_counter(id);
        }
    }
}
