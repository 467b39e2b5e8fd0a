//! Particle data model.
//!
//! A `Particle` is a plain record; it owns no behaviour of its own. Every
//! operation that advances or mutates a particle's state lives on
//! `store::ParticleStore`, which pairs the particle vector with the
//! per-particle local clock and invalidation counter.

use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

/// Identifies a particle by its index into the particle store. Particles
/// are never reordered after snapshot load, so this id is stable for the
/// lifetime of a run.
pub type ParticleId = usize;

/// Identifies a species entry in `SystemSnapshot::species`.
pub type SpeciesId = u32;

/// A particle's id, position, velocity, and species.
///
/// `local_clock` and the invalidation counter are *not* stored here — they
/// live in parallel vectors on `ParticleStore`, so that `Particle` itself
/// stays a small `Copy` value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub species_id: SpeciesId,
}

impl Particle {
    pub fn new(id: ParticleId, position: Vec3, velocity: Vec3, species_id: SpeciesId) -> Self {
        Particle {
            id,
            position,
            velocity,
            species_id,
        }
    }

    /// `true` if either the position or the velocity carries a NaN
    /// component. The scheduler treats this as a fatal `PhysicsError`
    /// rather than silently dropping the particle.
    pub fn has_nan(&self) -> bool {
        let p = self.position;
        let v = self.velocity;
        p.x.is_nan()
            || p.y.is_nan()
            || p.z.is_nan()
            || v.x.is_nan()
            || v.y.is_nan()
            || v.z.is_nan()
    }
}
