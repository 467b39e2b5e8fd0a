//! Ordered component registries.
//!
//! `interactions`, `locals`, and `globals` are each kept as an insertion-order
//! `Vec`, since registry order is part of the snapshot: two snapshots with
//! the same entries in a different order are not considered equal, and
//! re-serializing a loaded snapshot must reproduce the original order
//! byte-for-byte in the JSON array.

use crate::event::Event;
use crate::error::PhysicsError;
use crate::liouvillean::{Liouvillean, ResolutionDelta};
use crate::particle::ParticleId;
use crate::species::SpeciesDescriptor;
use crate::store::ParticleStore;
use crate::vector::Vec3;

/// The well-known name the scheduler looks up at `initialise()` to find the
/// neighbour-list global among the `globals` registry.
pub const NEIGHBOUR_LIST_GLOBAL_NAME: &str = "SchedulerNBList";

/// A pairwise interaction rule between two species (e.g. hard-sphere
/// collision, a square-well potential in a future extension). The crate
/// ships exactly one implementation, `HardSphereInteraction`, but the trait
/// seam keeps the scheduler's event-derivation logic decoupled from any one
/// physical model.
pub trait Interaction {
    /// Does this interaction apply to a collision between particles of
    /// these two species?
    fn applies_to(&self, species_i: u32, species_j: u32) -> bool;

    fn predict(
        &self,
        liouvillean: &Liouvillean,
        i: crate::particle::Particle,
        i_clock: f64,
        j: crate::particle::Particle,
        j_clock: f64,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<Option<f64>, PhysicsError>;

    fn resolve(
        &self,
        liouvillean: &Liouvillean,
        event: &Event,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<ResolutionDelta, PhysicsError>;
}

/// Standard elastic hard-sphere collision, delegated straight to the
/// liouvillean's own `predict_interaction`/`resolve`. This is the only
/// interaction a stock snapshot needs; it exists as a named registry entry
/// (rather than folding into the scheduler directly) so that a future
/// species-pair-specific interaction can be added without touching the
/// scheduler.
pub struct HardSphereInteraction;

impl Interaction for HardSphereInteraction {
    fn applies_to(&self, _species_i: u32, _species_j: u32) -> bool {
        true
    }

    fn predict(
        &self,
        liouvillean: &Liouvillean,
        i: crate::particle::Particle,
        i_clock: f64,
        j: crate::particle::Particle,
        j_clock: f64,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<Option<f64>, PhysicsError> {
        liouvillean.predict_interaction(i, i_clock, j, j_clock, species, bc)
    }

    fn resolve(
        &self,
        liouvillean: &Liouvillean,
        event: &Event,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<ResolutionDelta, PhysicsError> {
        liouvillean.resolve(event, store, species, bc)
    }
}

/// A fixed geometric feature a particle can collide against (a wall, a
/// sink). Locals have no velocity of their own; resolving a local event
/// only ever changes the participating particle.
pub trait Local {
    fn name(&self) -> &str;
    fn anchor(&self) -> Vec3;
    fn predict(&self, particle: crate::particle::Particle, clock: f64) -> Option<f64>;
    fn resolve(&self, particle: crate::particle::Particle) -> Vec3;
}

/// A flat reflecting wall with a fixed plane anchor and outward normal.
pub struct WallLocal {
    pub name: String,
    pub anchor: Vec3,
    pub normal: Vec3,
}

impl Local for WallLocal {
    fn name(&self) -> &str {
        &self.name
    }

    fn anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Time until `particle`'s free-flight trajectory crosses the wall's
    /// plane, or `None` if it is moving parallel to or away from it.
    fn predict(&self, particle: crate::particle::Particle, clock: f64) -> Option<f64> {
        let rel = particle.position - self.anchor;
        let d0 = rel.dot(&self.normal);
        let closing = particle.velocity.dot(&self.normal);
        if closing >= 0.0 {
            return None;
        }
        let dt = -d0 / closing;
        if dt < 0.0 {
            return None;
        }
        Some(clock + dt)
    }

    /// Specular reflection: flips the velocity component along the wall
    /// normal, leaving the tangential component untouched.
    fn resolve(&self, particle: crate::particle::Particle) -> Vec3 {
        let vn = particle.velocity.dot(&self.normal);
        particle.velocity - self.normal * (2.0 * vn)
    }
}

/// A system-wide driver not tied to any particular particle pair (a
/// thermostat, a periodic neighbour-list maintenance tick). The crate keeps
/// this seam for future extension; no concrete `Global` other than the
/// neighbour list itself is shipped.
pub trait Global {
    fn name(&self) -> &str;
}

/// Registers the neighbour list under its well-known name so the scheduler
/// can find it without a type test.
pub struct NeighbourListGlobal {
    pub id: ParticleId,
}

impl Global for NeighbourListGlobal {
    fn name(&self) -> &str {
        NEIGHBOUR_LIST_GLOBAL_NAME
    }
}

/// Locates the neighbour-list entry among a `globals` registry by its
/// well-known name. Returns its index, or `None` if the snapshot never
/// registered one (a `ConfigError::MissingNeighbourList` at the scheduler's
/// `initialise()` call site, per §4.F "Failure semantics").
pub fn find_neighbour_list_global(globals: &[Box<dyn Global>]) -> Option<usize> {
    globals
        .iter()
        .position(|g| g.name() == NEIGHBOUR_LIST_GLOBAL_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::Particle;

    #[test]
    fn wall_predicts_approach_time() {
        let wall = WallLocal {
            name: "floor".into(),
            anchor: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
        };
        let p = Particle::new(0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0), 0);
        let t = wall.predict(p, 0.0).expect("must approach");
        assert!((t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn wall_ignores_receding_particle() {
        let wall = WallLocal {
            name: "floor".into(),
            anchor: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
        };
        let p = Particle::new(0, Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0);
        assert!(wall.predict(p, 0.0).is_none());
    }

    #[test]
    fn wall_reflects_normal_component() {
        let wall = WallLocal {
            name: "floor".into(),
            anchor: Vec3::new(0.0, 0.0, 0.0),
            normal: Vec3::new(0.0, 1.0, 0.0),
        };
        let p = Particle::new(0, Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, -2.0, 0.0), 0);
        let reflected = wall.resolve(p);
        assert!(reflected.approx_eq(&Vec3::new(1.0, 2.0, 0.0), 1e-12));
    }

    #[test]
    fn finds_neighbour_list_by_well_known_name() {
        let globals: Vec<Box<dyn Global>> = vec![Box::new(NeighbourListGlobal { id: 0 })];
        assert_eq!(find_neighbour_list_global(&globals), Some(0));
    }

    #[test]
    fn missing_neighbour_list_is_none() {
        let globals: Vec<Box<dyn Global>> = vec![];
        assert_eq!(find_neighbour_list_global(&globals), None);
    }
}
