//! The liouvillean: free-flight kinematics and collision resolution.
//!
//! A runtime type test distinguishing compression mode from standard mode
//! at every call site is replaced here by a single polymorphic
//! `effective_diameter` method. `growth_rate` is plain data on the
//! `Compression` variant, matched once inside `predict_interaction` —
//! there is exactly one branch point, not a type test repeated at every
//! call site.

use crate::error::PhysicsError;
use crate::event::{Counterparty, Event};
use crate::particle::{Particle, ParticleId};
use crate::species::{self, SpeciesDescriptor};
use crate::store::ParticleStore;
use crate::vector::Vec3;
use serde::{Deserialize, Serialize};

/// A flattened tagged variant rather than a clone-on-copy class hierarchy.
/// Data lives inline; `Clone` is a value copy, no indirection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Liouvillean {
    /// Static hard-core diameters, standard elastic hard-sphere dynamics.
    HardSphere,
    /// Effective hard-core diameter grows linearly with absolute
    /// simulation time at `growth_rate` ("compression mode").
    Compression { growth_rate: f64 },
}

/// Describes which particles had their velocity changed by a resolved
/// event, and how, so the scheduler can bump invalidation counters and the
/// output plugins can record a delta.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionDelta {
    pub changed: Vec<(ParticleId, Vec3)>,
}

impl Liouvillean {
    /// The linear growth rate applied to hard-core diameters; zero for
    /// standard hard spheres.
    fn growth_rate(&self) -> f64 {
        match self {
            Liouvillean::HardSphere => 0.0,
            Liouvillean::Compression { growth_rate } => *growth_rate,
        }
    }

    /// The effective hard-core diameter of `species` at absolute time `t`.
    /// This is the single polymorphic seam that replaces a runtime type
    /// test at every call site.
    pub fn effective_diameter(&self, species: &SpeciesDescriptor, t: f64) -> f64 {
        species.diameter + self.growth_rate() * t
    }

    /// The next absolute time at or after `max(i.clock, j.clock)` at which
    /// particles `i` and `j` collide, or `None` if they never will.
    ///
    /// Deterministic: given the same inputs, always returns the same
    /// answer. Tie-breaking between simultaneous predictions for different
    /// pairs is handled by `Event`'s `Ord`, not here.
    pub fn predict_interaction(
        &self,
        i: Particle,
        i_clock: f64,
        j: Particle,
        j_clock: f64,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<Option<f64>, PhysicsError> {
        let t0 = i_clock.max(j_clock);

        let pos_i = i.position + i.velocity * (t0 - i_clock);
        let pos_j = j.position + j.velocity * (t0 - j_clock);

        let dr0 = bc.displacement(pos_i, pos_j);
        let dv = i.velocity - j.velocity;

        let species_i = species::find(species, i.species_id).ok_or(PhysicsError::NotANumber {
            particle: i.id,
            field: "species_id",
        })?;
        let species_j = species::find(species, j.species_id).ok_or(PhysicsError::NotANumber {
            particle: j.id,
            field: "species_id",
        })?;
        let sigma_i = self.effective_diameter(species_i, t0);
        let sigma_j = self.effective_diameter(species_j, t0);
        let d0 = 0.5 * (sigma_i + sigma_j);
        let g = self.growth_rate();

        // Solve |dr0 + dv*s|^2 == (d0 + g*s)^2 for the smallest s >= 0.
        // Expands to a quadratic a*s^2 + b*s + c == 0:
        let a = dv.dot(&dv) - g * g;
        let b = 2.0 * (dr0.dot(&dv) - g * d0);
        let c = dr0.dot(&dr0) - d0 * d0;

        let s = solve_smallest_nonnegative_root(a, b, c);
        match s {
            Some(s) => {
                let t = t0 + s;
                if t < t0 {
                    return Err(PhysicsError::TimeTravel {
                        particle: i.id,
                        time: t,
                        system_time: t0,
                    });
                }
                Ok(Some(t))
            }
            None => Ok(None),
        }
    }

    /// Resolves a pairwise interaction event: elastic hard-sphere
    /// collision along the contact normal, returning the velocity delta
    /// for both participants.
    pub fn resolve(
        &self,
        event: &Event,
        store: &ParticleStore,
        species: &[SpeciesDescriptor],
        bc: &crate::boundary::BoundaryCondition,
    ) -> Result<ResolutionDelta, PhysicsError> {
        let j = match event.counterparty {
            Counterparty::Particle(j) => j,
            other => {
                panic!("Liouvillean::resolve called on a non-interaction counterparty: {other:?}")
            }
        };
        let i = event.primary;

        let pi = store.get(i);
        let pj = store.get(j);

        let normal = {
            // Must go through `bc.displacement`, not a raw subtraction: a
            // pair whose cells neighbour each other across a periodic wrap
            // (e.g. x=0.5 and x=29.5 in a box of side 30) has a contact
            // normal that only the minimum-image displacement gets right.
            let raw = bc.displacement(pi.position, pj.position);
            let n = raw.norm();
            if n <= f64::EPSILON {
                return Err(PhysicsError::NotANumber {
                    particle: i,
                    field: "collision normal (particles coincide)",
                });
            }
            raw * (1.0 / n)
        };

        let species_i =
            species::find(species, pi.species_id).expect("species table checked at initialise");
        let species_j =
            species::find(species, pj.species_id).expect("species table checked at initialise");

        let rel_vel = pi.velocity - pj.velocity;
        let vn = rel_vel.dot(&normal);
        if vn >= 0.0 {
            // Already separating; nothing to resolve. This can legitimately
            // happen for an event re-validated after an unrelated change
            // shifted the trajectories apart, rather than being discarded
            // by the counter check.
            return Ok(ResolutionDelta { changed: vec![] });
        }

        let inv_mass_i = 1.0 / species_i.mass;
        let inv_mass_j = 1.0 / species_j.mass;
        // Coefficient of restitution 1.0 (perfectly elastic), spec's
        // boundary scenario 1 requires exact velocity exchange for equal
        // masses head-on.
        let impulse = -2.0 * vn / (inv_mass_i + inv_mass_j);

        let new_vi = pi.velocity + normal * (impulse * inv_mass_i);
        let new_vj = pj.velocity - normal * (impulse * inv_mass_j);

        Ok(ResolutionDelta {
            changed: vec![(i, new_vi), (j, new_vj)],
        })
    }
}

/// Solves `a*s^2 + b*s + c == 0` for the smallest `s >= 0`, restricted to
/// roots that represent genuine approach (mirrors DynamO's
/// `quadSolve`/sign-of-`b` convention: only consider collisions where the
/// particles are approaching at contact).
fn solve_smallest_nonnegative_root(a: f64, b: f64, c: f64) -> Option<f64> {
    const EPS: f64 = 1e-12;

    if a.abs() < EPS {
        if b.abs() < EPS {
            return None;
        }
        let s = -c / b;
        return if s >= 0.0 { Some(s) } else { None };
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let s1 = (-b - sqrt_disc) / (2.0 * a);
    let s2 = (-b + sqrt_disc) / (2.0 * a);
    let (lo, hi) = if s1 <= s2 { (s1, s2) } else { (s2, s1) };

    if lo >= -EPS {
        Some(lo.max(0.0))
    } else if hi >= -EPS {
        Some(hi.max(0.0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryCondition;

    fn species_table() -> Vec<SpeciesDescriptor> {
        vec![SpeciesDescriptor::new(0, "sphere", 1.0, 1.0)]
    }

    #[test]
    fn head_on_collision_time_matches_scenario_one() {
        // Two unit-mass, diameter-1 spheres at (-2,0,0)/(+2,0,0) moving
        // towards each other at unit speed: they touch at t = 1.5.
        let l = Liouvillean::HardSphere;
        let bc = BoundaryCondition::Periodic {
            box_size: Vec3::new(1000.0, 1000.0, 1000.0),
        };
        let species = species_table();

        let i = Particle::new(0, Vec3::new(-2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0);
        let j = Particle::new(1, Vec3::new(2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0);

        let t = l
            .predict_interaction(i, 0.0, j, 0.0, &species, &bc)
            .unwrap()
            .expect("must collide");
        assert!((t - 1.5).abs() < 1e-9, "expected t=1.5, got {t}");
    }

    #[test]
    fn receding_pair_never_collides() {
        let l = Liouvillean::HardSphere;
        let bc = BoundaryCondition::None;
        let species = species_table();

        let i = Particle::new(0, Vec3::new(-2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0);
        let j = Particle::new(1, Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0);

        let t = l.predict_interaction(i, 0.0, j, 0.0, &species, &bc).unwrap();
        assert_eq!(t, None);
    }

    #[test]
    fn compression_mode_advances_collision_time() {
        // Two non-overlapping spheres whose static-diameter touching time
        // is t=100 collide strictly earlier once the diameter grows at
        // rate 0.01.
        let static_l = Liouvillean::HardSphere;
        let compressed_l = Liouvillean::Compression { growth_rate: 0.01 };
        let bc = BoundaryCondition::None;
        let species = species_table();

        // Closing speed 0.02/unit time so that, at diameter 1.0, contact
        // (separation == diameter) occurs at t=100: initial separation is
        // 1.0 + 100*0.02 = 3.0, symmetric placement at +/-1.5.
        let i = Particle::new(0, Vec3::new(-1.5, 0.0, 0.0), Vec3::new(0.01, 0.0, 0.0), 0);
        let j = Particle::new(1, Vec3::new(1.5, 0.0, 0.0), Vec3::new(-0.01, 0.0, 0.0), 0);

        let t_static = static_l
            .predict_interaction(i, 0.0, j, 0.0, &species, &bc)
            .unwrap()
            .expect("static case collides");
        assert!((t_static - 100.0).abs() < 1e-6, "got {t_static}");

        let t_compressed = compressed_l
            .predict_interaction(i, 0.0, j, 0.0, &species, &bc)
            .unwrap()
            .expect("compressed case collides");
        assert!(
            t_compressed < t_static,
            "compression must bring the collision forward: {t_compressed} vs {t_static}"
        );
    }

    #[test]
    fn resolve_exchanges_velocities_for_equal_mass_head_on() {
        let l = Liouvillean::HardSphere;
        let species = species_table();
        let mut store = ParticleStore::new(vec![
            Particle::new(0, Vec3::new(-0.5, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0),
            Particle::new(1, Vec3::new(0.5, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0),
        ]);
        store.set_clock(0, 1.5);
        store.set_clock(1, 1.5);

        let event = Event::new(
            1.5,
            crate::event::EventKind::Interaction,
            0,
            Counterparty::Particle(1),
            0,
        );
        let bc = BoundaryCondition::None;
        let delta = l.resolve(&event, &store, &species, &bc).unwrap();
        assert_eq!(delta.changed.len(), 2);
        let (_, v0) = delta.changed[0];
        let (_, v1) = delta.changed[1];
        assert!(v0.approx_eq(&Vec3::new(-1.0, 0.0, 0.0), 1e-9));
        assert!(v1.approx_eq(&Vec3::new(1.0, 0.0, 0.0), 1e-9));
    }

    #[test]
    fn resolve_uses_minimum_image_normal_across_a_periodic_wrap() {
        // Particles at x=0.5 and x=29.5 in a box of side 30 are neighbours
        // across the wrap (separation 1.0 via the minimum image, not 29.0
        // via the raw difference). The contact normal must point along the
        // short way round, or the reflection axis is reversed.
        let l = Liouvillean::HardSphere;
        let species = species_table();
        let bc = BoundaryCondition::Periodic {
            box_size: Vec3::new(30.0, 30.0, 30.0),
        };
        let mut store = ParticleStore::new(vec![
            Particle::new(0, Vec3::new(0.5, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), 0),
            Particle::new(1, Vec3::new(29.5, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0),
        ]);
        store.set_clock(0, 0.0);
        store.set_clock(1, 0.0);

        let event = Event::new(
            0.0,
            crate::event::EventKind::Interaction,
            0,
            Counterparty::Particle(1),
            0,
        );
        let delta = l.resolve(&event, &store, &species, &bc).unwrap();
        assert_eq!(delta.changed.len(), 2);
        let (_, v0) = delta.changed[0];
        let (_, v1) = delta.changed[1];
        // Correct minimum-image normal exchanges velocities exactly, as in
        // the non-wrapped head-on case; a reversed (raw-difference) normal
        // would instead leave the velocities unchanged or flip both signs.
        assert!(v0.approx_eq(&Vec3::new(1.0, 0.0, 0.0), 1e-9));
        assert!(v1.approx_eq(&Vec3::new(-1.0, 0.0, 0.0), 1e-9));
    }
}
