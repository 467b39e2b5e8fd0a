//! Initial-condition generation.
//!
//! A snapshot document describes the shape of a configuration but nothing
//! about how one is first produced — configuration loading is treated as
//! an external collaborator. A dense energy-conservation test needs a
//! random pack of spheres at a given packing fraction, so this module
//! supplements a generator rather than requiring every test and example to
//! hand-author particle lists.
//!
//! Uses the same rejection-sampling loop (reject a candidate too close to
//! an already-placed particle, retry) and the same uniform-direction
//! sampling (`cos(theta) ~ Uniform[-1, 1]` then `theta = acos(cos_theta)`,
//! avoiding pole clustering) as sphere-surface placement, adapted to
//! placement inside a periodic box.

use rand::Rng;
use rand_distr::Uniform;
use std::f64::consts::PI;

use crate::boundary::BoundaryCondition;
use crate::particle::{Particle, SpeciesId};
use crate::vector::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct RandomPackParams {
    pub n: usize,
    pub box_size: Vec3,
    /// Minimum allowed centre-to-centre separation (the hard-core
    /// diameter); candidates closer than this to an already-placed
    /// particle are rejected.
    pub min_separation: f64,
    pub speed: f64,
    pub species_id: SpeciesId,
}

impl RandomPackParams {
    /// The packing fraction implied by `n` spheres of diameter
    /// `min_separation` in `box_size`.
    pub fn packing_fraction(&self) -> f64 {
        let sphere_volume = (PI / 6.0) * self.min_separation.powi(3);
        let box_volume = self.box_size.x * self.box_size.y * self.box_size.z;
        self.n as f64 * sphere_volume / box_volume
    }
}

/// Places `params.n` particles uniformly at random inside a periodic box of
/// `params.box_size`, rejecting any candidate within `params.min_separation`
/// of an already-placed particle. Velocities are unit-speed-scaled vectors
/// drawn uniformly over the sphere.
///
/// This is O(n^2) worst case from the rejection loop; acceptable for
/// few-thousand-particle packs, not intended for million-particle packs.
pub fn random_pack(params: &RandomPackParams, rng: &mut impl Rng) -> Vec<Particle> {
    let bc = BoundaryCondition::Periodic {
        box_size: params.box_size,
    };
    let ux = Uniform::new(0.0, params.box_size.x).expect("box_size.x must be positive");
    let uy = Uniform::new(0.0, params.box_size.y).expect("box_size.y must be positive");
    let uz = Uniform::new(0.0, params.box_size.z).expect("box_size.z must be positive");

    let mut particles: Vec<Particle> = Vec::with_capacity(params.n);
    const MAX_ATTEMPTS: usize = 100_000;

    for id in 0..params.n {
        let mut attempts = 0;
        let position = loop {
            attempts += 1;
            let candidate = Vec3::new(rng.sample(ux), rng.sample(uy), rng.sample(uz));
            let clashes = particles.iter().any(|p| {
                bc.displacement(candidate, p.position).norm() < params.min_separation
            });
            if !clashes || attempts >= MAX_ATTEMPTS {
                break candidate;
            }
        };
        let velocity = random_unit_vector(rng) * params.speed;
        particles.push(Particle::new(id, position, velocity, params.species_id));
    }

    particles
}

/// A uniformly-distributed direction on the unit sphere, sampled via
/// `cos(theta) ~ Uniform[-1, 1]` (not `theta ~ Uniform[0, pi]`, which would
/// bunch samples near the poles).
fn random_unit_vector(rng: &mut impl Rng) -> Vec3 {
    let cos_theta_dist = Uniform::new(-1.0, 1.0).unwrap();
    let phi_dist = Uniform::new(0.0, 2.0 * PI).unwrap();

    let cos_theta: f64 = rng.sample(cos_theta_dist);
    let theta = cos_theta.acos();
    let phi: f64 = rng.sample(phi_dist);

    Vec3::new(
        theta.sin() * phi.cos(),
        theta.sin() * phi.sin(),
        theta.cos(),
    )
}
