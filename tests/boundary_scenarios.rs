//! Integration tests covering the core physical scenarios this crate must
//! get right. Each test builds a snapshot `Doc` by hand (the way a
//! configuration loader would produce one) and drives it through `Engine`,
//! the one entry point every external collaborator (CLI, tests) is
//! expected to use.

use edmd_core::boundary::BoundaryCondition;
use edmd_core::engine::Engine;
use edmd_core::event::EventKind;
use edmd_core::init::{random_pack, RandomPackParams};
use edmd_core::liouvillean::Liouvillean;
use edmd_core::runtime::Runtime;
use edmd_core::snapshot::{
    Doc, DynamicsDoc, GlobalDoc, InteractionDoc, ParticleDoc, PropertiesDoc, SchedulerDoc,
    SorterDoc, UnitBasis,
};
use edmd_core::species::SpeciesDescriptor;
use edmd_core::vector::Vec3;

fn base_doc(box_size: Vec3, particles: Vec<ParticleDoc>, min_cell_size: f64) -> Doc {
    Doc {
        box_size,
        particles,
        dynamics: DynamicsDoc {
            liouvillean: Liouvillean::HardSphere,
            interactions: vec![InteractionDoc::HardSphere],
            locals: vec![],
            globals: vec![GlobalDoc::NeighbourList { min_cell_size }],
            species: vec![SpeciesDescriptor::new(0, "sphere", 1.0, 1.0)],
            bc: BoundaryCondition::Periodic { box_size },
        },
        scheduler: SchedulerDoc {
            sorter: SorterDoc::default(),
        },
        properties: PropertiesDoc {
            time: 0.0,
            collision_counter: 0,
            freestream_accumulator: 0.0,
            run_length: None,
            unit_basis: UnitBasis::default(),
        },
    }
}

fn engine_of(doc: &Doc) -> Engine {
    let mut engine = Engine::from_doc(doc).expect("doc must be valid");
    engine.initialise().expect("initial predictions must seed cleanly");
    engine
}

/// Scenario 1: two unit-mass, diameter-1 spheres approaching head-on from
/// (-2,0,0)/(+2,0,0) at unit speed in a very large periodic box collide
/// exactly once at t=1.5, exchanging velocities.
#[test]
fn two_sphere_head_on_collision() {
    let box_size = Vec3::new(1000.0, 1000.0, 1000.0);
    let doc = base_doc(
        box_size,
        vec![
            ParticleDoc {
                id: 0,
                position: Vec3::new(-2.0, 0.0, 0.0),
                velocity: Vec3::new(1.0, 0.0, 0.0),
                species: 0,
            },
            ParticleDoc {
                id: 1,
                position: Vec3::new(2.0, 0.0, 0.0),
                velocity: Vec3::new(-1.0, 0.0, 0.0),
                species: 0,
            },
        ],
        4.0,
    );

    let mut engine = engine_of(&doc);
    let runtime = Runtime::new(0);
    let report = engine.run(10.0, None, &runtime).unwrap();

    let collisions: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind == EventKind::Interaction)
        .collect();
    assert_eq!(collisions.len(), 1, "expected exactly one particle-particle event");
    assert!((collisions[0].fire_time - 1.5).abs() < 1e-6);
    assert_eq!(report.collisions, 1);

    let out = engine.to_doc(&doc);
    assert!(out.particles[0].velocity.approx_eq(&Vec3::new(-1.0, 0.0, 0.0), 1e-6));
    assert!(out.particles[1].velocity.approx_eq(&Vec3::new(1.0, 0.0, 0.0), 1e-6));
}

/// Scenario 2: a single particle in a periodic box of side 10 moving along
/// +x crosses cells at regular intervals, with `system.time` advancing
/// monotonically and its velocity left untouched (no collision partner
/// exists).
#[test]
fn periodic_single_particle_crossings() {
    let box_size = Vec3::new(10.0, 10.0, 10.0);
    let doc = base_doc(
        box_size,
        vec![ParticleDoc {
            id: 0,
            position: Vec3::zero(),
            velocity: Vec3::new(1.0, 0.0, 0.0),
            species: 0,
        }],
        2.0,
    );

    let mut engine = engine_of(&doc);
    let runtime = Runtime::new(0);
    let report = engine.run(25.0, None, &runtime).unwrap();

    let crossings: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind == EventKind::CellCrossing)
        .collect();
    assert!(crossings.len() >= 5, "expected several cell crossings over 25 time units");

    let mut last = -1.0;
    for c in &crossings {
        assert!(c.fire_time > last, "event stream must be strictly increasing in time");
        last = c.fire_time;
    }

    // No interaction partner exists, so the velocity must be untouched and
    // no collisions should ever fire.
    assert_eq!(report.collisions, 0);
    let out = engine.to_doc(&doc);
    assert!(out.particles[0].velocity.approx_eq(&Vec3::new(1.0, 0.0, 0.0), 1e-12));
}

/// Scenario 3: under compression (growth rate 0.01), two spheres whose
/// static-diameter touching time is t=100 collide strictly earlier.
#[test]
fn compression_mode_advances_collision_time() {
    let box_size = Vec3::new(1000.0, 1000.0, 1000.0);
    // Closing speed 0.02/unit time so that, at diameter 1.0, the
    // static-diameter contact time is exactly t=100 (separation 3.0,
    // symmetric placement at +/-1.5 per the liouvillean unit test).
    let particles = vec![
        ParticleDoc {
            id: 0,
            position: Vec3::new(-1.5, 0.0, 0.0),
            velocity: Vec3::new(0.01, 0.0, 0.0),
            species: 0,
        },
        ParticleDoc {
            id: 1,
            position: Vec3::new(1.5, 0.0, 0.0),
            velocity: Vec3::new(-0.01, 0.0, 0.0),
            species: 0,
        },
    ];

    let mut static_doc = base_doc(box_size, particles.clone(), 4.0);
    static_doc.properties.run_length = Some(150.0);
    let mut static_engine = engine_of(&static_doc);
    let static_report = static_engine.run(150.0, None, &Runtime::new(0)).unwrap();
    let static_collision = static_report
        .records
        .iter()
        .find(|r| r.kind == EventKind::Interaction)
        .expect("static case must collide within the horizon");
    assert!((static_collision.fire_time - 100.0).abs() < 1e-3);

    let mut compressed_doc = base_doc(box_size, particles, 4.0);
    compressed_doc.dynamics.liouvillean = Liouvillean::Compression { growth_rate: 0.01 };
    compressed_doc.properties.run_length = Some(150.0);
    let mut compressed_engine = engine_of(&compressed_doc);
    let compressed_report = compressed_engine.run(150.0, None, &Runtime::new(0)).unwrap();
    let compressed_collision = compressed_report
        .records
        .iter()
        .find(|r| r.kind == EventKind::Interaction)
        .expect("compressed case must collide within the horizon");

    assert!(
        compressed_collision.fire_time < static_collision.fire_time,
        "compression must bring the collision forward: {} vs {}",
        compressed_collision.fire_time,
        static_collision.fire_time
    );
}

/// Scenario 4: a dense random pack run for many collisions conserves
/// kinetic energy to machine epsilon (elastic hard-sphere collisions never
/// change total kinetic energy). Marked `#[ignore]` by default since
/// 10^5 collisions is too slow for a routine `cargo test`; run explicitly
/// with `cargo test --release -- --ignored`.
#[test]
#[ignore]
fn dense_pack_energy_conservation() {
    use rand::{rngs::StdRng, SeedableRng};

    let box_size = Vec3::new(30.0, 30.0, 30.0);
    let params = RandomPackParams {
        n: 1000,
        box_size,
        min_separation: 1.0,
        speed: 1.0,
        species_id: 0,
    };
    let mut rng = StdRng::seed_from_u64(42);
    let particles: Vec<ParticleDoc> = random_pack(&params, &mut rng)
        .into_iter()
        .map(|p| ParticleDoc {
            id: p.id,
            position: p.position,
            velocity: p.velocity,
            species: p.species_id,
        })
        .collect();

    let doc = base_doc(box_size, particles, 2.0);
    let mut engine = engine_of(&doc);

    let energy_before = kinetic_energy(&doc.particles);

    let report = engine.run(f64::INFINITY, Some(100_000), &Runtime::new(0)).unwrap();
    assert_eq!(report.collisions, 100_000);

    let out = engine.to_doc(&doc);
    let energy_after = kinetic_energy(&out.particles);

    let relative_drift = (energy_after - energy_before).abs() / energy_before;
    assert!(
        relative_drift < 1e-9,
        "kinetic energy drifted by a relative {relative_drift}"
    );
}

fn kinetic_energy(particles: &[ParticleDoc]) -> f64 {
    particles.iter().map(|p| 0.5 * p.velocity.norm_squared()).sum()
}

/// Scenario 5 (neighbour-list rebuild consistency): pausing a run partway
/// through, round-tripping the state through the snapshot document, and
/// resuming from a fresh `Engine` (which rebuilds the neighbour list from
/// scratch) must reproduce the same continuation as letting the first
/// engine run straight through to the same end time.
#[test]
fn neighbour_list_rebuild_consistency() {
    let box_size = Vec3::new(40.0, 40.0, 40.0);
    let particles = vec![
        ParticleDoc {
            id: 0,
            position: Vec3::new(-5.0, 0.0, 0.0),
            velocity: Vec3::new(1.0, 0.0, 0.0),
            species: 0,
        },
        ParticleDoc {
            id: 1,
            position: Vec3::new(5.0, 0.3, -0.2),
            velocity: Vec3::new(-1.0, 0.0, 0.0),
            species: 0,
        },
        ParticleDoc {
            id: 2,
            position: Vec3::new(0.0, 10.0, 0.0),
            velocity: Vec3::new(0.0, -0.5, 0.3),
            species: 0,
        },
    ];

    let straight_doc = base_doc(box_size, particles.clone(), 4.0);
    let mut straight_engine = engine_of(&straight_doc);
    straight_engine.run(20.0, None, &Runtime::new(0)).unwrap();
    let straight_final = straight_engine.to_doc(&straight_doc);

    // Run the same system only halfway, serialize the mid-run state, and
    // rebuild a fresh engine (and therefore a freshly rebuilt neighbour
    // list) from that serialized snapshot to finish the run.
    let paused_doc = base_doc(box_size, particles, 4.0);
    let mut paused_engine = engine_of(&paused_doc);
    paused_engine.run(10.0, None, &Runtime::new(0)).unwrap();
    let midpoint = paused_engine.to_doc(&paused_doc);

    let json = edmd_core::snapshot::to_json(&midpoint).unwrap();
    let reloaded = edmd_core::snapshot::from_json(&json).unwrap();
    let mut resumed_engine = engine_of(&reloaded);
    resumed_engine.run(20.0, None, &Runtime::new(0)).unwrap();
    let resumed_final = resumed_engine.to_doc(&reloaded);

    for (a, b) in straight_final.particles.iter().zip(resumed_final.particles.iter()) {
        assert!(
            a.position.approx_eq(&b.position, 1e-6),
            "position diverged after neighbour-list rebuild: {:?} vs {:?}",
            a.position,
            b.position
        );
        assert!(
            a.velocity.approx_eq(&b.velocity, 1e-6),
            "velocity diverged after neighbour-list rebuild: {:?} vs {:?}",
            a.velocity,
            b.velocity
        );
    }
    assert_eq!(
        straight_final.properties.collision_counter,
        resumed_final.properties.collision_counter
    );
}

/// Property test: running the same snapshot and seed twice must yield a
/// byte-for-byte identical event stream (spec: "Running with identical
/// snapshot + seed twice yields identical event streams"). A stale event
/// that slips through unnoticed would show up here as nondeterminism, so
/// this also stands in for "pop a stale event: discarded silently, no
/// observable effect" at the integration level (unit-level coverage for the
/// exact mechanism lives in `scheduler::tests`).
#[test]
fn deterministic_event_stream_for_repeated_runs() {
    use rand::{rngs::StdRng, SeedableRng};

    let box_size = Vec3::new(20.0, 20.0, 20.0);
    let params = RandomPackParams {
        n: 40,
        box_size,
        min_separation: 1.0,
        speed: 1.0,
        species_id: 0,
    };
    let mut rng = StdRng::seed_from_u64(7);
    let particles: Vec<ParticleDoc> = random_pack(&params, &mut rng)
        .into_iter()
        .map(|p| ParticleDoc {
            id: p.id,
            position: p.position,
            velocity: p.velocity,
            species: p.species_id,
        })
        .collect();
    let doc = base_doc(box_size, particles, 2.0);

    let mut engine_a = engine_of(&doc);
    let records_a = engine_a.run(f64::INFINITY, Some(500), &Runtime::new(0)).unwrap().records;

    let mut engine_b = engine_of(&doc);
    let records_b = engine_b.run(f64::INFINITY, Some(500), &Runtime::new(0)).unwrap().records;

    assert_eq!(records_a.len(), records_b.len());
    for (a, b) in records_a.iter().zip(records_b.iter()) {
        assert_eq!(a.fire_time, b.fire_time);
        assert_eq!(a.kind, b.kind);
        assert_eq!(a.primary, b.primary);
        assert_eq!(a.counterparty, b.counterparty);
    }
}
