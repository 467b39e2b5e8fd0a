//! Benchmarks the scheduler's hot path — `Engine::run` driving a dense
//! random pack through a few thousand collisions — against the size the
//! two-level bucket-heap design exists to make cheap: per-particle
//! invalidation without walking the whole queue.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, SeedableRng};

use edmd_core::boundary::BoundaryCondition;
use edmd_core::engine::Engine;
use edmd_core::init::{random_pack, RandomPackParams};
use edmd_core::liouvillean::Liouvillean;
use edmd_core::runtime::Runtime;
use edmd_core::snapshot::{
    Doc, DynamicsDoc, GlobalDoc, InteractionDoc, ParticleDoc, PropertiesDoc, SchedulerDoc,
    SorterDoc, UnitBasis,
};
use edmd_core::species::SpeciesDescriptor;
use edmd_core::vector::Vec3;

fn doc_with_n_particles(n: usize) -> Doc {
    let box_size = Vec3::new(30.0, 30.0, 30.0);
    let params = RandomPackParams {
        n,
        box_size,
        min_separation: 1.0,
        speed: 1.0,
        species_id: 0,
    };
    let mut rng = StdRng::seed_from_u64(1);
    let particles = random_pack(&params, &mut rng)
        .into_iter()
        .map(|p| ParticleDoc {
            id: p.id,
            position: p.position,
            velocity: p.velocity,
            species: p.species_id,
        })
        .collect();

    Doc {
        box_size,
        particles,
        dynamics: DynamicsDoc {
            liouvillean: Liouvillean::HardSphere,
            interactions: vec![InteractionDoc::HardSphere],
            locals: vec![],
            globals: vec![GlobalDoc::NeighbourList { min_cell_size: 2.0 }],
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

fn bench_collisions(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler_collisions");
    for &n in &[100usize, 400] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let doc = doc_with_n_particles(n);
                let mut engine = Engine::from_doc(&doc).unwrap();
                engine.initialise().unwrap();
                let runtime = Runtime::new(0);
                engine.run(f64::INFINITY, Some(2_000), &runtime).unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_collisions);
criterion_main!(benches);
