//! The simulation owner.
//!
//! `Engine` is the sole holder of the simulation's state; the scheduler and
//! neighbour list hold only `&mut` borrows plus ids into the owner's
//! tables, never a back-pointer of their own. `Engine` holds the particle
//! store, species table,
//! boundary condition, liouvillean, the three registries, the neighbour
//! list, and the scheduler, and is the only thing `main`/`cli` talk to. No
//! other type in the crate holds a back-pointer into another; the
//! scheduler and neighbour list are plain fields here, driven by `&mut`
//! borrows taken for the duration of one `run` call, never stored.

use log::{debug, info};

use crate::boundary::BoundaryCondition;
use crate::error::{PhysicsError, SimError};
use crate::liouvillean::Liouvillean;
use crate::neighbourlist::NeighbourList;
use crate::particle::Particle;
use crate::registry::{Global, Interaction, Local};
use crate::runtime::Runtime;
use crate::scheduler::{EventRecord, Scheduler};
use crate::snapshot::{self, Doc};
use crate::species::SpeciesDescriptor;
use crate::store::ParticleStore;

pub struct Engine {
    store: ParticleStore,
    species: Vec<SpeciesDescriptor>,
    bc: BoundaryCondition,
    liouvillean: Liouvillean,
    interactions: Vec<Box<dyn Interaction>>,
    locals: Vec<Box<dyn Local>>,
    globals: Vec<Box<dyn Global>>,
    neighbour_list: NeighbourList,
    scheduler: Scheduler,
    time: f64,
    freestream_accumulator: f64,
}

/// The outcome of one bounded `Engine::run` call: the fired-event stream
/// plus everything needed to write a fresh `Doc`.
pub struct RunReport {
    pub records: Vec<EventRecord>,
    pub final_time: f64,
    pub collisions: u64,
}

impl Engine {
    /// Builds the live engine from a validated document: missing
    /// neighbour list, inconsistent species, and insufficient cell count
    /// are all fatal at this point, never discovered mid-run.
    pub fn from_doc(doc: &Doc) -> Result<Self, SimError> {
        doc.validate()?;

        let particles: Vec<Particle> = doc.particles_as_model();
        for p in &particles {
            if p.has_nan() {
                return Err(SimError::Physics(PhysicsError::NotANumber {
                    particle: p.id,
                    field: "position/velocity",
                }));
            }
        }
        let mut store = ParticleStore::new(particles);
        for p in &doc.particles {
            store.set_clock(p.id, doc.properties.time);
        }

        let interactions = snapshot::build_interactions(&doc.dynamics.interactions);
        let locals = snapshot::build_locals(&doc.dynamics.locals);
        let (globals, min_cell_size) = snapshot::build_globals(&doc.dynamics.globals)?;

        let mut neighbour_list =
            NeighbourList::new(doc.box_size, min_cell_size, &doc.dynamics.bc, store.len())?;
        for p in store.all() {
            neighbour_list.insert(p.id, p.position);
        }
        for (id, local) in locals.iter().enumerate() {
            neighbour_list.register_local(id, local.anchor());
        }

        let scheduler = Scheduler::new(store.len(), &globals)?;

        info!(
            "engine initialised: {} particles, {} cells, {} interactions, {} locals",
            store.len(),
            neighbour_list.cell_count(),
            interactions.len(),
            locals.len()
        );

        Ok(Engine {
            store,
            species: doc.dynamics.species.clone(),
            bc: doc.dynamics.bc,
            liouvillean: doc.dynamics.liouvillean,
            interactions,
            locals,
            globals,
            neighbour_list,
            scheduler,
            time: doc.properties.time,
            freestream_accumulator: doc.properties.freestream_accumulator,
        })
    }

    /// Seeds the scheduler with every particle's initial predictions. Must
    /// be called exactly once before the first `run`.
    pub fn initialise(&mut self) -> Result<(), SimError> {
        self.scheduler
            .initialise(
                &self.store,
                &self.species,
                &self.bc,
                &self.liouvillean,
                &self.interactions,
                &self.locals,
                &self.neighbour_list,
            )
            .map_err(SimError::from)
    }

    /// Drives the simulation until `end_time` or `max_collisions` fired
    /// interaction events, whichever comes first, polling `runtime`'s
    /// cooperative stop flag between events.
    pub fn run(
        &mut self,
        end_time: f64,
        max_collisions: Option<u64>,
        runtime: &Runtime,
    ) -> Result<RunReport, SimError> {
        let result = self.scheduler.run(
            &mut self.store,
            &self.species,
            &self.bc,
            &self.liouvillean,
            &self.interactions,
            &self.locals,
            &self.globals,
            &mut self.neighbour_list,
            end_time,
            max_collisions,
            Some(&runtime.stop_flag),
        );

        match result {
            Ok(records) => {
                self.time = records.last().map(|r| r.fire_time).unwrap_or(self.time);
                debug!("run produced {} events", records.len());
                if let Some(handoff) = &runtime.handoff {
                    handoff.publish(&self.positions_and_radii());
                }
                Ok(RunReport {
                    collisions: self.scheduler.collisions(),
                    final_time: self.time,
                    records,
                })
            }
            Err(SimError::Shutdown) => {
                info!("cooperative shutdown requested at time {}", self.time);
                Err(SimError::Shutdown)
            }
            Err(other) => Err(other),
        }
    }

    /// The current state rendered back into a `Doc` — the last-known-good
    /// snapshot. `freestream_accumulator` is carried through untouched; see
    /// DESIGN.md for the open decision on what happens to it at shutdown.
    ///
    /// Every particle is extrapolated to `self.time` before being written
    /// out, even one that hasn't participated in an event since an earlier
    /// clock value: the emitted `properties.time` is the system clock, and
    /// every particle's local clock must read as that same time, so the
    /// position serialised alongside it must agree.
    /// Loading the resulting doc sets every particle's clock directly to
    /// `properties.time` (see `from_doc`); skipping this step would leave a
    /// reloaded engine with positions stale relative to their own clocks.
    pub fn to_doc(&self, original: &Doc) -> Doc {
        let mut doc = original.clone();
        doc.particles = self
            .store
            .all()
            .iter()
            .map(|p| {
                let mut position = self.store.position_at(p.id, self.time);
                self.bc.apply(&mut position);
                crate::snapshot::ParticleDoc {
                    id: p.id,
                    position,
                    velocity: p.velocity,
                    species: p.species_id,
                }
            })
            .collect();
        doc.properties.time = self.time;
        doc.properties.collision_counter = self.scheduler.collisions();
        doc.properties.freestream_accumulator = self.freestream_accumulator;
        doc
    }

    fn positions_and_radii(&self) -> Vec<(f64, f64, f64, f64)> {
        self.store
            .all()
            .iter()
            .map(|p| {
                let species = crate::species::find(&self.species, p.species_id);
                let radius = species.map(|s| s.diameter * 0.5).unwrap_or(0.5);
                (p.position.x, p.position.y, p.position.z, radius)
            })
            .collect()
    }
}
