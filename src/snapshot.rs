//! The external snapshot document and its two codecs.
//!
//! `Doc` is the serde tree a configuration loader or output plugin targets:
//! it mirrors a snapshot's `<Particles>`, `<Dynamics>`, `<Scheduler>`, and
//! `<Properties>` sections field for field. The crate does not parse any
//! external markup format itself — configuration loading is treated as an
//! external collaborator, and `Doc` is the concrete contract that
//! collaborator targets, with an `io::json` / `io::bin` split: one
//! human-diffable JSON path via `serde_json` and one compact path via
//! `bincode` for checkpoints and the handoff buffer, both round-tripping
//! through the same value.

use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryCondition;
use crate::error::ConfigError;
use crate::liouvillean::Liouvillean;
use crate::particle::{Particle, ParticleId, SpeciesId};
use crate::registry::{
    Global, HardSphereInteraction, Interaction, Local, NeighbourListGlobal, WallLocal,
    NEIGHBOUR_LIST_GLOBAL_NAME,
};
use crate::species::{self, SpeciesDescriptor};
use crate::vector::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleDoc {
    pub id: ParticleId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub species: SpeciesId,
}

/// Tagged interaction descriptor. The crate ships exactly one variant;
/// the tag still round-trips so a document written by a future version
/// with more interaction kinds fails to parse (`serde_json` rejects an
/// unrecognised `type` value) rather than silently misreading one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InteractionDoc {
    HardSphere,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LocalDoc {
    Wall {
        name: String,
        anchor: Vec3,
        normal: Vec3,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GlobalDoc {
    /// The neighbour list, registered under its well-known name.
    /// `min_cell_size` is the largest interaction range any registered
    /// interaction requires; see `neighbourlist::NeighbourList::new`.
    NeighbourList { min_cell_size: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicsDoc {
    pub liouvillean: Liouvillean,
    pub interactions: Vec<InteractionDoc>,
    pub locals: Vec<LocalDoc>,
    pub globals: Vec<GlobalDoc>,
    pub species: Vec<SpeciesDescriptor>,
    pub bc: BoundaryCondition,
}

/// Descriptor for the sorter strategy. The crate ships a single two-level
/// bucket-heap implementation (`scheduler::Scheduler`); `kind` exists so
/// the document round-trips a pluggable-sorter concept without the crate
/// actually needing more than one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SorterDoc {
    pub kind: String,
}

impl Default for SorterDoc {
    fn default() -> Self {
        SorterDoc {
            kind: "BoundedPQ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerDoc {
    pub sorter: SorterDoc,
}

/// The unit basis a snapshot's numeric fields are expressed in. Carried
/// through verbatim; the core itself is unit-agnostic — it never rescales
/// by this value — but it must round-trip exactly so that an external
/// plugin reading the document can.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitBasis {
    pub length: f64,
    pub time: f64,
    pub energy: f64,
}

impl Default for UnitBasis {
    fn default() -> Self {
        UnitBasis {
            length: 1.0,
            time: 1.0,
            energy: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertiesDoc {
    pub time: f64,
    pub collision_counter: u64,
    /// Correct behaviour when this is non-zero at shutdown is ambiguous.
    /// This crate carries the value through untouched (no flush, no reset)
    /// rather than guessing; see DESIGN.md.
    pub freestream_accumulator: f64,
    pub run_length: Option<f64>,
    #[serde(default)]
    pub unit_basis: UnitBasis,
}

/// The full snapshot document. `box_size` sits alongside `particles`
/// rather than nested under `bc` because a `BoundaryCondition::None`
/// system still needs box dimensions to build a neighbour-list cell grid
/// over — a finite decomposition is required regardless of whether
/// positions are folded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
    pub box_size: Vec3,
    pub particles: Vec<ParticleDoc>,
    pub dynamics: DynamicsDoc,
    pub scheduler: SchedulerDoc,
    pub properties: PropertiesDoc,
}

impl Doc {
    /// Validates cross-references the serde layer cannot: every particle's
    /// species id must resolve in `dynamics.species`
    /// (`ConfigError::InconsistentSpecies`), and exactly one global must be
    /// the neighbour list (`ConfigError::MissingNeighbourList`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        for p in &self.particles {
            if species::find(&self.dynamics.species, p.species).is_none() {
                return Err(ConfigError::InconsistentSpecies {
                    particle: p.id,
                    species_id: p.species,
                });
            }
        }
        if !self
            .dynamics
            .globals
            .iter()
            .any(|g| matches!(g, GlobalDoc::NeighbourList { .. }))
        {
            return Err(ConfigError::MissingNeighbourList {
                name: NEIGHBOUR_LIST_GLOBAL_NAME,
            });
        }
        Ok(())
    }

    pub fn particles_as_model(&self) -> Vec<Particle> {
        self.particles
            .iter()
            .map(|p| Particle::new(p.id, p.position, p.velocity, p.species))
            .collect()
    }
}

/// Builds the live `Interaction` registry from its document form, in
/// document order — registry order is part of the snapshot.
pub fn build_interactions(docs: &[InteractionDoc]) -> Vec<Box<dyn Interaction>> {
    docs.iter()
        .map(|d| match d {
            InteractionDoc::HardSphere => Box::new(HardSphereInteraction) as Box<dyn Interaction>,
        })
        .collect()
}

pub fn build_locals(docs: &[LocalDoc]) -> Vec<Box<dyn Local>> {
    docs.iter()
        .map(|d| match d {
            LocalDoc::Wall {
                name,
                anchor,
                normal,
            } => Box::new(WallLocal {
                name: name.clone(),
                anchor: *anchor,
                normal: *normal,
            }) as Box<dyn Local>,
        })
        .collect()
}

/// Builds the live `Global` registry, returning it alongside the neighbour
/// list's minimum cell size (the one piece of per-run sizing information
/// the document stores on the global entry rather than on
/// `neighbourlist::NeighbourList` directly, since the list itself is built
/// separately by the engine once the particle count is known).
pub fn build_globals(docs: &[GlobalDoc]) -> Result<(Vec<Box<dyn Global>>, f64), ConfigError> {
    let mut globals: Vec<Box<dyn Global>> = Vec::with_capacity(docs.len());
    let mut min_cell_size = None;
    for (idx, d) in docs.iter().enumerate() {
        match d {
            GlobalDoc::NeighbourList { min_cell_size: s } => {
                globals.push(Box::new(NeighbourListGlobal { id: idx }));
                min_cell_size = Some(*s);
            }
        }
    }
    let min_cell_size = min_cell_size.ok_or(ConfigError::MissingNeighbourList {
        name: NEIGHBOUR_LIST_GLOBAL_NAME,
    })?;
    Ok((globals, min_cell_size))
}

pub fn from_json(text: &str) -> Result<Doc, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn to_json(doc: &Doc) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Loads a `Doc` from `path`, dispatching on extension: `.json` goes
/// through the human-diffable codec, anything else through the compact
/// `bin` codec, collapsed into one entry point since this crate has a
/// single document type rather than one per pipeline stage.
pub fn load_from_path(path: &std::path::Path) -> std::io::Result<Doc> {
    let bytes = std::fs::read(path)?;
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let text = String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        from_json(&text).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    } else {
        bin::decode(&bytes).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Writes `doc` to `path`, creating its parent directory if needed.
pub fn write_to_path(doc: &Doc, path: &std::path::Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if path.extension().and_then(|e| e.to_str()) == Some("json") {
        let text = to_json(doc).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)
    } else {
        let bytes = bin::encode(doc).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, bytes)
    }
}

/// Compact binary codec for checkpoints and the handoff buffer's initial
/// seed.
pub mod bin {
    use super::Doc;

    pub fn encode(doc: &Doc) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(doc)
    }

    pub fn decode(bytes: &[u8]) -> Result<Doc, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> Doc {
        Doc {
            box_size: Vec3::new(20.0, 20.0, 20.0),
            particles: vec![
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
            dynamics: DynamicsDoc {
                liouvillean: Liouvillean::HardSphere,
                interactions: vec![InteractionDoc::HardSphere],
                locals: vec![LocalDoc::Wall {
                    name: "floor".into(),
                    anchor: Vec3::zero(),
                    normal: Vec3::new(0.0, 1.0, 0.0),
                }],
                globals: vec![GlobalDoc::NeighbourList { min_cell_size: 2.0 }],
                species: vec![SpeciesDescriptor::new(0, "sphere", 1.0, 1.0)],
                bc: BoundaryCondition::Periodic {
                    box_size: Vec3::new(20.0, 20.0, 20.0),
                },
            },
            scheduler: SchedulerDoc {
                sorter: SorterDoc::default(),
            },
            properties: PropertiesDoc {
                time: 0.0,
                collision_counter: 0,
                freestream_accumulator: 0.0,
                run_length: Some(1000.0),
                unit_basis: UnitBasis::default(),
            },
        }
    }

    #[test]
    fn json_round_trips_exactly() {
        let doc = sample_doc();
        let text = to_json(&doc).unwrap();
        let back = from_json(&text).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn bincode_round_trips_exactly() {
        let doc = sample_doc();
        let bytes = bin::encode(&doc).unwrap();
        let back = bin::decode(&bytes).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn validate_rejects_unknown_species_reference() {
        let mut doc = sample_doc();
        doc.particles[0].species = 99;
        assert!(matches!(
            doc.validate(),
            Err(ConfigError::InconsistentSpecies { .. })
        ));
    }

    #[test]
    fn validate_rejects_missing_neighbour_list() {
        let mut doc = sample_doc();
        doc.dynamics.globals.clear();
        assert!(matches!(
            doc.validate(),
            Err(ConfigError::MissingNeighbourList { .. })
        ));
    }

    #[test]
    fn registry_order_is_preserved_through_build() {
        let doc = sample_doc();
        let interactions = build_interactions(&doc.dynamics.interactions);
        assert_eq!(interactions.len(), 1);
        let locals = build_locals(&doc.dynamics.locals);
        assert_eq!(locals[0].name(), "floor");
        let (globals, min_cell_size) = build_globals(&doc.dynamics.globals).unwrap();
        assert_eq!(globals.len(), 1);
        assert_eq!(min_cell_size, 2.0);
    }

    #[test]
    fn write_then_load_json_round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let doc = sample_doc();

        write_to_path(&doc, &path).unwrap();
        let back = load_from_path(&path).unwrap();

        assert_eq!(doc, back);
    }

    #[test]
    fn write_then_load_bin_round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.bin");
        let doc = sample_doc();

        write_to_path(&doc, &path).unwrap();
        let back = load_from_path(&path).unwrap();

        assert_eq!(doc, back);
    }

    #[test]
    fn write_to_path_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("checkpoints").join("run.json");
        let doc = sample_doc();

        write_to_path(&doc, &path).unwrap();

        assert!(path.exists());
        let back = load_from_path(&path).unwrap();
        assert_eq!(doc, back);
    }
}
