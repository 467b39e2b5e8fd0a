//! Typed error taxonomy for the simulation core.
//!
//! Every fatal condition the core can encounter is represented here rather
//! than swallowed locally; propagation always bubbles to the outermost
//! runner (the CLI's `main::run`), which writes a diagnostic and the
//! last-known-good snapshot (`engine::Engine::to_doc`) before mapping the
//! error to an exit code (`SimError::exit_code`).

use crate::particle::ParticleId;

/// Something about the configured simulation is structurally wrong: a
/// required component is missing, or the species table is inconsistent.
/// Surfaced at `initialise`, always fatal. An unrecognized `#[serde(tag =
/// "type")]` value in a snapshot document is rejected by `serde_json`
/// itself at parse time, surfacing as an I/O error at the CLI layer rather
/// than as a variant here.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no neighbour list global named {name:?} is registered; the scheduler requires one")]
    MissingNeighbourList { name: &'static str },

    #[error("species table is inconsistent: particle {particle:?} references species id {species_id} which is not defined")]
    InconsistentSpecies { particle: ParticleId, species_id: u32 },
}

/// A physics invariant was violated. Always fatal; these indicate either a
/// malformed snapshot or a bug in a `Liouvillean` implementation, and must
/// never be clamped or silently corrected.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("predicted interaction time {time} for particle {particle:?} is earlier than the current system time {system_time}")]
    TimeTravel {
        particle: ParticleId,
        time: f64,
        system_time: f64,
    },

    #[error("NaN encountered in {field} of particle {particle:?}")]
    NotANumber { particle: ParticleId, field: &'static str },

    #[error("particle {particle:?} is outside the primary box after applying boundary conditions")]
    OutsidePrimaryBox { particle: ParticleId },

    #[error("the scheduler's top heap emptied before end_time ({end_time}) was reached; simulation is stuck")]
    Stuck { end_time: f64 },
}

/// The neighbour list cannot guarantee correctness at its current cell
/// size: a particle could reach a non-neighbour cell before its next
/// crossing is processed. Recoverable only by rebuilding with smaller
/// cells; otherwise fatal.
#[derive(Debug, thiserror::Error)]
#[error("neighbour list cell count {actual} is below the minimum of {minimum} required for correctness at interaction range {interaction_range}")]
pub struct CapacityError {
    pub actual: usize,
    pub minimum: usize,
    pub interaction_range: f64,
}

/// The top-level error type returned by every fallible core entry point.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("neighbour list capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// Cooperative stop was requested. Not an error in the usual sense, but
    /// it shares the error channel so the main loop has exactly one exit
    /// path.
    #[error("shutdown requested")]
    Shutdown,
}

impl SimError {
    /// Exit code per the CLI contract: 0 success/cooperative stop,
    /// 1 physics-fatal, 2 configuration error, 3 I/O error (I/O errors are
    /// constructed directly by the CLI layer, not from this variant set).
    pub fn exit_code(&self) -> i32 {
        match self {
            SimError::Config(_) => 2,
            SimError::Physics(_) | SimError::Capacity(_) => 1,
            SimError::Shutdown => 0,
        }
    }
}
