//! The TOML-based run configuration.
//!
//! The snapshot document (`snapshot::Doc`) owns everything physical; this
//! file owns the handful of per-invocation knobs that are a property of
//! *running* a snapshot rather than of the snapshot itself — the RNG seed
//! and a default time horizon a `--config` flag can supply so the CLI
//! doesn't need a large flag surface for things better checked into a file.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// Overrides the default seed (0) used for any RNG-driven behaviour
    /// (currently only `init::random_pack`, reached from outside the CLI).
    pub seed: Option<u64>,
    /// Overrides the snapshot's own `properties.run_length` as the time
    /// horizon, when neither is given the run is unbounded in time (bounded
    /// only by `--ticks`, if that is given).
    pub end_time: Option<f64>,
}

impl RunConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path)?;
        let config = toml::from_str(&text)?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("could not read run config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse run config file: {0}")]
    Parse(#[from] toml::de::Error),
}
