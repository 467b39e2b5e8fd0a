//! Command-line interface. The library core treats the CLI as an external
//! collaborator, not part of the physics; this binary is a reference
//! implementation of that collaborator — it owns no physics of its own,
//! only argument parsing and the glue in `main` that turns a parsed
//! `Commands` into `engine` calls.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Runs a snapshot forward until `--ticks` collisions or `--end-time`
    /// (whichever is reached first), writing the resulting snapshot to
    /// `--out`.
    Run {
        /// Path to the input snapshot document (`.json` or binary).
        snapshot: PathBuf,

        /// Bounds the number of collisions processed.
        #[arg(long)]
        ticks: Option<u64>,

        /// Bounds the absolute simulation time reached. Defaults to the
        /// snapshot's own `properties.run_length`, or unbounded if neither
        /// is set.
        #[arg(long)]
        end_time: Option<f64>,

        /// Destination for the resulting snapshot document.
        #[arg(long)]
        out: PathBuf,

        /// RNG seed for any stochastic behaviour reached during the run.
        #[arg(long)]
        seed: Option<u64>,

        /// Optional TOML run configuration; CLI flags take precedence over
        /// its values.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Loads and validates a snapshot document without running it: checks
    /// schema, species cross-references, and neighbour-list presence.
    Validate {
        snapshot: PathBuf,
    },
}
