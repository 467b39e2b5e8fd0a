use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use edmd_core::cli::{Cli, Commands};
use edmd_core::config::RunConfig;
use edmd_core::engine::Engine;
use edmd_core::error::SimError;
use edmd_core::runtime::Runtime;
use edmd_core::snapshot;

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            snapshot,
            ticks,
            end_time,
            out,
            seed,
            config,
        } => run(snapshot, ticks, end_time, out, seed, config),
        Commands::Validate { snapshot } => validate(snapshot),
    }
}

/// Exit codes: 0 success, 1 physics-fatal, 2 configuration error, 3 I/O
/// error. I/O errors are produced here, at the CLI layer, never inside
/// the library.
fn run(
    snapshot_path: std::path::PathBuf,
    ticks: Option<u64>,
    end_time_arg: Option<f64>,
    out: std::path::PathBuf,
    seed_arg: Option<u64>,
    config_path: Option<std::path::PathBuf>,
) -> ExitCode {
    let run_config = match config_path {
        Some(path) => match RunConfig::load(&path) {
            Ok(c) => c,
            Err(e) => {
                error!("failed to load run config {}: {e}", path.display());
                return ExitCode::from(3);
            }
        },
        None => RunConfig::default(),
    };

    let doc = match snapshot::load_from_path(&snapshot_path) {
        Ok(doc) => doc,
        Err(e) => {
            error!("failed to load snapshot {}: {e}", snapshot_path.display());
            return ExitCode::from(3);
        }
    };

    let mut engine = match Engine::from_doc(&doc) {
        Ok(engine) => engine,
        Err(e) => return report_sim_error(&e),
    };

    if let Err(e) = engine.initialise() {
        return report_sim_error(&e);
    }

    let seed = seed_arg.or(run_config.seed).unwrap_or(0);
    let runtime = Runtime::new(seed);

    let end_time = end_time_arg
        .or(run_config.end_time)
        .or(doc.properties.run_length)
        .unwrap_or(f64::INFINITY);

    let result = engine.run(end_time, ticks, &runtime);

    // Whatever happened, write the last-known-good snapshot before
    // deciding the exit code.
    let out_doc = engine.to_doc(&doc);
    if let Err(e) = snapshot::write_to_path(&out_doc, &out) {
        error!("failed to write output snapshot {}: {e}", out.display());
        return ExitCode::from(3);
    }

    match result {
        Ok(report) => {
            info!(
                "run complete: {} events, {} collisions, final time {}",
                report.records.len(),
                report.collisions,
                report.final_time
            );
            ExitCode::from(0)
        }
        Err(e) => report_sim_error(&e),
    }
}

fn validate(snapshot_path: std::path::PathBuf) -> ExitCode {
    let doc = match snapshot::load_from_path(&snapshot_path) {
        Ok(doc) => doc,
        Err(e) => {
            error!("failed to load snapshot {}: {e}", snapshot_path.display());
            return ExitCode::from(3);
        }
    };

    match doc.validate() {
        Ok(()) => {
            info!("{} is valid", snapshot_path.display());
            ExitCode::from(0)
        }
        Err(e) => {
            error!("{} is invalid: {e}", snapshot_path.display());
            ExitCode::from(2)
        }
    }
}

fn report_sim_error(e: &SimError) -> ExitCode {
    error!("{e}");
    ExitCode::from(e.exit_code() as u8)
}
