//! Ground Station Link Simulator CLI
//!
//! Runs one configured simulation and writes the sectioned report as JSON.
//!
//! Usage:
//!   link-sim --config runs/iss_pass.json --output reports/iss_pass.json
//!   link-sim --config runs/sweep_510km.json --raw

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use link_budget::LinkBudgetResult;
use pass_simulator::config::cadence_from_secs;
use pass_simulator::{
    load_run_config, AngleSweep, ModeConfig, ReportAssembler, ResultSequence, SimulationError,
    SimulationRun, TimeWindow,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "link-sim",
    about = "Downlink budget over a satellite pass, a time window or an elevation sweep"
)]
struct Args {
    /// Path to run configuration JSON
    #[arg(short, long)]
    config: PathBuf,

    /// Output JSON file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the raw result sequence instead of the sectioned report
    #[arg(long)]
    raw: bool,

    /// Override the element set staleness limit in days
    #[arg(long)]
    max_epoch_age_days: Option<i64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Everything a run produced, before shaping
struct RunProducts {
    results: ResultSequence,
    assembler: ReportAssembler,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Ground Station Link Simulator");
    info!("{}", "=".repeat(60));

    let mut config = load_run_config(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(days) = args.max_epoch_age_days {
        config.propagation.max_epoch_age_days = days;
    }

    let products = match run(&config) {
        Ok(products) => products,
        Err(SimulationError::RunAborted(failure)) => {
            warn!(
                "{} results computed before tick {} failed",
                failure.partial.len(),
                failure.index
            );
            return Err(SimulationError::RunAborted(failure).into());
        }
        Err(e) => return Err(e.into()),
    };

    if args.raw {
        write_json(args.output.as_ref(), &products.results)?;
    } else {
        let report = products.assembler.assemble(&products.results, &config.rf);
        write_json(args.output.as_ref(), &report)?;
    }

    // Summary
    info!("{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Results: {}", products.results.len());
    if let Some(worst) = worst_margin(&products.results) {
        info!(
            "Worst margin: {:.2} dB at {} ({})",
            worst.link_margin_db,
            worst.key,
            if worst.closes() { "closes" } else { "does not close" }
        );
    }

    Ok(())
}

fn run(config: &pass_simulator::RunConfig) -> pass_simulator::Result<RunProducts> {
    let observer = config.observer.to_observer()?;

    match &config.mode {
        ModeConfig::TimeStepped {
            start,
            end,
            cadence_secs,
        } => {
            let provider = config.propagation.provider()?;
            let outcome = SimulationRun::new(observer, config.target()?, config.rf)?
                .with_cadence(cadence_from_secs(*cadence_secs)?)?
                .run_time_stepped(&provider, TimeWindow::new(*start, *end)?)?;

            Ok(RunProducts {
                results: outcome.results,
                assembler: ReportAssembler::new(),
            })
        }
        ModeConfig::Pass {
            after,
            cadence_secs,
        } => {
            let provider = config.propagation.provider()?;
            let after = after.unwrap_or_else(Utc::now);
            let outcome = SimulationRun::new(observer, config.target()?, config.rf)?
                .with_cadence(cadence_from_secs(*cadence_secs)?)?
                .run_pass(&provider, after)?;

            info!(
                "Pass duration {} s, predicted margin {:.2} dB",
                outcome.window.duration().num_seconds(),
                outcome.predicted.link_margin_db
            );

            Ok(RunProducts {
                results: outcome.run.results,
                assembler: ReportAssembler::new().with_pass(outcome.window, outcome.predicted),
            })
        }
        ModeConfig::AngleSweep {
            altitude_km,
            angles_deg,
        } => {
            let sweep = AngleSweep::new(*altitude_km, angles_deg.clone())?;
            Ok(RunProducts {
                results: sweep.run(&config.rf)?,
                assembler: ReportAssembler::new().with_altitude_km(sweep.altitude_km()),
            })
        }
    }
}

fn worst_margin(results: &[LinkBudgetResult]) -> Option<&LinkBudgetResult> {
    results
        .iter()
        .min_by(|a, b| a.link_margin_db.total_cmp(&b.link_margin_db))
}

fn write_json<T: Serialize>(output: Option<&PathBuf>, value: &T) -> Result<()> {
    match output {
        Some(path) => {
            info!("Writing output to {:?}", path);
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, value)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
