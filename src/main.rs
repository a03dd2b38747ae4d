use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use clocklab::config::LabConfig;
use clocklab::{berkeley, cristian, dispatch};
use clocklab::{BerkeleyScenario, ClockReading, DeterministicRng, SyncResult};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Arguments {
    /// JSON scenario file. Missing fields take their defaults.
    #[arg(short, long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override the seed used for every random draw.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    demo: Option<Demo>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Demo {
    /// Berkeley offset averaging.
    Berkeley,
    /// Cristian round-trip estimation.
    Cristian,
    /// Random two-way dispatch.
    Dispatch,
    /// All of the above (the default).
    All,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Arguments::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run failed");
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Arguments) -> SyncResult<()> {
    let mut config = match &args.config {
        Some(path) => LabConfig::load(path)?,
        None => LabConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    match args.demo.unwrap_or(Demo::All) {
        Demo::Berkeley => run_berkeley(&config),
        Demo::Cristian => run_cristian(&config),
        Demo::Dispatch => run_dispatch(&config),
        Demo::All => {
            run_berkeley(&config)?;
            run_cristian(&config)?;
            run_dispatch(&config)
        }
    }
}

fn banner(title: &str) {
    println!("═══════════════════════════════════════════════════════");
    println!("  {}", title);
    println!("═══════════════════════════════════════════════════════");
    println!();
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
        .unwrap_or_default()
}

fn run_berkeley(config: &LabConfig) -> SyncResult<()> {
    banner("Berkeley Algorithm");

    let reference = ClockReading::new(config.berkeley.reference.unwrap_or_else(unix_now));
    let mut rng = DeterministicRng::new(config.seed);
    let scenario = BerkeleyScenario::generate(reference, &config.berkeley, &mut rng)?;
    let outcome = berkeley::synchronize_with(
        scenario.reference,
        &scenario.participants,
        config.berkeley.rounding,
    )?;

    println!("  Master initial time: {}", scenario.reference);
    println!();
    for (i, (reading, offset)) in scenario
        .participants
        .iter()
        .zip(&outcome.offsets)
        .enumerate()
    {
        println!(
            "  Participant {} time: {}   (master − participant = {:+})",
            i + 1,
            reading,
            offset
        );
    }
    println!();
    println!("  Average offset:        {:+}", outcome.average_offset);
    println!("  Synchronized master:   {}", outcome.corrected_reference);
    println!();
    println!("  Updated participant times:");
    for (i, reading) in outcome.corrected_participants.iter().enumerate() {
        println!("    Participant {} new time: {}", i + 1, reading);
    }
    println!();
    Ok(())
}

fn run_cristian(config: &LabConfig) -> SyncResult<()> {
    banner("Cristian's Algorithm");

    let mut rng = DeterministicRng::new(config.seed);
    let samples = cristian::run_exchange(&config.cristian, &mut rng)?;

    for (round, sample) in samples.iter().enumerate() {
        println!(
            "  Round {}: T0={}  Ts={}  T1={}",
            round + 1,
            sample.request,
            sample.server,
            sample.response
        );
    }
    let estimate = cristian::best_estimate(&samples)?;

    println!();
    println!("  Client actual time:       {}", estimate.client_time);
    println!("  Round trip time (RTT):    {}", estimate.rtt);
    println!("  Estimated one-way delay:  {}", estimate.one_way_delay);
    println!("  Synchronized client time: {}", estimate.synchronized);
    if let Some(correction) = estimate.correction() {
        println!("  Correction:               {:+}", correction);
    }
    println!();
    Ok(())
}

fn run_dispatch(config: &LabConfig) -> SyncResult<()> {
    banner("Random Dispatch");

    let mut rng = DeterministicRng::new(config.seed);
    let report = dispatch::run_load_balancer(&config.dispatch, &mut rng);

    for (message, gate) in &report.deliveries {
        println!("  {} → {}", message, gate);
    }
    println!();
    println!(
        "  Delivered: {} total, {} via out[0], {} via out[1]",
        report.stats.total(),
        report.stats.out0,
        report.stats.out1
    );
    println!();
    Ok(())
}
