use std::io::Write;
use std::process::exit;

use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info};

use wfsim_dag::config::SimulationConfig;

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Simulates the workflow execution described by the config file and prints the result.
struct Args {
    /// Path to simulation config (.json, .yaml or .yml)
    #[arg(short, long)]
    config: String,

    /// Scheduler to use instead of the one from config, e.g. adaptive[hide_profile=false]
    #[arg(short, long)]
    scheduler: Option<String>,

    /// Random seed to use instead of the one from config
    #[arg(long)]
    seed: Option<u64>,

    /// Save trace log to this file
    #[arg(short, long)]
    trace: Option<String>,

    /// Print run statistics as JSON
    #[arg(long)]
    stats: bool,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SimulationConfig::from_file(&args.config)?;
    if let Some(scheduler) = &args.scheduler {
        config.scheduler = scheduler.clone();
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut sim = config.build()?;
    let stats = sim.run()?;

    if let Some(trace) = &args.trace {
        sim.trace_log().save_to_file(trace)?;
        info!("trace log saved to {}", trace);
    }
    if args.stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        exit(1);
    }
}
