//! finplan CLI
//!
//! Runs one engine calculation from a JSON parameter file and prints the
//! result as JSON. Parameter files use the same camelCase field names as the
//! API layer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finplan_engine::{
    CompoundInterestParams, DebtPayoffParams, DebtPayoffResult, EngineConfig, FinancialEngine, MonteCarloParams,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "finplan", version, about = "Financial projection and debt payoff calculator")]
struct Cli {
    /// Engine configuration JSON (limits, rate limit, cache, timeouts)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Caller identifier used for rate limiting
    #[arg(long, global = true, default_value = "cli")]
    caller: String,

    /// Print per-call performance metrics to stderr
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compound interest with optional recurring contributions
    Compound {
        #[arg(long)]
        params: PathBuf,
    },
    /// Monte Carlo portfolio projection
    MonteCarlo {
        #[arg(long)]
        params: PathBuf,
        /// Overrides any seed in the parameter file
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Debt payoff plan for the strategy in the parameter file
    Debt {
        #[arg(long)]
        params: PathBuf,
        /// Also write the month-by-month schedule as CSV
        #[arg(long)]
        schedule_csv: Option<PathBuf>,
    },
    /// Snowball versus avalanche for the same debts
    CompareDebts {
        #[arg(long)]
        params: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let engine = FinancialEngine::new(config);

    match &cli.command {
        Command::Compound { params } => {
            let params: CompoundInterestParams = read_params(params)?;
            let result = engine.calculate_compound_interest_detailed(&cli.caller, &params)?;
            print_json(&result)?;
        }
        Command::MonteCarlo { params, seed } => {
            let mut params: MonteCarloParams = read_params(params)?;
            if seed.is_some() {
                params.seed = *seed;
            }
            let result = engine.run_monte_carlo_simulation(&cli.caller, &params)?;
            print_json(&result)?;
        }
        Command::Debt { params, schedule_csv } => {
            let params: DebtPayoffParams = read_params(params)?;
            let result = engine.calculate_debt_payoff(&cli.caller, &params)?;
            if let Some(path) = schedule_csv {
                write_schedule_csv(&result, path)?;
                eprintln!("Schedule written to {}", path.display());
            }
            print_json(&result)?;
        }
        Command::CompareDebts { params } => {
            let params: DebtPayoffParams = read_params(params)?;
            let result = engine.compare_debt_strategies(&cli.caller, &params)?;
            print_json(&result)?;
        }
    }

    if cli.metrics {
        for metric in engine.performance_metrics() {
            eprintln!(
                "{:<36} {:>10.3} ms  success={} cache_hit={}",
                metric.function_name,
                metric.execution_time.as_secs_f64() * 1000.0,
                metric.success,
                metric.cache_hit
            );
        }
    }

    Ok(())
}

fn read_params<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_schedule_csv(result: &DebtPayoffResult, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for entry in &result.payoff_schedule {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}
