//! Monte Carlo portfolio projection
//!
//! Each path walks `years_to_project * 12` months. A month's return is drawn
//! from a normal distribution with mean `expected_return / 12` and standard
//! deviation `volatility / sqrt(12)`; the return is applied to the balance and
//! then the monthly contribution is added.
//!
//! Paths run in parallel. Every path owns a generator seeded from
//! `(base seed, path index)`, so a seeded run produces the same result no
//! matter how rayon schedules the work.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

/// Percentiles reported in [`MonteCarloResult::projections`]
pub const PERCENTILES: [u32; 7] = [5, 10, 25, 50, 75, 90, 95];

/// Named confidence bands as (name, lower percentile, upper percentile)
pub const CONFIDENCE_BANDS: [(&str, u32, u32); 3] = [("p50", 25, 75), ("p80", 10, 90), ("p90", 5, 95)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloParams {
    pub initial_value: f64,
    pub monthly_contribution: f64,
    pub years_to_project: u32,
    /// Expected annual return, e.g. 0.07
    pub expected_return: f64,
    /// Annual standard deviation of returns
    pub volatility: f64,
    pub iterations: u32,
    /// Fixes the random stream; omitted means a fresh entropy seed per run
    #[serde(default)]
    pub seed: Option<u64>,
    /// Final value counted as a successful outcome
    #[serde(default)]
    pub target_value: Option<f64>,
}

impl MonteCarloParams {
    pub fn total_months(&self) -> usize {
        self.years_to_project as usize * 12
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatistics {
    pub mean: f64,
    pub standard_deviation: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Distribution of path balances at the end of one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyProjection {
    pub year: u32,
    pub p10: f64,
    pub median: f64,
    pub p90: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloResult {
    pub iterations: u32,
    /// Percentile (5, 10, ... 95) to final value
    pub projections: BTreeMap<u32, f64>,
    pub statistics: SimulationStatistics,
    pub confidence_intervals: BTreeMap<String, Band>,
    pub yearly_projections: Vec<YearlyProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_of_success: Option<f64>,
}

impl MonteCarloResult {
    pub fn percentile(&self, p: u32) -> Option<f64> {
        self.projections.get(&p).copied()
    }
}

/// Run the simulation to completion
pub fn run_simulation(params: &MonteCarloParams) -> MonteCarloResult {
    let never = AtomicBool::new(false);
    // Never cancelled, so a result is always produced
    run_simulation_cancellable(params, &never).unwrap_or_else(|| summarize(params, Vec::new()))
}

/// Run the simulation, polling `cancel` between paths.
///
/// Returns `None` as soon as cancellation is observed.
pub fn run_simulation_cancellable(params: &MonteCarloParams, cancel: &AtomicBool) -> Option<MonteCarloResult> {
    let base_seed = params.seed.unwrap_or_else(rand::random::<u64>);

    let paths: Option<Vec<Vec<f64>>> = (0..params.iterations)
        .into_par_iter()
        .map(|path_index| {
            if cancel.load(Ordering::Relaxed) {
                return None;
            }
            let mut rng = Pcg64::seed_from_u64(derive_seed(base_seed, path_index));
            Some(simulate_path(params, &mut rng))
        })
        .collect();

    paths.map(|year_ends| summarize(params, year_ends))
}

/// Walk one path, returning the balance at the end of every year
fn simulate_path<R: Rng>(params: &MonteCarloParams, rng: &mut R) -> Vec<f64> {
    let monthly_mean = params.expected_return / 12.0;
    let monthly_vol = params.volatility / 12.0_f64.sqrt();

    let mut balance = params.initial_value;
    let mut year_ends = Vec::with_capacity(params.years_to_project as usize);

    for month in 1..=params.total_months() {
        let monthly_return = monthly_mean + monthly_vol * standard_normal(rng);
        balance = (balance * (1.0 + monthly_return)).max(0.0);
        balance += params.monthly_contribution;

        if month % 12 == 0 {
            year_ends.push(balance);
        }
    }

    year_ends
}

fn summarize(params: &MonteCarloParams, year_ends: Vec<Vec<f64>>) -> MonteCarloResult {
    let years = params.years_to_project as usize;

    let mut finals: Vec<f64> = year_ends
        .iter()
        .map(|path| path.last().copied().unwrap_or(params.initial_value))
        .collect();
    finals.sort_by(f64::total_cmp);

    let projections = PERCENTILES
        .iter()
        .map(|&p| (p, percentile(&finals, p as f64)))
        .collect::<BTreeMap<_, _>>();

    let confidence_intervals = CONFIDENCE_BANDS
        .iter()
        .map(|&(name, lower, upper)| {
            let band = Band {
                min: percentile(&finals, lower as f64),
                max: percentile(&finals, upper as f64),
            };
            (name.to_string(), band)
        })
        .collect();

    let (mean, standard_deviation) = mean_and_std(&finals);
    let statistics = SimulationStatistics {
        mean,
        standard_deviation,
        median: percentile(&finals, 50.0),
        min: finals.first().copied().unwrap_or(0.0),
        max: finals.last().copied().unwrap_or(0.0),
    };

    let mut yearly_projections = Vec::with_capacity(years);
    let mut column = Vec::with_capacity(year_ends.len());
    for year in 0..years {
        column.clear();
        column.extend(year_ends.iter().filter_map(|path| path.get(year).copied()));
        column.sort_by(f64::total_cmp);
        yearly_projections.push(YearlyProjection {
            year: year as u32 + 1,
            p10: percentile(&column, 10.0),
            median: percentile(&column, 50.0),
            p90: percentile(&column, 90.0),
            mean: mean_and_std(&column).0,
        });
    }

    let probability_of_success = params.target_value.map(|target| {
        if finals.is_empty() {
            0.0
        } else {
            finals.iter().filter(|&&v| v >= target).count() as f64 / finals.len() as f64
        }
    });

    MonteCarloResult {
        iterations: params.iterations,
        projections,
        statistics,
        confidence_intervals,
        yearly_projections,
        probability_of_success,
    }
}

/// Linear interpolation between closest ranks. `sorted` must be ascending.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Population mean and standard deviation
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Box-Muller transform on two uniform draws
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-12);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn derive_seed(base_seed: u64, path_index: u32) -> u64 {
    splitmix64(base_seed ^ (((path_index as u64) << 32) | path_index as u64))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
