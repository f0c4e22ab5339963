//! Engine configuration
//!
//! Every limit the validator enforces, plus cache, rate limiting and timeout
//! settings. All sections default to production values, so a JSON file only
//! needs to name the settings it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a [`crate::FinancialEngine`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: ValidationLimits,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,

    /// Wall-clock budget for one Monte Carlo simulation
    pub monte_carlo_timeout_secs: u64,

    /// Longest debt payoff plan simulated before declaring non-convergence
    pub max_payoff_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: ValidationLimits::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            monte_carlo_timeout_secs: 30,
            max_payoff_months: 1200, // 100 years
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Wall-clock budget for one Monte Carlo run
    pub fn monte_carlo_timeout(&self) -> Duration {
        Duration::from_secs(self.monte_carlo_timeout_secs)
    }
}

/// Numeric and string bounds applied to every incoming parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    /// Ceiling for principal, balances, contributions and payments
    pub max_amount: f64,
    pub min_rate: f64,
    pub max_rate: f64,
    pub max_years: f64,
    pub min_frequency: u32,
    pub max_frequency: u32,
    pub max_iterations: u32,
    pub max_projection_years: u32,
    pub max_volatility: f64,
    pub max_debts: usize,
    pub max_string_length: usize,

    /// `|rate| x years x exposure` above this is treated as an overflow attempt
    pub overflow_ceiling: f64,

    /// `iterations x years x 12` above this is treated as a DoS attempt
    pub max_simulation_steps: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_amount: 1e9,
            min_rate: -0.5,
            max_rate: 2.0,
            max_years: 100.0,
            min_frequency: 1,
            max_frequency: 365,
            max_iterations: 10_000,
            max_projection_years: 100,
            max_volatility: 2.0,
            max_debts: 100,
            max_string_length: 1000,
            overflow_ceiling: 1e15,
            max_simulation_steps: 1e8,
        }
    }
}

/// Per-caller sliding window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Oldest entries are evicted first once this many are stored
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1000 }
    }
}
