//! Engine facade
//!
//! Every calculation runs the same linear pipeline:
//! rate limit -> validate -> claim key -> cache lookup -> calculate -> cache store -> metric.
//!
//! # Example
//! ```
//! use finplan_engine::{CompoundInterestParams, FinancialEngine};
//!
//! let engine = FinancialEngine::default();
//! let params = CompoundInterestParams::lump_sum(10_000.0, 0.07, 1, 10.0);
//! let result = engine.calculate_compound_interest_detailed("user-1", &params).unwrap();
//! assert!((result.future_value - 19_671.51).abs() < 0.01);
//! ```

use crate::cache::{CacheKey, CacheStats, CachedResult, InFlight, ResultCache};
use crate::calculators::{
    calculate_compound_interest, calculate_debt_payoff, compare_strategies, run_simulation_cancellable,
    CompoundInterestParams, DebtPayoffParams, DebtPayoffResult, DetailedCompoundInterestResult, MonteCarloParams,
    MonteCarloResult, StrategyComparison,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::metrics::{FunctionSummary, PerformanceMetric, PerformanceMonitor};
use crate::validation::{SecurityEvent, Validator};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

pub const COMPOUND_INTEREST: &str = "calculateCompoundInterestDetailed";
pub const MONTE_CARLO: &str = "runMonteCarloSimulation";
pub const DEBT_PAYOFF: &str = "calculateDebtPayoff";
pub const DEBT_COMPARISON: &str = "compareDebtStrategies";

/// Entry point for all calculations.
///
/// Owns the only mutable state in the crate (rate limiter, result cache,
/// metrics and security logs). Construct one per application and share it by
/// reference; all methods take `&self`.
#[derive(Debug)]
pub struct FinancialEngine {
    config: EngineConfig,
    validator: Validator,
    cache: Mutex<ResultCache>,
    in_flight: InFlight,
    monitor: Mutex<PerformanceMonitor>,
}

impl Default for FinancialEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FinancialEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            validator: Validator::new(&config),
            cache: Mutex::new(ResultCache::new(config.cache.max_entries)),
            in_flight: InFlight::new(),
            monitor: Mutex::new(PerformanceMonitor::new()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculate_compound_interest_detailed(
        &self,
        caller_id: &str,
        params: &CompoundInterestParams,
    ) -> Result<DetailedCompoundInterestResult, EngineError> {
        self.instrumented(COMPOUND_INTEREST, || {
            self.validator.check_rate_limit(caller_id)?;
            let params = self.validator.validate_compound_interest(caller_id, params)?;

            let params = params.canonical();
            self.memoized(
                cache_key(COMPOUND_INTEREST, &params),
                |cached| match cached {
                    CachedResult::CompoundInterest(result) => Some(result),
                    _ => None,
                },
                CachedResult::CompoundInterest,
                || Ok(calculate_compound_interest(&params)),
            )
        })
    }

    /// Runs on a dedicated worker thread bounded by the configured timeout.
    ///
    /// Only seeded simulations are cached; an unseeded run is not a pure
    /// function of its parameters.
    pub fn run_monte_carlo_simulation(
        &self,
        caller_id: &str,
        params: &MonteCarloParams,
    ) -> Result<MonteCarloResult, EngineError> {
        self.instrumented(MONTE_CARLO, || {
            self.validator.check_rate_limit(caller_id)?;
            let params = self.validator.validate_monte_carlo(caller_id, params)?;

            let key = params.seed.and_then(|_| cache_key(MONTE_CARLO, &params));
            self.memoized(
                key,
                |cached| match cached {
                    CachedResult::MonteCarlo(result) => Some(result),
                    _ => None,
                },
                CachedResult::MonteCarlo,
                || self.simulate_with_timeout(params),
            )
        })
    }

    pub fn calculate_debt_payoff(
        &self,
        caller_id: &str,
        params: &DebtPayoffParams,
    ) -> Result<DebtPayoffResult, EngineError> {
        self.instrumented(DEBT_PAYOFF, || {
            self.validator.check_rate_limit(caller_id)?;
            let params = self.validator.validate_debt_payoff(caller_id, params)?;

            self.memoized(
                cache_key(DEBT_PAYOFF, &params),
                |cached| match cached {
                    CachedResult::DebtPayoff(result) => Some(result),
                    _ => None,
                },
                CachedResult::DebtPayoff,
                || calculate_debt_payoff(&params, self.config.max_payoff_months),
            )
        })
    }

    /// Snowball against avalanche for the same debts. Not cached.
    pub fn compare_debt_strategies(
        &self,
        caller_id: &str,
        params: &DebtPayoffParams,
    ) -> Result<StrategyComparison, EngineError> {
        self.instrumented(DEBT_COMPARISON, || {
            self.validator.check_rate_limit(caller_id)?;
            let params = self.validator.validate_debt_payoff(caller_id, params)?;
            Ok((compare_strategies(&params, self.config.max_payoff_months)?, false))
        })
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
        log::info!("Result cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        lock(&self.cache).stats()
    }

    /// Every recorded invocation, oldest first
    pub fn performance_metrics(&self) -> Vec<PerformanceMetric> {
        lock(&self.monitor).metrics().to_vec()
    }

    pub fn performance_summary(&self) -> BTreeMap<String, FunctionSummary> {
        lock(&self.monitor).summary()
    }

    pub fn truncate_performance_metrics(&self, keep_last: usize) {
        lock(&self.monitor).truncate(keep_last);
    }

    pub fn clear_performance_metrics(&self) {
        lock(&self.monitor).clear();
    }

    pub fn security_events(&self) -> Vec<SecurityEvent> {
        self.validator.security_events()
    }

    pub fn clear_security_events(&self) {
        self.validator.clear_security_events();
    }

    /// Time `operation` and record one metric whatever its outcome
    fn instrumented<T, F>(&self, function_name: &'static str, operation: F) -> Result<T, EngineError>
    where
        F: FnOnce() -> Result<(T, bool), EngineError>,
    {
        let start = Instant::now();
        let outcome = operation();
        let elapsed = start.elapsed();

        let (success, cache_hit) = match &outcome {
            Ok((_, hit)) => (true, *hit),
            Err(_) => (false, false),
        };
        lock(&self.monitor).record(function_name, elapsed, success, cache_hit);

        outcome.map(|(value, _)| value)
    }

    /// Serve `key` from the cache or compute and store it.
    ///
    /// The key stays claimed from lookup to store, so a concurrent caller with
    /// the same key waits and then reads the stored result. Without a key the
    /// computation always runs. Returns the value and whether it was a hit.
    fn memoized<T, F>(
        &self,
        key: Option<CacheKey>,
        from_cache: fn(CachedResult) -> Option<T>,
        into_cache: fn(T) -> CachedResult,
        compute: F,
    ) -> Result<(T, bool), EngineError>
    where
        T: Clone,
        F: FnOnce() -> Result<T, EngineError>,
    {
        let key = match key {
            Some(key) => key,
            None => return compute().map(|result| (result, false)),
        };

        let _claim = self.in_flight.claim(&key);
        let hit = lock(&self.cache).get(&key);
        log::debug!("cache {} for {}", if hit.is_some() { "hit" } else { "miss" }, key);
        if let Some(result) = hit.and_then(from_cache) {
            return Ok((result, true));
        }

        let result = compute()?;
        lock(&self.cache).put(key, into_cache(result.clone()));
        Ok((result, false))
    }

    fn simulate_with_timeout(&self, params: MonteCarloParams) -> Result<MonteCarloResult, EngineError> {
        let timeout = self.config.monte_carlo_timeout();
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();

        let worker_cancel = Arc::clone(&cancel);
        let spawned = thread::Builder::new()
            .name("monte-carlo".to_string())
            .spawn(move || {
                // Receiver is gone after a timeout; nothing left to report to
                let _ = tx.send(run_simulation_cancellable(&params, &worker_cancel));
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn Monte Carlo worker: {}", e);
            return Err(EngineError::ComputationTimeout {
                function: MONTE_CARLO,
                timeout,
            });
        }

        match rx.recv_timeout(timeout) {
            Ok(Some(result)) => Ok(result),
            Ok(None) | Err(RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                log::warn!("Monte Carlo simulation cancelled after {:?}", timeout);
                Err(EngineError::ComputationTimeout {
                    function: MONTE_CARLO,
                    timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Monte Carlo worker exited without a result");
                Err(EngineError::ComputationTimeout {
                    function: MONTE_CARLO,
                    timeout,
                })
            }
        }
    }
}

fn cache_key<P: Serialize>(function_name: &str, params: &P) -> Option<CacheKey> {
    match CacheKey::derive(function_name, params) {
        Ok(key) => Some(key),
        Err(e) => {
            log::warn!("Skipping cache for {}: {}", function_name, e);
            None
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
