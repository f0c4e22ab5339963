//! Financial calculation engine for personal-finance planning
//!
//! This library provides:
//! - Compound interest projection with recurring contributions
//! - Monte Carlo retirement projections with percentile bands
//! - Multi-debt payoff planning (snowball, avalanche, custom order)
//! - Input validation, sanitization and per-caller rate limiting
//! - Result caching and per-call performance metrics
//!
//! All calculations go through [`FinancialEngine`]; the calculators in
//! [`calculators`] are also usable directly as pure functions.

pub mod cache;
pub mod calculators;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod validation;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStats};
pub use calculators::{
    CompoundInterestParams, ContributionTiming, Debt, DebtPayoffParams, DebtPayoffResult,
    DetailedCompoundInterestResult, MonteCarloParams, MonteCarloResult, PayoffStrategy, StrategyComparison,
};
pub use config::EngineConfig;
pub use engine::FinancialEngine;
pub use error::{ConfigError, EngineError, ValidationError, Violation};
pub use metrics::PerformanceMetric;
pub use validation::{SecurityEvent, SecurityEventKind, Severity};
