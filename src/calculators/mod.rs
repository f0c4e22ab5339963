//! Pure numeric calculators
//!
//! The three calculators share no state. Each is a plain function of its
//! parameters; validation, caching and timing live in [`crate::engine`].

mod compound;
mod debt;
mod monte_carlo;

pub use compound::{
    calculate_compound_interest, effective_annual_rate, CompoundInterestParams, ContributionTiming,
    DetailedCompoundInterestResult, YearlyBalance, DEFAULT_CONTRIBUTION_FREQUENCY,
};
pub use debt::{
    calculate_debt_payoff, compare_strategies, order_debts, Debt, DebtPayoffEntry, DebtPayoffParams,
    DebtPayoffResult, PayoffScheduleEntry, PayoffStrategy, StrategyComparison,
};
pub use monte_carlo::{
    percentile, run_simulation, run_simulation_cancellable, Band, MonteCarloParams, MonteCarloResult,
    SimulationStatistics, YearlyProjection, CONFIDENCE_BANDS, PERCENTILES,
};
