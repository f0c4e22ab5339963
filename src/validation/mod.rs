//! Input validation, sanitization and rate limiting
//!
//! The [`Validator`] is the single gate between caller-supplied parameters and
//! the calculators. It:
//! - Refuses callers over their rate limit before doing any other work
//! - Sanitizes free-text fields
//! - Checks every numeric field against [`ValidationLimits`], collecting all
//!   violations rather than stopping at the first
//! - Classifies overflow-sized parameter combinations as security events

mod rate_limit;
mod sanitize;
mod security;

pub use rate_limit::RateLimiter;
pub use sanitize::{sanitize_string, Sanitized};
pub use security::{SecurityEvent, SecurityEventKind, SecurityLog, Severity, DEFAULT_SECURITY_LOG_CAPACITY};

use crate::calculators::{CompoundInterestParams, DebtPayoffParams, MonteCarloParams, PayoffStrategy};
use crate::config::{EngineConfig, ValidationLimits};
use crate::error::{EngineError, ValidationError, Violation};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Message returned for security rejections; the detail only goes to the log
const SECURITY_REJECTION_MESSAGE: &str = "parameter combination exceeds safe computation limits";

#[derive(Debug)]
pub struct Validator {
    limits: ValidationLimits,
    rate_limiter: Mutex<RateLimiter>,
    security_log: Mutex<SecurityLog>,
}

impl Validator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            limits: config.limits.clone(),
            rate_limiter: Mutex::new(RateLimiter::new(&config.rate_limit)),
            security_log: Mutex::new(SecurityLog::default()),
        }
    }

    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }

    /// Count a request against the caller's window
    pub fn check_rate_limit(&self, caller_id: &str) -> Result<(), EngineError> {
        let (allowed, limit, window) = {
            let mut limiter = lock(&self.rate_limiter);
            (limiter.check(caller_id), limiter.max_requests(), limiter.window())
        };
        if allowed {
            return Ok(());
        }

        self.record(SecurityEvent::new(
            SecurityEventKind::RateLimitExceeded,
            caller_id,
            format!("more than {} requests in {:?}", limit, window),
        ));
        Err(EngineError::RateLimited {
            caller_id: caller_id.to_string(),
            limit,
            window_secs: window.as_secs(),
        })
    }

    pub fn validate_compound_interest(
        &self,
        caller_id: &str,
        params: &CompoundInterestParams,
    ) -> Result<CompoundInterestParams, ValidationError> {
        let limits = &self.limits;
        let mut checks = Checks::new(limits);

        checks.amount("principal", params.principal);
        checks.in_range("annualRate", params.annual_rate, limits.min_rate, limits.max_rate);
        checks.frequency("compoundingFrequency", params.compounding_frequency);
        checks.in_range("timeInYears", params.time_in_years, 0.0, limits.max_years);
        if let Some(amount) = params.additional_contributions {
            checks.amount("additionalContributions", amount);
        }
        if let Some(frequency) = params.contribution_frequency {
            checks.frequency("contributionFrequency", frequency);
        }

        if checks.is_clean() {
            let contributions = params.contribution_amount()
                * params.contribution_periods_per_year() as f64
                * params.time_in_years;
            let exposure = params.annual_rate.abs() * params.time_in_years * (params.principal + contributions);
            if exposure > limits.overflow_ceiling {
                self.reject_overflow(
                    &mut checks,
                    caller_id,
                    format!("compound interest exposure {:.3e} exceeds {:.3e}", exposure, limits.overflow_ceiling),
                );
            }
        }

        checks.finish(params.clone())
    }

    pub fn validate_monte_carlo(
        &self,
        caller_id: &str,
        params: &MonteCarloParams,
    ) -> Result<MonteCarloParams, ValidationError> {
        let limits = &self.limits;
        let mut checks = Checks::new(limits);

        checks.amount("initialValue", params.initial_value);
        checks.amount("monthlyContribution", params.monthly_contribution);
        checks.count("yearsToProject", params.years_to_project, 1, limits.max_projection_years);
        checks.in_range("expectedReturn", params.expected_return, limits.min_rate, limits.max_rate);
        checks.in_range("volatility", params.volatility, 0.0, limits.max_volatility);
        checks.count("iterations", params.iterations, 1, limits.max_iterations);
        if let Some(target) = params.target_value {
            checks.in_range("targetValue", target, 0.0, f64::MAX);
        }

        if checks.is_clean() {
            let steps = params.iterations as f64 * params.years_to_project as f64 * 12.0;
            let years = params.years_to_project as f64;
            let exposure = params.expected_return.abs()
                * years
                * (params.initial_value + params.monthly_contribution * 12.0 * years);

            if steps > limits.max_simulation_steps {
                self.reject_overflow(
                    &mut checks,
                    caller_id,
                    format!("{:.3e} simulation steps exceed {:.3e}", steps, limits.max_simulation_steps),
                );
            } else if exposure > limits.overflow_ceiling {
                self.reject_overflow(
                    &mut checks,
                    caller_id,
                    format!("simulation exposure {:.3e} exceeds {:.3e}", exposure, limits.overflow_ceiling),
                );
            }
        }

        checks.finish(params.clone())
    }

    pub fn validate_debt_payoff(
        &self,
        caller_id: &str,
        params: &DebtPayoffParams,
    ) -> Result<DebtPayoffParams, ValidationError> {
        let limits = &self.limits;
        let mut checks = Checks::new(limits);
        let mut sanitized = params.clone();

        if params.debts.is_empty() {
            checks.violation("debts", "at least one debt is required");
        } else if params.debts.len() > limits.max_debts {
            checks.violation("debts", format!("at most {} debts are allowed", limits.max_debts));
        }

        let mut seen_ids = HashSet::new();
        for (i, debt) in sanitized.debts.iter_mut().enumerate() {
            debt.id = self.sanitize_field(caller_id, &format!("debts[{}].id", i), &debt.id);
            debt.name = self.sanitize_field(caller_id, &format!("debts[{}].name", i), &debt.name);

            if debt.id.is_empty() {
                checks.violation(format!("debts[{}].id", i), "must not be empty");
            } else if !seen_ids.insert(debt.id.clone()) {
                checks.violation(format!("debts[{}].id", i), format!("duplicate debt id '{}'", debt.id));
            }
            checks.amount(&format!("debts[{}].balance", i), debt.balance);
            checks.in_range(&format!("debts[{}].interestRate", i), debt.interest_rate, 0.0, limits.max_rate);
            checks.amount(&format!("debts[{}].minimumPayment", i), debt.minimum_payment);
        }
        checks.amount("extraPayment", params.extra_payment);

        match (params.strategy, &mut sanitized.custom_order) {
            (PayoffStrategy::Custom, None) => {
                checks.violation("customOrder", "required when strategy is custom");
            }
            (PayoffStrategy::Custom, Some(order)) => {
                for (i, id) in order.iter_mut().enumerate() {
                    let clean = self.sanitize_field(caller_id, &format!("customOrder[{}]", i), id.as_str());
                    *id = clean;
                }
                if let Some(message) = permutation_error(&order[..], &seen_ids, sanitized.debts.len()) {
                    checks.violation("customOrder", message);
                }
            }
            (_, Some(_)) => {
                checks.violation("customOrder", "only allowed when strategy is custom");
            }
            (_, None) => {}
        }

        if checks.is_clean() {
            let exposure = sanitized
                .debts
                .iter()
                .map(|d| d.interest_rate * d.balance * limits.max_years)
                .fold(0.0, f64::max);
            if exposure > limits.overflow_ceiling {
                self.reject_overflow(
                    &mut checks,
                    caller_id,
                    format!("debt interest exposure {:.3e} exceeds {:.3e}", exposure, limits.overflow_ceiling),
                );
            }
        }

        checks.finish(sanitized)
    }

    /// Security events recorded so far, oldest first
    pub fn security_events(&self) -> Vec<SecurityEvent> {
        lock(&self.security_log).events()
    }

    pub fn clear_security_events(&self) {
        lock(&self.security_log).clear();
    }

    pub fn reset_rate_limits(&self) {
        lock(&self.rate_limiter).reset();
    }

    fn sanitize_field(&self, caller_id: &str, field: &str, value: &str) -> String {
        let sanitized = sanitize_string(value, self.limits.max_string_length);
        if sanitized.had_dangerous_content {
            self.record(SecurityEvent::new(
                SecurityEventKind::DangerousPattern,
                caller_id,
                format!("stripped dangerous content from {}", field),
            ));
        }
        sanitized.value
    }

    fn reject_overflow(&self, checks: &mut Checks, caller_id: &str, detail: String) {
        self.record(SecurityEvent::new(SecurityEventKind::OverflowAttempt, caller_id, detail));
        checks.violation("parameters", SECURITY_REJECTION_MESSAGE);
    }

    fn record(&self, event: SecurityEvent) {
        lock(&self.security_log).record(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn permutation_error(order: &[String], ids: &HashSet<String>, debt_count: usize) -> Option<String> {
    let mut seen = HashSet::new();
    for id in order {
        if !ids.contains(id) {
            return Some(format!("unknown debt id '{}'", id));
        }
        if !seen.insert(id.as_str()) {
            return Some(format!("debt id '{}' appears more than once", id));
        }
    }
    if order.len() != debt_count {
        return Some(format!("must list all {} debts exactly once, got {}", debt_count, order.len()));
    }
    None
}

/// Violation accumulator for one parameter set
struct Checks<'a> {
    limits: &'a ValidationLimits,
    violations: Vec<Violation>,
}

impl<'a> Checks<'a> {
    fn new(limits: &'a ValidationLimits) -> Self {
        Self {
            limits,
            violations: Vec::new(),
        }
    }

    fn violation(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(field, message));
    }

    fn in_range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() {
            self.violation(field, "must be a finite number");
        } else if value < min || value > max {
            self.violation(field, format!("must be within [{}, {}], got {}", min, max, value));
        }
    }

    fn amount(&mut self, field: &str, value: f64) {
        self.in_range(field, value, 0.0, self.limits.max_amount);
    }

    fn frequency(&mut self, field: &str, value: u32) {
        self.count(field, value, self.limits.min_frequency, self.limits.max_frequency);
    }

    fn count(&mut self, field: &str, value: u32, min: u32, max: u32) {
        if value < min || value > max {
            self.violation(field, format!("must be within [{}, {}], got {}", min, max, value));
        }
    }

    fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.violations.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError::new(self.violations))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::{ContributionTiming, Debt};
    use crate::config::RateLimitConfig;

    fn validator() -> Validator {
        Validator::new(&EngineConfig::default())
    }

    fn debts() -> Vec<Debt> {
        vec![
            Debt::new("a", "Card A", 1_000.0, 0.2, 50.0),
            Debt::new("b", "Card B", 2_000.0, 0.1, 60.0),
        ]
    }

    fn debt_params(strategy: PayoffStrategy, custom_order: Option<Vec<&str>>) -> DebtPayoffParams {
        DebtPayoffParams {
            debts: debts(),
            extra_payment: 100.0,
            strategy,
            custom_order: custom_order.map(|ids| ids.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_valid_compound_params_pass() {
        let params = CompoundInterestParams::lump_sum(10_000.0, 0.07, 12, 30.0)
            .with_contributions(500.0, 12, ContributionTiming::Begin);
        let validated = validator().validate_compound_interest("u1", &params).unwrap();
        assert_eq!(validated, params);
    }

    #[test]
    fn test_every_violation_reported() {
        let params = CompoundInterestParams {
            principal: -1.0,
            annual_rate: 3.0,
            compounding_frequency: 0,
            time_in_years: f64::NAN,
            additional_contributions: Some(f64::INFINITY),
            contribution_frequency: Some(366),
            contribution_timing: None,
        };
        let err = validator().validate_compound_interest("u1", &params).unwrap_err();

        assert_eq!(err.len(), 6);
        for field in [
            "principal",
            "annualRate",
            "compoundingFrequency",
            "timeInYears",
            "additionalContributions",
            "contributionFrequency",
        ] {
            assert!(err.has_field(field), "missing violation for {}", field);
        }
    }

    #[test]
    fn test_ordinary_violation_is_not_a_security_event() {
        let v = validator();
        let params = CompoundInterestParams::lump_sum(2e9, 0.05, 1, 10.0);
        assert!(v.validate_compound_interest("u1", &params).is_err());
        assert!(v.security_events().is_empty());
    }

    #[test]
    fn test_overflow_attempt_is_security_event() {
        let config = EngineConfig {
            limits: ValidationLimits {
                overflow_ceiling: 1e6,
                ..ValidationLimits::default()
            },
            ..EngineConfig::default()
        };
        let v = Validator::new(&config);
        let params = CompoundInterestParams::lump_sum(1e6, 0.5, 1, 10.0);

        let err = v.validate_compound_interest("mallory", &params).unwrap_err();
        assert_eq!(err.violations[0].message, SECURITY_REJECTION_MESSAGE);

        let events = v.security_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SecurityEventKind::OverflowAttempt);
        assert_eq!(events[0].severity, Severity::High);
        assert_eq!(events[0].caller_id, "mallory");
    }

    #[test]
    fn test_simulation_step_ceiling() {
        let config = EngineConfig {
            limits: ValidationLimits {
                max_simulation_steps: 1e5,
                ..ValidationLimits::default()
            },
            ..EngineConfig::default()
        };
        let v = Validator::new(&config);
        let params = MonteCarloParams {
            initial_value: 1_000.0,
            monthly_contribution: 0.0,
            years_to_project: 100,
            expected_return: 0.05,
            volatility: 0.1,
            iterations: 1_000,
            seed: None,
            target_value: None,
        };

        assert!(v.validate_monte_carlo("mallory", &params).is_err());
        assert_eq!(v.security_events()[0].kind, SecurityEventKind::OverflowAttempt);

        let small = MonteCarloParams { iterations: 10, ..params };
        assert!(v.validate_monte_carlo("alice", &small).is_ok());
    }

    #[test]
    fn test_monte_carlo_bounds() {
        let params = MonteCarloParams {
            initial_value: 1_000.0,
            monthly_contribution: -5.0,
            years_to_project: 0,
            expected_return: 0.05,
            volatility: -0.1,
            iterations: 10_001,
            seed: Some(1),
            target_value: None,
        };
        let err = validator().validate_monte_carlo("u1", &params).unwrap_err();
        for field in ["monthlyContribution", "yearsToProject", "volatility", "iterations"] {
            assert!(err.has_field(field), "missing violation for {}", field);
        }
    }

    #[test]
    fn test_empty_debts_rejected() {
        let params = DebtPayoffParams {
            debts: Vec::new(),
            extra_payment: 0.0,
            strategy: PayoffStrategy::Snowball,
            custom_order: None,
        };
        let err = validator().validate_debt_payoff("u1", &params).unwrap_err();
        assert!(err.has_field("debts"));
    }

    #[test]
    fn test_custom_order_must_be_permutation() {
        let v = validator();

        assert!(v
            .validate_debt_payoff("u1", &debt_params(PayoffStrategy::Custom, Some(vec!["b", "a"])))
            .is_ok());

        for bad in [None, Some(vec!["a"]), Some(vec!["a", "a"]), Some(vec!["a", "z"]), Some(vec!["a", "b", "a"])] {
            let err = v
                .validate_debt_payoff("u1", &debt_params(PayoffStrategy::Custom, bad.clone()))
                .unwrap_err();
            assert!(err.has_field("customOrder"), "accepted {:?}", bad);
        }

        let err = v
            .validate_debt_payoff("u1", &debt_params(PayoffStrategy::Avalanche, Some(vec!["a", "b"])))
            .unwrap_err();
        assert!(err.has_field("customOrder"));
    }

    #[test]
    fn test_duplicate_debt_ids_rejected() {
        let mut params = debt_params(PayoffStrategy::Snowball, None);
        params.debts[1].id = "a".to_string();
        let err = validator().validate_debt_payoff("u1", &params).unwrap_err();
        assert!(err.has_field("debts[1].id"));
    }

    #[test]
    fn test_debt_strings_sanitized_and_logged() {
        let v = validator();
        let mut params = debt_params(PayoffStrategy::Custom, Some(vec!["<a>", "b"]));
        params.debts[0].id = "<a>".to_string();
        params.debts[0].name = "javascript:alert('hi')".to_string();

        let validated = v.validate_debt_payoff("u1", &params).unwrap();
        assert_eq!(validated.debts[0].id, "a");
        assert_eq!(validated.debts[0].name, "alert(hi)");
        assert_eq!(validated.custom_order, Some(vec!["a".to_string(), "b".to_string()]));

        let events = v.security_events();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == SecurityEventKind::DangerousPattern));
    }

    #[test]
    fn test_rate_limit() {
        let config = EngineConfig {
            rate_limit: RateLimitConfig {
                max_requests: 2,
                window_secs: 60,
            },
            ..EngineConfig::default()
        };
        let v = Validator::new(&config);

        assert!(v.check_rate_limit("alice").is_ok());
        assert!(v.check_rate_limit("alice").is_ok());
        let err = v.check_rate_limit("alice").unwrap_err();
        assert!(matches!(err, EngineError::RateLimited { limit: 2, window_secs: 60, .. }));
        assert_eq!(v.security_events()[0].kind, SecurityEventKind::RateLimitExceeded);

        v.reset_rate_limits();
        assert!(v.check_rate_limit("alice").is_ok());
    }
}
