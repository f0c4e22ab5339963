//! Discrete compound interest with recurring contributions
//!
//! Principal grows by `(1 + r/n)^(n*t)`. Contributions are valued as an
//! annuity over the contribution periods, using the contribution-period rate
//! equivalent to the compounding rate: `(1 + r/n)^(n/m) - 1`.

use serde::{Deserialize, Serialize};

/// When a contribution is made within its period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionTiming {
    /// Start of period: the contribution earns interest for that period
    Begin,
    /// End of period: the contribution earns nothing in its own period
    #[default]
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundInterestParams {
    pub principal: f64,
    pub annual_rate: f64,
    /// Compounding periods per year
    pub compounding_frequency: u32,
    pub time_in_years: f64,
    #[serde(default)]
    pub additional_contributions: Option<f64>,
    /// Contributions per year, defaults to monthly
    #[serde(default)]
    pub contribution_frequency: Option<u32>,
    #[serde(default)]
    pub contribution_timing: Option<ContributionTiming>,
}

impl CompoundInterestParams {
    /// Lump sum with no recurring contributions
    pub fn lump_sum(principal: f64, annual_rate: f64, compounding_frequency: u32, time_in_years: f64) -> Self {
        Self {
            principal,
            annual_rate,
            compounding_frequency,
            time_in_years,
            additional_contributions: None,
            contribution_frequency: None,
            contribution_timing: None,
        }
    }

    pub fn with_contributions(mut self, amount: f64, frequency: u32, timing: ContributionTiming) -> Self {
        self.additional_contributions = Some(amount);
        self.contribution_frequency = Some(frequency);
        self.contribution_timing = Some(timing);
        self
    }

    pub fn contribution_amount(&self) -> f64 {
        self.additional_contributions.unwrap_or(0.0)
    }

    pub fn contribution_periods_per_year(&self) -> u32 {
        self.contribution_frequency.unwrap_or(DEFAULT_CONTRIBUTION_FREQUENCY)
    }

    pub fn timing(&self) -> ContributionTiming {
        self.contribution_timing.unwrap_or_default()
    }

    /// The same calculation with every default spelled out.
    ///
    /// Contribution settings are dropped entirely when nothing is contributed,
    /// and negative zeros are folded into zero, so that inputs which produce
    /// the same result also compare equal.
    pub fn canonical(&self) -> Self {
        let amount = self.contribution_amount();
        let (additional_contributions, contribution_frequency, contribution_timing) = if amount == 0.0 {
            (None, None, None)
        } else {
            (
                Some(amount),
                Some(self.contribution_periods_per_year()),
                Some(self.timing()),
            )
        };
        Self {
            principal: self.principal + 0.0,
            annual_rate: self.annual_rate + 0.0,
            compounding_frequency: self.compounding_frequency,
            time_in_years: self.time_in_years + 0.0,
            additional_contributions,
            contribution_frequency,
            contribution_timing,
        }
    }
}

pub const DEFAULT_CONTRIBUTION_FREQUENCY: u32 = 12;

/// Balance at the end of one projection year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyBalance {
    pub year: u32,
    pub balance: f64,
    pub total_contributions: f64,
    pub total_interest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedCompoundInterestResult {
    pub future_value: f64,
    pub total_contributions: f64,
    pub total_interest_earned: f64,
    pub effective_annual_rate: f64,
    pub yearly_breakdown: Vec<YearlyBalance>,
}

/// Point-in-time split of a balance into its growth sources
#[derive(Debug, Clone, Copy)]
struct Valuation {
    principal_growth: f64,
    contributions_growth: f64,
    contributions_paid: f64,
}

impl Valuation {
    fn balance(&self) -> f64 {
        self.principal_growth + self.contributions_growth
    }
}

/// Compute the future value and its breakdown. Pure and deterministic.
pub fn calculate_compound_interest(params: &CompoundInterestParams) -> DetailedCompoundInterestResult {
    let final_valuation = value_at(params, params.time_in_years);

    let total_years = params.time_in_years.ceil() as u32;
    let yearly_breakdown = (1..=total_years)
        .map(|year| {
            let t = (year as f64).min(params.time_in_years);
            let v = value_at(params, t);
            YearlyBalance {
                year,
                balance: v.balance(),
                total_contributions: v.contributions_paid,
                total_interest: v.balance() - params.principal - v.contributions_paid,
            }
        })
        .collect();

    let future_value = final_valuation.balance();
    DetailedCompoundInterestResult {
        future_value,
        total_contributions: final_valuation.contributions_paid,
        total_interest_earned: future_value - params.principal - final_valuation.contributions_paid,
        effective_annual_rate: effective_annual_rate(params.annual_rate, params.compounding_frequency),
        yearly_breakdown,
    }
}

/// `(1 + r/n)^n - 1`
pub fn effective_annual_rate(annual_rate: f64, compounding_frequency: u32) -> f64 {
    let n = compounding_frequency as f64;
    (1.0 + annual_rate / n).powf(n) - 1.0
}

/// Absorbs representation error such as `365.0 * 1.4 == 510.99999999999994`
const PERIOD_COUNT_TOLERANCE: f64 = 1e-9;

/// Completed periods in `periods`, treating values a hair below an integer as that integer
fn whole_periods(periods: f64) -> f64 {
    (periods + PERIOD_COUNT_TOLERANCE).floor()
}

fn value_at(params: &CompoundInterestParams, years: f64) -> Valuation {
    let contribution = params.contribution_amount();
    let contributions_per_year = params.contribution_periods_per_year() as f64;
    let contribution_count = whole_periods(contributions_per_year * years);
    let contributions_paid = contribution * contribution_count;

    // No compounding term at all: balances add linearly
    if params.annual_rate == 0.0 {
        return Valuation {
            principal_growth: params.principal,
            contributions_growth: contributions_paid,
            contributions_paid,
        };
    }

    let n = params.compounding_frequency as f64;
    let period_rate = params.annual_rate / n;
    let growth = 1.0 + period_rate;

    let principal_growth = params.principal * growth.powf(n * years);

    let contributions_growth = if contribution > 0.0 && contribution_count > 0.0 {
        let contribution_rate = growth.powf(n / contributions_per_year) - 1.0;
        let mut annuity = if contribution_rate == 0.0 {
            contribution_count
        } else {
            ((1.0 + contribution_rate).powf(contribution_count) - 1.0) / contribution_rate
        };
        if params.timing() == ContributionTiming::Begin {
            annuity *= 1.0 + contribution_rate;
        }

        // Time left after the last whole contribution period only compounds
        let elapsed = contribution_count / contributions_per_year;
        let remainder = (years - elapsed).max(0.0);
        contribution * annuity * growth.powf(n * remainder)
    } else {
        0.0
    };

    Valuation {
        principal_growth,
        contributions_growth,
        contributions_paid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_annual_compounding_reference_value() {
        let result = calculate_compound_interest(&CompoundInterestParams::lump_sum(10_000.0, 0.07, 1, 10.0));

        assert_relative_eq!(result.future_value, 19_671.51, epsilon = 0.01);
        assert_relative_eq!(result.total_interest_earned, 9_671.51, epsilon = 0.01);
        assert_eq!(result.total_contributions, 0.0);
        assert_relative_eq!(result.effective_annual_rate, 0.07, epsilon = 1e-12);
        assert_eq!(result.yearly_breakdown.len(), 10);
        assert_relative_eq!(result.yearly_breakdown[9].balance, result.future_value);
    }

    #[test]
    fn test_monthly_effective_rate() {
        let ear = effective_annual_rate(0.12, 12);
        assert_relative_eq!(ear, 1.01_f64.powi(12) - 1.0, epsilon = 1e-12);
        assert!(ear > 0.12);
    }

    #[test]
    fn test_zero_rate_is_linear() {
        let params = CompoundInterestParams::lump_sum(5_000.0, 0.0, 12, 3.0)
            .with_contributions(100.0, 12, ContributionTiming::End);
        let result = calculate_compound_interest(&params);

        assert_eq!(result.total_contributions, 3_600.0);
        assert_eq!(result.future_value, 8_600.0);
        assert_eq!(result.total_interest_earned, 0.0);
        assert_eq!(result.effective_annual_rate, 0.0);
    }

    #[test]
    fn test_begin_timing_earns_one_extra_period() {
        let end = calculate_compound_interest(
            &CompoundInterestParams::lump_sum(0.0, 0.06, 12, 10.0)
                .with_contributions(200.0, 12, ContributionTiming::End),
        );
        let begin = calculate_compound_interest(
            &CompoundInterestParams::lump_sum(0.0, 0.06, 12, 10.0)
                .with_contributions(200.0, 12, ContributionTiming::Begin),
        );

        // FV of an ordinary annuity: 200 * ((1.005^120 - 1) / 0.005)
        assert_relative_eq!(end.future_value, 32_775.87, epsilon = 0.01);
        assert_relative_eq!(begin.future_value, end.future_value * 1.005, epsilon = 1e-6);
        assert_eq!(begin.total_contributions, end.total_contributions);
    }

    #[test]
    fn test_contributions_less_frequent_than_compounding() {
        // Annual contributions with monthly compounding use the equivalent annual rate
        let params = CompoundInterestParams::lump_sum(0.0, 0.12, 12, 2.0)
            .with_contributions(1_000.0, 1, ContributionTiming::End);
        let result = calculate_compound_interest(&params);

        let annual = 1.01_f64.powi(12);
        assert_relative_eq!(result.future_value, 1_000.0 * annual + 1_000.0, epsilon = 1e-6);
        assert_eq!(result.total_contributions, 2_000.0);
    }

    #[test]
    fn test_fractional_years() {
        let result = calculate_compound_interest(&CompoundInterestParams::lump_sum(1_000.0, 0.05, 1, 2.5));
        assert_relative_eq!(result.future_value, 1_000.0 * 1.05_f64.powf(2.5), epsilon = 1e-9);
        assert_eq!(result.yearly_breakdown.len(), 3);
        assert_eq!(result.yearly_breakdown[2].year, 3);
        assert_relative_eq!(result.yearly_breakdown[2].balance, result.future_value);
    }

    #[test]
    fn test_daily_contribution_count_survives_float_error() {
        // 365.0 * 1.4 evaluates to 510.99999999999994
        let params = CompoundInterestParams::lump_sum(0.0, 0.0, 365, 1.4)
            .with_contributions(1.0, 365, ContributionTiming::End);
        let result = calculate_compound_interest(&params);

        assert_eq!(result.total_contributions, 511.0);
        assert_eq!(result.future_value, 511.0);

        for years in [2.8, 4.6, 5.6, 8.2, 9.2] {
            let params = CompoundInterestParams::lump_sum(0.0, 0.0, 365, years)
                .with_contributions(1.0, 365, ContributionTiming::End);
            let expected = (365.0 * years).round();
            assert_eq!(calculate_compound_interest(&params).total_contributions, expected);
        }
    }

    #[test]
    fn test_canonical_resolves_defaults() {
        let bare = CompoundInterestParams::lump_sum(10_000.0, 0.07, 1, 10.0);
        let zero_contribution = bare.clone().with_contributions(0.0, 52, ContributionTiming::Begin);
        assert_eq!(bare.canonical(), zero_contribution.canonical());

        let mut implicit = bare.clone();
        implicit.additional_contributions = Some(100.0);
        let explicit = bare.clone().with_contributions(100.0, 12, ContributionTiming::End);
        assert_eq!(implicit.canonical(), explicit.canonical());

        let negative_zero = CompoundInterestParams::lump_sum(-0.0, 0.07, 1, 10.0);
        let positive_zero = CompoundInterestParams::lump_sum(0.0, 0.07, 1, 10.0);
        assert!(negative_zero.canonical().principal.is_sign_positive());
        assert_eq!(
            serde_json::to_string(&negative_zero.canonical()).unwrap(),
            serde_json::to_string(&positive_zero.canonical()).unwrap()
        );
    }

    #[test]
    fn test_zero_years() {
        let result = calculate_compound_interest(&CompoundInterestParams::lump_sum(1_000.0, 0.05, 4, 0.0));
        assert_eq!(result.future_value, 1_000.0);
        assert!(result.yearly_breakdown.is_empty());
    }

    #[test]
    fn test_negative_rate_shrinks_principal() {
        let result = calculate_compound_interest(&CompoundInterestParams::lump_sum(1_000.0, -0.1, 1, 2.0));
        assert_relative_eq!(result.future_value, 810.0, epsilon = 1e-9);
        assert!(result.total_interest_earned < 0.0);
    }

    proptest! {
        #[test]
        fn prop_zero_rate_future_value_is_principal_plus_contributions(
            principal in 0.0..1e9_f64,
            contribution in 0.0..1e6_f64,
            frequency in 1u32..=365,
            years in 0.0..100.0_f64,
        ) {
            let params = CompoundInterestParams::lump_sum(principal, 0.0, frequency, years)
                .with_contributions(contribution, frequency, ContributionTiming::End);
            let result = calculate_compound_interest(&params);
            prop_assert_eq!(result.future_value, principal + result.total_contributions);
        }

        #[test]
        fn prop_zero_principal_strictly_increasing(
            rate in 0.001..2.0_f64,
            contribution in 1.0..1e5_f64,
            years in 1u32..60,
        ) {
            let params = CompoundInterestParams::lump_sum(0.0, rate, 12, years as f64)
                .with_contributions(contribution, 12, ContributionTiming::End);
            let result = calculate_compound_interest(&params);

            prop_assert!(result.future_value.is_finite());
            for pair in result.yearly_breakdown.windows(2) {
                prop_assert!(pair[1].balance > pair[0].balance);
            }
        }

        #[test]
        fn prop_deterministic(
            principal in 0.0..1e9_f64,
            rate in -0.5..2.0_f64,
            frequency in 1u32..=365,
            years in 0.0..100.0_f64,
        ) {
            let params = CompoundInterestParams::lump_sum(principal, rate, frequency, years);
            let a = calculate_compound_interest(&params);
            let b = calculate_compound_interest(&params);
            prop_assert_eq!(a.future_value.to_bits(), b.future_value.to_bits());
            prop_assert!(a.future_value.is_finite());
        }
    }
}
