//! Multi-debt payoff planning
//!
//! Debts are ordered by the chosen strategy, then simulated month by month:
//! 1. Every unpaid debt accrues `rate / 12` interest on its balance
//! 2. Every unpaid debt receives its minimum payment (capped at its balance)
//! 3. The extra pool goes to the first unpaid debt in order; whatever that
//!    debt does not need flows to the next one in the same month
//!
//! The extra pool is `extra_payment` plus the minimum payments of every debt
//! already paid off, which is what produces the snowball effect.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Balances below this are treated as paid off
const BALANCE_EPSILON: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: String,
    pub name: String,
    pub balance: f64,
    /// Annual rate, e.g. 0.18
    pub interest_rate: f64,
    pub minimum_payment: f64,
}

impl Debt {
    pub fn new(id: &str, name: &str, balance: f64, interest_rate: f64, minimum_payment: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            balance,
            interest_rate,
            minimum_payment,
        }
    }

    pub fn monthly_interest(&self) -> f64 {
        self.balance * self.interest_rate / 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayoffStrategy {
    /// Smallest balance first
    Snowball,
    /// Highest interest rate first
    Avalanche,
    /// Caller-supplied order
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoffParams {
    pub debts: Vec<Debt>,
    #[serde(default)]
    pub extra_payment: f64,
    pub strategy: PayoffStrategy,
    #[serde(default)]
    pub custom_order: Option<Vec<String>>,
}

/// One debt's position in the payoff order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoffEntry {
    pub debt_id: String,
    pub name: String,
    pub payoff_month: u32,
    pub interest_paid: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoffScheduleEntry {
    pub month: u32,
    pub debt_id: String,
    pub payment: f64,
    pub interest: f64,
    /// Portion of `payment` above the debt's own minimum
    pub extra_applied: f64,
    pub remaining_balance: f64,
    pub is_paid_off: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtPayoffResult {
    pub strategy: PayoffStrategy,
    pub debt_order: Vec<DebtPayoffEntry>,
    /// Month in which the last debt is paid off
    pub total_time: u32,
    pub total_interest: f64,
    pub total_paid: f64,
    pub total_extra_applied: f64,
    pub payoff_schedule: Vec<PayoffScheduleEntry>,
}

impl DebtPayoffResult {
    /// Schedule rows for one debt, in month order
    pub fn schedule_for<'a>(&'a self, debt_id: &'a str) -> impl Iterator<Item = &'a PayoffScheduleEntry> + 'a {
        self.payoff_schedule.iter().filter(move |e| e.debt_id == debt_id)
    }
}

/// Snowball and avalanche run on the same debts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub snowball: DebtPayoffResult,
    pub avalanche: DebtPayoffResult,
    /// Positive when avalanche pays less interest
    pub interest_saved_by_avalanche: f64,
    /// Positive when avalanche finishes sooner
    pub months_saved_by_avalanche: i64,
}

/// Order debts according to the strategy. Ties keep input order.
///
/// `custom_order` must already be validated as a permutation of the debt ids.
pub fn order_debts<'a>(debts: &'a [Debt], strategy: PayoffStrategy, custom_order: Option<&[String]>) -> Vec<&'a Debt> {
    let mut ordered: Vec<&Debt> = debts.iter().collect();
    match strategy {
        PayoffStrategy::Snowball => ordered.sort_by(|a, b| a.balance.total_cmp(&b.balance)),
        PayoffStrategy::Avalanche => ordered.sort_by(|a, b| b.interest_rate.total_cmp(&a.interest_rate)),
        PayoffStrategy::Custom => {
            if let Some(order) = custom_order {
                let position: HashMap<&str, usize> =
                    order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
                ordered.sort_by_key(|d| position.get(d.id.as_str()).copied().unwrap_or(usize::MAX));
            }
        }
    }
    ordered
}

struct DebtState<'a> {
    debt: &'a Debt,
    balance: f64,
    interest_paid: f64,
    payoff_month: Option<u32>,
}

/// Simulate the payoff plan.
///
/// Fails with [`EngineError::NonConvergence`] when the payments can never
/// clear the debts or the plan runs past `max_months`.
pub fn calculate_debt_payoff(params: &DebtPayoffParams, max_months: u32) -> Result<DebtPayoffResult, EngineError> {
    let ordered = order_debts(&params.debts, params.strategy, params.custom_order.as_deref());
    check_payment_capacity(&ordered, params.extra_payment)?;

    let mut states: Vec<DebtState> = ordered
        .into_iter()
        .map(|debt| DebtState {
            debt,
            balance: debt.balance,
            interest_paid: 0.0,
            payoff_month: None,
        })
        .collect();

    let mut schedule = Vec::new();
    for state in states.iter_mut().filter(|s| s.balance < BALANCE_EPSILON) {
        state.balance = 0.0;
        state.payoff_month = Some(0);
        schedule.push(PayoffScheduleEntry {
            month: 0,
            debt_id: state.debt.id.clone(),
            payment: 0.0,
            interest: 0.0,
            extra_applied: 0.0,
            remaining_balance: 0.0,
            is_paid_off: true,
        });
    }

    let mut total_interest = 0.0;
    let mut total_paid = 0.0;
    let mut total_extra_applied = 0.0;
    let mut month = 0;

    while states.iter().any(|s| s.payoff_month.is_none()) {
        month += 1;
        if month > max_months {
            let stuck = states.iter().find(|s| s.payoff_month.is_none()).map(|s| s.debt);
            return Err(EngineError::NonConvergence {
                debt_id: stuck.map(|d| d.id.clone()).unwrap_or_default(),
                reason: format!("not paid off within {} months", max_months),
            });
        }

        let freed_minimums: f64 = states
            .iter()
            .filter(|s| s.payoff_month.is_some())
            .map(|s| s.debt.minimum_payment)
            .sum();
        let mut pool = params.extra_payment + freed_minimums;

        // Interest, then minimums. Unused minimum joins this month's pool.
        let mut payments = vec![(0.0_f64, 0.0_f64, 0.0_f64); states.len()];
        for (state, row) in states.iter_mut().zip(payments.iter_mut()) {
            if state.payoff_month.is_some() {
                continue;
            }
            let interest = state.balance * state.debt.interest_rate / 12.0;
            state.balance += interest;
            state.interest_paid += interest;
            total_interest += interest;

            let minimum = state.debt.minimum_payment.min(state.balance);
            state.balance -= minimum;
            pool += state.debt.minimum_payment - minimum;
            *row = (interest, minimum, 0.0);
        }

        // Extra pool in strategy order
        for (state, row) in states.iter_mut().zip(payments.iter_mut()) {
            if pool <= 0.0 {
                break;
            }
            if state.payoff_month.is_some() {
                continue;
            }
            let extra = pool.min(state.balance);
            state.balance -= extra;
            pool -= extra;
            row.2 = extra;
        }

        for (state, &(interest, minimum, extra)) in states.iter_mut().zip(payments.iter()) {
            if state.payoff_month.is_some() {
                continue;
            }
            let paid_off = state.balance < BALANCE_EPSILON;
            if paid_off {
                state.balance = 0.0;
                state.payoff_month = Some(month);
            }
            total_paid += minimum + extra;
            total_extra_applied += extra;
            schedule.push(PayoffScheduleEntry {
                month,
                debt_id: state.debt.id.clone(),
                payment: minimum + extra,
                interest,
                extra_applied: extra,
                remaining_balance: state.balance,
                is_paid_off: paid_off,
            });
        }
    }

    let debt_order: Vec<DebtPayoffEntry> = states
        .iter()
        .map(|s| DebtPayoffEntry {
            debt_id: s.debt.id.clone(),
            name: s.debt.name.clone(),
            payoff_month: s.payoff_month.unwrap_or(month),
            interest_paid: s.interest_paid,
        })
        .collect();

    Ok(DebtPayoffResult {
        strategy: params.strategy,
        total_time: debt_order.iter().map(|e| e.payoff_month).max().unwrap_or(0),
        debt_order,
        total_interest,
        total_paid,
        total_extra_applied,
        payoff_schedule: schedule,
    })
}

/// Run snowball and avalanche on the same debts and extra payment
pub fn compare_strategies(params: &DebtPayoffParams, max_months: u32) -> Result<StrategyComparison, EngineError> {
    let with_strategy = |strategy| DebtPayoffParams {
        debts: params.debts.clone(),
        extra_payment: params.extra_payment,
        strategy,
        custom_order: None,
    };
    let snowball = calculate_debt_payoff(&with_strategy(PayoffStrategy::Snowball), max_months)?;
    let avalanche = calculate_debt_payoff(&with_strategy(PayoffStrategy::Avalanche), max_months)?;

    Ok(StrategyComparison {
        interest_saved_by_avalanche: snowball.total_interest - avalanche.total_interest,
        months_saved_by_avalanche: snowball.total_time as i64 - avalanche.total_time as i64,
        snowball,
        avalanche,
    })
}

/// Reject plans whose total payments never outpace the interest accrued
fn check_payment_capacity(ordered: &[&Debt], extra_payment: f64) -> Result<(), EngineError> {
    let outstanding: Vec<&&Debt> = ordered.iter().filter(|d| d.balance >= BALANCE_EPSILON).collect();
    if outstanding.is_empty() {
        return Ok(());
    }

    let capacity: f64 = outstanding.iter().map(|d| d.minimum_payment).sum::<f64>() + extra_payment;
    let accrual: f64 = outstanding.iter().map(|d| d.monthly_interest()).sum();
    if capacity > accrual {
        return Ok(());
    }

    let worst = outstanding
        .iter()
        .max_by(|a, b| {
            (a.monthly_interest() - a.minimum_payment).total_cmp(&(b.monthly_interest() - b.minimum_payment))
        })
        .map(|d| d.id.clone())
        .unwrap_or_default();

    log::debug!(
        "Debt plan rejected: monthly payments {:.2} do not cover interest accrual {:.2}",
        capacity,
        accrual
    );
    Err(EngineError::NonConvergence {
        debt_id: worst,
        reason: format!(
            "monthly payments of {:.2} do not cover monthly interest of {:.2}",
            capacity, accrual
        ),
    })
}
