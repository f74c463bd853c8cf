use crate::schema::{Transaction, TransactionType};
use crate::utils::{mean, month_key, std_dev};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly aggregates needed before trend confidence saturates.
const FULL_CONFIDENCE_MONTH_COUNT: f64 = 12.0;

/// Reported volatility when the history is too thin to measure dispersion.
/// An explicit "unknown" midpoint, not a measurement.
const UNKNOWN_VOLATILITY: f64 = 0.5;

#[derive(Debug, Clone, Default)]
pub struct MonthlyTotals {
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendEstimate {
    /// Mean month-over-month relative change in income totals.
    pub income_growth_rate: f64,
    pub expense_growth_rate: f64,
    /// Coefficient of variation of combined monthly flow, capped at 1.
    pub volatility: f64,
    pub confidence: f64,
}

/// Groups history into calendar-month totals, ordered by (year, month).
pub fn monthly_totals(transactions: &[Transaction]) -> BTreeMap<(i32, u32), MonthlyTotals> {
    let mut totals: BTreeMap<(i32, u32), MonthlyTotals> = BTreeMap::new();
    for transaction in transactions {
        let entry = totals.entry(month_key(transaction.date)).or_default();
        match transaction.transaction_type {
            TransactionType::Income => entry.income += transaction.amount,
            TransactionType::Expense => entry.expense += transaction.amount,
        }
    }
    totals
}

pub fn estimate_trend(transactions: &[Transaction]) -> TrendEstimate {
    let totals = monthly_totals(transactions);
    let months = totals.len();

    let income_series: Vec<f64> = totals.values().map(|t| t.income).collect();
    let expense_series: Vec<f64> = totals.values().map(|t| t.expense).collect();
    let combined: Vec<f64> = totals.values().map(|t| t.income + t.expense).collect();

    let volatility = if months < 2 {
        UNKNOWN_VOLATILITY
    } else {
        let combined_mean = mean(&combined);
        if combined_mean == 0.0 {
            UNKNOWN_VOLATILITY
        } else {
            (std_dev(&combined) / combined_mean).min(1.0)
        }
    };

    let confidence = (months as f64 / FULL_CONFIDENCE_MONTH_COUNT).min(1.0) * (1.0 - volatility);

    let estimate = TrendEstimate {
        income_growth_rate: growth_rate(&income_series),
        expense_growth_rate: growth_rate(&expense_series),
        volatility,
        confidence,
    };

    debug!(
        "Trend over {} monthly aggregates: income {:+.4}, expense {:+.4}, volatility {:.4}",
        months, estimate.income_growth_rate, estimate.expense_growth_rate, estimate.volatility
    );

    estimate
}

/// Mean of month-over-month relative deltas. Pairs whose previous total is 0
/// are skipped rather than treated as infinite growth.
fn growth_rate(series: &[f64]) -> f64 {
    let deltas: Vec<f64> = series
        .windows(2)
        .filter(|pair| pair[0] != 0.0)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect();
    mean(&deltas)
}
