use crate::patterns::RecurringPattern;
use crate::schema::{Transaction, TransactionType};
use crate::trend::TrendEstimate;
use crate::utils::{distinct_month_count, history_span_days, mean};
use crate::ForecastPeriod;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Below this overall confidence a warning is attached to the result.
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Burn rates under this many months trigger an urgency warning.
const URGENT_BURN_RATE_MONTHS: f64 = 6.0;

/// History shorter than this caps the confidence score proportionally.
const MIN_HISTORY_DAYS: i64 = 30;
const SPARSE_HISTORY_CONFIDENCE_CAP: f64 = 0.3;

/// Growth rates below 1% month-over-month are not worth an insight line.
const TREND_INSIGHT_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub current_balance: f64,
    /// Balance at forecast day 30; absent when the horizon is shorter.
    pub projected_balance_30d: Option<f64>,
    pub projected_balance_90d: Option<f64>,
    /// Computed from the transaction history, not from the forecast.
    pub avg_monthly_income: f64,
    pub avg_monthly_expense: f64,
    /// Months until reserves run out at the current net flow. `None` means
    /// net flow is non-negative and the runway is effectively infinite.
    pub burn_rate_months: Option<f64>,
    pub confidence_score: f64,
}

/// Average income and expense per distinct calendar month of history.
/// Returns `(0.0, 0.0)` for an empty history.
pub(crate) fn monthly_flow_averages(transactions: &[Transaction]) -> (f64, f64) {
    let months = distinct_month_count(transactions.iter().map(|t| t.date)) as f64;
    if months == 0.0 {
        return (0.0, 0.0);
    }

    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    for transaction in transactions {
        match transaction.transaction_type {
            TransactionType::Income => total_income += transaction.amount,
            TransactionType::Expense => total_expense += transaction.amount,
        }
    }

    (total_income / months, total_expense / months)
}

pub fn build_summary(
    current_balance: f64,
    transactions: &[Transaction],
    periods: &[ForecastPeriod],
) -> ForecastSummary {
    let (avg_monthly_income, avg_monthly_expense) = monthly_flow_averages(transactions);

    let net_monthly_flow = avg_monthly_income - avg_monthly_expense;
    let burn_rate_months = if net_monthly_flow < 0.0 {
        // A negative starting balance means the runway is already gone.
        Some((current_balance / net_monthly_flow.abs()).max(0.0))
    } else {
        None
    };

    let confidences: Vec<f64> = periods.iter().map(|p| p.confidence).collect();
    let mut confidence_score = mean(&confidences);

    let dates: Vec<NaiveDate> = transactions.iter().map(|t| t.date).collect();
    let span = history_span_days(&dates);
    if span < MIN_HISTORY_DAYS {
        let cap = SPARSE_HISTORY_CONFIDENCE_CAP * span as f64 / MIN_HISTORY_DAYS as f64;
        confidence_score = confidence_score.min(cap);
    }

    ForecastSummary {
        current_balance,
        projected_balance_30d: periods.get(29).map(|p| p.predicted_balance),
        projected_balance_90d: periods.get(89).map(|p| p.predicted_balance),
        avg_monthly_income,
        avg_monthly_expense,
        burn_rate_months,
        confidence_score,
    }
}

/// Conditional templates over the computed metrics. Formatting logic only;
/// every threshold check is independent of the others.
pub fn build_insights(
    summary: &ForecastSummary,
    patterns: &[RecurringPattern],
    trend: &TrendEstimate,
) -> Vec<String> {
    let mut insights = Vec::new();

    if summary.avg_monthly_income > summary.avg_monthly_expense {
        insights.push(format!(
            "Monthly cash flow is positive: income averages ${:.2} against ${:.2} in expenses.",
            summary.avg_monthly_income, summary.avg_monthly_expense
        ));
    } else if summary.avg_monthly_expense > summary.avg_monthly_income {
        insights.push(format!(
            "Monthly expenses (${:.2}) run ahead of income (${:.2}).",
            summary.avg_monthly_expense, summary.avg_monthly_income
        ));
    }

    match patterns.len() {
        0 => {}
        1 => insights.push(format!(
            "1 recurring pattern ('{}') anchors this forecast.",
            patterns[0].normalized_description
        )),
        n => insights.push(format!(
            "{} recurring patterns anchor this forecast; the strongest is '{}'.",
            n, patterns[0].normalized_description
        )),
    }

    if trend.income_growth_rate.abs() >= TREND_INSIGHT_THRESHOLD {
        let direction = if trend.income_growth_rate > 0.0 { "growing" } else { "shrinking" };
        insights.push(format!(
            "Income has been {} about {:.1}% month-over-month.",
            direction,
            trend.income_growth_rate.abs() * 100.0
        ));
    }
    if trend.expense_growth_rate.abs() >= TREND_INSIGHT_THRESHOLD {
        let direction = if trend.expense_growth_rate > 0.0 { "rising" } else { "falling" };
        insights.push(format!(
            "Expenses have been {} about {:.1}% month-over-month.",
            direction,
            trend.expense_growth_rate.abs() * 100.0
        ));
    }

    if let Some(balance_90d) = summary.projected_balance_90d {
        insights.push(format!(
            "The projected balance moves from ${:.2} to ${:.2} over the next 90 days.",
            summary.current_balance, balance_90d
        ));
    }

    insights
}

pub fn build_warnings(
    summary: &ForecastSummary,
    transactions: &[Transaction],
    periods: &[ForecastPeriod],
) -> Vec<String> {
    let mut warnings = Vec::new();

    let dates: Vec<NaiveDate> = transactions.iter().map(|t| t.date).collect();
    let span = history_span_days(&dates);
    if span < MIN_HISTORY_DAYS {
        warnings.push(format!(
            "Transaction history covers fewer than {} days ({} observed); confidence is capped accordingly.",
            MIN_HISTORY_DAYS, span
        ));
    }

    if summary.confidence_score < LOW_CONFIDENCE_THRESHOLD {
        warnings.push(format!(
            "Overall forecast confidence is low ({:.2}); treat projections as indicative only.",
            summary.confidence_score
        ));
    }

    if let Some(burn) = summary.burn_rate_months {
        if burn < URGENT_BURN_RATE_MONTHS {
            warnings.push(format!(
                "At the current net outflow, reserves cover about {:.1} months.",
                burn
            ));
        }
    }

    if let Some(first_negative) = periods.iter().find(|p| p.predicted_balance < 0.0) {
        warnings.push(format!(
            "Projected balance first goes negative on {}.",
            first_negative.date
        ));
    }

    warnings
}
