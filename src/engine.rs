use crate::patterns::{detect_recurring_patterns, RecurringPattern};
use crate::schema::{Transaction, TransactionType};
use crate::seasonality::{build_seasonal_patterns, SeasonalPattern};
use crate::trend::{estimate_trend, TrendEstimate};
use crate::utils::mean;
use crate::ForecastPeriod;
use chrono::{Datelike, Duration, NaiveDate};
use log::debug;

/// Occurrence probabilities at or below this threshold are dropped, not
/// accumulated, so weak patterns do not inflate the projection with noise.
pub const OCCURRENCE_PROBABILITY_FLOOR: f64 = 0.1;

/// Seasonal patterns at or below this confidence are ignored: a thin month
/// bucket is "no signal", not "predicted zero".
pub const SEASONAL_CONFIDENCE_GATE: f64 = 0.3;

/// Trend adjustments apply only above this confidence.
pub const TREND_CONFIDENCE_GATE: f64 = 0.4;

/// Reported confidence for days where no estimator contributed. Not 0:
/// silence means uncertainty, not certainty of inactivity.
pub const NO_SIGNAL_CONFIDENCE: f64 = 0.3;

/// Nominal days per month when pro-rating monthly averages.
const DAYS_PER_MONTH: f64 = 30.0;

pub struct Forecaster {
    patterns: Vec<RecurringPattern>,
    seasonal: Vec<SeasonalPattern>,
    trend: TrendEstimate,
}

impl Forecaster {
    pub fn new(
        patterns: Vec<RecurringPattern>,
        seasonal: Vec<SeasonalPattern>,
        trend: TrendEstimate,
    ) -> Self {
        Self {
            patterns,
            seasonal,
            trend,
        }
    }

    /// Projects one period per day for `1..=horizon_days` after `as_of`.
    /// The balance is a running sum seeded by `starting_balance` and is
    /// never floored at zero; negative projections are meaningful output.
    pub fn project(
        &self,
        as_of: NaiveDate,
        starting_balance: f64,
        horizon_days: u32,
    ) -> Vec<ForecastPeriod> {
        let recurring_income_mass = self.expected_monthly_mass(&TransactionType::Income);
        let recurring_expense_mass = self.expected_monthly_mass(&TransactionType::Expense);

        let mut periods = Vec::with_capacity(horizon_days as usize);
        let mut balance = starting_balance;

        for day in 1..=i64::from(horizon_days) {
            let date = as_of + Duration::days(day);
            let mut income = 0.0;
            let mut expense = 0.0;
            let mut signal_confidences: Vec<f64> = Vec::new();

            // 1. Recurring layer: each pattern fires on its expected-occurrence
            //    grid (anchored at next_occurrence, repeating every cycle).
            //    Euclidean remainder keeps a stale anchor on the same grid.
            for pattern in &self.patterns {
                let period_days = pattern.frequency.period_days();
                let offset = (date - pattern.next_occurrence)
                    .num_days()
                    .rem_euclid(period_days);
                let probability = if offset == 0 { pattern.confidence } else { 0.0 };
                if probability <= OCCURRENCE_PROBABILITY_FLOOR {
                    continue;
                }

                let contribution = pattern.average_amount * probability;
                match pattern.transaction_type {
                    TransactionType::Income => income += contribution,
                    TransactionType::Expense => expense += contribution,
                }
                signal_confidences.push(pattern.confidence);
            }

            // 2. Seasonal layer: pro-rated daily share of the calendar month's
            //    residual average. The recurring layer's expected monthly mass
            //    is subtracted first so the same flow is not projected twice.
            if let Some(seasonal) = self.seasonal.get(date.month0() as usize) {
                if seasonal.confidence > SEASONAL_CONFIDENCE_GATE {
                    let residual_income =
                        (seasonal.average_income - recurring_income_mass).max(0.0);
                    let residual_expense =
                        (seasonal.average_expense - recurring_expense_mass).max(0.0);
                    income += residual_income / DAYS_PER_MONTH * seasonal.confidence;
                    expense += residual_expense / DAYS_PER_MONTH * seasonal.confidence;
                    signal_confidences.push(seasonal.confidence);
                }
            }

            // 3. Trend adjustment: linear annualized, not compounding.
            if self.trend.confidence > TREND_CONFIDENCE_GATE {
                let annual_fraction = day as f64 / 365.0;
                let income_factor =
                    (1.0 + self.trend.income_growth_rate * annual_fraction).max(0.0);
                let expense_factor =
                    (1.0 + self.trend.expense_growth_rate * annual_fraction).max(0.0);
                income *= income_factor;
                expense *= expense_factor;
                signal_confidences.push(self.trend.confidence);
            }

            // 4. Day confidence: mean of the signals that contributed.
            let confidence = if signal_confidences.is_empty() {
                NO_SIGNAL_CONFIDENCE
            } else {
                mean(&signal_confidences)
            };

            // 5. Running balance.
            balance += income - expense;

            periods.push(ForecastPeriod {
                date,
                predicted_income: income,
                predicted_expense: expense,
                predicted_balance: balance,
                confidence,
            });
        }

        periods
    }

    /// Expected value the recurring layer contributes per nominal month for
    /// one transaction type. This is what seasonal averages already contain.
    fn expected_monthly_mass(&self, transaction_type: &TransactionType) -> f64 {
        self.patterns
            .iter()
            .filter(|p| p.transaction_type == *transaction_type)
            .map(|p| {
                p.average_amount * (DAYS_PER_MONTH / p.frequency.period_days() as f64)
                    * p.confidence
            })
            .sum()
    }
}

/// Runs the three estimators over the history and projects forward. This is
/// the raw computational pipeline; the crate facade validates inputs first.
pub fn generate_periods(
    transactions: &[Transaction],
    as_of: NaiveDate,
    starting_balance: f64,
    horizon_days: u32,
) -> Vec<ForecastPeriod> {
    let patterns = detect_recurring_patterns(transactions);
    let seasonal = build_seasonal_patterns(transactions);
    let trend = estimate_trend(transactions);

    debug!(
        "Projecting {} days from {} with {} patterns",
        horizon_days,
        as_of,
        patterns.len()
    );

    Forecaster::new(patterns, seasonal, trend).project(as_of, starting_balance, horizon_days)
}
