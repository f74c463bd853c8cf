//! # Financial Forecast Engine
//!
//! A library for projecting future cash flow from personal transaction history,
//! with scenario analysis and what-if evaluation built on the same estimators.
//!
//! ## Core Concepts
//!
//! - **Recurring Patterns**: Periodic transactions (paychecks, rent) inferred from history with amount, period, and confidence
//! - **Seasonal Patterns**: Average income and expense per calendar month across all observed years
//! - **Trend**: Month-over-month growth rates and volatility of the total flows
//! - **Forecast Periods**: A day-by-day balance projection combining all three estimators
//! - **Scenarios**: Optimistic/realistic/pessimistic forecast variants from uniform input scaling
//! - **What-If**: Comparison of the baseline forecast against a hypothetically modified history
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_forecast_engine::*;
//! use chrono::NaiveDate;
//!
//! let config = ForecastConfig {
//!     transactions: vec![
//!         Transaction {
//!             id: "tx-1".to_string(),
//!             date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
//!             description: "ACME PAYROLL".to_string(),
//!             category: Some("Salary".to_string()),
//!             amount: 3000.0,
//!             transaction_type: TransactionType::Income,
//!         },
//!         Transaction {
//!             id: "tx-2".to_string(),
//!             date: NaiveDate::from_ymd_opt(2024, 5, 5).unwrap(),
//!             description: "CITY RENT".to_string(),
//!             category: Some("Housing".to_string()),
//!             amount: 1800.0,
//!             transaction_type: TransactionType::Expense,
//!         },
//!     ],
//!     current_balance: 2500.0,
//!     horizon_days: 90,
//!     as_of: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
//! };
//!
//! let result = generate_forecast(&config).unwrap();
//! println!("{}", result.to_json().unwrap());
//! ```

pub mod engine;
pub mod error;
pub mod patterns;
pub mod scenario;
pub mod schema;
pub mod seasonality;
pub mod summary;
pub mod trend;
pub mod utils;
pub mod whatif;

pub use engine::{generate_periods, Forecaster};
pub use error::{ForecastError, Result};
pub use patterns::{detect_recurring_patterns, normalize_description, RecurringPattern};
pub use scenario::*;
pub use schema::*;
pub use seasonality::{build_seasonal_patterns, SeasonalPattern};
pub use summary::{build_insights, build_summary, build_warnings, ForecastSummary};
pub use trend::{estimate_trend, monthly_totals, MonthlyTotals, TrendEstimate};
pub use utils::*;
pub use whatif::{
    OneTimeInjection, RecurringInjection, WhatIfComparison, WhatIfScenario, WHAT_IF_HORIZON_DAYS,
};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One forecast day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPeriod {
    pub date: NaiveDate,
    pub predicted_income: f64,
    pub predicted_expense: f64,
    /// Running balance after this day's predicted flows.
    pub predicted_balance: f64,
    /// How much signal backed this day's prediction, in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub periods: Vec<ForecastPeriod>,
    pub summary: ForecastSummary,
    /// Human-readable observations about the history and the projection.
    pub insights: Vec<String>,
    /// Caveats the caller should surface alongside the numbers.
    pub warnings: Vec<String>,
}

impl ForecastResult {
    /// Serializes the full result for a presentation layer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct ForecastEngine;

impl ForecastEngine {
    pub fn forecast(config: &ForecastConfig) -> Result<ForecastResult> {
        validate_config(config)?;

        info!(
            "Generating {}-day forecast from {} transactions",
            config.horizon_days,
            config.transactions.len()
        );

        let patterns = detect_recurring_patterns(&config.transactions);
        let seasonal = build_seasonal_patterns(&config.transactions);
        let trend = estimate_trend(&config.transactions);
        debug!(
            "Estimators ready: {} recurring patterns, trend confidence {:.2}",
            patterns.len(),
            trend.confidence
        );

        let periods = Forecaster::new(patterns.clone(), seasonal, trend.clone()).project(
            config.as_of,
            config.current_balance,
            config.horizon_days,
        );

        let summary = build_summary(config.current_balance, &config.transactions, &periods);
        let insights = build_insights(&summary, &patterns, &trend);
        let warnings = build_warnings(&summary, &config.transactions, &periods);

        Ok(ForecastResult {
            periods,
            summary,
            insights,
            warnings,
        })
    }

    pub fn scenarios(config: &ForecastConfig) -> Result<ScenarioAnalysis> {
        validate_config(config)?;
        ScenarioModeler::new(config).analyze()
    }

    pub fn what_if(
        config: &ForecastConfig,
        scenario: &WhatIfScenario,
    ) -> Result<WhatIfComparison> {
        validate_config(config)?;
        validate_scenario(scenario)?;
        whatif::evaluate(config, scenario)
    }
}

pub fn generate_forecast(config: &ForecastConfig) -> Result<ForecastResult> {
    ForecastEngine::forecast(config)
}

pub fn analyze_scenarios(config: &ForecastConfig) -> Result<ScenarioAnalysis> {
    ForecastEngine::scenarios(config)
}

pub fn evaluate_what_if(
    config: &ForecastConfig,
    scenario: &WhatIfScenario,
) -> Result<WhatIfComparison> {
    ForecastEngine::what_if(config, scenario)
}

fn validate_config(config: &ForecastConfig) -> Result<()> {
    if config.horizon_days < 1 {
        return Err(ForecastError::InvalidHorizon(config.horizon_days));
    }

    if !config.current_balance.is_finite() {
        return Err(ForecastError::InvalidBalance(config.current_balance));
    }

    for transaction in &config.transactions {
        if !transaction.amount.is_finite() || transaction.amount < 0.0 {
            return Err(ForecastError::InvalidAmount {
                id: transaction.id.clone(),
                amount: transaction.amount,
            });
        }
    }

    Ok(())
}

fn validate_scenario(scenario: &WhatIfScenario) -> Result<()> {
    // Deltas may be negative (a pay cut, a cancelled bill) but never NaN/inf.
    if !scenario.monthly_income_delta.is_finite() {
        return Err(ForecastError::InvalidAmount {
            id: "monthly income delta".to_string(),
            amount: scenario.monthly_income_delta,
        });
    }

    if !scenario.monthly_expense_delta.is_finite() {
        return Err(ForecastError::InvalidAmount {
            id: "monthly expense delta".to_string(),
            amount: scenario.monthly_expense_delta,
        });
    }

    for injection in &scenario.one_time {
        if !injection.amount.is_finite() || injection.amount < 0.0 {
            return Err(ForecastError::InvalidAmount {
                id: format!("one-time '{}'", injection.description),
                amount: injection.amount,
            });
        }
    }

    for injection in &scenario.recurring {
        if !injection.amount.is_finite() || injection.amount < 0.0 {
            return Err(ForecastError::InvalidAmount {
                id: format!("recurring '{}'", injection.description),
                amount: injection.amount,
            });
        }
    }

    Ok(())
}
