use crate::engine::generate_periods;
use crate::error::{ForecastError, Result};
use crate::schema::{ForecastConfig, Frequency, Transaction, TransactionType};
use crate::summary::monthly_flow_averages;
use crate::utils::distinct_months;
use crate::ForecastPeriod;
use chrono::{Duration, NaiveDate};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Both runs of a what-if comparison project exactly one year.
pub const WHAT_IF_HORIZON_DAYS: u32 = 365;

/// A hypothetical change to evaluate against the baseline forecast.
///
/// All fields except `name` default to "no change", so a scenario can adjust
/// as little as a single monthly delta.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WhatIfScenario {
    #[schemars(description = "Human-readable name for the scenario, echoed back in the comparison")]
    pub name: String,
    #[serde(default)]
    #[schemars(description = "Change to total monthly income, e.g. 500.0 for a raise or -500.0 for reduced hours")]
    pub monthly_income_delta: f64,
    #[serde(default)]
    #[schemars(description = "Change to total monthly expenses, e.g. 300.0 for a new commitment or -300.0 for a cancelled one")]
    pub monthly_expense_delta: f64,
    #[serde(default)]
    #[schemars(description = "One-off transactions to inject, such as a planned purchase or an expected bonus")]
    pub one_time: Vec<OneTimeInjection>,
    #[serde(default)]
    #[schemars(description = "New repeating transactions to inject, such as a subscription or a side income")]
    pub recurring: Vec<RecurringInjection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OneTimeInjection {
    #[schemars(description = "Label for the injected transaction")]
    pub description: String,
    #[schemars(description = "Positive amount of the transaction")]
    pub amount: f64,
    #[schemars(description = "Whether the injection adds income or expense")]
    pub transaction_type: TransactionType,
    #[schemars(description = "Days after the forecast anchor at which the transaction lands")]
    pub days_from_now: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecurringInjection {
    #[schemars(description = "Label for the injected transactions")]
    pub description: String,
    #[schemars(description = "Positive amount of each occurrence")]
    pub amount: f64,
    #[schemars(description = "Whether the injection adds income or expense")]
    pub transaction_type: TransactionType,
    #[schemars(description = "How often the injected transaction repeats")]
    pub frequency: Frequency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfComparison {
    pub scenario_name: String,
    /// Projected balance at day 365 without the scenario applied.
    pub baseline_balance: f64,
    /// Projected balance at day 365 with the scenario applied.
    pub adjusted_balance: f64,
    pub balance_difference: f64,
    /// Difference relative to the baseline, in percent. Zero when the
    /// baseline balance is exactly zero.
    pub percent_change: f64,
}

impl WhatIfComparison {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl WhatIfScenario {
    /// Builds the adjusted configuration this scenario describes. The base
    /// configuration is never modified.
    ///
    /// Monthly deltas scale every transaction of the matching type so the
    /// monthly average moves by the requested amount. Injections are
    /// appended as new transactions dated forward from the anchor, where the
    /// pattern detector and forecaster pick them up.
    pub fn apply(&self, base: &ForecastConfig) -> ForecastConfig {
        let mut transactions = base.transactions.clone();

        apply_monthly_delta(
            &mut transactions,
            base,
            TransactionType::Income,
            self.monthly_income_delta,
        );
        apply_monthly_delta(
            &mut transactions,
            base,
            TransactionType::Expense,
            self.monthly_expense_delta,
        );

        for (index, injection) in self.one_time.iter().enumerate() {
            transactions.push(Transaction {
                id: format!("whatif-once-{}", index),
                date: base.as_of + Duration::days(i64::from(injection.days_from_now)),
                description: injection.description.clone(),
                category: None,
                amount: injection.amount,
                transaction_type: injection.transaction_type.clone(),
            });
        }

        for (index, injection) in self.recurring.iter().enumerate() {
            let period_days = injection.frequency.period_days();
            let occurrences = i64::from(WHAT_IF_HORIZON_DAYS) / period_days;
            for occurrence in 1..=occurrences {
                transactions.push(Transaction {
                    id: format!("whatif-recurring-{}-{}", index, occurrence),
                    date: base.as_of + Duration::days(occurrence * period_days),
                    description: injection.description.clone(),
                    category: None,
                    amount: injection.amount,
                    transaction_type: injection.transaction_type.clone(),
                });
            }
        }

        ForecastConfig {
            transactions,
            current_balance: base.current_balance,
            horizon_days: base.horizon_days,
            as_of: base.as_of,
        }
    }
}

/// Scales every transaction of `target` so the monthly average moves by
/// `delta`. A history with no flow of that type instead gains one synthetic
/// row per observed month, so the pipeline can pick the new flow up as a
/// monthly pattern.
fn apply_monthly_delta(
    transactions: &mut Vec<Transaction>,
    base: &ForecastConfig,
    target: TransactionType,
    delta: f64,
) {
    if delta == 0.0 {
        return;
    }

    let (avg_income, avg_expense) = monthly_flow_averages(&base.transactions);
    let average = match target {
        TransactionType::Income => avg_income,
        TransactionType::Expense => avg_expense,
    };

    if average > 0.0 {
        // A flow cannot scale below zero, so the factor is floored there.
        let factor = (1.0 + delta / average).max(0.0);
        for transaction in transactions.iter_mut() {
            if transaction.transaction_type == target {
                transaction.amount *= factor;
            }
        }
        return;
    }

    if delta <= 0.0 {
        return;
    }

    let label = match target {
        TransactionType::Income => "income",
        TransactionType::Expense => "expense",
    };
    for (year, month) in distinct_months(base.transactions.iter().map(|t| t.date)) {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, 15) {
            transactions.push(Transaction {
                id: format!("whatif-{}-{}-{:02}", label, year, month),
                date,
                description: format!("What-if monthly {}", label),
                category: None,
                amount: delta,
                transaction_type: target.clone(),
            });
        }
    }
}

/// Forecasts the baseline and the adjusted configuration over one year and
/// compares the final balances. Does not validate its input.
pub fn evaluate(config: &ForecastConfig, scenario: &WhatIfScenario) -> Result<WhatIfComparison> {
    debug!("Evaluating what-if scenario '{}'", scenario.name);

    let adjusted = scenario.apply(config);

    let baseline_periods = generate_periods(
        &config.transactions,
        config.as_of,
        config.current_balance,
        WHAT_IF_HORIZON_DAYS,
    );
    let adjusted_periods = generate_periods(
        &adjusted.transactions,
        adjusted.as_of,
        adjusted.current_balance,
        WHAT_IF_HORIZON_DAYS,
    );

    let baseline_balance = final_balance(&baseline_periods)?;
    let adjusted_balance = final_balance(&adjusted_periods)?;

    let balance_difference = adjusted_balance - baseline_balance;
    let percent_change = if baseline_balance != 0.0 {
        balance_difference / baseline_balance.abs() * 100.0
    } else {
        0.0
    };

    Ok(WhatIfComparison {
        scenario_name: scenario.name.clone(),
        baseline_balance,
        adjusted_balance,
        balance_difference,
        percent_change,
    })
}

fn final_balance(periods: &[ForecastPeriod]) -> Result<f64> {
    periods
        .get(WHAT_IF_HORIZON_DAYS as usize - 1)
        .map(|p| p.predicted_balance)
        .ok_or(ForecastError::HorizonTooShort {
            required: WHAT_IF_HORIZON_DAYS,
            produced: periods.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn tx(
        id: &str,
        date: &str,
        description: &str,
        amount: f64,
        transaction_type: TransactionType,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            description: description.to_string(),
            category: None,
            amount,
            transaction_type,
        }
    }

    fn salary_and_rent_config() -> ForecastConfig {
        let mut transactions = Vec::new();
        for month in 1..=12 {
            transactions.push(tx(
                &format!("s{}", month),
                &format!("2023-{:02}-01", month),
                "ACME PAYROLL",
                3000.0,
                TransactionType::Income,
            ));
            transactions.push(tx(
                &format!("r{}", month),
                &format!("2023-{:02}-05", month),
                "CITY RENT",
                2000.0,
                TransactionType::Expense,
            ));
        }
        ForecastConfig {
            transactions,
            current_balance: 1000.0,
            horizon_days: 90,
            as_of: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        }
    }

    fn named(name: &str) -> WhatIfScenario {
        WhatIfScenario {
            name: name.to_string(),
            monthly_income_delta: 0.0,
            monthly_expense_delta: 0.0,
            one_time: Vec::new(),
            recurring: Vec::new(),
        }
    }

    #[test]
    fn test_evaluation_never_mutates_the_original() {
        let config = salary_and_rent_config();
        let before = serde_json::to_string(&config).unwrap();

        let mut scenario = named("raise plus laptop");
        scenario.monthly_income_delta = 500.0;
        scenario.one_time.push(OneTimeInjection {
            description: "New laptop".to_string(),
            amount: 2400.0,
            transaction_type: TransactionType::Expense,
            days_from_now: 14,
        });
        evaluate(&config, &scenario).unwrap();

        let after = serde_json::to_string(&config).unwrap();
        assert_eq!(before, after, "evaluation must leave the input untouched");
    }

    #[test]
    fn test_income_raise_improves_final_balance() {
        let config = salary_and_rent_config();
        let mut scenario = named("raise");
        scenario.monthly_income_delta = 500.0;

        let comparison = evaluate(&config, &scenario).unwrap();
        assert_eq!(comparison.scenario_name, "raise");
        assert!(
            comparison.adjusted_balance > comparison.baseline_balance,
            "a raise should improve the one-year balance: {} vs {}",
            comparison.adjusted_balance,
            comparison.baseline_balance
        );
        assert!(comparison.balance_difference > 0.0);
        assert!(comparison.percent_change > 0.0);
    }

    #[test]
    fn test_monthly_delta_scales_matching_type_only() {
        let config = salary_and_rent_config();
        let mut scenario = named("cut spending");
        // Average monthly expense is 2000, so -500 scales expenses by 0.75.
        scenario.monthly_expense_delta = -500.0;

        let adjusted = scenario.apply(&config);
        for transaction in &adjusted.transactions {
            match transaction.transaction_type {
                TransactionType::Expense => {
                    assert!((transaction.amount - 1500.0).abs() < 0.01)
                }
                TransactionType::Income => {
                    assert!((transaction.amount - 3000.0).abs() < 0.01)
                }
            }
        }
    }

    #[test]
    fn test_scaling_factor_floors_at_zero() {
        let config = salary_and_rent_config();
        let mut scenario = named("impossible cut");
        scenario.monthly_expense_delta = -3000.0;

        let adjusted = scenario.apply(&config);
        for transaction in &adjusted.transactions {
            if transaction.transaction_type == TransactionType::Expense {
                assert_eq!(transaction.amount, 0.0);
            }
        }
    }

    #[test]
    fn test_synthetic_rows_cover_missing_flow() {
        let transactions = vec![
            tx("e1", "2024-01-05", "CITY RENT", 900.0, TransactionType::Expense),
            tx("e2", "2024-02-05", "CITY RENT", 900.0, TransactionType::Expense),
            tx("e3", "2024-03-05", "CITY RENT", 900.0, TransactionType::Expense),
        ];
        let config = ForecastConfig {
            transactions,
            current_balance: 2000.0,
            horizon_days: 90,
            as_of: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        };
        let mut scenario = named("new job");
        scenario.monthly_income_delta = 1200.0;

        let adjusted = scenario.apply(&config);
        let synthetic: Vec<&Transaction> = adjusted
            .transactions
            .iter()
            .filter(|t| t.id.starts_with("whatif-income-"))
            .collect();

        // One row per observed month, dated mid-month.
        assert_eq!(synthetic.len(), 3);
        for row in &synthetic {
            assert_eq!(row.transaction_type, TransactionType::Income);
            assert_eq!(row.amount, 1200.0);
            assert_eq!(row.date.day(), 15);
        }
    }

    #[test]
    fn test_one_time_injection_lands_on_offset_date() {
        let config = salary_and_rent_config();
        let mut scenario = named("bonus");
        scenario.one_time.push(OneTimeInjection {
            description: "Signing bonus".to_string(),
            amount: 5000.0,
            transaction_type: TransactionType::Income,
            days_from_now: 10,
        });

        let adjusted = scenario.apply(&config);
        let injected = adjusted
            .transactions
            .iter()
            .find(|t| t.id == "whatif-once-0")
            .unwrap();
        assert_eq!(
            injected.date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
        assert_eq!(injected.amount, 5000.0);
    }

    #[test]
    fn test_recurring_injection_schedule() {
        let config = salary_and_rent_config();
        let mut scenario = named("subscription");
        scenario.recurring.push(RecurringInjection {
            description: "Streaming service".to_string(),
            amount: 15.0,
            transaction_type: TransactionType::Expense,
            frequency: Frequency::Monthly,
        });

        let adjusted = scenario.apply(&config);
        let injected: Vec<&Transaction> = adjusted
            .transactions
            .iter()
            .filter(|t| t.id.starts_with("whatif-recurring-0-"))
            .collect();

        // 365 / 30 fits 12 monthly occurrences inside the window.
        assert_eq!(injected.len(), 12);
        assert_eq!(
            injected[0].date,
            config.as_of + Duration::days(30)
        );
        assert_eq!(
            injected[11].date,
            config.as_of + Duration::days(360)
        );
    }

    #[test]
    fn test_recurring_expense_lowers_final_balance() {
        let config = salary_and_rent_config();
        let mut scenario = named("car payment");
        scenario.recurring.push(RecurringInjection {
            description: "Car payment".to_string(),
            amount: 400.0,
            transaction_type: TransactionType::Expense,
            frequency: Frequency::Monthly,
        });

        let comparison = evaluate(&config, &scenario).unwrap();
        assert!(
            comparison.adjusted_balance < comparison.baseline_balance,
            "a new recurring expense should lower the one-year balance"
        );
        assert!(comparison.percent_change < 0.0);
    }

    #[test]
    fn test_zero_baseline_reports_zero_percent_change() {
        let config = ForecastConfig {
            transactions: Vec::new(),
            current_balance: 0.0,
            horizon_days: 30,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let scenario = named("noop");

        let comparison = evaluate(&config, &scenario).unwrap();
        assert_eq!(comparison.baseline_balance, 0.0);
        assert_eq!(comparison.percent_change, 0.0);
    }

    #[test]
    fn test_final_balance_requires_full_horizon() {
        let error = final_balance(&[]).unwrap_err();
        match error {
            ForecastError::HorizonTooShort { required, produced } => {
                assert_eq!(required, WHAT_IF_HORIZON_DAYS);
                assert_eq!(produced, 0);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
