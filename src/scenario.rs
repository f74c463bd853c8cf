use crate::engine::Forecaster;
use crate::error::{ForecastError, Result};
use crate::patterns::{detect_recurring_patterns, normalize_description, RecurringPattern};
use crate::schema::{ForecastConfig, TransactionType};
use crate::seasonality::{build_seasonal_patterns, SeasonalPattern};
use crate::summary::monthly_flow_averages;
use crate::trend::{estimate_trend, monthly_totals, TrendEstimate};
use crate::utils::{mean, std_dev};
use crate::ForecastPeriod;
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OPTIMISTIC_INCOME_FACTOR: f64 = 1.15;
pub const OPTIMISTIC_EXPENSE_FACTOR: f64 = 0.90;
pub const PESSIMISTIC_INCOME_FACTOR: f64 = 0.90;
pub const PESSIMISTIC_EXPENSE_FACTOR: f64 = 1.15;

/// Scenarios always project a full year so 30d/90d/1y balances all exist.
pub const SCENARIO_HORIZON_DAYS: u32 = 365;

/// Patterns below this confidence are not worth surfacing as key events.
const KEY_EVENT_CONFIDENCE: f64 = 0.5;
const KEY_EVENT_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum CashFlowHealth {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEvent {
    pub date: NaiveDate,
    pub description: String,
    /// Signed: positive for expected income, negative for expected expense.
    pub balance_impact: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub balance_at_30d: f64,
    pub balance_at_90d: f64,
    pub balance_at_1y: f64,
    pub cash_flow_health: CashFlowHealth,
    pub key_events: Vec<KeyEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioAnalysis {
    pub optimistic: ScenarioOutcome,
    pub realistic: ScenarioOutcome,
    pub pessimistic: ScenarioOutcome,
    pub risk: RiskAssessment,
    pub recommendations: Vec<String>,
}

impl ScenarioAnalysis {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct ScenarioModeler<'a> {
    config: &'a ForecastConfig,
}

impl<'a> ScenarioModeler<'a> {
    pub fn new(config: &'a ForecastConfig) -> Self {
        Self { config }
    }

    /// Projects the optimistic, realistic and pessimistic cases over a fixed
    /// one-year horizon. The multipliers scale the estimator inputs only;
    /// confidences are untouched, so scaling is exactly proportional and the
    /// pessimistic <= realistic <= optimistic ordering holds at every day.
    pub fn analyze(&self) -> Result<ScenarioAnalysis> {
        let patterns = detect_recurring_patterns(&self.config.transactions);
        let seasonal = build_seasonal_patterns(&self.config.transactions);
        let trend = estimate_trend(&self.config.transactions);

        info!(
            "Analyzing scenarios over {} days with {} recurring patterns",
            SCENARIO_HORIZON_DAYS,
            patterns.len()
        );

        let realistic = self.run_scenario(&patterns, &seasonal, &trend, 1.0, 1.0)?;
        let optimistic = self.run_scenario(
            &patterns,
            &seasonal,
            &trend,
            OPTIMISTIC_INCOME_FACTOR,
            OPTIMISTIC_EXPENSE_FACTOR,
        )?;
        let pessimistic = self.run_scenario(
            &patterns,
            &seasonal,
            &trend,
            PESSIMISTIC_INCOME_FACTOR,
            PESSIMISTIC_EXPENSE_FACTOR,
        )?;

        let risk = self.assess_risk(&realistic);
        let recommendations = self.recommend(&realistic, &pessimistic, &risk);

        Ok(ScenarioAnalysis {
            optimistic,
            realistic,
            pessimistic,
            risk,
            recommendations,
        })
    }

    fn run_scenario(
        &self,
        patterns: &[RecurringPattern],
        seasonal: &[SeasonalPattern],
        trend: &TrendEstimate,
        income_factor: f64,
        expense_factor: f64,
    ) -> Result<ScenarioOutcome> {
        let scaled_patterns: Vec<RecurringPattern> = patterns
            .iter()
            .map(|pattern| {
                let factor = match pattern.transaction_type {
                    TransactionType::Income => income_factor,
                    TransactionType::Expense => expense_factor,
                };
                RecurringPattern {
                    average_amount: pattern.average_amount * factor,
                    ..pattern.clone()
                }
            })
            .collect();
        let scaled_seasonal: Vec<SeasonalPattern> = seasonal
            .iter()
            .map(|pattern| SeasonalPattern {
                average_income: pattern.average_income * income_factor,
                average_expense: pattern.average_expense * expense_factor,
                ..pattern.clone()
            })
            .collect();

        let periods = Forecaster::new(scaled_patterns.clone(), scaled_seasonal, trend.clone())
            .project(
                self.config.as_of,
                self.config.current_balance,
                SCENARIO_HORIZON_DAYS,
            );

        let (base_income, base_expense) = monthly_flow_averages(&self.config.transactions);
        let cash_flow_health =
            classify_health(base_income * income_factor, base_expense * expense_factor);

        Ok(ScenarioOutcome {
            balance_at_30d: balance_at(&periods, 29)?,
            balance_at_90d: balance_at(&periods, 89)?,
            balance_at_1y: balance_at(&periods, 364)?,
            cash_flow_health,
            key_events: self.collect_key_events(&scaled_patterns, &periods),
        })
    }

    fn collect_key_events(
        &self,
        patterns: &[RecurringPattern],
        periods: &[ForecastPeriod],
    ) -> Vec<KeyEvent> {
        let mut events = Vec::new();

        for pattern in patterns {
            if pattern.confidence <= KEY_EVENT_CONFIDENCE {
                continue;
            }
            let period_days = pattern.frequency.period_days();
            let anchor_offset = (pattern.next_occurrence - self.config.as_of).num_days();
            // First day d >= 1 that lands on the pattern's occurrence grid.
            let first_day = (anchor_offset - 1).rem_euclid(period_days) + 1;
            if first_day > KEY_EVENT_WINDOW_DAYS {
                continue;
            }

            let (verb, signed_amount) = match pattern.transaction_type {
                TransactionType::Income => ("receive", pattern.average_amount),
                TransactionType::Expense => ("pay", -pattern.average_amount),
            };
            events.push(KeyEvent {
                date: self.config.as_of + chrono::Duration::days(first_day),
                description: format!(
                    "Expected to {} about ${:.2} for '{}'",
                    verb,
                    pattern.average_amount,
                    pattern.normalized_description
                ),
                balance_impact: signed_amount,
            });
        }

        if let Some(first_negative) = periods.iter().find(|p| p.predicted_balance < 0.0) {
            events.push(KeyEvent {
                date: first_negative.date,
                description: "Projected balance first dips below zero".to_string(),
                balance_impact: first_negative.predicted_balance,
            });
        }

        events.sort_by(|left, right| {
            left.date
                .cmp(&right.date)
                .then_with(|| left.description.cmp(&right.description))
        });
        events
    }

    /// Independent boolean factors; the level comes from how many triggered.
    fn assess_risk(&self, realistic: &ScenarioOutcome) -> RiskAssessment {
        let mut factors = Vec::new();

        let current = self.config.current_balance;
        if current > 0.0 {
            let decline = (current - realistic.balance_at_90d) / current;
            if decline > 0.5 {
                factors.push(
                    "Projected balance declines more than 50% within 90 days".to_string(),
                );
            }
        }

        if let Some(share) = top_income_source_share(self.config) {
            if share > 0.8 {
                factors.push(format!(
                    "More than 80% of income comes from a single source ({:.0}%)",
                    share * 100.0
                ));
            }
        }

        let expense_series: Vec<f64> = monthly_totals(&self.config.transactions)
            .values()
            .map(|t| t.expense)
            .collect();
        if expense_series.len() >= 2 {
            let expense_mean = mean(&expense_series);
            if expense_mean > 0.0 && std_dev(&expense_series) / expense_mean > 0.4 {
                factors.push(
                    "Monthly expenses swing more than 40% around their average".to_string(),
                );
            }
        }

        let level = match factors.len() {
            0 => RiskLevel::Low,
            1 | 2 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };

        RiskAssessment { level, factors }
    }

    fn recommend(
        &self,
        realistic: &ScenarioOutcome,
        pessimistic: &ScenarioOutcome,
        risk: &RiskAssessment,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if pessimistic.balance_at_90d < 0.0 {
            recommendations.push(
                "A modest downturn sends the 90-day balance negative; build a cash buffer now."
                    .to_string(),
            );
        }
        if realistic.cash_flow_health == CashFlowHealth::Poor {
            recommendations.push(
                "Expenses exceed income on average; reduce recurring outflows or add income."
                    .to_string(),
            );
        }
        if realistic.balance_at_1y < self.config.current_balance {
            recommendations.push(
                "The balance trends down over the next year; review subscriptions and recurring bills."
                    .to_string(),
            );
        }
        if risk.level == RiskLevel::High {
            recommendations.push(
                "Multiple risk factors are active; avoid new fixed commitments until the picture improves."
                    .to_string(),
            );
        }
        if recommendations.is_empty() {
            recommendations.push(
                "Cash flow looks resilient across scenarios; consider putting the monthly surplus to work."
                    .to_string(),
            );
        }

        recommendations
    }
}

fn balance_at(periods: &[ForecastPeriod], index: usize) -> Result<f64> {
    periods
        .get(index)
        .map(|p| p.predicted_balance)
        .ok_or(ForecastError::HorizonTooShort {
            required: index as u32 + 1,
            produced: periods.len(),
        })
}

fn classify_health(avg_income: f64, avg_expense: f64) -> CashFlowHealth {
    if avg_expense == 0.0 {
        // No measured outflow: positive income is as good as it gets, and a
        // fully silent history is simply unknown.
        return if avg_income > 0.0 {
            CashFlowHealth::Excellent
        } else {
            CashFlowHealth::Fair
        };
    }

    let ratio = avg_income / avg_expense;
    if ratio >= 1.5 {
        CashFlowHealth::Excellent
    } else if ratio >= 1.2 {
        CashFlowHealth::Good
    } else if ratio >= 1.0 {
        CashFlowHealth::Fair
    } else {
        CashFlowHealth::Poor
    }
}

/// Share of total income carried by the largest income source, or `None`
/// when there is no income at all.
fn top_income_source_share(config: &ForecastConfig) -> Option<f64> {
    let mut by_source: BTreeMap<String, f64> = BTreeMap::new();
    let mut total = 0.0;
    for transaction in &config.transactions {
        if transaction.transaction_type != TransactionType::Income {
            continue;
        }
        *by_source
            .entry(normalize_description(&transaction.description))
            .or_default() += transaction.amount;
        total += transaction.amount;
    }

    if total <= 0.0 {
        return None;
    }
    let largest = by_source.values().cloned().fold(0.0, f64::max);
    Some(largest / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Transaction;

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

    #[test]
    fn test_scenario_ordering() {
        let config = salary_and_rent_config();
        let analysis = ScenarioModeler::new(&config).analyze().unwrap();

        assert!(analysis.pessimistic.balance_at_30d <= analysis.realistic.balance_at_30d);
        assert!(analysis.realistic.balance_at_30d <= analysis.optimistic.balance_at_30d);
        assert!(analysis.pessimistic.balance_at_90d <= analysis.realistic.balance_at_90d);
        assert!(analysis.realistic.balance_at_90d <= analysis.optimistic.balance_at_90d);
        assert!(analysis.pessimistic.balance_at_1y <= analysis.realistic.balance_at_1y);
        assert!(analysis.realistic.balance_at_1y <= analysis.optimistic.balance_at_1y);
    }

    #[test]
    fn test_health_buckets() {
        assert_eq!(classify_health(3000.0, 2000.0), CashFlowHealth::Excellent);
        assert_eq!(classify_health(2500.0, 2000.0), CashFlowHealth::Good);
        assert_eq!(classify_health(2000.0, 2000.0), CashFlowHealth::Fair);
        assert_eq!(classify_health(1500.0, 2000.0), CashFlowHealth::Poor);
        assert_eq!(classify_health(500.0, 0.0), CashFlowHealth::Excellent);
        assert_eq!(classify_health(0.0, 0.0), CashFlowHealth::Fair);
    }

    #[test]
    fn test_health_shifts_with_multipliers() {
        let config = salary_and_rent_config();
        let analysis = ScenarioModeler::new(&config).analyze().unwrap();

        // Base ratio 1.5 is Excellent; pessimistic 2700/2300 ~ 1.17 is Fair.
        assert_eq!(analysis.realistic.cash_flow_health, CashFlowHealth::Excellent);
        assert_eq!(
            analysis.optimistic.cash_flow_health,
            CashFlowHealth::Excellent
        );
        assert_eq!(analysis.pessimistic.cash_flow_health, CashFlowHealth::Fair);
    }

    #[test]
    fn test_key_events_cover_confident_patterns() {
        let config = salary_and_rent_config();
        let analysis = ScenarioModeler::new(&config).analyze().unwrap();

        let events = &analysis.realistic.key_events;
        assert!(events.iter().any(|e| e.description.contains("acme payroll")));
        assert!(events.iter().any(|e| e.description.contains("city rent")));
        for event in events {
            assert!(event.date > config.as_of);
        }

        let rent = events
            .iter()
            .find(|e| e.description.contains("city rent"))
            .unwrap();
        assert!(rent.balance_impact < 0.0);
    }

    #[test]
    fn test_risk_concentration_single_income_source() {
        let config = salary_and_rent_config();
        let analysis = ScenarioModeler::new(&config).analyze().unwrap();

        assert!(analysis
            .risk
            .factors
            .iter()
            .any(|f| f.contains("single source")));
        assert_eq!(analysis.risk.level, RiskLevel::Medium);
    }

    #[test]
    fn test_risk_low_with_mixed_income() {
        let mut transactions = Vec::new();
        for month in 1..=6 {
            transactions.push(tx(
                &format!("a{}", month),
                &format!("2023-{:02}-01", month),
                "ACME PAYROLL",
                1500.0,
                TransactionType::Income,
            ));
            transactions.push(tx(
                &format!("b{}", month),
                &format!("2023-{:02}-03", month),
                "FREELANCE INVOICE",
                1500.0,
                TransactionType::Income,
            ));
            transactions.push(tx(
                &format!("e{}", month),
                &format!("2023-{:02}-10", month),
                "CITY RENT",
                1000.0,
                TransactionType::Expense,
            ));
        }
        let config = ForecastConfig {
            transactions,
            current_balance: 5000.0,
            horizon_days: 90,
            as_of: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
        };

        let analysis = ScenarioModeler::new(&config).analyze().unwrap();
        assert_eq!(analysis.risk.level, RiskLevel::Low);
        assert!(analysis.risk.factors.is_empty());
    }

    #[test]
    fn test_recommendations_for_deficit_household() {
        let mut transactions = Vec::new();
        for month in 1..=6 {
            transactions.push(tx(
                &format!("s{}", month),
                &format!("2023-{:02}-01", month),
                "PART TIME WORK",
                1000.0,
                TransactionType::Income,
            ));
            transactions.push(tx(
                &format!("r{}", month),
                &format!("2023-{:02}-05", month),
                "CITY RENT",
                1400.0,
                TransactionType::Expense,
            ));
        }
        let config = ForecastConfig {
            transactions,
            current_balance: 800.0,
            horizon_days: 90,
            as_of: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap(),
        };

        let analysis = ScenarioModeler::new(&config).analyze().unwrap();
        assert_eq!(analysis.realistic.cash_flow_health, CashFlowHealth::Poor);
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("reduce recurring outflows")));
        assert!(!analysis.recommendations.is_empty());
    }

    #[test]
    fn test_surplus_household_gets_resilient_note() {
        let config = salary_and_rent_config();
        let analysis = ScenarioModeler::new(&config).analyze().unwrap();
        assert!(analysis
            .recommendations
            .iter()
            .any(|r| r.contains("resilient")));
    }
}
