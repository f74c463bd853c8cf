use crate::schema::{Transaction, TransactionType};
use crate::utils::mean;
use chrono::Datelike;
use serde::{Deserialize, Serialize};

/// Transactions needed in a month bucket before its confidence saturates.
const FULL_CONFIDENCE_SAMPLE_COUNT: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalPattern {
    /// Calendar month index: 0 = January through 11 = December.
    pub month: u32,
    pub average_income: f64,
    pub average_expense: f64,
    /// Transactions observed in this calendar month across all years.
    pub sample_count: usize,
    /// min(sample_count / 10, 1). A zero-sample month means "no signal",
    /// not "predicted zero".
    pub confidence: f64,
}

/// Buckets history by calendar month, ignoring year. Always returns exactly
/// 12 entries, January first, including months with no samples.
pub fn build_seasonal_patterns(transactions: &[Transaction]) -> Vec<SeasonalPattern> {
    let mut income_by_month: Vec<Vec<f64>> = vec![Vec::new(); 12];
    let mut expense_by_month: Vec<Vec<f64>> = vec![Vec::new(); 12];

    for transaction in transactions {
        let bucket = transaction.date.month0() as usize;
        match transaction.transaction_type {
            TransactionType::Income => income_by_month[bucket].push(transaction.amount),
            TransactionType::Expense => expense_by_month[bucket].push(transaction.amount),
        }
    }

    (0..12)
        .map(|month| {
            let income = &income_by_month[month];
            let expense = &expense_by_month[month];
            let sample_count = income.len() + expense.len();

            SeasonalPattern {
                month: month as u32,
                average_income: mean(income),
                average_expense: mean(expense),
                sample_count,
                confidence: (sample_count as f64 / FULL_CONFIDENCE_SAMPLE_COUNT).min(1.0),
            }
        })
        .collect()
}
