use crate::schema::{Frequency, Transaction, TransactionType};
use crate::utils::{mean, variance};
use chrono::{Duration, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum occurrences before a description group is considered recurring.
const MIN_PATTERN_OCCURRENCES: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringPattern {
    pub transaction_type: TransactionType,
    /// Description after lowercasing, digit stripping and whitespace collapsing.
    pub normalized_description: String,
    pub average_amount: f64,
    pub frequency: Frequency,
    /// 0.0 to 1.0. Penalized by interval and amount variance relative to their means.
    pub confidence: f64,
    /// Last observed occurrence advanced by one mean interval.
    pub next_occurrence: NaiveDate,
}

/// Lowercases, strips digits, and collapses whitespace so statement lines
/// like "ACME PAYROLL 0423" and "ACME PAYROLL 0523" fold into one key.
pub fn normalize_description(raw: &str) -> String {
    let lowered: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds transaction groups that repeat on a stable cycle with stable
/// amounts. Groups need at least [`MIN_PATTERN_OCCURRENCES`] postings and a
/// positive mean interval; everything else is scored, never rejected.
/// Results are sorted by descending confidence.
pub fn detect_recurring_patterns(transactions: &[Transaction]) -> Vec<RecurringPattern> {
    let mut groups: BTreeMap<(TransactionType, String), Vec<&Transaction>> = BTreeMap::new();
    for transaction in transactions {
        let key = (
            transaction.transaction_type.clone(),
            normalize_description(&transaction.description),
        );
        groups.entry(key).or_default().push(transaction);
    }
    let candidate_groups = groups.len();

    let mut patterns: Vec<RecurringPattern> = Vec::new();
    for ((transaction_type, normalized_description), mut rows) in groups {
        if rows.len() < MIN_PATTERN_OCCURRENCES {
            continue;
        }

        rows.sort_by(|left, right| {
            left.date
                .cmp(&right.date)
                .then_with(|| left.id.cmp(&right.id))
        });

        let intervals: Vec<f64> = rows
            .windows(2)
            .map(|pair| (pair[1].date - pair[0].date).num_days() as f64)
            .collect();
        let mean_interval = mean(&intervals);
        if mean_interval <= 0.0 {
            // Repeated same-day postings, not a periodic signal.
            continue;
        }

        let amounts: Vec<f64> = rows.iter().map(|row| row.amount).collect();
        let average_amount = mean(&amounts);

        let interval_penalty = variance(&intervals) / (mean_interval * mean_interval);
        let amount_penalty = if average_amount > 0.0 {
            variance(&amounts) / (average_amount * average_amount)
        } else {
            0.0
        };
        let confidence = (1.0 - interval_penalty - amount_penalty).clamp(0.0, 1.0);

        let last_seen = rows[rows.len() - 1].date;
        let next_occurrence = last_seen + Duration::days(mean_interval.round() as i64);

        patterns.push(RecurringPattern {
            transaction_type,
            normalized_description,
            average_amount,
            frequency: Frequency::from_interval_days(mean_interval),
            confidence,
            next_occurrence,
        });
    }

    patterns.sort_by(|left, right| {
        right
            .confidence
            .total_cmp(&left.confidence)
            .then_with(|| {
                left.normalized_description
                    .cmp(&right.normalized_description)
            })
            .then_with(|| left.transaction_type.cmp(&right.transaction_type))
    });

    debug!(
        "Detected {} recurring patterns from {} description groups",
        patterns.len(),
        candidate_groups
    );

    patterns
}
