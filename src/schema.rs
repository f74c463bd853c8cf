use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum TransactionType {
    #[schemars(description = "Money flowing into the account: salary, client payments, refunds, interest")]
    Income,

    #[schemars(description = "Money flowing out of the account: purchases, bills, rent, subscriptions")]
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Frequency {
    #[schemars(description = "Repeats roughly every 7 days (e.g., weekly groceries, cleaning services)")]
    Weekly,

    #[schemars(description = "Repeats roughly every 30 days (e.g., salary, rent, subscriptions)")]
    Monthly,

    #[schemars(description = "Repeats roughly every 91 days (e.g., quarterly tax, insurance premiums)")]
    Quarterly,

    #[schemars(description = "Repeats roughly every 365 days (e.g., annual renewals, memberships)")]
    Yearly,
}

impl Frequency {
    /// Nominal cycle length in days. Used both to classify observed
    /// intervals and to lay out expected occurrences when projecting.
    pub fn period_days(&self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::Monthly => 30,
            Frequency::Quarterly => 91,
            Frequency::Yearly => 365,
        }
    }

    /// Classifies a mean observed interval (in days) into the nearest cycle.
    pub fn from_interval_days(mean_interval: f64) -> Frequency {
        if mean_interval <= 10.0 {
            Frequency::Weekly
        } else if mean_interval <= 40.0 {
            Frequency::Monthly
        } else if mean_interval <= 120.0 {
            Frequency::Quarterly
        } else {
            Frequency::Yearly
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    #[schemars(description = "Unique identifier for the transaction (e.g., a bank reference or UUID)")]
    pub id: String,

    #[schemars(description = "Date the transaction was posted, in YYYY-MM-DD format")]
    pub date: NaiveDate,

    #[schemars(
        description = "Raw transaction description as it appears on the statement (e.g., 'ACME PAYROLL 0423'). Trailing reference numbers are fine; descriptions are normalized before matching."
    )]
    pub description: String,

    #[serde(default)]
    #[schemars(
        description = "Optional category label (e.g., 'Groceries', 'Utilities'). Informational only; pattern detection works from descriptions."
    )]
    pub category: Option<String>,

    #[schemars(
        description = "Absolute monetary amount. Always non-negative; direction is carried by transaction_type."
    )]
    pub amount: f64,

    #[schemars(description = "Whether this transaction is income or an expense")]
    pub transaction_type: TransactionType,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForecastConfig {
    #[schemars(
        description = "Complete transaction history to analyze. Order does not matter; transactions are grouped and sorted internally. More history (ideally 6+ months) produces higher-confidence forecasts."
    )]
    pub transactions: Vec<Transaction>,

    #[schemars(
        description = "Account balance as of the as_of date. The projection starts from this value."
    )]
    pub current_balance: f64,

    #[schemars(
        description = "Number of days to project forward. Each day produces one forecast period. Typical values: 30, 90, 365. Must be at least 1."
    )]
    pub horizon_days: u32,

    #[schemars(
        description = "Anchor date for the projection in YYYY-MM-DD format. Day 1 of the forecast is the day after this date. An explicit anchor keeps repeated runs reproducible."
    )]
    pub as_of: NaiveDate,
}

impl ForecastConfig {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ForecastConfig)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
