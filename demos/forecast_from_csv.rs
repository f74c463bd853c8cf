use anyhow::{Context, Result};
use chrono::NaiveDate;
use financial_forecast_engine::*;

#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    id: String,
    date: NaiveDate,
    description: String,
    #[serde(default)]
    category: Option<String>,
    amount: f64,
    transaction_type: TransactionType,
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: forecast_from_csv <transactions.csv> [current_balance] [horizon_days]")?;
    let current_balance: f64 = match args.next() {
        Some(raw) => raw.parse().context("current balance must be a number")?,
        None => 0.0,
    };
    let horizon_days: u32 = match args.next() {
        Some(raw) => raw.parse().context("horizon must be a whole number of days")?,
        None => 90,
    };

    let mut reader =
        csv::Reader::from_path(&path).with_context(|| format!("failed to open {}", path))?;

    let mut transactions = Vec::new();
    for row in reader.deserialize() {
        let row: CsvRow = row.context("malformed transaction row")?;
        transactions.push(Transaction {
            id: row.id,
            date: row.date,
            description: row.description,
            category: row.category,
            amount: row.amount,
            transaction_type: row.transaction_type,
        });
    }

    // Anchor the forecast at the most recent transaction.
    let as_of = transactions
        .iter()
        .map(|t| t.date)
        .max()
        .context("the CSV contained no transactions")?;

    let config = ForecastConfig {
        transactions,
        current_balance,
        horizon_days,
        as_of,
    };

    let result = generate_forecast(&config)?;
    println!("{}", result.to_json()?);

    Ok(())
}
