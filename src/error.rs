use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Invalid horizon {0}: must be at least 1 day")]
    InvalidHorizon(u32),

    #[error("Invalid amount for transaction '{id}': {amount} (must be a non-negative finite number)")]
    InvalidAmount { id: String, amount: f64 },

    #[error("Invalid current balance: {0} (must be a finite number)")]
    InvalidBalance(f64),

    #[error("Projection horizon too short: comparison requires {required} days but only {produced} were produced")]
    HorizonTooShort { required: u32, produced: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
