use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the paper-trading controller
#[derive(Error, Debug)]
pub enum TraderError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing Alpaca credential: {0}")]
    MissingCredentials(&'static str),

    // Network errors
    #[error("Brokerage unavailable: {0}")]
    RemoteUnavailable(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Order preconditions
    #[error("Insufficient funds: required ${required}, buying power ${available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("No open position for {symbol}")]
    NoOpenPosition { symbol: String },

    #[error("Insufficient quantity for {symbol}: requested {requested}, held {held}")]
    InsufficientQuantity {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },

    #[error("Price unavailable for {symbol}")]
    PriceUnavailable { symbol: String },

    // Order execution errors
    #[error("Cancellation not confirmed for {symbol}: {pending} order(s) still open")]
    CancelTimeout { symbol: String, pending: usize },

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    // Generic errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for TraderError {
    fn from(err: reqwest::Error) -> Self {
        TraderError::RemoteUnavailable(err.to_string())
    }
}

impl TraderError {
    /// Failures the user can act on without touching the remote system.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            TraderError::InsufficientFunds { .. }
                | TraderError::NoOpenPosition { .. }
                | TraderError::InsufficientQuantity { .. }
                | TraderError::Validation(_)
        )
    }
}

/// Result type alias for TraderError
pub type Result<T> = std::result::Result<T, TraderError>;
