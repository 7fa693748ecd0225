//! Error types for the custody signing pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Deposit amount must be at least {minimum} USDC. Received: {requested} USDC")]
    AmountTooLow { minimum: String, requested: String },

    #[error("Failed to fetch permit nonce: {message}")]
    NonceFetchFailed { message: String },

    #[error("Signing failed: {message}")]
    SigningFailed { message: String },

    #[error("Malformed signature: {message}")]
    MalformedSignature { message: String },

    #[error("Transaction {tx_hash} rejected: {message}")]
    TransactionRejected { tx_hash: String, message: String },

    #[error("Transaction {tx_hash} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("API error: {message}")]
    Api { message: String, status: Option<u16> },

    #[error("Exchange rejected action: {message}")]
    Exchange { message: String },
}

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Error::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn signing(message: impl Into<String>) -> Self {
        Error::SigningFailed {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}

/// Coarse failure categories used for operator-facing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCategory {
    InsufficientBalance,
    Connectivity,
    Other(String),
}

impl FailureCategory {
    /// Classify an error by its message, the way the exchange and custody
    /// backends phrase their failures.
    pub fn classify(error: &Error) -> Self {
        if let Error::Http(e) = error {
            if e.is_connect() || e.is_timeout() {
                return FailureCategory::Connectivity;
            }
        }

        let message = error.to_string();
        if message.contains("Insufficient balance") {
            FailureCategory::InsufficientBalance
        } else if message.contains("provider") || message.contains("connect") {
            FailureCategory::Connectivity
        } else {
            FailureCategory::Other(message)
        }
    }

    /// Message shown to the operator.
    pub fn operator_message(&self) -> String {
        match self {
            FailureCategory::InsufficientBalance => "Not enough funds for this action".to_string(),
            FailureCategory::Connectivity => "Provider connection issue".to_string(),
            FailureCategory::Other(raw) => raw.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
