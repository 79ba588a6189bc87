use rust_decimal::Decimal;
use thiserror::Error;

/// Error type that captures ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),
    #[error("Insufficient funds in `{account}`: available {available}, requested {requested}")]
    InsufficientFunds {
        account: String,
        available: Decimal,
        requested: Decimal,
    },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Transfer failed: {0}")]
    TransferFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// True for errors raised by input validation before any state was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::InvalidAmount(_)
                | LedgerError::InsufficientFunds { .. }
                | LedgerError::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_message_names_the_account() {
        let err = LedgerError::InsufficientFunds {
            account: "main".into(),
            available: Decimal::new(10, 0),
            requested: Decimal::new(25, 0),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds in `main`: available 10, requested 25"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn io_and_serde_errors_keep_their_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = LedgerError::from(io);
        assert!(matches!(err, LedgerError::Io(_)));
        assert_eq!(err.source().map(|source| source.to_string()).as_deref(), Some("missing"));

        let serde = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = LedgerError::from(serde);
        assert!(matches!(err, LedgerError::Serde(_)));
        assert!(err.source().is_some());
    }
}
