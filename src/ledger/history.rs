use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A timestamped balance reading appended whenever a mutation changes an account balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistorySnapshot {
    #[serde(with = "crate::time::timestamp")]
    pub date: DateTime<Utc>,
    pub account_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

impl HistorySnapshot {
    pub fn new(date: DateTime<Utc>, account_id: impl Into<String>, balance: Decimal) -> Self {
        Self {
            date,
            account_id: account_id.into(),
            balance,
        }
    }
}
