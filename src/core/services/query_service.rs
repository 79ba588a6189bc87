use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerState, Transaction};

/// Conjunction of optional predicates over the transaction log.
///
/// Date bounds are inclusive. Amount bounds compare against the magnitude of the amount, so a
/// `min_amount` of 50 keeps both `-60` and `60`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    #[serde(default, with = "crate::time::timestamp_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::time::timestamp_option")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub min_amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub max_amount: Option<Decimal>,
}

impl TransactionFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn amount_range(mut self, min: Option<Decimal>, max: Option<Decimal>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        if self.start_date.is_some_and(|start| txn.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| txn.date > end) {
            return false;
        }
        if let Some(category) = non_empty(&self.category) {
            if txn.category != category {
                return false;
            }
        }
        if let Some(account_id) = non_empty(&self.account_id) {
            if txn.account_id != account_id {
                return false;
            }
        }
        let magnitude = txn.amount.abs();
        if self.min_amount.is_some_and(|min| magnitude < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| magnitude > max) {
            return false;
        }
        true
    }
}

// Empty strings act as "no filter", like an unset select box.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|text| !text.is_empty())
}

pub struct QueryService;

impl QueryService {
    /// Matching transactions in log order (newest first).
    pub fn filter(state: &LedgerState, filter: &TransactionFilter) -> Vec<Transaction> {
        state
            .transactions
            .iter()
            .filter(|txn| filter.matches(txn))
            .cloned()
            .collect()
    }

    pub fn transactions_for_account(state: &LedgerState, account_id: &str) -> Vec<Transaction> {
        Self::filter(state, &TransactionFilter::new().account(account_id))
    }
}
