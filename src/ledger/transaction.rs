use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category reserved for the two legs of a transfer.
pub const TRANSFER_CATEGORY: &str = "Transfer";

/// A single signed monetary movement against one account.
///
/// Positive amounts are credits (income), negative amounts are debits (expenses).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(with = "crate::time::timestamp")]
    pub date: DateTime<Utc>,
    pub merchant: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_id: Option<String>,
}

impl Transaction {
    pub fn new(
        account_id: impl Into<String>,
        merchant: impl Into<String>,
        category: impl Into<String>,
        amount: Decimal,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: new_id(),
            date,
            merchant: merchant.into(),
            category: category.into(),
            amount,
            account_id: account_id.into(),
            description: None,
            is_recurring: false,
            recurring_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_transfer(&self) -> bool {
        self.category == TRANSFER_CATEGORY
    }

    /// True when the transaction was spawned by the recurring template `template_id`, or by a
    /// legacy template with the same merchant when the back-reference is missing.
    pub fn spawned_by(&self, template_id: &str, template_merchant: &str) -> bool {
        match self.recurring_id.as_deref() {
            Some(id) => id == template_id,
            None => self.is_recurring && self.merchant == template_merchant,
        }
    }
}

/// Generates a fresh identifier for ledger entities.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
