use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::round2;
use super::time_interval::{days_between, TimeUnit};
use super::transaction::{new_id, Transaction};
use crate::errors::{LedgerError, Result};

/// How often a recurring template is meant to fire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Elapsed whole days after which a template counts as pending. Months and years are
    /// approximated as 30 and 365 days.
    pub fn pending_threshold_days(self) -> i64 {
        match self {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
            Frequency::Monthly => 30,
            Frequency::Yearly => 365,
        }
    }

    pub fn unit(self) -> TimeUnit {
        match self {
            Frequency::Daily => TimeUnit::Day,
            Frequency::Weekly => TimeUnit::Week,
            Frequency::Monthly => TimeUnit::Month,
            Frequency::Yearly => TimeUnit::Year,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schedule description that spawns concrete transactions when processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTransaction {
    pub id: String,
    pub merchant: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub frequency: Frequency,
    #[serde(with = "crate::time::timestamp")]
    pub start_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::timestamp_option"
    )]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::timestamp_option"
    )]
    pub last_processed: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl RecurringTransaction {
    /// Reference point for cadence checks: the last run, or the start date if never run.
    pub fn anchor(&self) -> DateTime<Utc> {
        self.last_processed.unwrap_or(self.start_date)
    }

    /// Whether enough days elapsed since the anchor for the template to count as pending.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && days_between(self.anchor(), now) >= self.frequency.pending_threshold_days()
    }

    /// Next calendar occurrence: one period after the last run, or the start date.
    pub fn next_due_date(&self) -> DateTime<Utc> {
        match self.last_processed {
            Some(last) => self.frequency.unit().next_datetime(last),
            None => self.start_date,
        }
    }

    /// Builds the concrete transaction for one processing run.
    pub fn spawn(&self, now: DateTime<Utc>) -> Transaction {
        let description = match self.description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => format!("Recurring: {}", self.frequency),
        };
        let mut txn = Transaction::new(
            self.account_id.clone(),
            self.merchant.clone(),
            self.category.clone(),
            round2(self.amount),
            now,
        )
        .with_description(description);
        txn.is_recurring = true;
        txn.recurring_id = Some(self.id.clone());
        txn
    }

    fn validate(&self) -> Result<()> {
        if self.merchant.trim().is_empty() {
            return Err(LedgerError::Validation("recurring merchant is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(LedgerError::Validation("recurring category is required".into()));
        }
        if self.account_id.trim().is_empty() {
            return Err(LedgerError::Validation("recurring account is required".into()));
        }
        if round2(self.amount).is_zero() {
            return Err(LedgerError::InvalidAmount(self.amount));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(LedgerError::Validation(
                    "recurring end date precedes start date".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Validated input for a new recurring template. The sign of `amount` encodes income versus
/// expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringDraft {
    pub merchant: String,
    pub category: String,
    pub amount: Decimal,
    pub account_id: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl RecurringDraft {
    pub fn new(
        merchant: impl Into<String>,
        category: impl Into<String>,
        amount: Decimal,
        account_id: impl Into<String>,
        frequency: Frequency,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            merchant: merchant.into(),
            category: category.into(),
            amount,
            account_id: account_id.into(),
            description: None,
            frequency,
            start_date,
            end_date: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn ending(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Produces an active template with a fresh id, or rejects malformed input.
    pub fn into_template(self) -> Result<RecurringTransaction> {
        let template = RecurringTransaction {
            id: new_id(),
            merchant: self.merchant.trim().to_string(),
            category: self.category.trim().to_string(),
            amount: round2(self.amount),
            account_id: self.account_id.trim().to_string(),
            description: self.description.filter(|text| !text.trim().is_empty()),
            frequency: self.frequency,
            start_date: self.start_date,
            end_date: self.end_date,
            last_processed: None,
            is_active: true,
        };
        template.validate()?;
        Ok(template)
    }
}

/// Field-by-field update of a template. `last_processed` is intentionally absent: only
/// processing moves it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurringPatch {
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub account_id: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl RecurringPatch {
    pub fn active(is_active: bool) -> Self {
        Self {
            is_active: Some(is_active),
            ..Self::default()
        }
    }

    /// Returns the patched copy of `template` after validating it.
    pub fn applied_to(self, template: &RecurringTransaction) -> Result<RecurringTransaction> {
        let mut next = template.clone();
        if let Some(merchant) = self.merchant {
            next.merchant = merchant.trim().to_string();
        }
        if let Some(category) = self.category {
            next.category = category.trim().to_string();
        }
        if let Some(amount) = self.amount {
            next.amount = round2(amount);
        }
        if let Some(account_id) = self.account_id {
            next.account_id = account_id.trim().to_string();
        }
        if let Some(description) = self.description {
            next.description = description.filter(|text| !text.trim().is_empty());
        }
        if let Some(frequency) = self.frequency {
            next.frequency = frequency;
        }
        if let Some(start_date) = self.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            next.end_date = end_date;
        }
        if let Some(is_active) = self.is_active {
            next.is_active = is_active;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Per-template view used by schedule listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceSnapshot {
    pub template_id: String,
    pub merchant: String,
    pub frequency: Frequency,
    pub next_due: DateTime<Utc>,
    pub days_since_anchor: i64,
    pub due: bool,
    pub is_active: bool,
}

/// Builds schedule snapshots ordered by next due date.
pub fn snapshot_recurrences(
    templates: &[RecurringTransaction],
    now: DateTime<Utc>,
) -> Vec<RecurrenceSnapshot> {
    let mut snapshots: Vec<RecurrenceSnapshot> = templates
        .iter()
        .map(|template| RecurrenceSnapshot {
            template_id: template.id.clone(),
            merchant: template.merchant.clone(),
            frequency: template.frequency,
            next_due: template.next_due_date(),
            days_since_anchor: days_between(template.anchor(), now),
            due: template.is_due(now),
            is_active: template.is_active,
        })
        .collect();
    snapshots.sort_by(|a, b| {
        a.next_due
            .cmp(&b.next_due)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
    snapshots
}
