use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::round2;
use super::time_interval::TimeUnit;
use super::transaction::new_id;
use crate::errors::{LedgerError, Result};

/// A spending cap on a category for a recurring calendar period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub limit: Decimal,
    pub period: BudgetPeriod,
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
        with = "rust_decimal::serde::float_option"
    )]
    pub spent: Option<Decimal>,
}

/// Enumeration of budgeting periods.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
    Yearly,
}

impl BudgetPeriod {
    pub fn unit(self) -> TimeUnit {
        match self {
            BudgetPeriod::Weekly => TimeUnit::Week,
            BudgetPeriod::Monthly => TimeUnit::Month,
            BudgetPeriod::Yearly => TimeUnit::Year,
        }
    }
}

impl Budget {
    fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(LedgerError::Validation("budget category is required".into()));
        }
        if self.limit <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(self.limit));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(LedgerError::Validation(
                    "budget end date precedes start date".into(),
                ));
            }
        }
        Ok(())
    }
}

/// User input for a new budget; the store assigns the id. Without an explicit start the
/// budget starts at the store clock's "now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetDraft {
    pub category: String,
    pub limit: Decimal,
    pub period: BudgetPeriod,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl BudgetDraft {
    pub fn new(category: impl Into<String>, limit: Decimal, period: BudgetPeriod) -> Self {
        Self {
            category: category.into(),
            limit,
            period,
            start_date: None,
            end_date: None,
        }
    }

    pub fn starting(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn ending(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn into_budget(self, now: DateTime<Utc>) -> Result<Budget> {
        let budget = Budget {
            id: new_id(),
            category: self.category.trim().to_string(),
            limit: round2(self.limit),
            period: self.period,
            start_date: self.start_date.unwrap_or(now),
            end_date: self.end_date,
            spent: Some(Decimal::ZERO),
        };
        budget.validate()?;
        Ok(budget)
    }
}

/// Field-by-field update of a budget; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetPatch {
    pub category: Option<String>,
    pub limit: Option<Decimal>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub spent: Option<Decimal>,
}

impl BudgetPatch {
    /// Returns the patched copy of `budget` after validating it.
    pub fn applied_to(self, budget: &Budget) -> Result<Budget> {
        let mut next = budget.clone();
        if let Some(category) = self.category {
            next.category = category.trim().to_string();
        }
        if let Some(limit) = self.limit {
            next.limit = round2(limit);
        }
        if let Some(period) = self.period {
            next.period = period;
        }
        if let Some(start_date) = self.start_date {
            next.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            next.end_date = end_date;
        }
        if let Some(spent) = self.spent {
            next.spent = Some(round2(spent));
        }
        next.validate()?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn draft_starts_with_zero_spent_at_now() {
        let budget = BudgetDraft::new("Food", dec!(300), BudgetPeriod::Monthly)
            .into_budget(at())
            .unwrap();
        assert_eq!(budget.spent, Some(Decimal::ZERO));
        assert_eq!(budget.start_date, at());
        assert!(!budget.id.is_empty());
    }

    #[test]
    fn end_before_start_is_rejected_by_draft_and_patch() {
        let inverted = BudgetDraft::new("Food", dec!(300), BudgetPeriod::Monthly)
            .starting(at())
            .ending(at() - Duration::days(1))
            .into_budget(at());
        assert!(matches!(inverted, Err(LedgerError::Validation(_))));

        let budget = BudgetDraft::new("Food", dec!(300), BudgetPeriod::Monthly)
            .into_budget(at())
            .unwrap();
        let patch = BudgetPatch {
            end_date: Some(Some(at() - Duration::days(1))),
            ..BudgetPatch::default()
        };
        assert!(matches!(patch.applied_to(&budget), Err(LedgerError::Validation(_))));

        let patch = BudgetPatch {
            start_date: Some(at() + Duration::days(10)),
            end_date: Some(Some(at() + Duration::days(40))),
            ..BudgetPatch::default()
        };
        let moved = patch.applied_to(&budget).unwrap();
        assert_eq!(moved.start_date, at() + Duration::days(10));
    }

    #[test]
    fn draft_rejects_non_positive_limit() {
        let err = BudgetDraft::new("Food", dec!(0), BudgetPeriod::Weekly)
            .into_budget(at())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = BudgetDraft::new("  ", dec!(10), BudgetPeriod::Weekly)
            .into_budget(at())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn period_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BudgetPeriod::Yearly).unwrap(),
            "\"yearly\""
        );
    }
}
