//! Reducer-style transitions over [`LedgerState`] and the pure queries built on it.
//!
//! Every mutation validates before writing, so an `Err` always leaves the state untouched.
//!
//! [`LedgerState`]: crate::ledger::LedgerState

pub mod budget_service;
pub mod export_service;
pub mod history_service;
pub mod query_service;
pub mod recurring_service;
pub mod summary_service;
pub mod transaction_service;

pub use budget_service::{BudgetHealth, BudgetProgress, BudgetService};
pub use export_service::{ExportFormat, ExportService};
pub use history_service::{DailyBalance, HistoryService, HistoryStats};
pub use query_service::{QueryService, TransactionFilter};
pub use recurring_service::{ProcessMode, RecurringService, RecurringTotals};
pub use summary_service::{
    AccountFlow, BalanceDrift, CategorySpend, DashboardSummary, MonthlyTrend, ReportRange,
    SummaryService,
};
pub use transaction_service::{TransactionService, TransferRequest};

use serde::Serialize;

use crate::errors::LedgerError;

pub type ServiceResult<T> = Result<T, LedgerError>;

/// What a committed transition changed; the store hands it to subscribers and logs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// `false` when an id-keyed update or delete found nothing to act on.
    pub matched: bool,
    pub accounts_touched: Vec<String>,
    pub transactions_created: Vec<String>,
    pub transactions_removed: Vec<String>,
    pub history_appended: usize,
    pub budgets_changed: Vec<String>,
    pub recurring_changed: Vec<String>,
    /// Recurring templates left unprocessed because their account does not exist.
    pub recurring_skipped: Vec<String>,
    /// The whole state was swapped for a fresh seed.
    pub replaced: bool,
}

impl ChangeSummary {
    pub fn matched() -> Self {
        Self {
            matched: true,
            ..Self::default()
        }
    }

    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        !self.replaced
            && self.accounts_touched.is_empty()
            && self.transactions_created.is_empty()
            && self.transactions_removed.is_empty()
            && self.history_appended == 0
            && self.budgets_changed.is_empty()
            && self.recurring_changed.is_empty()
    }

    pub(crate) fn touch_account(&mut self, account_id: &str) {
        if !self.accounts_touched.iter().any(|id| id == account_id) {
            self.accounts_touched.push(account_id.to_string());
        }
    }

    pub(crate) fn record_balance_change(&mut self, account_id: &str) {
        self.touch_account(account_id);
        self.history_appended += 1;
    }

    pub(crate) fn merge(&mut self, other: ChangeSummary) {
        self.matched |= other.matched;
        self.replaced |= other.replaced;
        for account in other.accounts_touched {
            self.touch_account(&account);
        }
        self.transactions_created.extend(other.transactions_created);
        self.transactions_removed.extend(other.transactions_removed);
        self.history_appended += other.history_appended;
        self.budgets_changed.extend(other.budgets_changed);
        self.recurring_changed.extend(other.recurring_changed);
        self.recurring_skipped.extend(other.recurring_skipped);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    use crate::ledger::{Account, LedgerState, SeedData};

    /// Wednesday 2025-06-11 12:00 UTC.
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 12, 0, 0).unwrap()
    }

    pub fn two_accounts() -> LedgerState {
        LedgerState::from_seed(SeedData::new(
            vec![
                Account::new("main", "Main Account", dec!(1000)),
                Account::new("savings", "Savings", dec!(500)),
            ],
            Vec::new(),
        ))
    }
}
