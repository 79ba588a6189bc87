//! Ledger domain models, persistence-friendly types, and helpers.

pub mod account;
pub mod budget;
pub mod history;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod money;
pub mod recurring;
pub mod time_interval;
pub mod transaction;

pub use account::Account;
pub use budget::{Budget, BudgetDraft, BudgetPatch, BudgetPeriod};
pub use history::HistorySnapshot;
pub use ledger::{LedgerState, SeedData};
pub use money::{display_amount, round2};
pub use recurring::{
    snapshot_recurrences, Frequency, RecurrenceSnapshot, RecurringDraft, RecurringPatch,
    RecurringTransaction,
};
pub use time_interval::{PeriodWindow, TimeUnit};
pub use transaction::{Transaction, TRANSFER_CATEGORY};
