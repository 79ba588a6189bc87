use chrono::{DateTime, Local, Utc, Weekday};

use super::services::{
    BudgetService, ChangeSummary, HistoryService, ProcessMode, RecurringService, ServiceResult,
    TransactionService, TransferRequest,
};
use crate::ledger::{
    account::DEFAULT_CURRENCY, BudgetDraft, BudgetPatch, HistorySnapshot, LedgerState,
    RecurringDraft, RecurringPatch, SeedData, Transaction,
};

/// Every mutation the store accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddTransaction(Transaction),
    DeleteTransaction(String),
    Transfer(TransferRequest),
    AddBudget(BudgetDraft),
    UpdateBudget { id: String, patch: BudgetPatch },
    DeleteBudget(String),
    RefreshBudgetSpending,
    AddRecurring(RecurringDraft),
    UpdateRecurring { id: String, patch: RecurringPatch },
    DeleteRecurring(String),
    ToggleRecurring(String),
    ProcessRecurring(ProcessMode),
    AddHistory(HistorySnapshot),
    Reset(SeedData),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::AddTransaction(_) => "add_transaction",
            Action::DeleteTransaction(_) => "delete_transaction",
            Action::Transfer(_) => "transfer",
            Action::AddBudget(_) => "add_budget",
            Action::UpdateBudget { .. } => "update_budget",
            Action::DeleteBudget(_) => "delete_budget",
            Action::RefreshBudgetSpending => "refresh_budget_spending",
            Action::AddRecurring(_) => "add_recurring",
            Action::UpdateRecurring { .. } => "update_recurring",
            Action::DeleteRecurring(_) => "delete_recurring",
            Action::ToggleRecurring(_) => "toggle_recurring",
            Action::ProcessRecurring(_) => "process_recurring",
            Action::AddHistory(_) => "add_history",
            Action::Reset(_) => "reset",
        }
    }
}

/// Ambient inputs a transition may read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceContext {
    pub now: DateTime<Utc>,
    pub week_start: Weekday,
    pub currency: String,
}

impl ReduceContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            week_start: Weekday::Sun,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// Applies `action` to `state`. On `Err` the state is unchanged.
///
/// Transfers go through here without latency; the store adds the delay and failure hook.
pub fn reduce(
    state: &mut LedgerState,
    action: Action,
    ctx: &ReduceContext,
) -> ServiceResult<ChangeSummary> {
    let now = ctx.now;
    match action {
        Action::AddTransaction(txn) => TransactionService::add(state, txn, now),
        Action::DeleteTransaction(id) => TransactionService::delete(state, &id, now),
        Action::Transfer(request) => TransactionService::transfer(state, &request, now),
        Action::AddBudget(draft) => BudgetService::add(state, draft, now),
        Action::UpdateBudget { id, patch } => BudgetService::update(state, &id, patch),
        Action::DeleteBudget(id) => Ok(BudgetService::delete(state, &id)),
        Action::RefreshBudgetSpending => Ok(BudgetService::refresh_spent(
            state,
            &now.with_timezone(&Local),
            ctx.week_start,
        )),
        Action::AddRecurring(draft) => RecurringService::add(state, draft),
        Action::UpdateRecurring { id, patch } => RecurringService::update(state, &id, patch),
        Action::DeleteRecurring(id) => RecurringService::delete(state, &id, now),
        Action::ToggleRecurring(id) => Ok(RecurringService::toggle_active(state, &id)),
        Action::ProcessRecurring(mode) => Ok(RecurringService::process(state, mode, now)),
        Action::AddHistory(snapshot) => Ok(HistoryService::record(state, snapshot)),
        Action::Reset(seed) => {
            *state = LedgerState::from_seed_with_currency(seed, &ctx.currency);
            let mut summary = ChangeSummary {
                replaced: true,
                ..ChangeSummary::matched()
            };
            for account in &state.accounts {
                summary.touch_account(&account.id);
            }
            Ok(summary)
        }
    }
}
