//! The single authoritative ledger container.
//!
//! `LedgerStore` keeps the committed [`LedgerState`] behind an `Arc` and serialises every
//! mutation through one async mutex. A mutation runs against a private copy and is swapped in
//! only once it succeeds, so readers always see a fully applied state.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use chrono::{DateTime, Local, Utc, Weekday};
use rust_decimal::Decimal;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::action::{reduce, Action, ReduceContext};
use super::services::{
    BalanceDrift, BudgetProgress, BudgetService, CategorySpend, ChangeSummary, DailyBalance,
    DashboardSummary, ExportFormat, ExportService, HistoryService, MonthlyTrend, ProcessMode,
    QueryService, RecurringService, RecurringTotals, ReportRange, SummaryService,
    TransactionFilter, TransactionService, TransferRequest,
};
use crate::errors::{LedgerError, Result};
use crate::ledger::{
    account::DEFAULT_CURRENCY, Budget, BudgetDraft, BudgetPatch, HistorySnapshot, LedgerState,
    RecurrenceSnapshot, RecurringDraft, RecurringPatch, SeedData, Transaction,
};
use crate::storage::SnapshotStorage;
use crate::time::{Clock, SystemClock};

pub const DEFAULT_TRANSFER_LATENCY: Duration = Duration::from_millis(600);
pub const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 30;

/// Decides whether a transfer that passed validation fails after its latency elapses.
pub trait FailureInjector: Send + Sync + fmt::Debug {
    fn should_fail(&self, request: &TransferRequest) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverFail;

impl FailureInjector for NeverFail {
    fn should_fail(&self, _request: &TransferRequest) -> bool {
        false
    }
}

/// Fails the next `n` transfers, then lets the rest through.
#[derive(Debug, Default)]
pub struct FailNext {
    remaining: AtomicUsize,
}

impl FailNext {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

impl FailureInjector for FailNext {
    fn should_fail(&self, _request: &TransferRequest) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub transfer_latency: Duration,
    pub failure_injector: Arc<dyn FailureInjector>,
    pub week_start: Weekday,
    pub currency: String,
    pub history_window_days: i64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            transfer_latency: DEFAULT_TRANSFER_LATENCY,
            failure_injector: Arc::new(NeverFail),
            week_start: Weekday::Sun,
            currency: DEFAULT_CURRENCY.to_string(),
            history_window_days: DEFAULT_HISTORY_WINDOW_DAYS,
        }
    }
}

impl StoreSettings {
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.transfer_latency = latency;
        self
    }

    pub fn with_failure_injector(mut self, injector: Arc<dyn FailureInjector>) -> Self {
        self.failure_injector = injector;
        self
    }
}

/// Notification handed to subscribers after each commit.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub action: &'static str,
    pub state: Arc<LedgerState>,
    pub summary: ChangeSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&StateChange) + Send + Sync>;

pub struct LedgerStore {
    committed: RwLock<Arc<LedgerState>>,
    mutation: AsyncMutex<()>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    next_subscription: AtomicU64,
    settings: StoreSettings,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerStore")
            .field("settings", &self.settings)
            .field("subscribers", &lock(&self.listeners).len())
            .finish_non_exhaustive()
    }
}

impl LedgerStore {
    pub fn new(seed: SeedData, settings: StoreSettings, clock: Arc<dyn Clock>) -> Self {
        let state = LedgerState::from_seed_with_currency(seed, &settings.currency);
        Self::from_state(state, settings, clock)
    }

    pub fn from_state(state: LedgerState, settings: StoreSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            committed: RwLock::new(Arc::new(state)),
            mutation: AsyncMutex::new(()),
            listeners: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            settings,
            clock,
        }
    }

    /// Seeded store on the system clock with default settings.
    pub fn with_seed(seed: SeedData) -> Self {
        Self::new(seed, StoreSettings::default(), Arc::new(SystemClock))
    }

    /// Restores the persisted state when `storage` has one, otherwise seeds a fresh ledger.
    pub fn open(
        seed: SeedData,
        storage: &dyn SnapshotStorage,
        settings: StoreSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        match storage.load()? {
            Some(state) => {
                info!(
                    accounts = state.accounts.len(),
                    transactions = state.transactions.len(),
                    "restored persisted ledger"
                );
                Ok(Self::from_state(state, settings, clock))
            }
            None => {
                info!(accounts = seed.accounts.len(), "seeding new ledger");
                Ok(Self::new(seed, settings, clock))
            }
        }
    }

    /// Current committed snapshot.
    pub fn state(&self) -> Arc<LedgerState> {
        match self.committed.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn context(&self) -> ReduceContext {
        ReduceContext {
            now: self.now(),
            week_start: self.settings.week_start,
            currency: self.settings.currency.clone(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::SeqCst));
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` when the id was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Applies one action as a single state transition.
    pub async fn dispatch(&self, action: Action) -> Result<ChangeSummary> {
        if let Action::Transfer(request) = action {
            return self.transfer(request).await;
        }

        let _guard = self.mutation.lock().await;
        let name = action.name();
        let mut working = LedgerState::clone(&self.state());
        match reduce(&mut working, action, &self.context()) {
            Ok(summary) => {
                if !summary.matched {
                    debug!(action = name, "no matching entity, nothing changed");
                } else if summary.is_noop() {
                    debug!(action = name, "nothing to change");
                } else {
                    if !summary.recurring_skipped.is_empty() {
                        warn!(
                            action = name,
                            skipped = ?summary.recurring_skipped,
                            "recurring templates reference missing accounts"
                        );
                    }
                    self.commit(name, working, &summary);
                }
                Ok(summary)
            }
            Err(err) => {
                debug!(action = name, error = %err, "action rejected");
                Err(err)
            }
        }
    }

    /// Moves money between accounts after the configured latency.
    ///
    /// Validation failures return before the delay. A transfer the failure injector rejects is
    /// discarded without ever becoming visible.
    pub async fn transfer(&self, request: TransferRequest) -> Result<ChangeSummary> {
        let _guard = self.mutation.lock().await;
        let now = self.now();
        let mut working = LedgerState::clone(&self.state());
        let summary = match TransactionService::transfer(&mut working, &request, now) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(from = %request.from, to = %request.to, amount = %request.amount, error = %err, "transfer rejected");
                return Err(err);
            }
        };

        if !self.settings.transfer_latency.is_zero() {
            tokio::time::sleep(self.settings.transfer_latency).await;
        }

        if self.settings.failure_injector.should_fail(&request) {
            warn!(from = %request.from, to = %request.to, amount = %request.amount, "transfer failed, rolled back");
            return Err(LedgerError::TransferFailed(format!(
                "transfer from `{}` to `{}` did not complete",
                request.from, request.to
            )));
        }

        info!(from = %request.from, to = %request.to, amount = %request.amount, "transfer committed");
        self.commit("transfer", working, &summary);
        Ok(summary)
    }

    fn commit(&self, action: &'static str, next: LedgerState, summary: &ChangeSummary) {
        let next = Arc::new(next);
        match self.committed.write() {
            Ok(mut guard) => *guard = Arc::clone(&next),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&next),
        }
        debug!(
            action,
            accounts = ?summary.accounts_touched,
            created = summary.transactions_created.len(),
            removed = summary.transactions_removed.len(),
            history = summary.history_appended,
            "state committed"
        );

        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            return;
        }
        let change = StateChange {
            action,
            state: next,
            summary: summary.clone(),
        };
        for listener in listeners {
            listener(&change);
        }
    }

    pub async fn add_transaction(&self, transaction: Transaction) -> Result<ChangeSummary> {
        self.dispatch(Action::AddTransaction(transaction)).await
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<ChangeSummary> {
        self.dispatch(Action::DeleteTransaction(id.to_string())).await
    }

    pub async fn transfer_between(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<ChangeSummary> {
        let mut request = TransferRequest::new(from, to, amount);
        request.description = description.map(str::to_string);
        self.transfer(request).await
    }

    pub async fn add_budget(&self, draft: BudgetDraft) -> Result<ChangeSummary> {
        self.dispatch(Action::AddBudget(draft)).await
    }

    pub async fn update_budget(&self, id: &str, patch: BudgetPatch) -> Result<ChangeSummary> {
        self.dispatch(Action::UpdateBudget {
            id: id.to_string(),
            patch,
        })
        .await
    }

    pub async fn delete_budget(&self, id: &str) -> Result<ChangeSummary> {
        self.dispatch(Action::DeleteBudget(id.to_string())).await
    }

    pub async fn refresh_budget_spending(&self) -> Result<ChangeSummary> {
        self.dispatch(Action::RefreshBudgetSpending).await
    }

    pub async fn add_recurring(&self, draft: RecurringDraft) -> Result<ChangeSummary> {
        self.dispatch(Action::AddRecurring(draft)).await
    }

    pub async fn update_recurring(&self, id: &str, patch: RecurringPatch) -> Result<ChangeSummary> {
        self.dispatch(Action::UpdateRecurring {
            id: id.to_string(),
            patch,
        })
        .await
    }

    pub async fn delete_recurring(&self, id: &str) -> Result<ChangeSummary> {
        self.dispatch(Action::DeleteRecurring(id.to_string())).await
    }

    pub async fn toggle_recurring(&self, id: &str) -> Result<ChangeSummary> {
        self.dispatch(Action::ToggleRecurring(id.to_string())).await
    }

    pub async fn process_recurring(&self, mode: ProcessMode) -> Result<ChangeSummary> {
        let summary = self.dispatch(Action::ProcessRecurring(mode)).await?;
        info!(
            ?mode,
            created = summary.transactions_created.len(),
            skipped = summary.recurring_skipped.len(),
            "processed recurring transactions"
        );
        Ok(summary)
    }

    pub async fn add_history(&self, snapshot: HistorySnapshot) -> Result<ChangeSummary> {
        self.dispatch(Action::AddHistory(snapshot)).await
    }

    pub async fn reset(&self, seed: SeedData) -> Result<ChangeSummary> {
        self.dispatch(Action::Reset(seed)).await
    }

    pub fn calculate_budget_spending(&self, budget: &Budget) -> Decimal {
        let now = self.now().with_timezone(&Local);
        BudgetService::calculate_spending(&self.state(), budget, &now, self.settings.week_start)
    }

    pub fn budget_progress(&self) -> Vec<BudgetProgress> {
        let now = self.now().with_timezone(&Local);
        BudgetService::progress_all(&self.state(), &now, self.settings.week_start)
    }

    /// Snapshots for one account, oldest first. `None` uses the configured window.
    pub fn account_history(&self, account_id: &str, days: Option<i64>) -> Vec<HistorySnapshot> {
        let days = days.unwrap_or(self.settings.history_window_days);
        HistoryService::account_history(&self.state(), account_id, days, self.now())
    }

    pub fn combined_daily_history(&self, days: Option<i64>) -> Vec<DailyBalance> {
        let days = days.unwrap_or(self.settings.history_window_days);
        HistoryService::combined_daily_history(&self.state(), days, &self.now().with_timezone(&Local))
    }

    pub fn filter_transactions(&self, filter: &TransactionFilter) -> Vec<Transaction> {
        QueryService::filter(&self.state(), filter)
    }

    pub fn export_transactions(&self, format: ExportFormat) -> Result<String> {
        ExportService::export(&self.state(), format)
    }

    pub fn export_filtered(&self, format: ExportFormat, filter: &TransactionFilter) -> Result<String> {
        ExportService::export_filtered(&self.state(), format, filter)
    }

    pub fn pending_recurring_count(&self) -> usize {
        RecurringService::pending_count(&self.state(), self.now())
    }

    pub fn recurring_totals(&self) -> RecurringTotals {
        RecurringService::totals(&self.state())
    }

    pub fn recurrence_schedule(&self) -> Vec<RecurrenceSnapshot> {
        RecurringService::schedule(&self.state(), self.now())
    }

    pub fn category_spending(&self, range: ReportRange, account_id: Option<&str>) -> Vec<CategorySpend> {
        SummaryService::category_spending(&self.state(), range, account_id, self.now())
    }

    pub fn monthly_trends(&self, limit: usize) -> Vec<MonthlyTrend> {
        SummaryService::monthly_trends(&self.state(), limit, &Local)
    }

    pub fn dashboard(&self) -> DashboardSummary {
        SummaryService::dashboard(&self.state())
    }

    pub fn unreconciled_accounts(&self, opening: &HashMap<String, Decimal>) -> Vec<BalanceDrift> {
        SummaryService::unreconciled_accounts(&self.state(), opening)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::fixtures::{now, two_accounts};
    use crate::time::FixedClock;
    use rust_decimal_macros::dec;

    fn store(settings: StoreSettings) -> LedgerStore {
        LedgerStore::from_state(two_accounts(), settings, Arc::new(FixedClock::new(now())))
    }

    #[test]
    fn fail_next_counts_down() {
        let injector = FailNext::new(2);
        let request = TransferRequest::new("a", "b", dec!(1));
        assert!(injector.should_fail(&request));
        assert!(injector.should_fail(&request));
        assert!(!injector.should_fail(&request));
        assert_eq!(injector.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_commits_and_notifies() {
        let store = store(StoreSettings::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(move |change| {
            lock(&sink).push((change.action, change.state.balance_of("main")));
        });

        let txn = Transaction::new("main", "Cafe", "Food", dec!(-5), now());
        store.add_transaction(txn).await.unwrap();
        assert_eq!(store.state().balance_of("main"), Some(dec!(995)));
        assert_eq!(*lock(&seen), vec![("add_transaction", Some(dec!(995)))]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.delete_transaction("missing").await.unwrap();
        assert_eq!(lock(&seen).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_snapshots_stay_immutable() {
        let store = store(StoreSettings::default());
        let before = store.state();
        store
            .transfer(TransferRequest::new("main", "savings", dec!(200)))
            .await
            .unwrap();
        assert_eq!(before.balance_of("main"), Some(dec!(1000)));
        assert_eq!(store.state().balance_of("main"), Some(dec!(800)));
    }

    #[tokio::test(start_paused = true)]
    async fn injected_failure_discards_transfer() {
        let settings =
            StoreSettings::default().with_failure_injector(Arc::new(FailNext::new(1)));
        let store = store(settings);
        let before = store.state();

        let err = store
            .transfer(TransferRequest::new("main", "savings", dec!(200)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::TransferFailed(_)));
        assert_eq!(*store.state(), *before);

        store
            .transfer(TransferRequest::new("main", "savings", dec!(200)))
            .await
            .unwrap();
        assert_eq!(store.state().balance_of("savings"), Some(dec!(700)));
    }
}
