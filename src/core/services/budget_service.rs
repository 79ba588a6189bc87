use chrono::{DateTime, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{ChangeSummary, ServiceResult};
use crate::ledger::{
    money::{round2, sum_rounded},
    Budget, BudgetDraft, BudgetPatch, LedgerState, PeriodWindow,
};

const WARNING_PERCENT: Decimal = Decimal::from_parts(70, 0, 0, false, 0);
const OVER_LIMIT_PERCENT: Decimal = Decimal::from_parts(90, 0, 0, false, 0);
const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Traffic-light classification of how much of a budget is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BudgetHealth {
    OnTrack,
    Warning,
    OverLimit,
}

impl BudgetHealth {
    fn from_percent(percent: Decimal) -> Self {
        if percent < WARNING_PERCENT {
            BudgetHealth::OnTrack
        } else if percent < OVER_LIMIT_PERCENT {
            BudgetHealth::Warning
        } else {
            BudgetHealth::OverLimit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    pub budget_id: String,
    pub category: String,
    pub spent: Decimal,
    pub limit: Decimal,
    /// Negative once the budget is overspent.
    pub remaining: Decimal,
    /// Share of the limit used, capped at 100.
    pub percent: Decimal,
    pub health: BudgetHealth,
}

impl BudgetProgress {
    pub fn is_overspent(&self) -> bool {
        self.spent > self.limit
    }
}

pub struct BudgetService;

impl BudgetService {
    pub fn add(
        state: &mut LedgerState,
        draft: BudgetDraft,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChangeSummary> {
        let budget = draft.into_budget(now)?;
        let mut summary = ChangeSummary::matched();
        summary.budgets_changed.push(budget.id.clone());
        state.budgets.push(budget);
        Ok(summary)
    }

    /// Applies `patch` to the budget with `id`. An unknown id is reported through
    /// `ChangeSummary::matched`.
    pub fn update(
        state: &mut LedgerState,
        id: &str,
        patch: BudgetPatch,
    ) -> ServiceResult<ChangeSummary> {
        let Some(current) = state.budget(id) else {
            return Ok(ChangeSummary::no_match());
        };
        let next = patch.applied_to(current)?;
        if let Some(slot) = state.budget_mut(id) {
            *slot = next;
        }
        let mut summary = ChangeSummary::matched();
        summary.budgets_changed.push(id.to_string());
        Ok(summary)
    }

    pub fn delete(state: &mut LedgerState, id: &str) -> ChangeSummary {
        let before = state.budgets.len();
        state.budgets.retain(|budget| budget.id != id);
        if state.budgets.len() == before {
            return ChangeSummary::no_match();
        }
        let mut summary = ChangeSummary::matched();
        summary.budgets_changed.push(id.to_string());
        summary
    }

    /// Calendar period of `budget` that contains `now`, bounded by local midnights of `now`'s zone.
    pub fn current_window<Tz: TimeZone>(
        budget: &Budget,
        now: &DateTime<Tz>,
        week_start: Weekday,
    ) -> PeriodWindow {
        PeriodWindow::calendar(budget.period.unit(), now, week_start)
    }

    /// Sum of absolute expense amounts in the budget's category dated inside the current period.
    ///
    /// The window is derived from `now` alone; the budget's own start date plays no part.
    pub fn calculate_spending<Tz: TimeZone>(
        state: &LedgerState,
        budget: &Budget,
        now: &DateTime<Tz>,
        week_start: Weekday,
    ) -> Decimal {
        let window = Self::current_window(budget, now, week_start);
        sum_rounded(
            state
                .transactions
                .iter()
                .filter(|txn| txn.category == budget.category && txn.is_expense())
                .filter(|txn| window.contains(txn.date))
                .map(|txn| txn.amount.abs()),
        )
    }

    pub fn progress<Tz: TimeZone>(
        state: &LedgerState,
        budget: &Budget,
        now: &DateTime<Tz>,
        week_start: Weekday,
    ) -> BudgetProgress {
        let spent = Self::calculate_spending(state, budget, now, week_start);
        let raw_percent = spent
            .checked_div(budget.limit)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .map_or(HUNDRED, round2);
        BudgetProgress {
            budget_id: budget.id.clone(),
            category: budget.category.clone(),
            spent,
            limit: budget.limit,
            remaining: round2(budget.limit.saturating_sub(spent)),
            percent: raw_percent.min(HUNDRED),
            health: BudgetHealth::from_percent(raw_percent),
        }
    }

    pub fn progress_all<Tz: TimeZone>(
        state: &LedgerState,
        now: &DateTime<Tz>,
        week_start: Weekday,
    ) -> Vec<BudgetProgress> {
        state
            .budgets
            .iter()
            .map(|budget| Self::progress(state, budget, now, week_start))
            .collect()
    }

    /// Stores the current-period spend on every budget whose cached value is stale.
    pub fn refresh_spent<Tz: TimeZone>(
        state: &mut LedgerState,
        now: &DateTime<Tz>,
        week_start: Weekday,
    ) -> ChangeSummary {
        let fresh: Vec<(usize, Decimal)> = state
            .budgets
            .iter()
            .enumerate()
            .map(|(index, budget)| {
                (index, Self::calculate_spending(state, budget, now, week_start))
            })
            .collect();

        let mut summary = ChangeSummary::matched();
        for (index, spent) in fresh {
            let budget = &mut state.budgets[index];
            if budget.spent != Some(spent) {
                budget.spent = Some(spent);
                summary.budgets_changed.push(budget.id.clone());
            }
        }
        summary
    }
}
