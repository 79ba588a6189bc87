use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{RecurringService, RecurringTotals};
use crate::ledger::{
    money::{round2, sum_rounded},
    LedgerState, PeriodWindow, Transaction,
};

/// Trailing report windows offered by the reports view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportRange {
    Week,
    #[default]
    Month,
    Year,
}

impl ReportRange {
    pub fn days(self) -> i64 {
        match self {
            ReportRange::Week => 7,
            ReportRange::Month => 30,
            ReportRange::Year => 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySpend {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub net: Decimal,
}

impl MonthlyTrend {
    /// Short label such as `Jun 2025`.
    pub fn label(&self) -> String {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|first| first.format("%b %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", self.year, self.month))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFlow {
    pub account_id: String,
    pub name: String,
    pub balance: Decimal,
    pub income: Decimal,
    pub expenses: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_balance: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub net_flow: Decimal,
    pub accounts: Vec<AccountFlow>,
    pub budget_count: usize,
    /// Budgets whose cached spend exceeds the limit.
    pub overspent_budgets: usize,
    pub active_recurring: usize,
    pub recurring: RecurringTotals,
}

/// Difference between a stored balance and opening balance plus transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDrift {
    pub account_id: String,
    pub expected: Decimal,
    pub actual: Decimal,
    pub drift: Decimal,
}

pub struct SummaryService;

impl SummaryService {
    /// Expense totals per category over the trailing range, largest first.
    pub fn category_spending(
        state: &LedgerState,
        range: ReportRange,
        account_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<CategorySpend> {
        let cutoff = PeriodWindow::trailing(now, range.days()).start;
        let mut totals: HashMap<&str, Decimal> = HashMap::new();
        for txn in state.transactions.iter().filter(|txn| {
            txn.is_expense()
                && txn.date > cutoff
                && account_id.map_or(true, |id| txn.account_id == id)
        }) {
            let total = totals.entry(txn.category.as_str()).or_default();
            *total = total.saturating_add(txn.amount.abs());
        }

        let mut spending: Vec<CategorySpend> = totals
            .into_iter()
            .map(|(category, amount)| CategorySpend {
                category: category.to_string(),
                amount: round2(amount),
            })
            .collect();
        spending.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.category.cmp(&b.category))
        });
        spending
    }

    /// Income, expense and net per calendar month of `zone`, oldest first, keeping the last
    /// `limit` months that have activity.
    pub fn monthly_trends<Tz: TimeZone>(
        state: &LedgerState,
        limit: usize,
        zone: &Tz,
    ) -> Vec<MonthlyTrend> {
        let mut months: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();
        for txn in &state.transactions {
            let local = txn.date.with_timezone(zone);
            let entry = months.entry((local.year(), local.month())).or_default();
            if txn.amount >= Decimal::ZERO {
                entry.0 = entry.0.saturating_add(txn.amount);
            } else {
                entry.1 = entry.1.saturating_add(txn.amount.abs());
            }
        }

        let skip = months.len().saturating_sub(limit);
        months
            .into_iter()
            .skip(skip)
            .map(|((year, month), (income, expense))| MonthlyTrend {
                year,
                month,
                income: round2(income),
                expense: round2(expense),
                net: round2(income.saturating_sub(expense)),
            })
            .collect()
    }

    pub fn dashboard(state: &LedgerState) -> DashboardSummary {
        let (total_income, total_expenses) = flows(state.transactions.iter());
        let accounts = state
            .accounts
            .iter()
            .map(|account| {
                let (income, expenses) = flows(
                    state
                        .transactions
                        .iter()
                        .filter(|txn| txn.account_id == account.id),
                );
                AccountFlow {
                    account_id: account.id.clone(),
                    name: account.name.clone(),
                    balance: account.balance,
                    income,
                    expenses,
                }
            })
            .collect();

        DashboardSummary {
            total_balance: sum_rounded(state.accounts.iter().map(|account| account.balance)),
            total_income,
            total_expenses,
            net_flow: total_income.saturating_sub(total_expenses),
            accounts,
            budget_count: state.budgets.len(),
            overspent_budgets: state
                .budgets
                .iter()
                .filter(|budget| budget.spent.is_some_and(|spent| spent > budget.limit))
                .count(),
            active_recurring: state
                .recurring_transactions
                .iter()
                .filter(|template| template.is_active)
                .count(),
            recurring: RecurringService::totals(state),
        }
    }

    /// Accounts whose balance differs from `opening` plus the sum of their transactions.
    /// Accounts absent from `opening` are assumed to have opened at zero.
    pub fn unreconciled_accounts(
        state: &LedgerState,
        opening: &HashMap<String, Decimal>,
    ) -> Vec<BalanceDrift> {
        state
            .accounts
            .iter()
            .filter_map(|account| {
                let start = opening.get(&account.id).copied().unwrap_or_default();
                let expected = round2(start.saturating_add(state.transaction_total(&account.id)));
                let drift = round2(account.balance.saturating_sub(expected));
                (!drift.is_zero()).then(|| BalanceDrift {
                    account_id: account.id.clone(),
                    expected,
                    actual: account.balance,
                    drift,
                })
            })
            .collect()
    }
}

fn flows<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> (Decimal, Decimal) {
    let (mut income, mut expenses) = (Decimal::ZERO, Decimal::ZERO);
    for txn in transactions {
        if txn.amount > Decimal::ZERO {
            income = income.saturating_add(txn.amount);
        } else {
            expenses = expenses.saturating_add(txn.amount.abs());
        }
    }
    (round2(income), round2(expenses))
}
