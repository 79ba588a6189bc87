use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    account::{Account, DEFAULT_CURRENCY},
    budget::Budget,
    history::HistorySnapshot,
    money::{round2, sum_rounded},
    recurring::RecurringTransaction,
    transaction::Transaction,
};
use crate::errors::{LedgerError, Result};

/// The whole wallet: every collection the engine keeps consistent.
///
/// `transactions` and `account_history` are stored newest-first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerState {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: VecDeque<Transaction>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
    #[serde(default)]
    pub recurring_transactions: Vec<RecurringTransaction>,
    #[serde(default)]
    pub account_history: VecDeque<HistorySnapshot>,
}

/// Initial accounts and transactions the store is seeded from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedData {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl SeedData {
    pub fn new(accounts: Vec<Account>, transactions: Vec<Transaction>) -> Self {
        Self {
            accounts,
            transactions,
        }
    }

    /// Parses the two seed collections from their JSON array documents.
    pub fn from_json_str(accounts_json: &str, transactions_json: &str) -> Result<Self> {
        let accounts: Vec<Account> = serde_json::from_str(accounts_json)?;
        let transactions: Vec<Transaction> = serde_json::from_str(transactions_json)?;
        Ok(Self::new(accounts, transactions))
    }

    pub fn from_json_files(accounts_path: &Path, transactions_path: &Path) -> Result<Self> {
        let accounts = fs::read_to_string(accounts_path)?;
        let transactions = fs::read_to_string(transactions_path)?;
        Self::from_json_str(&accounts, &transactions)
    }
}

impl LedgerState {
    /// Builds a fresh state from seed data, filling account defaults.
    pub fn from_seed(seed: SeedData) -> Self {
        Self::from_seed_with_currency(seed, DEFAULT_CURRENCY)
    }

    pub fn from_seed_with_currency(seed: SeedData, currency: &str) -> Self {
        let mut accounts = seed.accounts;
        for account in &mut accounts {
            account.apply_defaults(currency);
        }
        Self {
            accounts,
            transactions: seed.transactions.into(),
            budgets: Vec::new(),
            recurring_transactions: Vec::new(),
            account_history: VecDeque::new(),
        }
    }

    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|account| account.id == id)
    }

    pub fn account_mut(&mut self, id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|account| account.id == id)
    }

    pub fn has_account(&self, id: &str) -> bool {
        self.account(id).is_some()
    }

    pub fn require_account(&self, id: &str) -> Result<&Account> {
        self.account(id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    pub fn balance_of(&self, id: &str) -> Option<Decimal> {
        self.account(id).map(|account| account.balance)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn transaction_position(&self, id: &str) -> Option<usize> {
        self.transactions.iter().position(|txn| txn.id == id)
    }

    pub fn budget(&self, id: &str) -> Option<&Budget> {
        self.budgets.iter().find(|budget| budget.id == id)
    }

    pub fn budget_mut(&mut self, id: &str) -> Option<&mut Budget> {
        self.budgets.iter_mut().find(|budget| budget.id == id)
    }

    pub fn recurring(&self, id: &str) -> Option<&RecurringTransaction> {
        self.recurring_transactions
            .iter()
            .find(|template| template.id == id)
    }

    pub fn recurring_mut(&mut self, id: &str) -> Option<&mut RecurringTransaction> {
        self.recurring_transactions
            .iter_mut()
            .find(|template| template.id == id)
    }

    /// Sum of every transaction amount attributed to the account.
    pub fn transaction_total(&self, account_id: &str) -> Decimal {
        sum_rounded(
            self.transactions
                .iter()
                .filter(|txn| txn.account_id == account_id)
                .map(|txn| txn.amount),
        )
    }

    /// Balance the account would hold after `delta`, or `InvalidAmount` when the sum overflows.
    pub fn balance_after(&self, account_id: &str, delta: Decimal) -> Result<Decimal> {
        self.require_account(account_id)?
            .balance
            .checked_add(delta)
            .map(round2)
            .ok_or(LedgerError::InvalidAmount(delta))
    }

    /// Applies `delta` to the account balance, rounding to cents, and prepends a history
    /// snapshot stamped `at`. Returns the new balance.
    ///
    /// Nothing changes when the account is unknown or the new balance would overflow.
    pub(crate) fn apply_delta(
        &mut self,
        account_id: &str,
        delta: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Decimal> {
        let balance = self.balance_after(account_id, delta)?;
        let account = self
            .account_mut(account_id)
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        account.balance = balance;
        self.account_history
            .push_front(HistorySnapshot::new(at, account_id, balance));
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn seed_applies_account_defaults() {
        let seed = SeedData::new(
            vec![
                Account::new("main", "Main", dec!(1000)),
                Account::new("savings", "Savings", dec!(500)),
            ],
            Vec::new(),
        );
        let state = LedgerState::from_seed(seed);
        assert_eq!(state.accounts[0].color.as_deref(), Some("#3B82F6"));
        assert_eq!(state.accounts[1].color.as_deref(), Some("#10B981"));
        assert_eq!(state.accounts[1].currency(), "USD");
        assert!(state.budgets.is_empty());
    }

    #[test]
    fn apply_delta_rounds_and_records_history() {
        let mut state = LedgerState::from_seed(SeedData::new(
            vec![Account::new("main", "Main", dec!(10))],
            Vec::new(),
        ));
        let balance = state.apply_delta("main", dec!(0.105), at()).unwrap();
        assert_eq!(balance, dec!(10.11));
        assert_eq!(state.account_history.len(), 1);
        assert_eq!(state.account_history[0].balance, dec!(10.11));

        let err = state.apply_delta("ghost", dec!(1), at()).unwrap_err();
        assert!(matches!(err, LedgerError::AccountNotFound(id) if id == "ghost"));
        assert_eq!(state.account_history.len(), 1);
    }

    #[test]
    fn overflowing_delta_is_rejected_before_mutation() {
        let mut state = LedgerState::from_seed(SeedData::new(
            vec![Account::new("main", "Main", dec!(10))],
            Vec::new(),
        ));
        let before = state.clone();
        let err = state.apply_delta("main", Decimal::MAX, at()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(amount) if amount == Decimal::MAX));
        assert_eq!(state, before);
        assert_eq!(state.balance_after("main", dec!(-4.5)).unwrap(), dec!(5.5));
    }

    #[test]
    fn seed_parses_json_documents() {
        let seed = SeedData::from_json_str(
            r#"[{"id":"main","name":"Main","balance":1000}]"#,
            r#"[{"id":"t1","date":"2025-01-10","merchant":"Cafe","category":"Food","amount":-4.5,"accountId":"main"}]"#,
        )
        .unwrap();
        assert_eq!(seed.accounts.len(), 1);
        assert_eq!(seed.transactions[0].amount, dec!(-4.5));
        assert_eq!(
            seed.transactions[0].date.with_timezone(&chrono::Local).date_naive(),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
        );
    }

    #[test]
    fn state_uses_camel_case_keys() {
        let json = serde_json::to_value(LedgerState::default()).unwrap();
        assert!(json.get("recurringTransactions").is_some());
        assert!(json.get("accountHistory").is_some());
    }
}
