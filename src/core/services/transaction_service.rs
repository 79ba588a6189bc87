//! Business logic for single transactions and transfers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{ChangeSummary, ServiceResult};
use crate::errors::LedgerError;
use crate::ledger::{money::round2, transaction::new_id, LedgerState, Transaction, TRANSFER_CATEGORY};

const DEFAULT_TRANSFER_DESCRIPTION: &str = "Transfer";

/// Request to move money between two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub description: Option<String>,
}

impl TransferRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn description(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => DEFAULT_TRANSFER_DESCRIPTION.to_string(),
        }
    }
}

/// Applies and reverses transactions while keeping balances in step.
pub struct TransactionService;

impl TransactionService {
    /// Prepends `transaction` to the log and applies its amount to the owning account.
    pub fn add(
        state: &mut LedgerState,
        mut transaction: Transaction,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChangeSummary> {
        state.require_account(&transaction.account_id)?;
        if transaction.id.trim().is_empty() {
            transaction.id = new_id();
        } else if state.transaction(&transaction.id).is_some() {
            return Err(LedgerError::Validation(format!(
                "transaction `{}` already exists",
                transaction.id
            )));
        }
        transaction.amount = round2(transaction.amount);

        let mut summary = ChangeSummary::matched();
        state.apply_delta(&transaction.account_id, transaction.amount, now)?;
        summary.record_balance_change(&transaction.account_id);
        summary.transactions_created.push(transaction.id.clone());
        state.transactions.push_front(transaction);
        Ok(summary)
    }

    /// Removes the transaction and reverses its balance effect. Unknown ids are a no-op.
    ///
    /// When the owning account no longer exists the entry is still removed, but no reversal
    /// or history snapshot is recorded. A reversal that would overflow the balance is
    /// rejected before anything is removed.
    pub fn delete(
        state: &mut LedgerState,
        id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChangeSummary> {
        let Some(position) = state.transaction_position(id) else {
            return Ok(ChangeSummary::no_match());
        };
        let reverses = state
            .transactions
            .get(position)
            .filter(|txn| state.has_account(&txn.account_id))
            .map(|txn| (txn.account_id.clone(), -txn.amount));
        if let Some((account_id, delta)) = &reverses {
            state.balance_after(account_id, *delta)?;
        }
        let Some(removed) = state.transactions.remove(position) else {
            return Ok(ChangeSummary::no_match());
        };

        let mut summary = ChangeSummary::matched();
        if let Some((account_id, delta)) = reverses {
            state.apply_delta(&account_id, delta, now)?;
            summary.record_balance_change(&account_id);
        }
        summary.transactions_removed.push(removed.id);
        Ok(summary)
    }

    /// Checks a transfer without touching state.
    pub fn validate_transfer(state: &LedgerState, request: &TransferRequest) -> ServiceResult<Decimal> {
        let from = state.require_account(&request.from)?;
        state.require_account(&request.to)?;
        let amount = round2(request.amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(request.amount));
        }
        if request.from == request.to {
            return Err(LedgerError::Validation(
                "transfer source and destination must differ".into(),
            ));
        }
        if from.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.id.clone(),
                available: from.balance,
                requested: amount,
            });
        }
        state.balance_after(&request.to, amount)?;
        Ok(amount)
    }

    /// Moves `request.amount` between accounts and records the linked debit/credit pair.
    ///
    /// Both legs share `now` as their timestamp and the log reads `[credit, debit, ..]`
    /// afterwards.
    pub fn transfer(
        state: &mut LedgerState,
        request: &TransferRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChangeSummary> {
        let amount = Self::validate_transfer(state, request)?;
        let from_name = state.require_account(&request.from)?.name.clone();
        let to_name = state.require_account(&request.to)?.name.clone();
        let description = request.description();

        let debit = Transaction::new(
            request.from.clone(),
            format!("Transfer to {to_name}"),
            TRANSFER_CATEGORY,
            -amount,
            now,
        )
        .with_description(description.clone());
        let credit = Transaction::new(
            request.to.clone(),
            format!("Transfer from {from_name}"),
            TRANSFER_CATEGORY,
            amount,
            now,
        )
        .with_description(description);

        let mut summary = ChangeSummary::matched();
        state.apply_delta(&request.from, -amount, now)?;
        summary.record_balance_change(&request.from);
        state.apply_delta(&request.to, amount, now)?;
        summary.record_balance_change(&request.to);

        summary.transactions_created.push(debit.id.clone());
        summary.transactions_created.push(credit.id.clone());
        state.transactions.push_front(debit);
        state.transactions.push_front(credit);
        Ok(summary)
    }

    /// Returns the ledger's transactions, newest first.
    pub fn list(state: &LedgerState) -> Vec<&Transaction> {
        state.transactions.iter().collect()
    }
}
