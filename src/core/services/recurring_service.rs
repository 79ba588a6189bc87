//! Recurring template lifecycle and the batch processor that materialises them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ChangeSummary, ServiceResult, TransactionService};
use crate::errors::LedgerError;
use crate::ledger::{
    money::sum_rounded, snapshot_recurrences, LedgerState, RecurrenceSnapshot, RecurringDraft,
    RecurringPatch, RecurringTransaction, Transaction,
};

/// Which active templates a processing run materialises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessMode {
    /// Every active template, however recently it last ran.
    #[default]
    All,
    /// Only templates whose elapsed days reach their frequency threshold.
    DueOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTotals {
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

pub struct RecurringService;

impl RecurringService {
    pub fn add(state: &mut LedgerState, draft: RecurringDraft) -> ServiceResult<ChangeSummary> {
        let template = draft.into_template()?;
        state.require_account(&template.account_id)?;
        let mut summary = ChangeSummary::matched();
        summary.recurring_changed.push(template.id.clone());
        state.recurring_transactions.push(template);
        Ok(summary)
    }

    pub fn update(
        state: &mut LedgerState,
        id: &str,
        patch: RecurringPatch,
    ) -> ServiceResult<ChangeSummary> {
        let Some(current) = state.recurring(id) else {
            return Ok(ChangeSummary::no_match());
        };
        let next = patch.applied_to(current)?;
        state.require_account(&next.account_id)?;
        if let Some(slot) = state.recurring_mut(id) {
            *slot = next;
        }
        let mut summary = ChangeSummary::matched();
        summary.recurring_changed.push(id.to_string());
        Ok(summary)
    }

    pub fn toggle_active(state: &mut LedgerState, id: &str) -> ChangeSummary {
        let Some(template) = state.recurring_mut(id) else {
            return ChangeSummary::no_match();
        };
        template.is_active = !template.is_active;
        let mut summary = ChangeSummary::matched();
        summary.recurring_changed.push(id.to_string());
        summary
    }

    /// Reverses and removes every transaction the template spawned, then drops the template.
    ///
    /// Entries without a back-reference are matched by the recurring flag and merchant name.
    /// The whole cascade is rejected up front if any reversal would overflow a balance.
    pub fn delete(
        state: &mut LedgerState,
        id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<ChangeSummary> {
        let Some(template) = state.recurring(id) else {
            return Ok(ChangeSummary::no_match());
        };
        let merchant = template.merchant.clone();
        let spawned: Vec<&Transaction> = state
            .transactions
            .iter()
            .filter(|txn| txn.spawned_by(id, &merchant))
            .collect();

        {
            let mut reversed: HashMap<&str, Decimal> = HashMap::new();
            for txn in &spawned {
                let Some(account) = state.account(&txn.account_id) else {
                    continue;
                };
                let running = reversed.entry(txn.account_id.as_str()).or_insert(account.balance);
                *running = running
                    .checked_sub(txn.amount)
                    .ok_or(LedgerError::InvalidAmount(txn.amount))?;
            }
        }
        let spawned: Vec<String> = spawned.into_iter().map(|txn| txn.id.clone()).collect();

        let mut summary = ChangeSummary::matched();
        for txn_id in spawned {
            summary.merge(TransactionService::delete(state, &txn_id, now)?);
        }
        state.recurring_transactions.retain(|template| template.id != id);
        summary.recurring_changed.push(id.to_string());
        Ok(summary)
    }

    /// Materialises one transaction per selected template as a single batch.
    ///
    /// Templates whose account is missing are left untouched and listed in
    /// `ChangeSummary::recurring_skipped`.
    pub fn process(state: &mut LedgerState, mode: ProcessMode, now: DateTime<Utc>) -> ChangeSummary {
        let selected: Vec<String> = state
            .recurring_transactions
            .iter()
            .filter(|template| template.is_active)
            .filter(|template| mode == ProcessMode::All || template.is_due(now))
            .map(|template| template.id.clone())
            .collect();

        let mut summary = ChangeSummary::matched();
        for template_id in selected {
            let Some(template) = state.recurring(&template_id) else {
                continue;
            };
            if !state.has_account(&template.account_id) {
                summary.recurring_skipped.push(template_id);
                continue;
            }
            let spawned = template.spawn(now);
            match TransactionService::add(state, spawned, now) {
                Ok(added) => {
                    summary.merge(added);
                    if let Some(template) = state.recurring_mut(&template_id) {
                        template.last_processed = Some(now);
                    }
                    summary.recurring_changed.push(template_id);
                }
                Err(_) => summary.recurring_skipped.push(template_id),
            }
        }
        summary
    }

    pub fn pending_count(state: &LedgerState, now: DateTime<Utc>) -> usize {
        state
            .recurring_transactions
            .iter()
            .filter(|template| template.is_due(now))
            .count()
    }

    pub fn is_due(template: &RecurringTransaction, now: DateTime<Utc>) -> bool {
        template.is_due(now)
    }

    pub fn next_due_date(template: &RecurringTransaction) -> DateTime<Utc> {
        template.next_due_date()
    }

    pub fn schedule(state: &LedgerState, now: DateTime<Utc>) -> Vec<RecurrenceSnapshot> {
        snapshot_recurrences(&state.recurring_transactions, now)
    }

    /// Income and expense volume of one run over the active templates.
    pub fn totals(state: &LedgerState) -> RecurringTotals {
        let active = || {
            state
                .recurring_transactions
                .iter()
                .filter(|template| template.is_active)
        };
        let income = sum_rounded(
            active()
                .filter(|template| template.amount > Decimal::ZERO)
                .map(|template| template.amount),
        );
        let expenses = sum_rounded(
            active()
                .filter(|template| template.amount < Decimal::ZERO)
                .map(|template| template.amount.abs()),
        );
        RecurringTotals {
            income,
            expenses,
            net: income.saturating_sub(expenses),
        }
    }
}
