use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::ChangeSummary;
use crate::ledger::{
    money::{round2, sum_rounded},
    HistorySnapshot, LedgerState,
};

/// Summed balance of every account's snapshots for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBalance {
    pub date: NaiveDate,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub max: Decimal,
    pub min: Decimal,
    pub average: Decimal,
    /// Percentage change from the first to the last balance; `None` when the first is zero.
    pub growth_percent: Option<Decimal>,
}

pub struct HistoryService;

impl HistoryService {
    /// Prepends an externally produced snapshot.
    pub fn record(state: &mut LedgerState, snapshot: HistorySnapshot) -> ChangeSummary {
        let mut summary = ChangeSummary::matched();
        summary.touch_account(&snapshot.account_id);
        summary.history_appended += 1;
        state.account_history.push_front(snapshot);
        summary
    }

    /// Snapshots of one account newer than `days` before `now`, oldest first.
    pub fn account_history(
        state: &LedgerState,
        account_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Vec<HistorySnapshot> {
        let cutoff = now - Duration::days(days);
        let mut points: Vec<HistorySnapshot> = state
            .account_history
            .iter()
            .filter(|snapshot| snapshot.account_id == account_id && snapshot.date > cutoff)
            .cloned()
            .collect();
        points.sort_by_key(|snapshot| snapshot.date);
        points
    }

    /// Per-day totals across all accounts, keyed by the calendar day in `now`'s zone.
    pub fn combined_daily_history<Tz: TimeZone>(
        state: &LedgerState,
        days: i64,
        now: &DateTime<Tz>,
    ) -> Vec<DailyBalance> {
        let zone = now.timezone();
        let now_utc = now.with_timezone(&Utc);
        let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for account in &state.accounts {
            for snapshot in Self::account_history(state, &account.id, days, now_utc) {
                let day = snapshot.date.with_timezone(&zone).date_naive();
                let total = totals.entry(day).or_default();
                *total = total.saturating_add(snapshot.balance);
            }
        }
        totals
            .into_iter()
            .map(|(date, balance)| DailyBalance {
                date,
                balance: round2(balance),
            })
            .collect()
    }

    pub fn stats(balances: &[Decimal]) -> Option<HistoryStats> {
        let first = *balances.first()?;
        let last = *balances.last()?;
        let max = balances.iter().copied().max()?;
        let min = balances.iter().copied().min()?;
        let total = sum_rounded(balances.iter().copied());
        let average = round2(total / Decimal::from(balances.len()));
        let growth_percent = last
            .checked_sub(first)
            .and_then(|change| change.checked_div(first))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(round2);
        Some(HistoryStats {
            max,
            min,
            average,
            growth_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::fixtures::{now, two_accounts};
    use rust_decimal_macros::dec;

    fn snapshot(days_ago: i64, account: &str, balance: Decimal) -> HistorySnapshot {
        HistorySnapshot::new(now() - Duration::days(days_ago), account, balance)
    }

    #[test]
    fn account_history_is_windowed_and_ascending() {
        let mut state = two_accounts();
        HistoryService::record(&mut state, snapshot(40, "main", dec!(900)));
        HistoryService::record(&mut state, snapshot(10, "main", dec!(950)));
        HistoryService::record(&mut state, snapshot(5, "savings", dec!(500)));
        HistoryService::record(&mut state, snapshot(2, "main", dec!(1000)));

        let points = HistoryService::account_history(&state, "main", 30, now());
        let balances: Vec<Decimal> = points.iter().map(|p| p.balance).collect();
        assert_eq!(balances, vec![dec!(950), dec!(1000)]);
        assert_eq!(state.account_history[0].balance, dec!(1000));
    }

    #[test]
    fn snapshot_exactly_at_cutoff_is_excluded() {
        let mut state = two_accounts();
        HistoryService::record(&mut state, snapshot(7, "main", dec!(1)));
        assert!(HistoryService::account_history(&state, "main", 7, now()).is_empty());
    }

    #[test]
    fn combined_history_sums_per_day() {
        let mut state = two_accounts();
        HistoryService::record(&mut state, snapshot(3, "main", dec!(800)));
        HistoryService::record(&mut state, snapshot(3, "savings", dec!(700)));
        HistoryService::record(&mut state, snapshot(1, "main", dec!(750)));

        let daily = HistoryService::combined_daily_history(&state, 30, &now());
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2025, 6, 8).unwrap());
        assert_eq!(daily[0].balance, dec!(1500));
        assert_eq!(daily[1].balance, dec!(750));
    }

    #[test]
    fn stats_report_growth() {
        let stats = HistoryService::stats(&[dec!(100), dec!(80), dec!(150)]).unwrap();
        assert_eq!(stats.max, dec!(150));
        assert_eq!(stats.min, dec!(80));
        assert_eq!(stats.average, dec!(110));
        assert_eq!(stats.growth_percent, Some(dec!(50)));

        let flat = HistoryService::stats(&[dec!(0), dec!(10)]).unwrap();
        assert_eq!(flat.growth_percent, None);
        assert!(HistoryService::stats(&[]).is_none());
    }
}
