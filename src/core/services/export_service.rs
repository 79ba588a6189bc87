//! CSV and JSON renderings of the transaction log.
//!
//! CSV fields are joined verbatim: a merchant or description containing a comma shifts the
//! columns of that row. Existing exports rely on this exact layout.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use super::{QueryService, ServiceResult, TransactionFilter};
use crate::errors::LedgerError;
use crate::ledger::{display_amount, LedgerState, Transaction};

pub const CSV_HEADER: [&str; 6] = ["Date", "Merchant", "Category", "Amount", "Account", "Description"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(LedgerError::Validation(format!(
                "unsupported export format `{other}`"
            ))),
        }
    }
}

/// How the `Account` column is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccountLabel {
    Id,
    Name,
}

pub struct ExportService;

impl ExportService {
    /// Full log, dates rendered in the system time zone.
    pub fn export(state: &LedgerState, format: ExportFormat) -> ServiceResult<String> {
        Self::export_in(state, format, &Local)
    }

    pub fn export_in<Tz: TimeZone>(
        state: &LedgerState,
        format: ExportFormat,
        zone: &Tz,
    ) -> ServiceResult<String> {
        match format {
            ExportFormat::Csv => Ok(render_csv(state, state.transactions.iter(), zone, AccountLabel::Id)),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&state.transactions)?),
        }
    }

    /// Export of the filtered subset. The CSV `Account` column carries the account name, or
    /// the id when the account is unknown.
    pub fn export_filtered(
        state: &LedgerState,
        format: ExportFormat,
        filter: &TransactionFilter,
    ) -> ServiceResult<String> {
        Self::export_filtered_in(state, format, filter, &Local)
    }

    pub fn export_filtered_in<Tz: TimeZone>(
        state: &LedgerState,
        format: ExportFormat,
        filter: &TransactionFilter,
        zone: &Tz,
    ) -> ServiceResult<String> {
        let selected = QueryService::filter(state, filter);
        match format {
            ExportFormat::Csv => Ok(render_csv(state, selected.iter(), zone, AccountLabel::Name)),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(&selected)?),
        }
    }

    /// Suggested download name, e.g. `transactions-2025-06-11.csv`.
    pub fn file_name<Tz: TimeZone>(format: ExportFormat, now: &chrono::DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        format!("transactions-{}.{}", now.format("%Y-%m-%d"), format.extension())
    }
}

fn render_csv<'a, Tz, I>(state: &LedgerState, rows: I, zone: &Tz, label: AccountLabel) -> String
where
    Tz: TimeZone,
    I: Iterator<Item = &'a Transaction>,
{
    let mut lines = vec![CSV_HEADER.join(",")];
    for txn in rows {
        let account = match label {
            AccountLabel::Id => txn.account_id.as_str(),
            AccountLabel::Name => state
                .account(&txn.account_id)
                .map(|account| account.name.as_str())
                .unwrap_or(txn.account_id.as_str()),
        };
        let date = txn.date.with_timezone(zone).date_naive();
        let fields = [
            date.format("%Y-%m-%d").to_string(),
            txn.merchant.clone(),
            txn.category.clone(),
            display_amount(txn.amount),
            account.to_string(),
            txn.description.clone().unwrap_or_default(),
        ];
        lines.push(fields.join(","));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::services::fixtures::{now, two_accounts};
    use chrono::{FixedOffset, Utc};
    use rust_decimal_macros::dec;

    fn seeded() -> LedgerState {
        let mut state = two_accounts();
        state.transactions.push_back(
            Transaction::new("main", "Cafe", "Food", dec!(-4.50), now())
                .with_id("t1")
                .with_description("Latte"),
        );
        state.transactions.push_back(
            Transaction::new("savings", "Employer", "Salary", dec!(2500), now()).with_id("t2"),
        );
        state
    }

    #[test]
    fn csv_has_fixed_columns_and_no_trailing_newline() {
        let csv = ExportService::export_in(&seeded(), ExportFormat::Csv, &Utc).unwrap();
        assert_eq!(
            csv,
            "Date,Merchant,Category,Amount,Account,Description\n\
             2025-06-11,Cafe,Food,-4.5,main,Latte\n\
             2025-06-11,Employer,Salary,2500,savings,"
        );
    }

    #[test]
    fn csv_dates_follow_the_zone() {
        let zone = FixedOffset::west_opt(13 * 3600).unwrap();
        let csv = ExportService::export_in(&seeded(), ExportFormat::Csv, &zone).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("2025-06-10,"));
    }

    #[test]
    fn filtered_csv_uses_account_names() {
        let mut state = seeded();
        state
            .transactions
            .push_back(Transaction::new("closed", "Old", "Misc", dec!(-1), now()).with_id("t3"));
        let filter = TransactionFilter::new().amount_range(None, Some(dec!(10)));
        let csv = ExportService::export_filtered_in(&state, ExportFormat::Csv, &filter, &Utc).unwrap();
        let rows: Vec<&str> = csv.lines().skip(1).collect();
        assert_eq!(rows, vec!["2025-06-11,Cafe,Food,-4.5,Main Account,Latte", "2025-06-11,Old,Misc,-1,closed,"]);
    }

    #[test]
    fn json_export_round_trips() {
        let state = seeded();
        let json = ExportService::export_in(&state, ExportFormat::Json, &Utc).unwrap();
        let parsed: Vec<Transaction> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Vec::from(state.transactions.clone()));
        assert!(json.contains("\n  {"));
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().unwrap_err().is_validation());
        assert_eq!(
            ExportService::file_name(ExportFormat::Json, &now()),
            "transactions-2025-06-11.json"
        );
    }
}
