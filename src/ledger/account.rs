use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const PRIMARY_ACCOUNT_COLOR: &str = "#3B82F6";
pub const SECONDARY_ACCOUNT_COLOR: &str = "#10B981";
const PRIMARY_ACCOUNT_ID: &str = "main";

/// A named balance-holding entity.
///
/// `balance` always equals the seed balance plus every transaction applied to the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            balance,
            currency: None,
            color: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Currency code, falling back to USD.
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    }

    /// Fills a missing currency and display colour.
    pub fn apply_defaults(&mut self, currency: &str) {
        if self.currency.as_deref().map_or(true, |code| code.trim().is_empty()) {
            self.currency = Some(currency.to_string());
        }
        if self.color.as_deref().map_or(true, |color| color.trim().is_empty()) {
            let color = if self.id == PRIMARY_ACCOUNT_ID {
                PRIMARY_ACCOUNT_COLOR
            } else {
                SECONDARY_ACCOUNT_COLOR
            };
            self.color = Some(color.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_fill_colour_by_id() {
        let mut main = Account::new("main", "Main", dec!(10));
        let mut savings = Account::new("savings", "Savings", dec!(5)).with_color("#000000");
        main.apply_defaults("EUR");
        savings.apply_defaults("EUR");

        assert_eq!(main.color.as_deref(), Some(PRIMARY_ACCOUNT_COLOR));
        assert_eq!(main.currency(), "EUR");
        assert_eq!(savings.color.as_deref(), Some("#000000"));
    }

    #[test]
    fn deserializes_numeric_balance() {
        let account: Account =
            serde_json::from_str(r#"{"id":"main","name":"Main","balance":1000.5}"#).unwrap();
        assert_eq!(account.balance, dec!(1000.5));
        assert_eq!(account.currency(), DEFAULT_CURRENCY);
    }
}
