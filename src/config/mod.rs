use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::core::{NeverFail, StoreSettings};
use crate::errors::{LedgerError, Result};
use crate::storage::DEFAULT_STORAGE_KEY;
use crate::utils::{app_data_dir, ensure_dir, write_atomic};

const CONFIG_FILE: &str = "config.json";
const CURRENCY_ENV: &str = "WALLET_CORE_CURRENCY";
const LATENCY_ENV: &str = "WALLET_CORE_TRANSFER_LATENCY_MS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub currency: String,
    pub week_start: WeekStart,
    pub transfer_latency_ms: u64,
    pub history_window_days: i64,
    pub storage_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            week_start: WeekStart::Sunday,
            transfer_latency_ms: 600,
            history_window_days: 30,
            storage_key: DEFAULT_STORAGE_KEY.into(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(LedgerError::Config("currency must not be empty".into()));
        }
        if self.history_window_days <= 0 {
            return Err(LedgerError::Config(
                "history window must be at least one day".into(),
            ));
        }
        if self.storage_key.trim().is_empty() {
            return Err(LedgerError::Config("storage key must not be empty".into()));
        }
        Ok(())
    }

    /// Overrides currency and transfer latency from `WALLET_CORE_*` variables when set.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(currency) = env::var(CURRENCY_ENV) {
            if !currency.trim().is_empty() {
                self.currency = currency.trim().to_uppercase();
            }
        }
        if let Ok(raw) = env::var(LATENCY_ENV) {
            self.transfer_latency_ms = raw.trim().parse().map_err(|_| {
                LedgerError::Config(format!("{LATENCY_ENV} must be a whole number, got `{raw}`"))
            })?;
        }
        Ok(())
    }

    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            transfer_latency: Duration::from_millis(self.transfer_latency_ms),
            failure_injector: Arc::new(NeverFail),
            week_start: self.week_start.weekday(),
            currency: self.currency.clone(),
            history_window_days: self.history_window_days,
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        Ok(Self {
            path: base.join(CONFIG_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored config, falling back to defaults when the file does not exist.
    pub fn load(&self) -> Result<Config> {
        let config = if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// `load` followed by environment overrides.
    pub fn load_effective(&self) -> Result<Config> {
        let mut config = self.load()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_store_defaults() {
        let settings = Config::default().store_settings();
        assert_eq!(settings.transfer_latency, Duration::from_millis(600));
        assert_eq!(settings.week_start, Weekday::Sun);
        assert_eq!(settings.history_window_days, 30);
    }

    #[test]
    fn load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        assert_eq!(manager.load().unwrap(), Config::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        let config = Config {
            currency: "EUR".into(),
            week_start: WeekStart::Monday,
            transfer_latency_ms: 0,
            ..Config::default()
        };
        manager.save(&config).unwrap();
        assert_eq!(manager.load().unwrap(), config);

        let raw = fs::read_to_string(manager.path()).unwrap();
        assert!(raw.contains("\"weekStart\": \"monday\""));
    }

    #[test]
    fn partial_files_fill_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).unwrap();
        fs::write(manager.path(), r#"{"currency":"GBP"}"#).unwrap();
        let config = manager.load().unwrap();
        assert_eq!(config.currency, "GBP");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config {
            history_window_days: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(LedgerError::Config(_))));
    }
}
