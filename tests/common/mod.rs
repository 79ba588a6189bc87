#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use wallet_core::core::{FailureInjector, LedgerStore, StoreSettings};
use wallet_core::ledger::{Account, Frequency, RecurringDraft, SeedData};
use wallet_core::time::FixedClock;

/// Wednesday 2025-06-11 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 11, 12, 0, 0).unwrap()
}

pub fn seed() -> SeedData {
    SeedData::new(
        vec![
            Account::new("main", "Main Account", dec!(1000)),
            Account::new("savings", "Savings", dec!(500)),
        ],
        Vec::new(),
    )
}

pub fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(fixed_now()))
}

/// Store on a fixed clock with default settings (600 ms transfer latency).
pub fn store() -> LedgerStore {
    LedgerStore::new(seed(), StoreSettings::default(), clock())
}

pub fn store_with_clock(clock: Arc<FixedClock>) -> LedgerStore {
    LedgerStore::new(seed(), StoreSettings::default(), clock)
}

pub fn store_failing(injector: Arc<dyn FailureInjector>) -> LedgerStore {
    let settings = StoreSettings::default().with_failure_injector(injector);
    LedgerStore::new(seed(), settings, clock())
}

pub fn instant_store() -> LedgerStore {
    let settings = StoreSettings::default().with_latency(Duration::ZERO);
    LedgerStore::new(seed(), settings, clock())
}

pub fn netflix() -> RecurringDraft {
    RecurringDraft::new(
        "Netflix",
        "Entertainment",
        dec!(-15),
        "main",
        Frequency::Monthly,
        fixed_now(),
    )
}
