#![doc(test(attr(deny(warnings))))]

//! Wallet Core is the ledger state engine behind a personal-finance wallet: accounts,
//! transactions, transfers, budgets, recurring schedules and balance history, kept
//! consistent behind a single store.

pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod time;
pub mod utils;

pub use crate::core::{Action, LedgerStore, StoreSettings};
pub use crate::errors::{LedgerError, Result};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Wallet Core tracing initialized.");
    });
}
