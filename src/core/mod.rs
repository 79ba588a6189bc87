//! State transitions, the action reducer and the store that serialises them.

pub mod action;
pub mod services;
pub mod store;

pub use action::{reduce, Action, ReduceContext};
pub use store::{
    FailNext, FailureInjector, LedgerStore, NeverFail, StateChange, StoreSettings,
    SubscriptionId,
};
