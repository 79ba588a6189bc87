//! Decimal helpers for monetary values.
//!
//! Amounts are rounded to cents at the point of mutation so repeated updates never accumulate
//! drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept on every stored amount.
pub const CENT_PLACES: u32 = 2;

/// Rounds to two decimals, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Renders an amount in its shortest form (`-15`, `12.5`, `3.75`).
pub fn display_amount(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Sums an iterator of amounts and rounds the total, saturating at the `Decimal` bounds.
pub fn sum_rounded<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round2(
        values
            .into_iter()
            .fold(Decimal::ZERO, |total, value| total.saturating_add(value)),
    )
}
