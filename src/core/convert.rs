//! Conversion calculator

use rust_decimal::prelude::{Decimal, FromPrimitive, RoundingStrategy};

use super::amount::Amount;
use super::rates::RateTable;

/// Result shown when there is nothing to convert.
pub const ZERO_RESULT: &str = "0.0";

/// Converts `amount` into `target` using `rates`.
///
/// Yields [`ZERO_RESULT`] when the amount is empty or the target has no rate.
/// Otherwise the product is rounded half away from zero and printed with two
/// fraction digits.
pub fn convert(amount: Amount, target: &str, rates: &RateTable) -> String {
    match (amount.value(), rates.rate(target)) {
        (Some(value), Some(rate)) => format_two_places(value * rate),
        _ => ZERO_RESULT.to_string(),
    }
}

fn format_two_places(value: f64) -> String {
    match Decimal::from_f64(value) {
        Some(d) => {
            let rounded = d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.2}")
        }
        // Outside the decimal range; fall back to float formatting.
        None => format!("{value:.2}"),
    }
}
