//! Position sizing and price rounding for order legs.

use rust_decimal::prelude::*;

/// `max(floor(budget / entry), 1)`.
///
/// Returns `None` for a non-positive or non-finite entry, which can never
/// be sized.
pub fn order_quantity(risk_budget: f64, entry: f64) -> Option<u64> {
    if !entry.is_finite() || entry <= 0.0 {
        return None;
    }
    let shares = (risk_budget / entry).floor();
    let shares = if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    };
    Some(shares.max(1))
}

/// Round a price to cents for a bracket leg.
///
/// Rounds the exact binary value of `price`, so `2.675` (stored as
/// 2.67499...) goes to `2.67`.
pub fn to_cents(price: f64) -> Option<Decimal> {
    Decimal::from_f64_retain(price).map(|d| d.round_dp(2))
}
