//! Conversions between domain amounts and the integer minor units stored in
//! the database.

use rust_decimal::{prelude::ToPrimitive, Decimal};

/// Number of decimal places every stored amount carries.
pub const SCALE: u32 = 2;

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// Rounds to two decimals and returns the amount in minor units, or `None`
/// when it does not fit in an `i64`.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    amount
        .round_dp(SCALE)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}
