//! Money codec - converts between decimal values and integer minor units.
//!
//! Amounts are stored as cents (100 minor units per dollar) and percentage
//! rates as hundredths of a percent (10000 minor units = 100%), so every
//! stored value is exact and duplicate comparison never trips over floating
//! point noise. Rounding is half-to-even throughout so repeated conversions
//! do not drift in one direction.

/// Minor units per dollar.
pub const AMOUNT_SCALE: i64 = 100;

/// Minor units per 100% for percentage rates (so 12.34% stores as 1234).
pub const RATE_SCALE: i64 = 10_000;

/// Converts a dollar amount to integer cents, rounding half-to-even.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * AMOUNT_SCALE as f64).round_ties_even() as i64
}

/// Converts a percentage rate on the 0-100 scale to hundredths of a percent.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_minor_units_rate(rate: f64) -> i64 {
    (rate * 100.0).round_ties_even() as i64
}

/// Converts integer cents back to a dollar amount.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / AMOUNT_SCALE as f64
}

/// Converts a stored rate back to a percentage on the 0-100 scale.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_minor_units_rate(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// Multiplies an amount in cents by a stored rate, rounding half-to-even.
///
/// The product is computed exactly in 128-bit integers; only the final
/// division by the rate scale rounds. This keeps per-entry error inside half
/// a cent, which the allocation engine's reconciliation step then absorbs.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn apply_rate(amount_minor: i64, rate_minor: i64) -> i64 {
    let product = i128::from(amount_minor) * i128::from(rate_minor);
    let scale = i128::from(RATE_SCALE);
    let quotient = product.div_euclid(scale);
    let remainder = product.rem_euclid(scale);
    let rounded = match (remainder * 2).cmp(&scale) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        // Exactly halfway: round to even
        std::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    };
    rounded as i64
}

/// Renders cents as a `$x.yz` string for messages and reports.
#[must_use]
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let magnitude = minor.unsigned_abs();
    format!("{sign}${}.{:02}", magnitude / 100, magnitude % 100)
}
