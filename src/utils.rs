//! Shared helpers: monetary rounding and store-boundary date codecs.

use chrono::{Datelike, NaiveDate};

/// Round a monetary figure half-up to `decimals` places.
///
/// The accuracy floor is one decimal; anything lower (including zero) is
/// clamped up. Non-finite inputs collapse to 0.0 so a poisoned intermediate
/// value surfaces as an error-flagged quote instead of NaN in the response.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let decimals = decimals.max(1);
    // Shift via the decimal string form so values like 2.005 (stored as
    // 2.00499...) still shift to an exact 200.5 before rounding.
    let shifted: f64 = format!("{}e{}", value, decimals).parse().unwrap_or(0.0);
    format!("{}e-{}", shifted.round(), decimals)
        .parse()
        .unwrap_or(0.0)
}

/// Encode a date as the numeric `YYYYMMDD` form the lane table stores.
pub fn yyyymmdd(date: NaiveDate) -> i32 {
    date.year() * 10_000 + date.month() as i32 * 100 + date.day() as i32
}

/// Decode a numeric `YYYYMMDD` date; `None` for out-of-range values.
pub fn from_yyyymmdd(code: i32) -> Option<NaiveDate> {
    let year = code / 10_000;
    let month = (code / 100 % 100) as u32;
    let day = (code % 100) as u32;
    NaiveDate::from_ymd_opt(year, month, day)
}
