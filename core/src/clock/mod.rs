//! Time scales and epochs used by the mission products.

pub mod leap;
pub mod units;

pub use leap::{LeapSecondTable, TaiUtcConverter};
pub use units::{TimeUnit, TimeUnits};

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::prelude::{L1bError, L1bResult};

/// 2000-01-01 00:00:00, the day count origin of ESA products.
pub fn mjd2000_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Instant from a days / seconds / microseconds triplet since 2000-01-01.
/// Values outside chrono's range are a decode error.
pub fn from_mjd2000(days: f64, seconds: f64, microseconds: f64) -> L1bResult<NaiveDateTime> {
    let out_of_range = || {
        L1bError::BinaryDecode(format!(
            "MJD2000 time {} d {} s {} us is out of range",
            days, seconds, microseconds
        ))
    };
    if !(days.is_finite() && seconds.is_finite() && microseconds.is_finite()) {
        return Err(out_of_range());
    }
    let total = (days as i64)
        .checked_mul(MICROS_PER_DAY)
        .and_then(|us| us.checked_add((seconds as i64).checked_mul(1_000_000)?))
        .and_then(|us| us.checked_add(microseconds as i64))
        .ok_or_else(out_of_range)?;
    mjd2000_epoch()
        .checked_add_signed(Duration::microseconds(total))
        .ok_or_else(out_of_range)
}

/// Parses product header times such as `UTC=01-JAN-2015 10:20:30.123456`;
/// a `UTC=` or `TAI=` prefix is ignored.
pub fn parse_pds_datetime(text: &str) -> L1bResult<NaiveDateTime> {
    let trimmed = text.trim();
    let value = trimmed
        .strip_prefix("UTC=")
        .or_else(|| trimmed.strip_prefix("TAI="))
        .unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(value, "%d-%b-%Y %H:%M:%S%.f")
        .map_err(|err| L1bError::HeaderParse(format!("product time {:?}: {}", text, err)))
}

/// Header form of an instant, e.g. `TAI=01-JAN-2015 10:20:30.123456`.
pub fn format_pds_datetime(scale: &str, time: NaiveDateTime) -> String {
    format!("{}={}", scale, time.format("%d-%b-%Y %H:%M:%S%.6f").to_string().to_uppercase())
}
