//! CF-style numeric time axes: `<unit> since <reference date>`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::prelude::{L1bError, L1bResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "day" | "days" | "d" => Some(Self::Days),
            "hour" | "hours" | "h" | "hr" => Some(Self::Hours),
            "minute" | "minutes" | "min" => Some(Self::Minutes),
            "second" | "seconds" | "sec" | "secs" | "s" => Some(Self::Seconds),
            "millisecond" | "milliseconds" | "ms" => Some(Self::Milliseconds),
            "microsecond" | "microseconds" | "us" => Some(Self::Microseconds),
            _ => None,
        }
    }

    fn microseconds(self) -> f64 {
        match self {
            Self::Days => 86_400e6,
            Self::Hours => 3_600e6,
            Self::Minutes => 60e6,
            Self::Seconds => 1e6,
            Self::Milliseconds => 1e3,
            Self::Microseconds => 1.0,
        }
    }
}

/// Calendars whose dates coincide with chrono's proleptic Gregorian
/// calendar for every date a satellite mission can carry.
const SUPPORTED_CALENDARS: [&str; 3] = ["standard", "gregorian", "proleptic_gregorian"];

#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    pub fn parse(units: &str, calendar: &str) -> L1bResult<Self> {
        let calendar = calendar.trim().to_ascii_lowercase();
        if !SUPPORTED_CALENDARS.contains(&calendar.as_str()) {
            return Err(L1bError::InvalidConfig(format!(
                "unsupported calendar {:?}",
                calendar
            )));
        }
        let (unit, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| L1bError::InvalidConfig(format!("time units {:?}", units)))?;
        let unit = TimeUnit::parse(unit.trim())
            .ok_or_else(|| L1bError::InvalidConfig(format!("time unit {:?}", unit)))?;
        let epoch = parse_reference_date(epoch.trim())
            .ok_or_else(|| L1bError::InvalidConfig(format!("reference date {:?}", epoch)))?;
        Ok(Self { unit, epoch })
    }

    /// `None` for non-finite values and instants chrono cannot represent,
    /// such as netCDF fill values.
    pub fn to_datetime(&self, value: f64) -> Option<DateTime<Utc>> {
        let micros = (value * self.unit.microseconds()).round();
        if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::microseconds(micros as i64))
            .map(|time| time.and_utc())
    }

    /// Converts a whole time axis. A non-finite value is reported as
    /// missing, a finite one outside the representable range as corrupt.
    pub fn convert(&self, values: &[f64]) -> L1bResult<Vec<DateTime<Utc>>> {
        values
            .iter()
            .enumerate()
            .map(|(idx, &value)| {
                self.to_datetime(value).ok_or_else(|| {
                    if value.is_finite() {
                        L1bError::StructuralInconsistency(format!(
                            "time value {} at index {} is out of range",
                            value, idx
                        ))
                    } else {
                        L1bError::MissingField(format!("time value at index {} is not finite", idx))
                    }
                })
            })
            .collect()
    }
}

fn parse_reference_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_end_matches('Z').trim_end_matches(" UTC");
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_and_converts_values() {
        let units = TimeUnits::parse("seconds since 1990-01-01 00:00:00", "gregorian").unwrap();
        assert_eq!(units.unit, TimeUnit::Seconds);
        let t = units.to_datetime(86_400.5).unwrap();
        assert_eq!(t.to_rfc3339(), "1990-01-02T00:00:00.500+00:00");

        let days = TimeUnits::parse("days since 2000-01-01", "standard").unwrap();
        assert_eq!(days.to_datetime(1.5).unwrap().to_rfc3339(), "2000-01-02T12:00:00+00:00");
    }

    #[test]
    fn rejects_bad_units_and_calendars() {
        assert!(TimeUnits::parse("fortnights since 2000-01-01", "gregorian").is_err());
        assert!(TimeUnits::parse("seconds after 2000-01-01", "gregorian").is_err());
        assert!(TimeUnits::parse("seconds since 2000-01-01", "360_day").is_err());
    }

    #[test]
    fn non_finite_time_is_missing() {
        let units = TimeUnits::parse("seconds since 2000-01-01T00:00:00Z", "gregorian").unwrap();
        assert!(matches!(
            units.convert(&[0.0, f64::NAN]),
            Err(L1bError::MissingField(_))
        ));
    }

    #[test]
    fn fill_values_and_overflowing_times_are_rejected() {
        let units = TimeUnits::parse("seconds since 2000-01-01 00:00:00", "gregorian").unwrap();
        assert_eq!(units.to_datetime(9.96921e36), None);
        assert_eq!(units.to_datetime(1.0e13), None);
        assert_eq!(units.to_datetime(-1.0e13), None);
        assert!(matches!(
            units.convert(&[0.0, 9.96921e36]),
            Err(L1bError::StructuralInconsistency(_))
        ));
        let days = TimeUnits::parse("days since 2000-01-01", "standard").unwrap();
        assert!(days.convert(&[1.0e12]).is_err());
    }
}
