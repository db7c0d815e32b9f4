//! TAI-UTC offsets and the TAI to UTC conversion step.

use std::io::BufRead;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use log::debug;

use crate::prelude::{L1bError, L1bResult};

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch.
const NTP_UNIX_OFFSET: i64 = 2_208_988_800;

/// (year, month, TAI-UTC in seconds) from 1972-01-01 onward.
const IERS_TABLE: [(i32, u32, i64); 28] = [
    (1972, 1, 10),
    (1972, 7, 11),
    (1973, 1, 12),
    (1974, 1, 13),
    (1975, 1, 14),
    (1976, 1, 15),
    (1977, 1, 16),
    (1978, 1, 17),
    (1979, 1, 18),
    (1980, 1, 19),
    (1981, 7, 20),
    (1982, 7, 21),
    (1983, 7, 22),
    (1985, 7, 23),
    (1988, 1, 24),
    (1990, 1, 25),
    (1991, 1, 26),
    (1992, 7, 27),
    (1993, 7, 28),
    (1994, 7, 29),
    (1996, 1, 30),
    (1997, 7, 31),
    (1999, 1, 32),
    (2006, 1, 33),
    (2009, 1, 34),
    (2012, 7, 35),
    (2015, 7, 36),
    (2017, 1, 37),
];

#[derive(Debug, Clone, PartialEq)]
pub struct LeapSecondTable {
    /// Sorted by effective date.
    entries: Vec<(NaiveDateTime, i64)>,
}

impl LeapSecondTable {
    pub fn builtin() -> Self {
        let entries = IERS_TABLE
            .iter()
            .filter_map(|&(year, month, offset)| {
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|date| (date, offset))
            })
            .collect();
        Self { entries }
    }

    /// Parses an IETF `leap-seconds.list` file: `<NTP seconds> <offset>` per
    /// data line, `#` starts a comment.
    pub fn from_reader<R: BufRead>(reader: R) -> L1bResult<Self> {
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line
                .map_err(|err| L1bError::InvalidConfig(format!("leap second list: {}", err)))?;
            let data = line.split('#').next().unwrap_or("").trim();
            if data.is_empty() {
                continue;
            }
            let mut columns = data.split_whitespace();
            let parsed = match (columns.next(), columns.next()) {
                (Some(ntp), Some(offset)) => ntp.parse::<i64>().ok().zip(offset.parse::<i64>().ok()),
                _ => None,
            };
            let (ntp, offset) = parsed.ok_or_else(|| {
                L1bError::InvalidConfig(format!(
                    "leap second list line {}: {:?}",
                    line_no + 1,
                    line
                ))
            })?;
            let effective = DateTime::<Utc>::from_timestamp(ntp - NTP_UNIX_OFFSET, 0)
                .ok_or_else(|| {
                    L1bError::InvalidConfig(format!("leap second list line {}: bad epoch", line_no + 1))
                })?
                .naive_utc();
            entries.push((effective, offset));
        }
        if entries.is_empty() {
            return Err(L1bError::InvalidConfig("leap second list has no entries".into()));
        }
        entries.sort_by_key(|(date, _)| *date);
        debug!("loaded {} leap second entries", entries.len());
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// TAI-UTC valid at `time`; zero before the first entry.
    pub fn offset_at(&self, time: NaiveDateTime) -> i64 {
        self.entries
            .iter()
            .take_while(|(effective, _)| *effective <= time)
            .last()
            .map_or(0, |(_, offset)| *offset)
    }
}

impl Default for LeapSecondTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Converts TAI timestamps to UTC.
///
/// The offset valid at the first timestamp is applied to the whole series,
/// which keeps the series free of duplicate instants. Tracks that cross a
/// leap second are off by one second after the leap.
#[derive(Debug, Clone, Default)]
pub struct TaiUtcConverter {
    table: LeapSecondTable,
}

impl TaiUtcConverter {
    pub fn new(table: LeapSecondTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &LeapSecondTable {
        &self.table
    }

    pub fn tai_to_utc(&self, tai: &[NaiveDateTime]) -> L1bResult<Vec<DateTime<Utc>>> {
        let Some(first) = tai.first() else {
            return Ok(Vec::new());
        };
        let offset = Duration::seconds(self.table.offset_at(*first));
        tai.iter()
            .map(|time| {
                time.checked_sub_signed(offset)
                    .map(|utc| utc.and_utc())
                    .ok_or_else(|| L1bError::BinaryDecode(format!("TAI time {} is out of range", time)))
            })
            .collect()
    }
}
