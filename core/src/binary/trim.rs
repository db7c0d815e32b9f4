//! Removal of trailing pad records.

use log::warn;

/// Outcome of scanning a sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPlan {
    /// Leading entries to keep.
    pub keep: usize,
    pub removed: usize,
    /// Every counter was zero; nothing was trimmed.
    pub all_zero: bool,
}

impl TrimPlan {
    pub fn apply<T>(&self, mut values: Vec<T>) -> Vec<T> {
        values.truncate(self.keep);
        values
    }
}

pub struct TrackTrimmer;

impl TrackTrimmer {
    /// Drops the run of zero counters after the last nonzero one. Zeros
    /// before or between nonzero counters are data. An all-zero sequence is
    /// left untouched and flagged.
    pub fn plan(counters: &[f64]) -> TrimPlan {
        match counters.iter().rposition(|&counter| counter != 0.0) {
            Some(last) => TrimPlan {
                keep: last + 1,
                removed: counters.len() - last - 1,
                all_zero: false,
            },
            None => {
                if !counters.is_empty() {
                    warn!(
                        "all {} sequence counters are zero, track left untrimmed",
                        counters.len()
                    );
                }
                TrimPlan {
                    keep: counters.len(),
                    removed: 0,
                    all_zero: !counters.is_empty(),
                }
            }
        }
    }
}
