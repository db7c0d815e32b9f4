//! Leading-edge width from threshold first-maximum retracking.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::math::StatsHelper;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadingEdgeOptions {
    /// Samples per range bin after linear oversampling.
    pub oversampling: usize,
    /// Boxcar length in oversampled samples.
    pub smoothing_window: usize,
    /// Minimum normalised power of the first maximum.
    pub first_maximum_threshold: f64,
}

impl Default for LeadingEdgeOptions {
    fn default() -> Self {
        Self {
            oversampling: 10,
            smoothing_window: 11,
            first_maximum_threshold: 0.15,
        }
    }
}

/// One pulse, oversampled, smoothed and normalised to a unit peak.
struct EdgeProfile {
    bin: Vec<f64>,
    range: Vec<f64>,
    power: Vec<f64>,
    first_maximum: usize,
}

impl EdgeProfile {
    fn build(range: &[f64], power: &[f64], options: &LeadingEdgeOptions) -> Option<Self> {
        let bins = power.len();
        if bins < 2 {
            return None;
        }
        let x: Vec<f64> = (0..bins).map(|k| k as f64).collect();
        let bin = StatsHelper::linspace(0.0, (bins - 1) as f64, bins * options.oversampling.max(1));
        let range_os: Vec<f64> = bin.iter().map(|&b| StatsHelper::interp(b, &x, range)).collect();
        let power_os: Vec<f64> = bin.iter().map(|&b| StatsHelper::interp(b, &x, power)).collect();
        let smoothed = StatsHelper::boxcar(&power_os, options.smoothing_window.max(1));

        let (peak_idx, peak) = StatsHelper::nanmax_index(&smoothed)?;
        if peak <= 0.0 {
            return None;
        }
        let normalised: Vec<f64> = smoothed.iter().map(|v| v / peak).collect();
        let threshold = options.first_maximum_threshold;
        let first_maximum = (1..normalised.len().saturating_sub(1))
            .find(|&j| {
                normalised[j] >= threshold
                    && normalised[j] >= normalised[j - 1]
                    && normalised[j] > normalised[j + 1]
            })
            .unwrap_or(peak_idx);

        Some(Self {
            bin,
            range: range_os,
            power: normalised,
            first_maximum,
        })
    }

    /// Range where the normalised power first reaches `threshold` on the
    /// way up to the first maximum.
    fn crossing(&self, threshold: f64) -> f64 {
        let Some(j) = (0..=self.first_maximum).find(|&j| self.power[j] >= threshold) else {
            return f64::NAN;
        };
        if j == 0 {
            return self.range[0];
        }
        let (p0, p1) = (self.power[j - 1], self.power[j]);
        let fraction = if p1 > p0 { (threshold - p0) / (p1 - p0) } else { 1.0 };
        self.range[j - 1] + fraction * (self.range[j] - self.range[j - 1])
    }

    fn first_maximum_bin(&self) -> f64 {
        self.bin[self.first_maximum]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeadingEdgeWidth {
    /// One series per requested `(low, high)` threshold pair.
    pub widths: Vec<Vec<f64>>,
    /// First maximum in original range-bin units.
    pub first_maximum_index: Vec<f64>,
}

/// `range(high) - range(low)` for each threshold pair. Only pulses flagged
/// in `is_ocean` are processed; all others are NaN.
pub fn leading_edge_width(
    range: &Array2<f64>,
    power: &Array2<f64>,
    is_ocean: &[bool],
    options: &LeadingEdgeOptions,
    thresholds: &[(f64, f64)],
) -> LeadingEdgeWidth {
    let n = power.nrows();
    let mut widths = vec![vec![f64::NAN; n]; thresholds.len()];
    let mut first_maximum_index = vec![f64::NAN; n];

    for i in (0..n).filter(|&i| is_ocean.get(i).copied().unwrap_or(false)) {
        let range_row = range.row(i).to_vec();
        let power_row = power.row(i).to_vec();
        let Some(profile) = EdgeProfile::build(&range_row, &power_row, options) else {
            continue;
        };
        first_maximum_index[i] = profile.first_maximum_bin();
        for (series, &(low, high)) in widths.iter_mut().zip(thresholds) {
            series[i] = profile.crossing(high) - profile.crossing(low);
        }
    }
    LeadingEdgeWidth {
        widths,
        first_maximum_index,
    }
}
