//! Peakiness family: pulse peakiness with side lobes, window peakiness and
//! late-tail-to-peak power.

use ndarray::Array2;

use crate::classifier::{finite_or_nan, noise_corrected};
use crate::math::StatsHelper;

#[derive(Debug, Clone, PartialEq)]
pub struct PulsePeakiness {
    pub peakiness: Vec<f64>,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

/// True when the peak bin leaves room for both side windows.
pub fn in_guard_band(peak_index: usize, bins: usize, pad: usize) -> bool {
    peak_index >= 3 * pad && peak_index + 4 * pad < bins
}

/// Full, left and right pulse peakiness of noise-corrected waveforms.
///
/// The side windows are `[i - 3 pad, i - pad]` and `[i + pad, i + 3 pad]`
/// around the first peak bin `i`. Pulses whose peak is closer than
/// `3 pad` to the first bin or `4 pad` to the last are NaN.
pub fn pulse_peakiness(power: &Array2<f64>, pad: usize) -> PulsePeakiness {
    let bins = power.ncols();
    let n = power.nrows();
    let mut out = PulsePeakiness {
        peakiness: vec![f64::NAN; n],
        left: vec![f64::NAN; n],
        right: vec![f64::NAN; n],
    };
    for (i, row) in power.rows().into_iter().enumerate() {
        let y = noise_corrected(&row.to_vec());
        let Some((idx, peak)) = StatsHelper::nanmax_index(&y) else {
            continue;
        };
        if !in_guard_band(idx, bins, pad) {
            continue;
        }
        let left = StatsHelper::nanmean(&y[idx - 3 * pad..=idx - pad]);
        let right = StatsHelper::nanmean(&y[idx + pad..=idx + 3 * pad]);
        let total: f64 = y.iter().filter(|v| v.is_finite()).sum();
        out.left[i] = finite_or_nan(peak / left * 3.0);
        out.right[i] = finite_or_nan(peak / right * 3.0);
        out.peakiness[i] = finite_or_nan(peak / total * bins as f64);
    }
    out
}

/// Mean power 50 to 70 bins behind the peak relative to the peak.
pub fn late_tail_to_peak_power(power: &Array2<f64>) -> Vec<f64> {
    const TAIL_START: usize = 50;
    const TAIL_END: usize = 70;
    power
        .rows()
        .into_iter()
        .map(|row| {
            let y = noise_corrected(&row.to_vec());
            match StatsHelper::nanmax_index(&y) {
                Some((idx, peak)) if peak > 0.0 && idx + TAIL_END <= y.len() => {
                    finite_or_nan(StatsHelper::nanmean(&y[idx + TAIL_START..idx + TAIL_END]) / peak)
                }
                _ => f64::NAN,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowPeakiness {
    /// `83 * max / sum` over bins 5..83.
    pub peakiness: Vec<f64>,
    /// `max / sum * B` over the whole waveform.
    pub peakiness_old: Vec<f64>,
}

/// Peakiness of raw pulse-limited waveforms, without noise correction.
pub fn window_peakiness(power: &Array2<f64>) -> WindowPeakiness {
    const SKIP: usize = 5;
    const WINDOW_END: usize = 83;
    let bins = power.ncols();
    let mut peakiness = Vec::with_capacity(power.nrows());
    let mut peakiness_old = Vec::with_capacity(power.nrows());
    for row in power.rows() {
        let y = row.to_vec();
        let end = WINDOW_END.min(bins);
        let window = if SKIP < end { &y[SKIP..end] } else { &y[..0] };
        let window_sum: f64 = window.iter().sum();
        let window_max = window.iter().copied().fold(f64::NAN, f64::max);
        peakiness.push(finite_or_nan(WINDOW_END as f64 * window_max / window_sum));

        let sum: f64 = y.iter().sum();
        let max = y.iter().copied().fold(f64::NAN, f64::max);
        peakiness_old.push(finite_or_nan(max / sum * bins as f64));
    }
    WindowPeakiness {
        peakiness,
        peakiness_old,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BINS: usize = 256;
    const PAD: usize = 2;

    fn triangle(peak: usize) -> Vec<f64> {
        (0..BINS)
            .map(|k| 10.0 + (1000.0 - 100.0 * (k as f64 - peak as f64).abs()).max(0.0))
            .collect()
    }

    fn single(row: Vec<f64>) -> Array2<f64> {
        Array2::from_shape_vec((1, row.len()), row).unwrap()
    }

    #[test]
    fn nan_exactly_outside_guard_band() {
        for peak in 0..BINS {
            let result = pulse_peakiness(&single(triangle(peak)), PAD);
            let inside = peak >= 3 * PAD && peak < BINS - 4 * PAD;
            assert_eq!(result.peakiness[0].is_finite(), inside, "peak bin {}", peak);
            assert_eq!(result.left[0].is_finite(), inside, "peak bin {}", peak);
            assert_eq!(result.right[0].is_finite(), inside, "peak bin {}", peak);
        }
    }

    #[test]
    fn boundary_bins() {
        let at = |peak| pulse_peakiness(&single(triangle(peak)), PAD).peakiness[0];
        assert!(at(5).is_nan());
        assert!(at(6).is_finite());
        assert!(at(247).is_finite());
        assert!(at(248).is_nan());
    }

    #[test]
    fn symmetric_peak_has_equal_side_peakiness() {
        let result = pulse_peakiness(&single(triangle(100)), PAD);
        assert!((result.left[0] - result.right[0]).abs() < 1e-9);
        // y = triangle - 10 after noise removal: peak 1000, window mean 600.
        assert!((result.left[0] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn late_tail_needs_seventy_bins_behind_peak() {
        let mut row = vec![0.0; 128];
        row[40] = 100.0;
        for v in &mut row[90..110] {
            *v = 20.0;
        }
        let ltpp = late_tail_to_peak_power(&single(row.clone()));
        assert!((ltpp[0] - 0.2).abs() < 1e-12);
        row[40] = 0.0;
        row[80] = 100.0;
        assert!(late_tail_to_peak_power(&single(row))[0].is_nan());
    }

    #[test]
    fn window_peakiness_of_flat_and_spiky_waveforms() {
        let flat = window_peakiness(&single(vec![1.0; 128]));
        assert!((flat.peakiness[0] - 83.0 / 78.0).abs() < 1e-12);
        assert!((flat.peakiness_old[0] - 1.0).abs() < 1e-12);
        let zero = window_peakiness(&single(vec![0.0; 128]));
        assert!(zero.peakiness[0].is_nan());
    }
}
