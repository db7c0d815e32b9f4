//! Offset centre of gravity shape estimate.

use ndarray::Array2;

use crate::classifier::noise_corrected;

#[derive(Debug, Clone, PartialEq)]
pub struct OcogParameters {
    pub amplitude: Vec<f64>,
    pub width: Vec<f64>,
}

/// Amplitude `sqrt(sum y^4 / sum y^2)` and width `(sum y^2)^2 / sum y^4` of
/// the noise-corrected waveform. An all-zero waveform has amplitude 0 and
/// no width.
pub fn ocog(power: &Array2<f64>) -> OcogParameters {
    let mut amplitude = Vec::with_capacity(power.nrows());
    let mut width = Vec::with_capacity(power.nrows());
    for row in power.rows() {
        let y = noise_corrected(&row.to_vec());
        let sum2: f64 = y.iter().map(|v| v * v).sum();
        let sum4: f64 = y.iter().map(|v| v.powi(4)).sum();
        if sum2 > 0.0 {
            amplitude.push((sum4 / sum2).sqrt());
            width.push(sum2 * sum2 / sum4);
        } else {
            amplitude.push(0.0);
            width.push(f64::NAN);
        }
    }
    OcogParameters { amplitude, width }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(bins: usize, centre: f64, sigma: f64) -> Vec<f64> {
        (0..bins)
            .map(|k| 5.0 + 800.0 * (-(k as f64 - centre).powi(2) / (2.0 * sigma * sigma)).exp())
            .collect()
    }

    #[test]
    fn amplitude_scales_and_width_is_invariant() {
        let row = bump(128, 60.0, 4.0);
        let original = ocog(&Array2::from_shape_vec((1, 128), row.clone()).unwrap());
        for c in [0.5, 3.0, 1000.0] {
            let scaled_row = row.iter().map(|v| v * c).collect();
            let scaled = ocog(&Array2::from_shape_vec((1, 128), scaled_row).unwrap());
            let rel_amp = scaled.amplitude[0] / (c * original.amplitude[0]);
            assert!((rel_amp - 1.0).abs() < 1e-9);
            assert!((scaled.width[0] / original.width[0] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn flat_waveform_has_zero_amplitude_and_no_width() {
        let result = ocog(&Array2::from_elem((2, 64), 42.0));
        assert_eq!(result.amplitude, vec![0.0, 0.0]);
        assert!(result.width.iter().all(|w| w.is_nan()));
    }
}
