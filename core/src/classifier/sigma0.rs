//! Backscatter coefficient from the radar equation.

use std::f64::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::classifier::finite_or_nan;
use crate::prelude::RadarMode;

/// Instrument and geometry constants of the radar equation. Defaults are the
/// CryoSat-2 SIRAL values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sigma0Params {
    /// Compressed pulse width [s].
    pub ptr_width: f64,
    /// Burst length [s].
    pub tau_b: f64,
    /// Carrier wavelength [m].
    pub lambda_0: f64,
    /// Along-track footprint widening from the Doppler window.
    pub wf: f64,
    /// Antenna gain at boresight (linear).
    pub g_0: f64,
    /// Additive calibration bias [dB].
    pub bias_sigma0: f64,
    pub l_atm: f64,
    pub l_rx: f64,
    pub c_0: f64,
    pub r_mean: f64,
}

impl Default for Sigma0Params {
    fn default() -> Self {
        Self {
            ptr_width: 2.819e-9,
            tau_b: 0.00352,
            lambda_0: 0.022084,
            wf: 1.0,
            g_0: 19054.607179632483,
            bias_sigma0: 0.0,
            l_atm: 1.0,
            l_rx: 1.0,
            c_0: 299_792_458.0,
            r_mean: 6_371_000.0,
        }
    }
}

impl Sigma0Params {
    fn spherical_earth(&self, r: f64) -> f64 {
        1.0 + r / self.r_mean
    }

    /// Delay-Doppler cell area: Doppler-limited along track times
    /// pulse-limited across track.
    fn sar_footprint(&self, r: f64, v_s: f64) -> f64 {
        let lx = self.lambda_0 * r / (2.0 * v_s * self.tau_b);
        let ly = (self.c_0 * r * self.ptr_width / self.spherical_earth(r)).sqrt();
        2.0 * ly * self.wf * lx
    }

    fn pulse_limited_footprint(&self, r: f64) -> f64 {
        PI * self.c_0 * r * self.ptr_width / self.spherical_earth(r)
    }

    fn sigma0_db(&self, peak_power: f64, tx_power: f64, r: f64, area: f64) -> f64 {
        if !(peak_power > 0.0 && tx_power > 0.0 && area > 0.0) {
            return f64::NAN;
        }
        let k = (4.0 * PI).powi(3) * r.powi(4) * self.l_atm * self.l_rx
            / (self.lambda_0.powi(2) * self.g_0.powi(2) * area);
        finite_or_nan(10.0 * (peak_power / tx_power).log10() + 10.0 * k.log10() + self.bias_sigma0)
    }
}

/// Sigma0 [dB] for SAR/SARin echoes. `velocity` is the platform speed [m/s].
pub fn sar_sigma0(
    peak_power: &[f64],
    tx_power: &[f64],
    altitude: &[f64],
    velocity: &[f64],
    params: &Sigma0Params,
) -> Vec<f64> {
    peak_power
        .iter()
        .zip(tx_power)
        .zip(altitude.iter().zip(velocity))
        .map(|((&pp, &tx), (&r, &v))| params.sigma0_db(pp, tx, r, params.sar_footprint(r, v)))
        .collect()
}

/// Sigma0 [dB] for pulse-limited (LRM) echoes.
pub fn pulse_limited_sigma0(
    peak_power: &[f64],
    tx_power: &[f64],
    altitude: &[f64],
    params: &Sigma0Params,
) -> Vec<f64> {
    peak_power
        .iter()
        .zip(tx_power)
        .zip(altitude)
        .map(|((&pp, &tx), &r)| params.sigma0_db(pp, tx, r, params.pulse_limited_footprint(r)))
        .collect()
}

/// Selects the footprint model from the radar mode.
pub fn sigma0(
    mode: RadarMode,
    peak_power: &[f64],
    tx_power: &[f64],
    altitude: &[f64],
    velocity: &[f64],
    params: &Sigma0Params,
) -> Vec<f64> {
    if mode.is_synthetic_aperture() {
        sar_sigma0(peak_power, tx_power, altitude, velocity, params)
    } else {
        pulse_limited_sigma0(peak_power, tx_power, altitude, params)
    }
}

/// Maximum of each waveform, optionally as `10 log10`.
pub fn peak_power(power: &Array2<f64>, db: bool) -> Vec<f64> {
    power
        .rows()
        .into_iter()
        .map(|row| {
            let peak = row.iter().copied().filter(|v| v.is_finite()).fold(f64::NAN, f64::max);
            if db {
                if peak > 0.0 {
                    10.0 * peak.log10()
                } else {
                    f64::NAN
                }
            } else {
                peak
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALT: f64 = 720_000.0;
    const SPEED: f64 = 7_500.0;

    #[test]
    fn doubling_echo_power_adds_three_db() {
        let params = Sigma0Params::default();
        let s = sar_sigma0(&[1e-13, 2e-13], &[25.0, 25.0], &[ALT, ALT], &[SPEED, SPEED], &params);
        assert!((s[1] - s[0] - 10.0 * 2f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn sar_value_matches_closed_form() {
        let p = Sigma0Params::default();
        let alpha = 1.0 + ALT / p.r_mean;
        let lx = p.lambda_0 * ALT / (2.0 * SPEED * p.tau_b);
        let ly = (p.c_0 * ALT * p.ptr_width / alpha).sqrt();
        let area = 2.0 * ly * lx;
        let k = (4.0 * PI).powi(3) * ALT.powi(4) / (p.lambda_0.powi(2) * p.g_0.powi(2) * area);
        let expected = 10.0 * (1e-13f64 / 25.0).log10() + 10.0 * k.log10();
        let got = sigma0(RadarMode::Sar, &[1e-13], &[25.0], &[ALT], &[SPEED], &p)[0];
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn mode_selects_footprint_and_bias_is_additive() {
        let mut p = Sigma0Params::default();
        let sar = sigma0(RadarMode::Sarin, &[1e-13], &[25.0], &[ALT], &[SPEED], &p)[0];
        let lrm = sigma0(RadarMode::Lrm, &[1e-13], &[25.0], &[ALT], &[SPEED], &p)[0];
        assert!((sar - lrm).abs() > 1.0);
        p.bias_sigma0 = 1.5;
        let biased = sigma0(RadarMode::Lrm, &[1e-13], &[25.0], &[ALT], &[SPEED], &p)[0];
        assert!((biased - lrm - 1.5).abs() < 1e-9);
    }

    #[test]
    fn non_positive_power_is_nan() {
        let p = Sigma0Params::default();
        let s = pulse_limited_sigma0(&[0.0, 1e-13], &[25.0, 0.0], &[ALT, ALT], &p);
        assert!(s.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn peak_power_linear_and_db() {
        let power = Array2::from_shape_vec((2, 3), vec![1.0, 100.0, 3.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(peak_power(&power, false), vec![100.0, 0.0]);
        let db = peak_power(&power, true);
        assert!((db[0] - 20.0).abs() < 1e-12);
        assert!(db[1].is_nan());
    }
}
