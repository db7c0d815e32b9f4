//! Waveform shape parameters used for surface-type classification.
//!
//! Every function works on a whole track (row = pulse, column = range bin)
//! and returns one value per pulse. NaN marks a pulse where a parameter is
//! not computable.

pub mod leading_edge;
pub mod ocog;
pub mod peakiness;
pub mod sigma0;

pub use leading_edge::{leading_edge_width, LeadingEdgeOptions, LeadingEdgeWidth};
pub use ocog::{ocog, OcogParameters};
pub use peakiness::{
    in_guard_band, late_tail_to_peak_power, pulse_peakiness, window_peakiness, PulsePeakiness,
    WindowPeakiness,
};
pub use sigma0::{peak_power, pulse_limited_sigma0, sar_sigma0, sigma0, Sigma0Params};

use ndarray::Array2;

use crate::config::MissionConfig;
use crate::math::StatsHelper;
use crate::model::{PulseTrackBuilder, SurfaceCategory};
use crate::prelude::{L1bError, L1bResult};
use crate::telemetry::LogManager;

/// Classifier keys written by the engine.
pub mod names {
    pub const OCOG_AMPLITUDE: &str = "ocog_amplitude";
    pub const OCOG_WIDTH: &str = "ocog_width";
    pub const PEAKINESS: &str = "peakiness";
    pub const PEAKINESS_LEFT: &str = "peakiness_l";
    pub const PEAKINESS_RIGHT: &str = "peakiness_r";
    pub const PEAKINESS_OLD: &str = "peakiness_old";
    pub const PULSE_PEAKINESS: &str = "pulse_peakiness";
    pub const LATE_TAIL_TO_PEAK_POWER: &str = "late_tail_to_peak_power";
    pub const LEADING_EDGE_WIDTH: &str = "leading_edge_width";
    pub const LEADING_EDGE_WIDTH_FIRST_HALF: &str = "leading_edge_width_first_half";
    pub const LEADING_EDGE_WIDTH_SECOND_HALF: &str = "leading_edge_width_second_half";
    pub const FIRST_MAXIMUM_INDEX: &str = "first_maximum_index";
    pub const PEAK_POWER_DB: &str = "peak_power_db";
    pub const SIGMA0: &str = "sigma0";
}

/// Bins averaged for the noise floor.
const NOISE_BINS: usize = 11;

/// Waveform minus the mean of its first bins, clipped at zero.
pub fn noise_corrected(samples: &[f64]) -> Vec<f64> {
    let floor = StatsHelper::nanmean(&samples[..NOISE_BINS.min(samples.len())]);
    let floor = if floor.is_finite() { floor } else { 0.0 };
    samples.iter().map(|v| (v - floor).max(0.0)).collect()
}

pub(crate) fn finite_or_nan(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NAN
    }
}

/// Runs the classifier family on a track under construction and stores
/// the results under [`names`].
#[derive(Debug, Clone)]
pub struct WaveformClassifierEngine {
    pad: usize,
    leading_edge: LeadingEdgeOptions,
    sigma0: Sigma0Params,
    logger: LogManager,
}

impl WaveformClassifierEngine {
    pub fn new(pad: usize, leading_edge: LeadingEdgeOptions, sigma0: Sigma0Params) -> Self {
        Self {
            pad,
            leading_edge,
            sigma0,
            logger: LogManager::new(),
        }
    }

    pub fn from_config(config: &MissionConfig) -> Self {
        Self::new(config.peakiness_pad, config.leading_edge, config.sigma0)
    }

    pub fn with_logger(mut self, logger: LogManager) -> Self {
        self.logger = logger;
        self
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    /// OCOG, pulse peakiness and late-tail-to-peak power from echo counts.
    pub fn add_shape_parameters(&self, builder: &mut PulseTrackBuilder, counts: &Array2<f64>) -> L1bResult<()> {
        let shape = ocog(counts);
        let pp = pulse_peakiness(counts, self.pad);
        let ltpp = late_tail_to_peak_power(counts);
        let classifier = builder.classifier();
        classifier.add(shape.amplitude, names::OCOG_AMPLITUDE)?;
        classifier.add(shape.width, names::OCOG_WIDTH)?;
        classifier.add(pp.peakiness, names::PEAKINESS)?;
        classifier.add(pp.left, names::PEAKINESS_LEFT)?;
        classifier.add(pp.right, names::PEAKINESS_RIGHT)?;
        classifier.add(ltpp, names::LATE_TAIL_TO_PEAK_POWER)?;
        self.logger.debug("shape parameters added");
        Ok(())
    }

    /// Window and classic peakiness of pulse-limited echoes.
    pub fn add_window_peakiness(&self, builder: &mut PulseTrackBuilder, counts: &Array2<f64>) -> L1bResult<()> {
        let result = window_peakiness(counts);
        let classifier = builder.classifier();
        classifier.add(result.peakiness, names::PEAKINESS)?;
        classifier.add(result.peakiness_old, names::PEAKINESS_OLD)?;
        Ok(())
    }

    /// Leading-edge widths (0.05-0.95, 0.05-0.5, 0.5-0.95) and the first
    /// maximum index, on ocean pulses of the stored waveform.
    pub fn add_leading_edge_width(&self, builder: &mut PulseTrackBuilder) -> L1bResult<()> {
        let is_ocean = builder.surface().get(SurfaceCategory::Ocean).flag().to_vec();
        let result = {
            let (power, range, _) = builder
                .waveform()
                .ok_or_else(|| L1bError::MissingField("waveform".into()))?;
            leading_edge_width(
                range,
                power,
                &is_ocean,
                &self.leading_edge,
                &[(0.05, 0.95), (0.05, 0.5), (0.5, 0.95)],
            )
        };
        let mut widths = result.widths.into_iter();
        let classifier = builder.classifier();
        for name in [
            names::LEADING_EDGE_WIDTH,
            names::LEADING_EDGE_WIDTH_FIRST_HALF,
            names::LEADING_EDGE_WIDTH_SECOND_HALF,
        ] {
            let series = widths
                .next()
                .ok_or_else(|| L1bError::StructuralInconsistency("missing leading edge series".into()))?;
            classifier.add(series, name)?;
        }
        classifier.add(result.first_maximum_index, names::FIRST_MAXIMUM_INDEX)?;
        Ok(())
    }

    /// Radar-equation sigma0 from the stored waveform power and altitude.
    pub fn add_sigma0(&self, builder: &mut PulseTrackBuilder, tx_power: &[f64], velocity: &[f64]) -> L1bResult<()> {
        let values = {
            let (power, _, mode) = builder
                .waveform()
                .ok_or_else(|| L1bError::MissingField("waveform".into()))?;
            let altitude = builder
                .altitude()
                .ok_or_else(|| L1bError::MissingField("altitude".into()))?;
            sigma0(mode, &peak_power(power, false), tx_power, altitude, velocity, &self.sigma0)
        };
        builder.classifier().add(values, names::SIGMA0)
    }

    /// Waveform peak power in dB under `name`.
    pub fn add_peak_power_db(&self, builder: &mut PulseTrackBuilder, name: &str) -> L1bResult<()> {
        let values = {
            let (power, _, _) = builder
                .waveform()
                .ok_or_else(|| L1bError::MissingField("waveform".into()))?;
            peak_power(power, true)
        };
        builder.classifier().add(values, name)
    }
}

impl Default for WaveformClassifierEngine {
    fn default() -> Self {
        Self::new(2, LeadingEdgeOptions::default(), Sigma0Params::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackInfo;
    use crate::prelude::{MissionId, RadarMode};

    fn echo(bins: usize, centre: f64) -> Vec<f64> {
        (0..bins)
            .map(|k| 10.0 + 1000.0 * (-(k as f64 - centre).powi(2) / 8.0).exp())
            .collect()
    }

    fn builder_with_waveform(n: usize, bins: usize) -> PulseTrackBuilder {
        let mut builder = PulseTrackBuilder::new(TrackInfo::new(MissionId::Cryosat2, "test.DBL"), n);
        let power = Array2::from_shape_vec((n, bins), (0..n).flat_map(|_| echo(bins, 60.0)).collect()).unwrap();
        let range = Array2::from_shape_fn((n, bins), |(_, k)| 700_000.0 + 0.2342 * k as f64);
        builder.set_waveform(power, range, RadarMode::Lrm).unwrap();
        builder
            .set_position(vec![0.0; n], vec![80.0; n], vec![720_000.0; n])
            .unwrap();
        builder
    }

    #[test]
    fn noise_floor_uses_first_eleven_bins() {
        let mut samples = vec![2.0; 11];
        samples.extend([10.0, 1.0]);
        assert_eq!(noise_corrected(&samples)[11..], [8.0, 0.0]);
        assert_eq!(noise_corrected(&[3.0, 5.0]), vec![0.0, 1.0]);
    }

    #[test]
    fn engine_writes_fixed_names() {
        let engine = WaveformClassifierEngine::default();
        let mut builder = builder_with_waveform(3, 128);
        let ocean = vec![true, false, true];
        builder.surface_type().add(&ocean, SurfaceCategory::Ocean).unwrap();
        let counts = builder.waveform().unwrap().0.clone();

        engine.add_shape_parameters(&mut builder, &counts).unwrap();
        engine.add_leading_edge_width(&mut builder).unwrap();
        engine.add_sigma0(&mut builder, &[25.0; 3], &[7500.0; 3]).unwrap();

        let classifier = builder.classifier();
        for name in [
            names::OCOG_AMPLITUDE,
            names::OCOG_WIDTH,
            names::PEAKINESS,
            names::PEAKINESS_LEFT,
            names::PEAKINESS_RIGHT,
            names::LATE_TAIL_TO_PEAK_POWER,
            names::LEADING_EDGE_WIDTH,
            names::LEADING_EDGE_WIDTH_FIRST_HALF,
            names::LEADING_EDGE_WIDTH_SECOND_HALF,
            names::FIRST_MAXIMUM_INDEX,
            names::SIGMA0,
        ] {
            assert!(classifier.contains(name), "{name} missing");
        }
        let lew = classifier.get(names::LEADING_EDGE_WIDTH).unwrap();
        assert!(lew[0] > 0.0 && lew[1].is_nan() && lew[2] > 0.0);
        assert!(classifier.get(names::PEAKINESS).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn duplicate_classifier_name_is_rejected() {
        let engine = WaveformClassifierEngine::default();
        let mut builder = builder_with_waveform(2, 128);
        engine.add_peak_power_db(&mut builder, names::SIGMA0).unwrap();
        assert!(engine.add_peak_power_db(&mut builder, names::SIGMA0).is_err());
    }
}
