//! ERS-1/2 REAPER SGDR products read as variable sets.

use ndarray::Array2;

use crate::adapters::{transfer_classifier_targets, transfer_corrections, transfer_surface_codes};
use crate::binary::GroupUnpacker;
use crate::classifier::{names, window_peakiness, WaveformClassifierEngine};
use crate::config::MissionConfig;
use crate::model::{PulseTrack, PulseTrackBuilder, Timeliness, TrackInfo};
use crate::prelude::{L1bResult, MissionAdapter, MissionId, RadarMode};
use crate::source::ProductFile;
use crate::telemetry::LogManager;
use crate::variables::{JsonVariableSource, VariableSet, VariableSource};

const TIME: &str = "time_20hz";
const LONGITUDE: &str = "lon_20hz";
const LATITUDE: &str = "lat_20hz";
const ALTITUDE: &str = "alt_20hz";
const WAVEFORM: &str = "ku_wf";
const TRACKER_RANGE: &str = "tracker_range_20hz";
const TRACKING_STATE: &str = "alt_state_flag_20hz";
const SURFACE_TYPE: &str = "surface_type";

/// Tracker states of ocean and ice tracking; everything else is
/// acquisition or calibration.
fn is_tracking(state: f64) -> bool {
    state == 2.0 || state == 3.0
}

pub struct ErsAdapter {
    config: MissionConfig,
    source: Box<dyn VariableSource>,
    engine: WaveformClassifierEngine,
}

impl ErsAdapter {
    pub fn new(config: MissionConfig) -> Self {
        let engine = WaveformClassifierEngine::from_config(&config);
        Self {
            config,
            source: Box::new(JsonVariableSource),
            engine,
        }
    }

    pub fn with_source(mut self, source: Box<dyn VariableSource>) -> Self {
        self.source = source;
        self
    }

    fn track_info(&self, product: &ProductFile, set: &VariableSet) -> TrackInfo {
        let mut info = TrackInfo::new(self.config.mission, product.file_name());
        info.mission_data_version = set.attribute_text("software_ver").unwrap_or_default();
        info.orbit = set.attribute_i64("abs_orbit");
        info.cycle = set.attribute_i64("cycle");
        info.timeliness = Timeliness::Rep;
        info
    }

    fn transfer_waveform(&self, builder: &mut PulseTrackBuilder, set: &VariableSet, mode: RadarMode) -> L1bResult<Array2<f64>> {
        let power = set.variable(WAVEFORM)?.to_rows()?;
        let tracker = set.values(TRACKER_RANGE)?;
        let bin_width = self.config.range_bin_width;
        let reference_bin = self.config.reference_bin;
        let range = Array2::from_shape_fn(power.dim(), |(i, k)| {
            tracker.get(i).copied().unwrap_or(f64::NAN) + (k as f64 - reference_bin) * bin_width
        });
        builder.set_waveform(power.clone(), range, mode)?;
        let valid = set.values(TRACKING_STATE)?.into_iter().map(is_tracking).collect();
        builder.set_valid_flag(valid)?;
        Ok(power)
    }

    fn transfer_classifiers(&self, builder: &mut PulseTrackBuilder, set: &VariableSet, power: &Array2<f64>) -> L1bResult<()> {
        transfer_classifier_targets(builder, &self.config, |native| set.values(native))?;
        let peakiness = window_peakiness(power).peakiness;
        builder.classifier().add(peakiness, names::PULSE_PEAKINESS)?;
        self.engine.add_leading_edge_width(builder)
    }
}

impl MissionAdapter for ErsAdapter {
    fn mission(&self) -> MissionId {
        self.config.mission
    }

    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack> {
        let logger = LogManager::scoped(product.file_name());
        let set = self.source.read(&product)?;
        let mode = self.config.radar_mode.unwrap_or(RadarMode::Lrm);
        let unpacker = GroupUnpacker::new(self.config.blocks_per_record);

        let timestamps = self.config.time_axis()?.convert(&set.values(TIME)?)?;
        let mut builder = PulseTrackBuilder::new(self.track_info(&product, &set), timestamps.len());
        builder.set_timestamps(timestamps)?;
        builder.set_position(set.values(LONGITUDE)?, set.values(LATITUDE)?, set.values(ALTITUDE)?)?;
        let power = self.transfer_waveform(&mut builder, &set, mode)?;

        transfer_corrections(&mut builder, &self.config, |_, native| {
            Ok(unpacker.replicate(&set.values(native)?))
        })?;
        let surface = unpacker.replicate(&set.values(SURFACE_TYPE)?);
        transfer_surface_codes(&mut builder, &surface, &self.config)?;
        self.transfer_classifiers(&mut builder, &set, &power)?;

        let track = builder.finish()?;
        logger.record(&format!("{} track with {} pulses", self.config.mission, track.n_pulses()));
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SurfaceCategory;
    use crate::prelude::L1bError;
    use crate::variables::Variable;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    const RECORDS: usize = 2;
    const BLOCKS: usize = 20;
    const BINS: usize = 64;

    fn grid(f: impl Fn(usize) -> f64) -> Variable {
        Variable::new(vec![RECORDS, BLOCKS], (0..RECORDS * BLOCKS).map(f).collect()).unwrap()
    }

    fn variables() -> VariableSet {
        let n = RECORDS * BLOCKS;
        let mut set = VariableSet::new();
        set.set_attribute("software_ver", json!("REAPER v1.0"));
        set.set_attribute("abs_orbit", json!(4242));
        set.set_attribute("cycle", json!(18));
        set.insert(TIME, grid(|i| 2.0e8 + 0.05 * i as f64));
        set.insert(LONGITUDE, grid(|_| -30.0));
        set.insert(LATITUDE, grid(|i| 70.0 + 0.003 * i as f64));
        set.insert(ALTITUDE, grid(|_| 785_000.0));
        set.insert(TRACKER_RANGE, grid(|_| 784_990.0));
        set.insert(TRACKING_STATE, grid(|i| [3.0, 2.0, 0.0, 5.0][i % 4]));
        let waveform: Vec<f64> = (0..n)
            .flat_map(|_| (0..BINS).map(|k| 5.0 + 800.0 * (-((k as f64 - 32.0).powi(2)) / 4.0).exp()))
            .collect();
        set.insert(WAVEFORM, Variable::new(vec![RECORDS, BLOCKS, BINS], waveform).unwrap());
        for native in [
            "model_dry_tropo_corr",
            "model_wet_tropo_corr",
            "inv_bar_corr",
            "hf_fluctuations_corr",
            "iono_corr_model",
            "ocean_tide_sol1",
            "ocean_tide_equil",
            "load_tide_sol1",
            "solid_earth_tide",
            "pole_tide",
        ] {
            set.insert(native, Variable::vector(vec![-1.5, -2.5]));
        }
        set.insert(SURFACE_TYPE, Variable::vector(vec![0.0, 3.0]));
        for native in [
            "peakiness_20hz",
            "width_20hz",
            "amplitude_20hz",
            "ice1_sig0_20hz",
            "ice2_sig0_20hz",
            "ice2_le_sig0_20hz",
            "ice1_elevation_20hz",
            "ice2_elevation_20hz",
        ] {
            set.insert(native, grid(|i| i as f64));
        }
        set
    }

    fn product(set: &VariableSet) -> ProductFile {
        ProductFile::from_bytes("E2_REAP_ERS_ALT_2S.json", set.to_json().unwrap().into_bytes())
    }

    #[test]
    fn reaper_variables_map_onto_track() {
        let adapter = ErsAdapter::new(MissionConfig::defaults(MissionId::Ers2));
        assert_eq!(adapter.mission(), MissionId::Ers2);
        let track = adapter.construct(product(&variables())).unwrap();
        assert_eq!(track.n_pulses(), RECORDS * BLOCKS);
        assert_eq!(track.info().mission, MissionId::Ers2);
        assert_eq!(track.info().orbit, Some(4242));
        assert_eq!(track.info().mission_data_version, "REAPER v1.0");

        // 2e8 s after 1990-01-01.
        let first = Utc.with_ymd_and_hms(1996, 5, 3, 19, 33, 20).unwrap();
        assert_eq!(track.time_orbit().timestamp[0], first);

        let valid = &track.waveform().valid;
        assert_eq!(&valid[..4], &[true, true, false, false]);
        let range = &track.waveform().range;
        assert!((range[[0, 0]] - (784_990.0 - 32.5 * 0.4545)).abs() < 1e-6);
    }

    #[test]
    fn one_hz_fields_are_replicated() {
        let adapter = ErsAdapter::new(MissionConfig::defaults(MissionId::Ers1));
        let track = adapter.construct(product(&variables())).unwrap();
        let dry = track.correction().get("dry_troposphere").unwrap();
        assert_eq!(dry[BLOCKS - 1], -1.5);
        assert_eq!(dry[BLOCKS], -2.5);
        assert_eq!(track.surface_type().category(0), Some(SurfaceCategory::Ocean));
        assert_eq!(track.surface_type().category(BLOCKS), Some(SurfaceCategory::Land));

        let classifier = track.classifier();
        assert_eq!(classifier.get("sigma0").unwrap()[7], 7.0);
        assert!(classifier.get(names::PULSE_PEAKINESS).unwrap()[0] > 1.0);
        assert!(classifier.get(names::LEADING_EDGE_WIDTH).unwrap()[0] > 0.0);
    }

    #[test]
    fn missing_tracking_state_is_reported() {
        let mut dump: serde_json::Value = serde_json::from_str(&variables().to_json().unwrap()).unwrap();
        dump["variables"].as_object_mut().unwrap().remove(TRACKING_STATE);
        let file = ProductFile::from_bytes("E2_REAP.json", dump.to_string().into_bytes());
        let err = ErsAdapter::new(MissionConfig::defaults(MissionId::Ers1))
            .construct(file)
            .unwrap_err();
        assert!(matches!(err, L1bError::MissingField(_)));
    }

    #[test]
    fn fill_value_timestamps_fail_the_track() {
        let mut set = variables();
        set.insert(TIME, grid(|i| if i == 5 { 9.96921e36 } else { 2.0e8 + 0.05 * i as f64 }));
        let err = ErsAdapter::new(MissionConfig::defaults(MissionId::Ers2))
            .construct(product(&set))
            .unwrap_err();
        assert!(matches!(err, L1bError::StructuralInconsistency(_)));

        set.insert(TIME, grid(|i| 1.0e13 + i as f64));
        assert!(ErsAdapter::new(MissionConfig::defaults(MissionId::Ers2))
            .construct(product(&set))
            .is_err());
    }
}
