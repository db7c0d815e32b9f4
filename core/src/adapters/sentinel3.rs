//! Sentinel-3 SRAL L1b products read as variable sets.

use ndarray::Array2;

use crate::adapters::{transfer_classifier_targets, transfer_corrections, transfer_surface_codes, truthy};
use crate::classifier::{names, WaveformClassifierEngine};
use crate::config::MissionConfig;
use crate::math::StatsHelper;
use crate::model::{PulseTrack, PulseTrackBuilder, Timeliness, TrackInfo};
use crate::prelude::{L1bResult, MissionAdapter, MissionId, RadarMode};
use crate::source::ProductFile;
use crate::telemetry::LogManager;
use crate::variables::{JsonVariableSource, VariableSet, VariableSource};

const TIME_20HZ: &str = "time_20_ku";
const TIME_1HZ: &str = "time_01";
const LONGITUDE: &str = "lon_20_ku";
const LATITUDE: &str = "lat_20_ku";
const ALTITUDE: &str = "alt_20_ku";
const WAVEFORM: &str = "waveform_20_ku";
const SCALE_FACTOR: &str = "scale_factor_20_ku";
const TRACKER_RANGE: &str = "tracker_range_20_ku";
const INSTRUMENT_CORRECTION: &str = "net_instr_cor_range_20_ku";
const SURFACE_TYPE: &str = "surf_type_20_ku";

/// Stand-in for zero counts so the dB scale stays finite.
const ZERO_COUNT: f64 = 1e-12;

/// `counts * 10^(scale_factor / 10)` per waveform.
fn echo_power(counts: &Array2<f64>, scale_factor: &[f64]) -> Array2<f64> {
    let mut power = counts.clone();
    for (mut row, sf) in power.rows_mut().into_iter().zip(scale_factor) {
        let gain = 10f64.powf(sf / 10.0);
        row.mapv_inplace(|count| if count == 0.0 { ZERO_COUNT * gain } else { count * gain });
    }
    power
}

pub struct Sentinel3Adapter {
    config: MissionConfig,
    source: Box<dyn VariableSource>,
    engine: WaveformClassifierEngine,
}

impl Sentinel3Adapter {
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
        let source = set
            .attribute_text("product_name")
            .unwrap_or_else(|| product.file_name());
        let mut info = TrackInfo::new(self.config.mission, source);
        info.mission_data_version = set.attribute_text("source").unwrap_or_default();
        info.orbit = set.attribute_i64("absolute_pass_number");
        info.cycle = set.attribute_i64("cycle_number");
        info.sar_mode_percent = set.attribute_f64("sar_mode_percentage");
        info.open_ocean_percent = set.attribute_f64("open_ocean_percentage");
        info.timeliness = set
            .attribute_text("timeliness")
            .and_then(|text| Timeliness::parse(&text))
            .unwrap_or(Timeliness::Ntc);
        info
    }

    fn transfer_waveform(&self, builder: &mut PulseTrackBuilder, set: &VariableSet) -> L1bResult<()> {
        let counts = set.variable(WAVEFORM)?.to_rows()?;
        let power = echo_power(&counts, &set.values(SCALE_FACTOR)?);
        let tracker = set.values(TRACKER_RANGE)?;
        let instrument = set.values(INSTRUMENT_CORRECTION)?;
        let bin_width = self.config.range_bin_width;
        let reference_bin = self.config.reference_bin;
        let range = Array2::from_shape_fn(power.dim(), |(i, k)| {
            let window = tracker.get(i).copied().unwrap_or(f64::NAN) + instrument.get(i).copied().unwrap_or(f64::NAN);
            window + (k as f64 - reference_bin) * bin_width
        });
        let mode = self.config.radar_mode.unwrap_or(RadarMode::Sar);
        builder.set_waveform(power, range, mode)?;

        let valid = match &self.config.quality_flag {
            Some(name) => truthy(&set.values(name)?).into_iter().map(|bad| !bad).collect(),
            None => vec![true; builder.n_pulses()],
        };
        builder.set_valid_flag(valid)
    }

    fn transfer_classifiers(&self, builder: &mut PulseTrackBuilder, set: &VariableSet) -> L1bResult<()> {
        transfer_classifier_targets(builder, &self.config, |native| set.values(native))?;
        self.engine.add_peak_power_db(builder, names::SIGMA0)?;
        self.engine.add_leading_edge_width(builder)
    }
}

impl MissionAdapter for Sentinel3Adapter {
    fn mission(&self) -> MissionId {
        self.config.mission
    }

    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack> {
        let logger = LogManager::scoped(product.file_name());
        let set = self.source.read(&product)?;
        let time_20hz = set.values(TIME_20HZ)?;
        let timestamps = self.config.time_axis()?.convert(&time_20hz)?;

        let mut builder = PulseTrackBuilder::new(self.track_info(&product, &set), timestamps.len());
        builder.set_timestamps(timestamps)?;
        builder.set_position(set.values(LONGITUDE)?, set.values(LATITUDE)?, set.values(ALTITUDE)?)?;
        self.transfer_waveform(&mut builder, &set)?;

        let time_1hz = set.values(TIME_1HZ)?;
        transfer_corrections(&mut builder, &self.config, |_, native| {
            let low_rate = set.values(native)?;
            Ok(time_20hz
                .iter()
                .map(|&t| StatsHelper::interp(t, &time_1hz, &low_rate))
                .collect())
        })?;
        transfer_surface_codes(&mut builder, &set.values(SURFACE_TYPE)?, &self.config)?;
        self.transfer_classifiers(&mut builder, &set)?;

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
    use serde_json::json;

    const N: usize = 40;
    const BINS: usize = 128;

    fn series(f: impl Fn(usize) -> f64) -> Variable {
        Variable::vector((0..N).map(f).collect())
    }

    fn variables() -> VariableSet {
        let mut set = VariableSet::new();
        set.set_attribute("product_name", json!("S3A_SR_1_SRA_A__20170101T000000.SEN3"));
        set.set_attribute("source", json!("IPF-SR-1 06.08"));
        set.set_attribute("absolute_pass_number", json!(1234));
        set.set_attribute("cycle_number", json!(13));
        set.set_attribute("sar_mode_percentage", json!(100.0));
        set.set_attribute("open_ocean_percentage", json!("42.5"));
        set.set_attribute("timeliness", json!("NT"));
        set.insert(TIME_20HZ, series(|i| 5.364e8 + 0.05 * i as f64));
        set.insert(TIME_1HZ, Variable::vector(vec![5.364e8, 5.364e8 + 1.0]));
        set.insert(LONGITUDE, series(|_| 5.0));
        set.insert(LATITUDE, series(|i| 81.0 + 0.001 * i as f64));
        set.insert(ALTITUDE, series(|_| 810_000.0));
        set.insert(TRACKER_RANGE, series(|_| 809_998.0));
        set.insert(INSTRUMENT_CORRECTION, series(|_| 0.5));
        set.insert(SCALE_FACTOR, series(|_| 20.0));
        set.insert(SURFACE_TYPE, series(|i| if i < 20 { 0.0 } else { 2.0 }));
        let counts: Vec<f64> = (0..N)
            .flat_map(|_| (0..BINS).map(|k| if k == 0 { 0.0 } else { 1.0 + 500.0 * (-((k as f64 - 43.0).powi(2)) / 3.0).exp() }))
            .collect();
        set.insert(WAVEFORM, Variable::new(vec![N, BINS], counts).unwrap());
        set.insert("mod_dry_tropo_cor_meas_altitude_01", Variable::vector(vec![-2.0, -3.0]));
        for native in [
            "mod_wet_tropo_cor_meas_altitude_01",
            "inv_bar_cor_01",
            "hf_fluct_cor_01",
            "iono_cor_gim_01_ku",
            "ocean_tide_sol1_01",
            "ocean_tide_non_eq_01",
            "load_tide_sol1_01",
            "solid_earth_tide_01",
            "pole_tide_01",
        ] {
            set.insert(native, Variable::vector(vec![0.1, 0.1]));
        }
        for native in ["stdev_stack_20_ku", "skew_stack_20_ku", "kurt_stack_20_ku", "peakiness_20_ku"] {
            set.insert(native, series(|i| i as f64));
        }
        set
    }

    fn product(set: &VariableSet) -> ProductFile {
        ProductFile::from_bytes("measurement.json", set.to_json().unwrap().into_bytes())
    }

    fn adapter() -> Sentinel3Adapter {
        Sentinel3Adapter::new(MissionConfig::defaults(MissionId::Sentinel3a))
    }

    #[test]
    fn sral_variables_map_onto_track() {
        let track = adapter().construct(product(&variables())).unwrap();
        assert_eq!(track.n_pulses(), N);
        let info = track.info();
        assert_eq!(info.mission, MissionId::Sentinel3a);
        assert_eq!(info.mission_data_source, "S3A_SR_1_SRA_A__20170101T000000.SEN3");
        assert_eq!(info.orbit, Some(1234));
        assert_eq!(info.cycle, Some(13));
        assert_eq!(info.timeliness, Timeliness::Ntc);
        assert_eq!(info.open_ocean_percent, Some(42.5));
        assert_eq!(info.radar_mode, Some(RadarMode::Sar));

        let waveform = track.waveform();
        assert!((waveform.power[[0, 0]] - 1e-12 * 100.0).abs() < 1e-18);
        assert!((waveform.power[[0, 43]] - 501.0 * 100.0).abs() < 1e-6);
        let bin_width = MissionConfig::defaults(MissionId::Sentinel3a).range_bin_width;
        assert!((waveform.range[[0, 43]] - 809_998.5).abs() < 1e-6);
        assert!((waveform.range[[0, 44]] - waveform.range[[0, 43]] - bin_width).abs() < 1e-9);
        assert!(waveform.valid.iter().all(|&v| v));
    }

    #[test]
    fn corrections_are_interpolated_to_20hz() {
        let track = adapter().construct(product(&variables())).unwrap();
        let dry = track.correction().get("dry_troposphere").unwrap();
        assert!((dry[0] + 2.0).abs() < 1e-9);
        assert!((dry[10] + 2.5).abs() < 1e-9);
        assert!((dry[N - 1] + 3.0).abs() < 1e-9);
        let instrument = track.correction().get("instrument_range").unwrap();
        assert!(instrument.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn sigma0_is_peak_power_and_surface_follows_codes() {
        let track = adapter().construct(product(&variables())).unwrap();
        let sigma0 = track.classifier().get(names::SIGMA0).unwrap();
        assert!((sigma0[0] - 10.0 * (501.0f64 * 100.0).log10()).abs() < 1e-9);
        assert_eq!(track.classifier().get("stack_kurtosis").unwrap()[5], 5.0);
        assert_eq!(track.surface_type().category(0), Some(SurfaceCategory::Ocean));
        assert_eq!(track.surface_type().category(25), Some(SurfaceCategory::LandIce));
    }

    #[test]
    fn missing_ku_time_is_a_missing_field() {
        let mut dump: serde_json::Value = serde_json::from_str(&variables().to_json().unwrap()).unwrap();
        dump["variables"].as_object_mut().unwrap().remove(TIME_20HZ);
        let file = ProductFile::from_bytes("measurement.json", dump.to_string().into_bytes());
        let err = adapter().construct(file).unwrap_err();
        assert!(matches!(err, L1bError::MissingField(_)));
    }
}
