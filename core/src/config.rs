//! Mission configuration block: name maps, code dictionaries and the
//! numeric constants an adapter needs beyond the product itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classifier::{LeadingEdgeOptions, Sigma0Params};
use crate::clock::TimeUnits;
use crate::model::{is_correction_name, SurfaceCategory};
use crate::prelude::{L1bError, L1bResult, MissionId, RadarMode};

/// Speed of light [m/s].
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Source of the CryoSat-2 ionospheric correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IonosphericSource {
    Gim,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    pub mission: MissionId,
    /// Canonical correction name to native field name. `None` means the
    /// mission carries no such field and the correction is zero-filled.
    #[serde(default)]
    pub correction_targets: BTreeMap<String, Option<String>>,
    /// Classifier name to native field name, passed through unchanged.
    #[serde(default)]
    pub classifier_targets: BTreeMap<String, String>,
    /// Native surface code to canonical category. Codes not listed are
    /// `unknown`.
    #[serde(default)]
    pub surface_codes: BTreeMap<i64, SurfaceCategory>,
    pub time_units: String,
    pub time_calendar: String,
    /// Range-bin width [m].
    pub range_bin_width: f64,
    /// Bin the tracker range refers to.
    pub reference_bin: f64,
    /// Receiver bandwidth [Hz].
    pub bandwidth: f64,
    /// High-rate blocks per low-rate record.
    pub blocks_per_record: usize,
    #[serde(default)]
    pub radar_mode: Option<RadarMode>,
    pub peakiness_pad: usize,
    #[serde(default)]
    pub leading_edge: LeadingEdgeOptions,
    #[serde(default)]
    pub sigma0: Sigma0Params,
    /// Variable whose truthy values mark a pulse as invalid.
    #[serde(default)]
    pub quality_flag: Option<String>,
    pub ionospheric_source: IonosphericSource,
    /// Time gap [s] that starts a new orbit segment.
    pub segment_gap_seconds: f64,
    /// Constant platform altitude [m] for missions that do not carry one.
    pub nominal_altitude: f64,
}

fn targets(pairs: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
    pairs
        .iter()
        .map(|(name, native)| (name.to_string(), native.map(str::to_string)))
        .collect()
}

fn classifiers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(name, native)| (name.to_string(), native.to_string()))
        .collect()
}

/// ESA surface codes: open ocean, enclosed sea or lake, continental ice,
/// land.
fn esa_surface_codes() -> BTreeMap<i64, SurfaceCategory> {
    BTreeMap::from([
        (0, SurfaceCategory::Ocean),
        (1, SurfaceCategory::Ocean),
        (2, SurfaceCategory::LandIce),
        (3, SurfaceCategory::Land),
    ])
}

impl MissionConfig {
    fn base(mission: MissionId) -> Self {
        Self {
            mission,
            correction_targets: BTreeMap::new(),
            classifier_targets: BTreeMap::new(),
            surface_codes: esa_surface_codes(),
            time_units: "seconds since 2000-01-01 00:00:00".into(),
            time_calendar: "gregorian".into(),
            range_bin_width: SPEED_OF_LIGHT / (4.0 * 320e6),
            reference_bin: 0.0,
            bandwidth: 320e6,
            blocks_per_record: 20,
            radar_mode: None,
            peakiness_pad: 2,
            leading_edge: LeadingEdgeOptions::default(),
            sigma0: Sigma0Params::default(),
            quality_flag: None,
            ionospheric_source: IonosphericSource::Gim,
            segment_gap_seconds: 300.0,
            nominal_altitude: 590_000.0,
        }
    }

    /// Working defaults for every supported mission.
    pub fn defaults(mission: MissionId) -> Self {
        let mut config = Self::base(mission);
        match mission {
            MissionId::Cryosat2 => {
                config.correction_targets = targets(&[
                    ("dry_troposphere", Some("dry_troposphere")),
                    ("wet_troposphere", Some("wet_troposphere")),
                    ("inverse_barometric", Some("inverse_barometric")),
                    ("dynamic_atmosphere", Some("dynamic_atmosphere")),
                    ("ionospheric", Some("ionospheric_gim")),
                    ("ocean_tide_elastic", Some("ocean_tide_elastic")),
                    ("ocean_tide_long_period", Some("ocean_tide_long_period")),
                    ("ocean_loading_tide", Some("ocean_loading_tide")),
                    ("solid_earth_tide", Some("solid_earth_tide")),
                    ("geocentric_polar_tide", Some("geocentric_polar_tide")),
                ]);
            }
            MissionId::Envisat => {
                config.correction_targets = targets(&[
                    ("dry_troposphere", Some("dry_troposphere")),
                    ("wet_troposphere", Some("wet_troposphere_model")),
                    ("inverse_barometric", Some("inverse_barometric")),
                    ("ionospheric", Some("ionospheric_gim")),
                    ("ocean_tide_elastic", Some("ocean_tide_solution1")),
                    ("ocean_tide_long_period", Some("long_period_tide")),
                    ("ocean_loading_tide", Some("loading_tide_solution1")),
                    ("solid_earth_tide", Some("solid_earth_tide")),
                    ("geocentric_polar_tide", Some("geocentric_pole_tide")),
                ]);
                config.range_bin_width = 0.4686;
                config.reference_bin = 45.0;
                config.radar_mode = Some(RadarMode::Lrm);
            }
            MissionId::Ers1 | MissionId::Ers2 => {
                config.correction_targets = targets(&[
                    ("dry_troposphere", Some("model_dry_tropo_corr")),
                    ("wet_troposphere", Some("model_wet_tropo_corr")),
                    ("inverse_barometric", Some("inv_bar_corr")),
                    ("dynamic_atmosphere", Some("hf_fluctuations_corr")),
                    ("ionospheric", Some("iono_corr_model")),
                    ("ocean_tide_elastic", Some("ocean_tide_sol1")),
                    ("ocean_tide_long_period", Some("ocean_tide_equil")),
                    ("ocean_loading_tide", Some("load_tide_sol1")),
                    ("solid_earth_tide", Some("solid_earth_tide")),
                    ("geocentric_polar_tide", Some("pole_tide")),
                ]);
                config.classifier_targets = classifiers(&[
                    ("peakiness_old", "peakiness_20hz"),
                    ("ocog_width", "width_20hz"),
                    ("ocog_amplitude", "amplitude_20hz"),
                    ("sigma0", "ice1_sig0_20hz"),
                    ("sigma0_ice2", "ice2_sig0_20hz"),
                    ("leading_edge_width_ice2", "ice2_le_sig0_20hz"),
                    ("elevation_ice1", "ice1_elevation_20hz"),
                    ("elevation_ice2", "ice2_elevation_20hz"),
                ]);
                config.time_units = "seconds since 1990-01-01 00:00:00".into();
                config.range_bin_width = 0.4545;
                config.reference_bin = 32.5;
                config.radar_mode = Some(RadarMode::Lrm);
            }
            MissionId::Sentinel3a | MissionId::Sentinel3b => {
                config.correction_targets = targets(&[
                    ("dry_troposphere", Some("mod_dry_tropo_cor_meas_altitude_01")),
                    ("wet_troposphere", Some("mod_wet_tropo_cor_meas_altitude_01")),
                    ("inverse_barometric", Some("inv_bar_cor_01")),
                    ("dynamic_atmosphere", Some("hf_fluct_cor_01")),
                    ("ionospheric", Some("iono_cor_gim_01_ku")),
                    ("ocean_tide_elastic", Some("ocean_tide_sol1_01")),
                    ("ocean_tide_long_period", Some("ocean_tide_non_eq_01")),
                    ("ocean_loading_tide", Some("load_tide_sol1_01")),
                    ("solid_earth_tide", Some("solid_earth_tide_01")),
                    ("geocentric_polar_tide", Some("pole_tide_01")),
                    ("instrument_range", None),
                ]);
                config.classifier_targets = classifiers(&[
                    ("stack_standard_deviation", "stdev_stack_20_ku"),
                    ("stack_skewness", "skew_stack_20_ku"),
                    ("stack_kurtosis", "kurt_stack_20_ku"),
                    ("stack_peakiness", "peakiness_20_ku"),
                ]);
                config.reference_bin = 43.0;
                config.radar_mode = Some(RadarMode::Sar);
            }
            MissionId::Icesat => {
                config.correction_targets = targets(&[
                    ("equilibrium_tide", Some("Geophysical/d_eqEl")),
                    ("solid_earth_tide", Some("Geophysical/d_erElv")),
                    ("ocean_loading_tide", Some("Geophysical/d_ldElv")),
                    ("ocean_tide_elastic", Some("Geophysical/d_ocElv")),
                    ("geocentric_polar_tide", Some("Geophysical/d_poTide")),
                    ("dry_troposphere", Some("Elevation_Corrections/d_dTrop")),
                    ("wet_troposphere", Some("Elevation_Corrections/d_wTrop")),
                    ("elevation_saturation", Some("Elevation_Corrections/d_satElevCorr")),
                    ("elevation_bias", Some("Elevation_Corrections/d_ElevBiasCorr")),
                ]);
                config.classifier_targets = classifiers(&[
                    ("echo_kurtosis", "Waveform/d_kurt2"),
                    ("echo_peak_power", "Waveform/d_maxRecAmp"),
                    ("smoothed_echo_peak_power", "Waveform/d_maxSmAmp"),
                    ("echo_skewness", "Waveform/d_skew2"),
                    ("echo_gain", "Waveform/i_gval_rcv"),
                    ("echo_n_peaks", "Waveform/i_numPk"),
                    ("received_energy", "Reflectivity/d_RecNrgAll"),
                    ("reflectivity", "Reflectivity/d_reflctUC"),
                    ("energy_saturation_correction", "Elevation_Corrections/d_satNrgCorr"),
                    ("background_noise_sdev", "Waveform/d_sDevNsOb1"),
                    ("gaussian_variance", "Elevation_Surfaces/d_SeaIceVar"),
                ]);
                config.surface_codes = BTreeMap::new();
                config.time_units = "seconds since 2000-01-01 12:00:00".into();
                config.range_bin_width = 10.0;
                config.blocks_per_record = 40;
                config.radar_mode = Some(RadarMode::Lrm);
                config.quality_flag = Some("Quality/elev_use_flg".into());
            }
        }
        config
    }

    /// Replaces the fields present in `overrides` (a JSON object, possibly
    /// nested) and validates the result.
    pub fn with_overrides(self, overrides: &serde_json::Value) -> L1bResult<Self> {
        let mut merged = serde_json::to_value(&self)
            .map_err(|err| L1bError::InvalidConfig(format!("mission config: {}", err)))?;
        merge(&mut merged, overrides);
        let config: Self = serde_json::from_value(merged)
            .map_err(|err| L1bError::InvalidConfig(format!("mission config: {}", err)))?;
        if config.mission != self.mission {
            return Err(L1bError::InvalidConfig(format!(
                "override changes mission {} to {}",
                self.mission, config.mission
            )));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn time_axis(&self) -> L1bResult<TimeUnits> {
        TimeUnits::parse(&self.time_units, &self.time_calendar)
    }

    pub fn surface_category(&self, code: i64) -> SurfaceCategory {
        self.surface_codes
            .get(&code)
            .copied()
            .unwrap_or(SurfaceCategory::Unknown)
    }

    pub fn validate(&self) -> L1bResult<()> {
        if let Some(name) = self.correction_targets.keys().find(|name| !is_correction_name(name)) {
            return Err(L1bError::InvalidConfig(format!(
                "{}: {:?} is not a correction name",
                self.mission, name
            )));
        }
        if self.blocks_per_record == 0 {
            return Err(L1bError::InvalidConfig(format!("{}: blocks_per_record is zero", self.mission)));
        }
        if self.peakiness_pad == 0 {
            return Err(L1bError::InvalidConfig(format!("{}: peakiness_pad is zero", self.mission)));
        }
        if !(self.range_bin_width > 0.0) || !(self.bandwidth > 0.0) {
            return Err(L1bError::InvalidConfig(format!(
                "{}: range bin width and bandwidth must be positive",
                self.mission
            )));
        }
        let threshold = self.leading_edge.first_maximum_threshold;
        if self.leading_edge.oversampling == 0 || !(threshold > 0.0 && threshold <= 1.0) {
            return Err(L1bError::InvalidConfig(format!("{}: leading edge options", self.mission)));
        }
        self.time_axis()?;
        Ok(())
    }
}

fn merge(base: &mut serde_json::Value, overrides: &serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(slot) if slot.is_object() && value.is_object() => merge(slot, value),
                    _ => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (_, serde_json::Value::Null) => {}
        (base, overrides) => *base = overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_mission_default_validates() {
        for mission in MissionId::ALL {
            MissionConfig::defaults(mission).validate().unwrap();
        }
    }

    #[test]
    fn unknown_surface_codes_map_to_unknown() {
        let config = MissionConfig::defaults(MissionId::Envisat);
        assert_eq!(config.surface_category(2), SurfaceCategory::LandIce);
        assert_eq!(config.surface_category(17), SurfaceCategory::Unknown);
    }

    #[test]
    fn overrides_merge_nested_fields() {
        let config = MissionConfig::defaults(MissionId::Cryosat2)
            .with_overrides(&json!({
                "peakiness_pad": 3,
                "leading_edge": {"first_maximum_threshold": 0.3},
                "ionospheric_source": "model"
            }))
            .unwrap();
        assert_eq!(config.peakiness_pad, 3);
        assert_eq!(config.leading_edge.first_maximum_threshold, 0.3);
        assert_eq!(config.leading_edge.oversampling, 10);
        assert_eq!(config.ionospheric_source, IonosphericSource::Model);

        let untouched = MissionConfig::defaults(MissionId::Icesat)
            .with_overrides(&serde_json::Value::Null)
            .unwrap();
        assert_eq!(untouched.blocks_per_record, 40);
    }

    #[test]
    fn overrides_are_validated() {
        let bad_name = MissionConfig::defaults(MissionId::Ers1)
            .with_overrides(&json!({"correction_targets": {"sea_state_bias": "ssb"}}));
        assert!(matches!(bad_name, Err(L1bError::InvalidConfig(_))));
        let bad_units = MissionConfig::defaults(MissionId::Ers1)
            .with_overrides(&json!({"time_units": "fortnights since 1990-01-01"}));
        assert!(matches!(bad_units, Err(L1bError::InvalidConfig(_))));
        let bad_mission = MissionConfig::defaults(MissionId::Ers1).with_overrides(&json!({"mission": "ers2"}));
        assert!(bad_mission.is_err());
    }
}
