//! Track-level metadata and the serialisable track summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prelude::{MissionId, RadarMode};

/// Data timeliness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Timeliness {
    Nrt,
    Stc,
    Ntc,
    Rep,
}

impl Timeliness {
    /// Maps an ESA processing stage code: N near real time, O offline,
    /// R and L reprocessing; anything else counts as offline.
    pub fn from_proc_stage(code: &str) -> Self {
        match code.trim().chars().next() {
            Some('N') => Self::Nrt,
            Some('R') | Some('L') => Self::Rep,
            _ => Self::Ntc,
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "NRT" | "NR" => Some(Self::Nrt),
            "STC" | "ST" => Some(Self::Stc),
            "NTC" | "NT" => Some(Self::Ntc),
            "REP" => Some(Self::Rep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub mission: MissionId,
    /// Baseline or processor version of the source product.
    pub mission_data_version: String,
    /// File name of the source product.
    pub mission_data_source: String,
    pub radar_mode: Option<RadarMode>,
    pub orbit: Option<i64>,
    pub cycle: Option<i64>,
    pub timeliness: Timeliness,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub open_ocean_percent: Option<f64>,
    pub sar_mode_percent: Option<f64>,
    pub n_records: usize,
    pub pulses_trimmed: usize,
    /// The sequence counter was zero for every record, so trailing pad
    /// records could not be told apart from data.
    pub sequence_counter_all_zero: bool,
    pub is_merged_orbit: bool,
}

impl TrackInfo {
    pub fn new(mission: MissionId, source: impl Into<String>) -> Self {
        Self {
            mission,
            mission_data_version: String::new(),
            mission_data_source: source.into(),
            radar_mode: None,
            orbit: None,
            cycle: None,
            timeliness: Timeliness::Ntc,
            start_time: None,
            stop_time: None,
            lat_min: None,
            lat_max: None,
            lon_min: None,
            lon_max: None,
            open_ocean_percent: None,
            sar_mode_percent: None,
            n_records: 0,
            pulses_trimmed: 0,
            sequence_counter_all_zero: false,
            is_merged_orbit: false,
        }
    }
}

/// Compact per-track report handed to the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub mission: MissionId,
    pub source: String,
    pub mission_data_version: String,
    pub radar_mode: RadarMode,
    pub timeliness: Timeliness,
    pub n_pulses: usize,
    pub n_valid: usize,
    pub range_bins: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
    pub lat_min: Option<f64>,
    pub lat_max: Option<f64>,
    pub lon_min: Option<f64>,
    pub lon_max: Option<f64>,
    pub surface_counts: BTreeMap<String, usize>,
    pub corrections: Vec<String>,
    pub classifiers: Vec<String>,
    pub pulses_trimmed: usize,
    pub sequence_counter_all_zero: bool,
}
