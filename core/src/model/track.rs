//! The canonical per-pulse track and its single-pass builder.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use ndarray::Array2;

use crate::model::info::{TrackInfo, TrackSummary};
use crate::model::parameters::{Classifiers, Corrections};
use crate::model::surface::{SurfaceCategory, SurfaceType};
use crate::prelude::{L1bError, L1bResult, RadarMode};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeOrbit {
    pub timestamp: Vec<DateTime<Utc>>,
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    pub altitude: Vec<f64>,
    /// NaN where the mission has no attitude telemetry.
    pub pitch: Vec<f64>,
    pub roll: Vec<f64>,
    pub yaw: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// `[N, B]` echo power.
    pub power: Array2<f64>,
    /// `[N, B]` range of each bin, aligned with `power`.
    pub range: Array2<f64>,
    pub radar_mode: RadarMode,
    pub valid: Vec<bool>,
}

impl Waveform {
    pub fn range_bins(&self) -> usize {
        self.power.ncols()
    }
}

/// Immutable, fully populated track.
#[derive(Debug, Clone)]
pub struct PulseTrack {
    info: TrackInfo,
    time_orbit: TimeOrbit,
    waveform: Waveform,
    correction: Corrections,
    surface_type: SurfaceType,
    classifier: Classifiers,
}

impl PulseTrack {
    pub fn n_pulses(&self) -> usize {
        self.time_orbit.timestamp.len()
    }

    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    pub fn time_orbit(&self) -> &TimeOrbit {
        &self.time_orbit
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    pub fn correction(&self) -> &Corrections {
        &self.correction
    }

    pub fn surface_type(&self) -> &SurfaceType {
        &self.surface_type
    }

    pub fn classifier(&self) -> &Classifiers {
        &self.classifier
    }

    pub fn summary(&self) -> TrackSummary {
        let surface_counts: BTreeMap<String, usize> = SurfaceCategory::ALL
            .iter()
            .map(|category| (category.to_string(), self.surface_type.get(*category).num()))
            .collect();
        TrackSummary {
            mission: self.info.mission,
            source: self.info.mission_data_source.clone(),
            mission_data_version: self.info.mission_data_version.clone(),
            radar_mode: self.waveform.radar_mode,
            timeliness: self.info.timeliness,
            n_pulses: self.n_pulses(),
            n_valid: self.waveform.valid.iter().filter(|&&valid| valid).count(),
            range_bins: self.waveform.range_bins(),
            start_time: self.info.start_time,
            stop_time: self.info.stop_time,
            lat_min: self.info.lat_min,
            lat_max: self.info.lat_max,
            lon_min: self.info.lon_min,
            lon_max: self.info.lon_max,
            surface_counts,
            corrections: self.correction.names().map(str::to_string).collect(),
            classifiers: self.classifier.names().map(str::to_string).collect(),
            pulses_trimmed: self.info.pulses_trimmed,
            sequence_counter_all_zero: self.info.sequence_counter_all_zero,
        }
    }
}

/// Collects every group of a track exactly once, then freezes it.
#[derive(Debug)]
pub struct PulseTrackBuilder {
    n_pulses: usize,
    info: TrackInfo,
    timestamp: Option<Vec<DateTime<Utc>>>,
    position: Option<(Vec<f64>, Vec<f64>, Vec<f64>)>,
    attitude: Option<(Vec<f64>, Vec<f64>, Vec<f64>)>,
    waveform: Option<(Array2<f64>, Array2<f64>, RadarMode)>,
    valid: Option<Vec<bool>>,
    correction: Corrections,
    surface_type: SurfaceType,
    classifier: Classifiers,
}

fn check_len(name: &str, len: usize, n_pulses: usize) -> L1bResult<()> {
    if len != n_pulses {
        return Err(L1bError::StructuralInconsistency(format!(
            "{} has {} values for {} pulses",
            name, len, n_pulses
        )));
    }
    Ok(())
}

fn set_once<T>(slot: &mut Option<T>, name: &str, value: T) -> L1bResult<()> {
    if slot.is_some() {
        return Err(L1bError::StructuralInconsistency(format!("{} set twice", name)));
    }
    *slot = Some(value);
    Ok(())
}

fn nan_bounds(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

impl PulseTrackBuilder {
    pub fn new(info: TrackInfo, n_pulses: usize) -> Self {
        Self {
            n_pulses,
            info,
            timestamp: None,
            position: None,
            attitude: None,
            waveform: None,
            valid: None,
            correction: Corrections::new(n_pulses),
            surface_type: SurfaceType::new(n_pulses),
            classifier: Classifiers::new(n_pulses),
        }
    }

    pub fn n_pulses(&self) -> usize {
        self.n_pulses
    }

    pub fn info_mut(&mut self) -> &mut TrackInfo {
        &mut self.info
    }

    /// Timestamps must not decrease.
    pub fn set_timestamps(&mut self, timestamp: Vec<DateTime<Utc>>) -> L1bResult<()> {
        check_len("timestamp", timestamp.len(), self.n_pulses)?;
        if let Some(idx) = timestamp.windows(2).position(|pair| pair[1] < pair[0]) {
            return Err(L1bError::StructuralInconsistency(format!(
                "timestamp decreases at pulse {}",
                idx + 1
            )));
        }
        set_once(&mut self.timestamp, "timestamp", timestamp)
    }

    pub fn set_position(&mut self, lon: Vec<f64>, lat: Vec<f64>, alt: Vec<f64>) -> L1bResult<()> {
        check_len("longitude", lon.len(), self.n_pulses)?;
        check_len("latitude", lat.len(), self.n_pulses)?;
        check_len("altitude", alt.len(), self.n_pulses)?;
        set_once(&mut self.position, "position", (lon, lat, alt))
    }

    pub fn set_attitude(&mut self, pitch: Vec<f64>, roll: Vec<f64>, yaw: Vec<f64>) -> L1bResult<()> {
        check_len("pitch", pitch.len(), self.n_pulses)?;
        check_len("roll", roll.len(), self.n_pulses)?;
        check_len("yaw", yaw.len(), self.n_pulses)?;
        set_once(&mut self.attitude, "attitude", (pitch, roll, yaw))
    }

    pub fn set_waveform(&mut self, power: Array2<f64>, range: Array2<f64>, mode: RadarMode) -> L1bResult<()> {
        check_len("waveform power", power.nrows(), self.n_pulses)?;
        if power.dim() != range.dim() {
            return Err(L1bError::StructuralInconsistency(format!(
                "waveform power {:?} and range {:?} differ in shape",
                power.dim(),
                range.dim()
            )));
        }
        set_once(&mut self.waveform, "waveform", (power, range, mode))
    }

    pub fn set_valid_flag(&mut self, valid: Vec<bool>) -> L1bResult<()> {
        check_len("valid flag", valid.len(), self.n_pulses)?;
        set_once(&mut self.valid, "valid flag", valid)
    }

    pub fn correction(&mut self) -> &mut Corrections {
        &mut self.correction
    }

    pub fn surface_type(&mut self) -> &mut SurfaceType {
        &mut self.surface_type
    }

    pub fn classifier(&mut self) -> &mut Classifiers {
        &mut self.classifier
    }

    /// Power, range and mode, once set; classifiers run on these.
    pub fn waveform(&self) -> Option<(&Array2<f64>, &Array2<f64>, RadarMode)> {
        self.waveform
            .as_ref()
            .map(|(power, range, mode)| (power, range, *mode))
    }

    pub fn altitude(&self) -> Option<&[f64]> {
        self.position.as_ref().map(|(_, _, alt)| alt.as_slice())
    }

    pub fn valid_flag(&self) -> Option<&[bool]> {
        self.valid.as_deref()
    }

    pub fn surface(&self) -> &SurfaceType {
        &self.surface_type
    }

    pub fn finish(self) -> L1bResult<PulseTrack> {
        let missing = |name: &str| L1bError::MissingField(format!("track group {} was never set", name));
        let timestamp = self.timestamp.ok_or_else(|| missing("timestamp"))?;
        let (longitude, latitude, altitude) = self.position.ok_or_else(|| missing("position"))?;
        let (power, range, radar_mode) = self.waveform.ok_or_else(|| missing("waveform"))?;
        let valid = self.valid.ok_or_else(|| missing("valid flag"))?;
        let (pitch, roll, yaw) = self.attitude.unwrap_or_else(|| {
            let unknown = vec![f64::NAN; self.n_pulses];
            (unknown.clone(), unknown.clone(), unknown)
        });

        let mut info = self.info;
        info.n_records = self.n_pulses;
        info.radar_mode.get_or_insert(radar_mode);
        if info.start_time.is_none() {
            info.start_time = timestamp.first().copied();
        }
        if info.stop_time.is_none() {
            info.stop_time = timestamp.last().copied();
        }
        if info.lat_min.is_none() || info.lat_max.is_none() {
            let bounds = nan_bounds(&latitude);
            info.lat_min = bounds.map(|b| b.0);
            info.lat_max = bounds.map(|b| b.1);
        }
        if info.lon_min.is_none() || info.lon_max.is_none() {
            let bounds = nan_bounds(&longitude);
            info.lon_min = bounds.map(|b| b.0);
            info.lon_max = bounds.map(|b| b.1);
        }
        debug!(
            "{}: track of {} pulses with {} classifiers frozen",
            info.mission_data_source,
            self.n_pulses,
            self.classifier.len()
        );

        Ok(PulseTrack {
            info,
            time_orbit: TimeOrbit {
                timestamp,
                longitude,
                latitude,
                altitude,
                pitch,
                roll,
                yaw,
            },
            waveform: Waveform {
                power,
                range,
                radar_mode,
                valid,
            },
            correction: self.correction,
            surface_type: self.surface_type,
            classifier: self.classifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::MissionId;
    use chrono::TimeZone;

    fn times(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.timestamp_opt(1_500_000_000 + i as i64, 0).unwrap())
            .collect()
    }

    fn populated(n: usize) -> PulseTrackBuilder {
        let mut builder = PulseTrackBuilder::new(TrackInfo::new(MissionId::Cryosat2, "x.DBL"), n);
        builder.set_timestamps(times(n)).unwrap();
        builder
            .set_position(vec![10.0, f64::NAN, -5.0], vec![70.0, 71.0, 72.0], vec![7e5; n])
            .unwrap();
        builder
            .set_waveform(Array2::zeros((n, 4)), Array2::zeros((n, 4)), RadarMode::Sar)
            .unwrap();
        builder.set_valid_flag(vec![true, false, true]).unwrap();
        builder
    }

    #[test]
    fn finish_fills_bounds_and_unknown_attitude() {
        let mut builder = populated(3);
        builder
            .surface_type()
            .add(&[true, false, false], SurfaceCategory::Ocean)
            .unwrap();
        builder.classifier().add(vec![1.0, 2.0, 3.0], "sigma0").unwrap();
        let track = builder.finish().unwrap();

        assert_eq!(track.n_pulses(), 3);
        assert_eq!(track.info().lon_min, Some(-5.0));
        assert_eq!(track.info().lat_max, Some(72.0));
        assert_eq!(track.info().start_time, Some(times(3)[0]));
        assert!(track.time_orbit().yaw.iter().all(|v| v.is_nan()));

        let summary = track.summary();
        assert_eq!(summary.n_valid, 2);
        assert_eq!(summary.range_bins, 4);
        assert_eq!(summary.surface_counts["ocean"], 1);
        assert_eq!(summary.surface_counts["unknown"], 2);
        assert_eq!(summary.classifiers, vec!["sigma0".to_string()]);
    }

    #[test]
    fn setters_check_length_and_single_population() {
        let mut builder = populated(3);
        assert!(matches!(
            builder.set_valid_flag(vec![true; 3]),
            Err(L1bError::StructuralInconsistency(_))
        ));
        let mut fresh = PulseTrackBuilder::new(TrackInfo::new(MissionId::Envisat, "e"), 3);
        assert!(fresh.set_position(vec![0.0; 2], vec![0.0; 3], vec![0.0; 3]).is_err());
        assert!(fresh
            .set_waveform(Array2::zeros((3, 4)), Array2::zeros((3, 5)), RadarMode::Lrm)
            .is_err());
        let mut reversed = times(3);
        reversed.reverse();
        assert!(fresh.set_timestamps(reversed).is_err());
    }

    #[test]
    fn incomplete_track_yields_no_model() {
        let mut builder = PulseTrackBuilder::new(TrackInfo::new(MissionId::Envisat, "e"), 2);
        builder.set_timestamps(times(2)).unwrap();
        assert!(matches!(builder.finish(), Err(L1bError::MissingField(_))));
    }
}
