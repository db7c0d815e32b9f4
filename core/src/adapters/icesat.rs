//! ICESat GLAS GLAH13 sea-ice altimetry read as variable sets.
//!
//! GLAH13 only carries shots with a valid elevation. Shots are placed on a
//! gap-filled 40 Hz grid, segment by segment, and a three-bin waveform is
//! synthesised whose range reproduces the corrected surface elevation.

use chrono::{DateTime, NaiveDateTime, Utc};
use ndarray::Array2;

use crate::adapters::{transfer_classifier_targets, transfer_corrections, truthy};
use crate::config::MissionConfig;
use crate::math::StatsHelper;
use crate::model::{PulseTrack, PulseTrackBuilder, SurfaceCategory, Timeliness, TrackInfo};
use crate::prelude::{L1bError, L1bResult, MissionAdapter, MissionId, RadarMode};
use crate::source::ProductFile;
use crate::telemetry::LogManager;
use crate::variables::{JsonVariableSource, VariableSet, VariableSource};

const TIME_40HZ: &str = "Time/d_UTCTime_40";
const LONGITUDE: &str = "Geolocation/d_lon";
const LATITUDE: &str = "Geolocation/d_lat";
const ELEVATION: &str = "Elevation_Surfaces/d_elev";
const SATURATION_CORRECTION: &str = "Elevation_Corrections/d_satElevCorr";
const TIME_1HZ: &str = "Data_1HZ/Time/d_UTCTime_1";
const TRACK_1HZ: &str = "Data_1HZ/Geolocation/i_track";
const REFLECTIVITY_CORRECTION_1HZ: &str = "Data_1HZ/Reflectivity/d_reflCor_atm";

/// 1 Hz surface flags in assignment order; a later flag wins, so land
/// elevations never spill into ocean pulses.
const SURFACE_FLAGS_1HZ: [(&str, SurfaceCategory); 4] = [
    ("Data_1HZ/Surface/is_ocean", SurfaceCategory::Ocean),
    ("Data_1HZ/Surface/is_seaice", SurfaceCategory::Ocean),
    ("Data_1HZ/Surface/is_icesheet", SurfaceCategory::LandIce),
    ("Data_1HZ/Surface/is_land", SurfaceCategory::Land),
];

pub const SEA_ICE_ELEVATION: &str = "sea_ice_surface_elevation_corrected";
pub const ORBIT_SEGMENT_ID: &str = "orbit_segment_id";
pub const TRACK_ID: &str = "track_id";
pub const REFLECTIVITY_CORRECTION: &str = "reflectivity_correction";

const WAVEFORM_BINS: usize = 3;
/// Corrected elevations above this are not sea ice [m].
const MAX_SEA_ICE_ELEVATION: f64 = 100.0;

/// Placement of the recorded shots on the gap-filled grid.
#[derive(Debug, Clone, PartialEq)]
struct ShotGrid {
    len: usize,
    /// Grid index of every recorded shot.
    index: Vec<usize>,
    /// Orbit segment of every grid record.
    segment: Vec<f64>,
}

impl ShotGrid {
    /// Splits `time` into segments at gaps longer than `gap` seconds and
    /// counts `rate` records per second inside each segment.
    fn build(time: &[f64], gap: f64, rate: f64) -> L1bResult<Self> {
        let mut grid = Self {
            len: 0,
            index: Vec::with_capacity(time.len()),
            segment: Vec::new(),
        };
        if time.is_empty() {
            return Ok(grid);
        }
        let mut starts = vec![0];
        starts.extend(
            time.windows(2)
                .enumerate()
                .filter(|(_, pair)| pair[1] - pair[0] > gap)
                .map(|(idx, _)| idx + 1),
        );
        let mut ends = starts[1..].to_vec();
        ends.push(time.len());

        for (segment_id, (&start, &end)) in starts.iter().zip(&ends).enumerate() {
            let shots = &time[start..end];
            let t0 = shots[0];
            let mut last = 0usize;
            for &t in shots {
                let counter = (rate * (t - t0)).round();
                if counter.is_nan() || counter < last as f64 {
                    return Err(L1bError::StructuralInconsistency(format!(
                        "shot time {} runs backwards in segment {}",
                        t, segment_id
                    )));
                }
                last = counter as usize;
                grid.index.push(grid.len + last);
            }
            let records = last + 1;
            grid.segment.extend(std::iter::repeat(segment_id as f64).take(records));
            grid.len += records;
        }
        Ok(grid)
    }

    fn check_len(&self, values: usize) -> L1bResult<()> {
        if values != self.index.len() {
            return Err(L1bError::StructuralInconsistency(format!(
                "{} values for {} shots",
                values,
                self.index.len()
            )));
        }
        Ok(())
    }

    fn fill<T: Copy>(&self, values: &[T], default: T) -> L1bResult<Vec<T>> {
        self.check_len(values.len())?;
        let mut full = vec![default; self.len];
        for (&idx, &value) in self.index.iter().zip(values) {
            full[idx] = value;
        }
        Ok(full)
    }

    /// Fills gaps by linear interpolation over the grid index.
    fn interpolate(&self, values: &[f64]) -> L1bResult<Vec<f64>> {
        let axis: Vec<f64> = (0..self.len).map(|i| i as f64).collect();
        self.interpolate_over(values, &axis)
    }

    /// Fills gaps by linear interpolation over a gap-free grid axis.
    fn interpolate_over(&self, values: &[f64], axis: &[f64]) -> L1bResult<Vec<f64>> {
        self.check_len(values.len())?;
        let (xp, fp): (Vec<f64>, Vec<f64>) = self
            .index
            .iter()
            .zip(values)
            .filter(|(_, v)| v.is_finite())
            .map(|(&idx, &v)| (axis[idx], v))
            .unzip();
        Ok(axis.iter().map(|&x| StatsHelper::interp(x, &xp, &fp)).collect())
    }
}

fn parse_coverage_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|t| t.and_utc())
        })
}

pub struct IcesatAdapter {
    config: MissionConfig,
    source: Box<dyn VariableSource>,
}

impl IcesatAdapter {
    pub fn new(config: MissionConfig) -> Self {
        Self {
            config,
            source: Box::new(JsonVariableSource),
        }
    }

    pub fn with_source(mut self, source: Box<dyn VariableSource>) -> Self {
        self.source = source;
        self
    }

    fn track_info(&self, product: &ProductFile, set: &VariableSet) -> TrackInfo {
        let source = set
            .attribute_text("LocalGranuleID")
            .unwrap_or_else(|| product.file_name());
        let mut info = TrackInfo::new(MissionId::Icesat, source);
        info.mission_data_version = set.attribute_text("product_version").unwrap_or_default();
        info.orbit = set.attribute_i64("OrbitNumber");
        info.cycle = set.attribute_i64("Cycle");
        info.timeliness = Timeliness::Rep;
        info.is_merged_orbit = true;
        info.start_time = set
            .attribute_text("time_coverage_start")
            .and_then(|text| parse_coverage_time(&text));
        info.stop_time = set
            .attribute_text("time_coverage_end")
            .and_then(|text| parse_coverage_time(&text));
        info
    }

    fn transfer_time_orbit(
        &self,
        builder: &mut PulseTrackBuilder,
        set: &VariableSet,
        grid: &ShotGrid,
        time_40hz: &[f64],
    ) -> L1bResult<Vec<f64>> {
        let time = grid.interpolate(time_40hz)?;
        let longitude: Vec<f64> = set
            .values(LONGITUDE)?
            .into_iter()
            .map(|lon| if lon > 360.0 { f64::NAN } else { lon })
            .collect();
        let latitude: Vec<f64> = set
            .values(LATITUDE)?
            .into_iter()
            .map(|lat| if lat.abs() > 90.0 { f64::NAN } else { lat })
            .collect();
        builder.set_timestamps(self.config.time_axis()?.convert(&time)?)?;
        builder.set_position(
            grid.interpolate_over(&longitude, &time)?,
            grid.interpolate_over(&latitude, &time)?,
            vec![self.config.nominal_altitude; grid.len],
        )?;
        Ok(time)
    }

    /// Returns the corrected elevation the synthetic range reproduces.
    fn transfer_waveform(&self, builder: &mut PulseTrackBuilder, set: &VariableSet, grid: &ShotGrid) -> L1bResult<Vec<f64>> {
        let elevation = grid.fill(&set.values(ELEVATION)?, f64::NAN)?;
        let saturation = grid.fill(&set.values(SATURATION_CORRECTION)?, f64::NAN)?;
        let corrected: Vec<f64> = elevation.iter().zip(&saturation).map(|(e, c)| e + c).collect();

        let altitude = self.config.nominal_altitude;
        let bin_width = self.config.range_bin_width;
        let power = Array2::from_elem((grid.len, WAVEFORM_BINS), 1.0);
        let range = Array2::from_shape_fn((grid.len, WAVEFORM_BINS), |(i, k)| {
            altitude - corrected[i] + k as f64 * bin_width
        });
        builder.set_waveform(power, range, self.config.radar_mode.unwrap_or(RadarMode::Lrm))?;

        let usable = match &self.config.quality_flag {
            Some(name) => truthy(&set.values(name)?).into_iter().map(|bad| !bad).collect(),
            None => vec![true; grid.index.len()],
        };
        builder.set_valid_flag(grid.fill(&usable, false)?)?;
        Ok(corrected)
    }

    fn transfer_surface_type(
        &self,
        builder: &mut PulseTrackBuilder,
        set: &VariableSet,
        grid: &ShotGrid,
        time_40hz: &[f64],
    ) -> L1bResult<()> {
        let time_1hz = set.values(TIME_1HZ)?;
        for (name, category) in SURFACE_FLAGS_1HZ {
            let flag_1hz: Vec<f64> = truthy(&set.values(name)?)
                .into_iter()
                .map(|flagged| if flagged { 1.0 } else { 0.0 })
                .collect();
            // Only shots between two flagged seconds count as flagged.
            let flag_40hz: Vec<bool> = time_40hz
                .iter()
                .map(|&t| StatsHelper::interp(t, &time_1hz, &flag_1hz) >= 1.0)
                .collect();
            builder.surface_type().add(&grid.fill(&flag_40hz, false)?, category)?;
        }
        Ok(())
    }

    fn transfer_classifiers(
        &self,
        builder: &mut PulseTrackBuilder,
        set: &VariableSet,
        grid: &ShotGrid,
        time_40hz: &[f64],
        time: &[f64],
        corrected: Vec<f64>,
    ) -> L1bResult<()> {
        transfer_classifier_targets(builder, &self.config, |native| grid.fill(&set.values(native)?, f64::NAN))?;

        let is_land = builder.surface().get(SurfaceCategory::Land).flag().to_vec();
        let valid = builder
            .valid_flag()
            .ok_or_else(|| L1bError::MissingField("valid flag".into()))?
            .to_vec();
        let elevation = corrected
            .into_iter()
            .zip(is_land.iter().zip(&valid))
            .map(|(elevation, (&land, &valid))| {
                if land || !valid || elevation > MAX_SEA_ICE_ELEVATION {
                    f64::NAN
                } else {
                    elevation
                }
            })
            .collect();
        builder.classifier().add(elevation, SEA_ICE_ELEVATION)?;
        builder.classifier().add(grid.segment.clone(), ORBIT_SEGMENT_ID)?;

        let time_1hz = set.values(TIME_1HZ)?;
        let track_1hz = set.values(TRACK_1HZ)?;
        let track_40hz: Vec<f64> = time_40hz
            .iter()
            .map(|&t| StatsHelper::interp(t, &time_1hz, &track_1hz).round())
            .collect();
        builder.classifier().add(grid.fill(&track_40hz, f64::NAN)?, TRACK_ID)?;

        if set.contains(REFLECTIVITY_CORRECTION_1HZ) {
            let correction_1hz = set.values(REFLECTIVITY_CORRECTION_1HZ)?;
            let correction = time
                .iter()
                .map(|&t| StatsHelper::interp(t, &time_1hz, &correction_1hz))
                .collect();
            builder.classifier().add(correction, REFLECTIVITY_CORRECTION)?;
        }
        Ok(())
    }
}

impl MissionAdapter for IcesatAdapter {
    fn mission(&self) -> MissionId {
        MissionId::Icesat
    }

    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack> {
        let logger = LogManager::scoped(product.file_name());
        let set = self.source.read(&product)?;
        let time_40hz = set.values(TIME_40HZ)?;
        let grid = ShotGrid::build(
            &time_40hz,
            self.config.segment_gap_seconds,
            self.config.blocks_per_record as f64,
        )?;
        let segments = grid.segment.last().map_or(0, |last| *last as usize + 1);
        logger.debug(&format!(
            "{} shots on a {} record grid in {} segments",
            time_40hz.len(),
            grid.len,
            segments
        ));

        let mut builder = PulseTrackBuilder::new(self.track_info(&product, &set), grid.len);
        let time = self.transfer_time_orbit(&mut builder, &set, &grid, &time_40hz)?;
        let corrected = self.transfer_waveform(&mut builder, &set, &grid)?;
        transfer_corrections(&mut builder, &self.config, |_, native| {
            grid.fill(&set.values(native)?, 0.0)
        })?;
        self.transfer_surface_type(&mut builder, &set, &grid, &time_40hz)?;
        self.transfer_classifiers(&mut builder, &set, &grid, &time_40hz, &time, corrected)?;

        let track = builder.finish()?;
        logger.record(&format!("merged orbit with {} pulses", track.n_pulses()));
        Ok(track)
    }
}
