//! Envisat RA-2 SGDR products.

use chrono::{NaiveDateTime, TimeZone, Utc};
use ndarray::Array2;

use crate::adapters::{transfer_corrections, transfer_surface_codes};
use crate::binary::{rows_to_array, BinaryRecordDecoder, GroupUnpacker, MeasurementSegment, NativeRecord};
use crate::classifier::{names, WaveformClassifierEngine};
use crate::clock::{format_pds_datetime, from_mjd2000};
use crate::config::MissionConfig;
use crate::header::text::MAX_HEADER_LINES;
use crate::header::{HeaderSchema, PdsHeader, PdsProductWriter, PdsSchema, DSD_LINES};
use crate::layouts::envisat::{self, BLOCKS_PER_RECORD, LEVEL2_DATASET, WAVEFORM_DATASET};
use crate::layouts::LayoutRegistry;
use crate::model::{PulseTrack, PulseTrackBuilder, Timeliness, TrackInfo};
use crate::prelude::{L1bError, L1bResult, MissionAdapter, MissionId, RadarMode};
use crate::source::ProductFile;
use crate::telemetry::LogManager;

pub const MPH_SCHEMA: HeaderSchema = HeaderSchema {
    sentinel: "NUM_DATA_SETS",
    integer_fields: &[
        "PHASE", "CYCLE", "REL_ORBIT", "ABS_ORBIT", "SAT_BINARY_TIME", "CLOCK_STEP", "LEAP_SIGN",
        "LEAP_ERR", "PRODUCT_ERR", "TOT_SIZE", "SPH_SIZE", "NUM_DSD", "DSD_SIZE", "NUM_DATA_SETS",
    ],
    float_fields: &[
        "DELTA_UT1", "X_POSITION", "Y_POSITION", "Z_POSITION", "X_VELOCITY", "Y_VELOCITY",
        "Z_VELOCITY",
    ],
    max_lines: MAX_HEADER_LINES,
};

pub const SPH_SCHEMA: HeaderSchema = HeaderSchema {
    sentinel: "MWR_SEAFLAG_PERCENT",
    integer_fields: &[
        "RA2_L2_PROC_FLAG", "RA2_L1B_PROC_FLAG", "RA2_L1B_HEADER_FLAG", "RA2_FLAG_MANOEUVER",
        "RA2_IF_MASK_SEL", "RA2_IF_MASK_PROC", "RA2_USO_SEL", "RA2_USO_PROC",
        "AVERAGE_GLOBAL_PRESSURE", "SOLAR_ACTIVITY_INDEX", "MWR_L2_PROC_FLAG", "MWR_L1B_PROC_FLAG",
        "MWR_L1B_HEADER_FLAG", "MWR_L1B_TELEMETRY_FLAG",
    ],
    float_fields: &[
        "RA2_FIRST_LAT", "RA2_FIRST_LONG", "RA2_LAST_LAT", "RA2_LAST_LONG",
        "RA2_L2_PROCESSING_QUALITY", "RA2_L1B_PROCESSING_QUALITY", "RA2_L1B_HEADER_QUALITY",
        "RA2_L2_PROC_THRESH", "RA2_L1B_PROC_THRESH", "RA2_L1B_HEADER_THRESH",
        "RA2_MEASUREMENT_PERCENT", "RA2_320_BAND_PERCENT", "RA2_80_BAND_PERCENT",
        "RA2_20_BAND_PERCENT", "RA2_OCEAN_KU_RETRACK_PERCENT", "RA2_OCEAN_S_RETRACK_PERCENT",
        "RA2_ICE1_KU_RETRACK_PERCENT", "RA2_ICE1_S_RETRACK_PERCENT", "RA2_ICE2_KU_RETRACK_PERCENT",
        "RA2_ICE2_S_RETRACK_PERCENT", "RA2_SEAICE_KU_RETRACK_PERCENT", "RA2_PEAKINESS_LOW_PERCENT",
        "RA2_PEAKINESS_HIGH_PERCENT", "MWR_BT_OPTIMAL_INTERPOLATION_PERCENT",
        "RA2_TIME_SHIFT_MIDFRAME", "RA2_TIME_INTERVAL", "MWR_FIRST_LAT", "MWR_FIRST_LONG",
        "MWR_LAST_LAT", "MWR_LAST_LONG", "MWR_L2_PROC_QUALITY", "MWR_L1B_PROC_QUALITY",
        "MWR_L1B_HEAD_QUALITY", "MWR_L1B_TELEM_QUALITY", "MWR_L2_PROC_THRESH",
        "MWR_L1B_PROC_THRESH", "MWR_L1B_HEAD_THRESH", "MWR_L1B_TELEM_THRESH",
        "RA2_WS_OPTIMAL_INTERPOLATION_PERCENT", "MWR_LANDFLAG_PERCENT", "MWR_SEAFLAG_PERCENT",
    ],
    max_lines: MAX_HEADER_LINES,
};

pub const PDS_SCHEMA: PdsSchema = PdsSchema {
    mph: MPH_SCHEMA,
    sph: SPH_SCHEMA,
    lines_per_descriptor: DSD_LINES,
};

/// Measurement confidence data flags, numbered from the most significant
/// bit: packet length error (0), OBDH invalid (1), AGC fault (4), Rx delay
/// fault (5) and waveform fault (6).
const MCD_FAULT_FLAGS: [u32; 5] = [0, 1, 4, 5, 6];

/// Chirp band id of the 320 MHz bandwidth.
const KU_CHIRP_320MHZ: f64 = 0.0;

fn mcd_mask() -> u32 {
    MCD_FAULT_FLAGS.iter().fold(0, |mask, flag| mask | (1 << (31 - flag)))
}

/// Major version of an MPH `SOFTWARE_VER` string such as `RA2/9.02`.
pub fn software_major(version: &str) -> Option<u32> {
    version
        .trim()
        .rsplit(|c: char| c == '/' || c == '_' || c.is_whitespace())
        .find(|token| !token.is_empty())?
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// Layout baseline for a software version; v9 and later share a format.
fn layout_baseline(version: &str) -> L1bResult<&'static str> {
    match software_major(version) {
        Some(major) if major >= 9 => Ok(envisat::BASELINE),
        _ => Err(L1bError::UnsupportedFormatVersion {
            mission: MissionId::Envisat.to_string(),
            baseline: version.trim().to_string(),
            mode: RadarMode::Lrm.to_string(),
        }),
    }
}

/// Header values of a synthetic SGDR.
#[derive(Debug, Clone)]
pub struct SgdrMetadata {
    pub product_name: String,
    pub software_version: String,
    pub cycle: i64,
    pub abs_orbit: i64,
    pub sensing_start: NaiveDateTime,
}

/// Writes an SGDR with both measurement data sets.
pub fn write_product(metadata: &SgdrMetadata, level2: &[NativeRecord], waveforms: &[NativeRecord]) -> Vec<u8> {
    PdsProductWriter::new()
        .mph_text("PRODUCT", &metadata.product_name)
        .mph_text("SENSING_START", &format_pds_datetime("UTC", metadata.sensing_start))
        .mph_text("SOFTWARE_VER", &metadata.software_version)
        .mph_integer("CYCLE", metadata.cycle)
        .mph_integer("ABS_ORBIT", metadata.abs_orbit)
        .sph_text("SPH_DESCRIPTOR", "RA2_MWR_SGDR")
        .sph_integer("MWR_SEAFLAG_PERCENT", 0, Some("%"))
        .dataset(LEVEL2_DATASET, &envisat::level2_layout(), level2)
        .dataset(WAVEFORM_DATASET, &envisat::waveform_layout(), waveforms)
        .finish()
}

pub struct EnvisatAdapter {
    config: MissionConfig,
    engine: WaveformClassifierEngine,
    unpacker: GroupUnpacker,
}

impl EnvisatAdapter {
    pub fn new(config: MissionConfig) -> Self {
        let engine = WaveformClassifierEngine::from_config(&config);
        Self {
            config,
            engine,
            unpacker: GroupUnpacker::new(BLOCKS_PER_RECORD),
        }
    }

    fn series(&self, segment: &MeasurementSegment<'_>, group: &str, field: &str) -> L1bResult<Vec<f64>> {
        self.unpacker.unpack(segment, segment.field(group, field)?)
    }

    /// 1 Hz base value plus the 20 per-block increments.
    fn with_increments(
        &self,
        segment: &MeasurementSegment<'_>,
        base: (&str, &str),
        increment: (&str, &str),
    ) -> L1bResult<Vec<f64>> {
        let base = segment.record_values(segment.field(base.0, base.1)?);
        let increments = segment.element_values(segment.field(increment.0, increment.1)?);
        self.unpacker.apply_increments(&base, &increments)
    }

    fn transfer_time_orbit(
        &self,
        builder: &mut PulseTrackBuilder,
        level2: &MeasurementSegment<'_>,
        waveforms: &MeasurementSegment<'_>,
    ) -> L1bResult<()> {
        let days = waveforms.record_values(waveforms.field("header", "utc_days")?);
        let seconds = waveforms.record_values(waveforms.field("header", "utc_seconds")?);
        let micros = waveforms.record_values(waveforms.field("header", "utc_microseconds")?);
        let record_times: Vec<_> = days
            .iter()
            .zip(&seconds)
            .zip(&micros)
            .map(|((&d, &s), &us)| from_mjd2000(d, s, us).map(|t| Utc.from_utc_datetime(&t)))
            .collect::<L1bResult<_>>()?;
        builder.set_timestamps(self.unpacker.replicate(&record_times))?;

        let longitude = self.with_increments(
            level2,
            ("time_orbit", "longitude"),
            ("range_information", "longitude_differences_18hz"),
        )?;
        let latitude = self.with_increments(
            level2,
            ("time_orbit", "latitude"),
            ("range_information", "latitude_differences_18hz"),
        )?;
        let altitude = self.with_increments(
            level2,
            ("time_orbit", "altitude"),
            ("time_orbit", "altitude_differences_18hz"),
        )?;
        builder.set_position(longitude, latitude, altitude)
    }

    fn transfer_waveform(
        &self,
        builder: &mut PulseTrackBuilder,
        level2: &MeasurementSegment<'_>,
        waveforms: &MeasurementSegment<'_>,
    ) -> L1bResult<Array2<f64>> {
        let wfm = waveforms.field("wfm", "average_wfm_if_corr_ku")?;
        let power = rows_to_array(waveforms.array_rows(wfm))?;

        let tracker = self.series(level2, "range_information", "tracker_range_no_doppler_ku_18hz")?;
        let doppler = self.series(level2, "range_correction", "doppler_ku_18hz")?;
        let slope = self.series(level2, "range_correction", "doppler_slope_ku_18hz")?;
        let bin_width = self.config.range_bin_width;
        let offset = self.config.reference_bin * bin_width;
        let range = Array2::from_shape_fn(power.dim(), |(i, k)| {
            tracker[i] + doppler[i] + slope[i] - offset + k as f64 * bin_width
        });
        builder.set_waveform(power.clone(), range, RadarMode::Lrm)?;

        let mask = mcd_mask();
        let mcd = self.series(level2, "time_orbit", "measurement_confidence_data")?;
        let chirp = self.series(level2, "flags", "average_ku_chirp_band")?;
        let valid = mcd
            .iter()
            .zip(&chirp)
            .map(|(&flags, &band)| (flags as u32) & mask == 0 && band == KU_CHIRP_320MHZ)
            .collect();
        builder.set_valid_flag(valid)?;
        Ok(power)
    }

    fn transfer_classifiers(
        &self,
        builder: &mut PulseTrackBuilder,
        level2: &MeasurementSegment<'_>,
        power: &Array2<f64>,
    ) -> L1bResult<()> {
        self.engine.add_window_peakiness(builder, power)?;
        let sigma0 = self.series(level2, "backscatter", "sea_ice_sigma_ku_18hz")?;
        builder.classifier().add(sigma0, names::SIGMA0)?;
        self.engine.add_leading_edge_width(builder)
    }
}

impl MissionAdapter for EnvisatAdapter {
    fn mission(&self) -> MissionId {
        MissionId::Envisat
    }

    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack> {
        let logger = LogManager::scoped(product.file_name());
        let header = PdsHeader::read(&product, &PDS_SCHEMA)?;
        let version = header.mph.text("software_ver")?.to_string();
        let baseline = layout_baseline(&version)?;

        let registry = LayoutRegistry::global();
        let level2_layout = registry.lookup(MissionId::Envisat, baseline, RadarMode::Lrm, LEVEL2_DATASET)?;
        let waveform_layout = registry.lookup(MissionId::Envisat, baseline, RadarMode::Lrm, WAVEFORM_DATASET)?;
        let level2 = BinaryRecordDecoder::decode(product.bytes(), header.dsd.get(LEVEL2_DATASET)?, level2_layout)?;
        let waveforms =
            BinaryRecordDecoder::decode(product.bytes(), header.dsd.get(WAVEFORM_DATASET)?, waveform_layout)?;
        if level2.len() != waveforms.len() {
            return Err(L1bError::StructuralInconsistency(format!(
                "{} has {} records but {} has {}",
                LEVEL2_DATASET,
                level2.len(),
                WAVEFORM_DATASET,
                waveforms.len()
            )));
        }

        let mut info = TrackInfo::new(MissionId::Envisat, product.file_name());
        info.mission_data_version = version.trim().to_string();
        info.radar_mode = Some(RadarMode::Lrm);
        info.orbit = header.mph.integer("abs_orbit").ok();
        info.cycle = header.mph.integer("cycle").ok();
        info.timeliness = Timeliness::Rep;

        let mut builder = PulseTrackBuilder::new(info, level2.len() * BLOCKS_PER_RECORD);
        self.transfer_time_orbit(&mut builder, &level2, &waveforms)?;
        let power = self.transfer_waveform(&mut builder, &level2, &waveforms)?;
        transfer_corrections(&mut builder, &self.config, |_, field| {
            self.series(&level2, "geophysical", field)
        })?;
        let surface = self.series(&level2, "flags", "altimeter_surface_type")?;
        transfer_surface_codes(&mut builder, &surface, &self.config)?;
        self.transfer_classifiers(&mut builder, &level2, &power)?;

        let track = builder.finish()?;
        logger.record(&format!(
            "software {} track with {} pulses from {} records",
            version.trim(),
            track.n_pulses(),
            level2.len()
        ));
        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::RecordLayout;
    use crate::layouts::envisat::WAVEFORM_BINS;
    use crate::model::SurfaceCategory;
    use chrono::NaiveDate;

    const TRACKER_RANGE: f64 = 780_000.0;

    fn set(layout: &RecordLayout, record: &mut NativeRecord, group: &str, field: &str, element: usize, value: f64) {
        let field = layout.field(group, field).unwrap();
        record.set_scaled(layout, field, 0, element, value);
    }

    /// Record 1 uses the 80 MHz chirp, record 2 reports a waveform fault.
    fn level2_records(n: usize) -> Vec<NativeRecord> {
        let layout = envisat::level2_layout();
        (0..n)
            .map(|r| {
                let mut record = NativeRecord::zeroed(&layout);
                set(&layout, &mut record, "time_orbit", "latitude", 0, 75.0 + 0.1 * r as f64);
                set(&layout, &mut record, "time_orbit", "longitude", 0, 20.0);
                set(&layout, &mut record, "time_orbit", "altitude", 0, 790_000.0);
                for b in 0..BLOCKS_PER_RECORD {
                    set(&layout, &mut record, "range_information", "latitude_differences_18hz", b, 0.0005 * b as f64);
                    set(&layout, &mut record, "time_orbit", "altitude_differences_18hz", b, -0.5 * b as f64);
                    set(&layout, &mut record, "range_information", "tracker_range_no_doppler_ku_18hz", b, TRACKER_RANGE);
                    set(&layout, &mut record, "range_correction", "doppler_ku_18hz", b, 0.25);
                    set(&layout, &mut record, "backscatter", "sea_ice_sigma_ku_18hz", b, 30.0 + r as f64);
                }
                let mcd = if r == 2 { (1u32 << 25) as f64 } else { 0.0 };
                set(&layout, &mut record, "time_orbit", "measurement_confidence_data", 0, mcd);
                set(&layout, &mut record, "flags", "average_ku_chirp_band", 0, if r == 1 { 1.0 } else { 0.0 });
                set(&layout, &mut record, "flags", "altimeter_surface_type", 0, if r == 0 { 0.0 } else { 2.0 });
                set(&layout, &mut record, "geophysical", "dry_troposphere", 0, -2.25);
                set(&layout, &mut record, "geophysical", "wet_troposphere_model", 0, -0.1);
                record
            })
            .collect()
    }

    fn waveform_records(n: usize) -> Vec<NativeRecord> {
        let layout = envisat::waveform_layout();
        let wfm = layout.field("wfm", "average_wfm_if_corr_ku").unwrap();
        (0..n)
            .map(|r| {
                let mut record = NativeRecord::zeroed(&layout);
                set(&layout, &mut record, "header", "utc_days", 0, 3000.0);
                set(&layout, &mut record, "header", "utc_seconds", 0, 100.0 + r as f64);
                for b in 0..BLOCKS_PER_RECORD {
                    for k in 0..WAVEFORM_BINS {
                        let x = k as f64 - 45.0;
                        let count = 20.0 + 3000.0 * (-x * x / 6.0).exp();
                        record.set_raw(&layout, wfm, b, k, count.round());
                    }
                }
                record
            })
            .collect()
    }

    fn metadata(version: &str) -> SgdrMetadata {
        SgdrMetadata {
            product_name: "RA2_MWS_2PNPDK20080309_101010_000060012066_00323_31508_0000.N1".into(),
            software_version: version.into(),
            cycle: 66,
            abs_orbit: 31_508,
            sensing_start: NaiveDate::from_ymd_opt(2008, 3, 18)
                .and_then(|d| d.and_hms_opt(0, 1, 40))
                .unwrap(),
        }
    }

    fn adapter() -> EnvisatAdapter {
        EnvisatAdapter::new(MissionConfig::defaults(MissionId::Envisat))
    }

    fn product(version: &str, n_level2: usize, n_waveforms: usize) -> ProductFile {
        let bytes = write_product(&metadata(version), &level2_records(n_level2), &waveform_records(n_waveforms));
        ProductFile::from_bytes("RA2_MWS_2P.N1", bytes)
    }

    #[test]
    fn software_versions_select_the_layout() {
        assert_eq!(software_major("RA2/9.02"), Some(9));
        assert_eq!(software_major("SGDR_10.1 "), Some(10));
        assert_eq!(software_major("unknown"), None);
        assert!(layout_baseline("RA2/8.04").is_err());
    }

    #[test]
    fn sgdr_decodes_into_18hz_track() {
        let track = adapter().construct(product("RA2/9.02", 3, 3)).unwrap();
        assert_eq!(track.n_pulses(), 3 * BLOCKS_PER_RECORD);
        assert_eq!(track.info().cycle, Some(66));
        assert_eq!(track.info().orbit, Some(31_508));
        assert_eq!(track.info().timeliness, Timeliness::Rep);
        assert_eq!(track.info().mission_data_version, "RA2/9.02");

        let time_orbit = track.time_orbit();
        assert_eq!(time_orbit.timestamp[0], time_orbit.timestamp[BLOCKS_PER_RECORD - 1]);
        assert_eq!(
            time_orbit.timestamp[BLOCKS_PER_RECORD] - time_orbit.timestamp[0],
            chrono::Duration::seconds(1)
        );
        assert!((time_orbit.latitude[5] - 75.0025).abs() < 1e-6);
        assert!((time_orbit.latitude[BLOCKS_PER_RECORD] - 75.1).abs() < 1e-6);
        assert!((time_orbit.altitude[4] - 789_998.0).abs() < 1e-6);
        assert!(time_orbit.pitch.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn range_and_valid_flags_follow_tracker_and_mcd() {
        let track = adapter().construct(product("RA2/9.02", 3, 3)).unwrap();
        let waveform = track.waveform();
        assert_eq!(waveform.range_bins(), WAVEFORM_BINS);
        let expected = TRACKER_RANGE + 0.25 - 45.0 * 0.4686;
        assert!((waveform.range[[0, 0]] - expected).abs() < 1e-6);
        assert!((waveform.range[[0, 45]] - (TRACKER_RANGE + 0.25)).abs() < 1e-6);

        assert!(waveform.valid[..BLOCKS_PER_RECORD].iter().all(|&v| v));
        assert!(waveform.valid[BLOCKS_PER_RECORD..].iter().all(|&v| !v));
    }

    #[test]
    fn corrections_surface_and_classifiers() {
        let track = adapter().construct(product("RA2/9.02", 3, 3)).unwrap();
        assert!((track.correction().get("dry_troposphere").unwrap()[7] + 2.25).abs() < 1e-9);
        assert!((track.correction().get("wet_troposphere").unwrap()[0] + 0.1).abs() < 1e-9);
        assert_eq!(track.surface_type().category(0), Some(SurfaceCategory::Ocean));
        assert_eq!(track.surface_type().category(BLOCKS_PER_RECORD), Some(SurfaceCategory::LandIce));

        let classifier = track.classifier();
        assert!((classifier.get(names::SIGMA0).unwrap()[BLOCKS_PER_RECORD] - 31.0).abs() < 1e-9);
        assert!(classifier.get(names::PEAKINESS).unwrap()[0] > 1.0);
        assert!(classifier.contains(names::PEAKINESS_OLD));
        assert!(classifier.get(names::LEADING_EDGE_WIDTH).unwrap()[0] > 0.0);
        assert!(classifier.get(names::LEADING_EDGE_WIDTH).unwrap()[BLOCKS_PER_RECORD].is_nan());
    }

    #[test]
    fn mismatched_record_counts_are_rejected() {
        let err = adapter().construct(product("RA2/9.02", 3, 2)).unwrap_err();
        assert!(matches!(err, L1bError::StructuralInconsistency(_)));
    }

    #[test]
    fn old_software_is_unsupported() {
        let err = adapter().construct(product("RA2/8.04", 1, 1)).unwrap_err();
        assert!(matches!(err, L1bError::UnsupportedFormatVersion { .. }));
    }
}
