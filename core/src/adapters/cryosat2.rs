//! CryoSat-2 SIRAL L1b products (ESA PDS, baselines B and C).

use chrono::NaiveDateTime;
use ndarray::Array2;

use crate::adapters::{transfer_corrections, transfer_surface_codes};
use crate::binary::{
    rows_to_array, BinaryRecordDecoder, GroupUnpacker, MeasurementSegment, NativeRecord, RecordLayout,
    TrackTrimmer, TrimPlan,
};
use crate::classifier::WaveformClassifierEngine;
use crate::clock::{format_pds_datetime, from_mjd2000, parse_pds_datetime, TaiUtcConverter};
use crate::config::{IonosphericSource, MissionConfig, SPEED_OF_LIGHT};
use crate::header::text::MAX_HEADER_LINES;
use crate::header::{HeaderSchema, PdsHeader, PdsProductWriter, PdsSchema, ProductHeader, DSD_LINES};
use crate::layouts::cryosat2::{dataset_name, BLOCKS_PER_RECORD};
use crate::layouts::LayoutRegistry;
use crate::model::{PulseTrack, PulseTrackBuilder, Timeliness, TrackInfo};
use crate::prelude::{L1bError, L1bResult, MissionAdapter, MissionId, RadarMode};
use crate::source::ProductFile;
use crate::telemetry::LogManager;

pub const MPH_SCHEMA: HeaderSchema = HeaderSchema {
    sentinel: "CRC",
    integer_fields: &[
        "PHASE", "CYCLE", "REL_ORBIT", "ABS_ORBIT", "SAT_BINARY_TIME", "CLOCK_STEP", "LEAP_SIGN",
        "LEAP_ERR", "PRODUCT_ERR", "TOT_SIZE", "SPH_SIZE", "NUM_DSD", "DSD_SIZE", "NUM_DATA_SETS",
        "CRC", "ABS_ORBIT_START", "ABS_ORBIT_STOP", "L0_PROC_FLAG",
    ],
    float_fields: &[
        "REL_TIME_ASC_NODE_START", "DELTA_UT1", "X_POSITION", "Y_POSITION", "Z_POSITION",
        "X_VELOCITY", "Y_VELOCITY", "Z_VELOCITY", "L0_PROCESSING_QUALITY", "L0_PROC_THRESH",
        "L0_GAPS_FLAG", "L0_GAPS_NUM", "OPEN_OCEAN_PERCENT", "CLOSE_SEA_PERCENT",
        "CONTINENT_ICE_PERCENT", "LAND_PERCENT", "L1B_PROD_STATUS", "L1B_PROC_FLAG",
        "L1B_PROCESSING_QUALITY", "L1B_PROC_THRESH", "REL_TIME_ASC_NODE_STOP",
        "EQUATOR_CROSS_LONG", "START_LAT", "START_LONG", "STOP_LAT", "STOP_LONG",
    ],
    max_lines: MAX_HEADER_LINES,
};

pub const SPH_SCHEMA: HeaderSchema = HeaderSchema {
    sentinel: "L1B_PROC_THRESH",
    integer_fields: &[
        "ABS_ORBIT_START", "ABS_ORBIT_STOP", "L0_PROC_FLAG", "L0_GAPS_FLAG", "L0_GAPS_NUM",
        "L1B_PROD_STATUS", "L1B_PROC_FLAG",
    ],
    float_fields: &[
        "REL_TIME_ASC_NODE_START", "REL_TIME_ASC_NODE_STOP", "EQUATOR_CROSS_LONG", "START_LAT",
        "START_LONG", "STOP_LAT", "STOP_LONG", "L0_PROCESSING_QUALITY", "L0_PROC_THRESH",
        "OPEN_OCEAN_PERCENT", "CLOSE_SEA_PERCENT", "CONTINENT_ICE_PERCENT", "LAND_PERCENT",
        "L1B_PROCESSING_QUALITY", "L1B_PROC_THRESH",
    ],
    max_lines: MAX_HEADER_LINES,
};

pub const PDS_SCHEMA: PdsSchema = PdsSchema {
    mph: MPH_SCHEMA,
    sph: SPH_SCHEMA,
    lines_per_descriptor: DSD_LINES,
};

/// Measurement confidence bits (31 = MSB) that invalidate a pulse: block
/// degraded, blank block, datation degraded, orbit propagation error,
/// echo saturation, other echo error.
const HARD_FAULT_BITS: [u32; 6] = [31, 30, 29, 28, 25, 24];

const STACK_PARAMETERS: [&str; 5] = [
    "stack_standard_deviation",
    "stack_centre",
    "stack_scaled_amplitude",
    "stack_skewness",
    "stack_kurtosis",
];

/// Baseline letter and radar mode from a product name such as
/// `CS_OFFL_SIR_SAR_1B_20150101T000000_20150101T001000_C001.DBL`.
pub fn product_format(name: &str) -> Option<(String, RadarMode)> {
    let parts: Vec<&str> = name.trim().split('_').collect();
    if parts.len() < 8 || parts[0] != "CS" || parts[2] != "SIR" {
        return None;
    }
    let mode = RadarMode::parse(parts[3])?;
    let baseline = parts[7].chars().next()?.to_ascii_uppercase().to_string();
    Some((baseline, mode))
}

pub fn product_name(mode: RadarMode, baseline: &str, start: NaiveDateTime, stop: NaiveDateTime) -> String {
    let stamp = |t: NaiveDateTime| t.format("%Y%m%dT%H%M%S").to_string();
    format!(
        "CS_OFFL_SIR_{}_1B_{}_{}_{}001.DBL",
        mode.as_str().to_ascii_uppercase(),
        stamp(start),
        stamp(stop),
        baseline
    )
}

/// Product-level fields written alongside the measurement data set.
#[derive(Debug, Clone)]
pub struct ProductMetadata {
    pub product_name: String,
    pub proc_stage: String,
    pub cycle: i64,
    pub abs_orbit: i64,
    pub start_tai: NaiveDateTime,
    pub stop_tai: NaiveDateTime,
    /// Percent of the track over open ocean.
    pub open_ocean_percent: f64,
}

/// Writes a complete product for `layout` from its records.
pub fn write_product(layout: &RecordLayout, metadata: &ProductMetadata, records: &[NativeRecord]) -> Vec<u8> {
    PdsProductWriter::new()
        .mph_text("PRODUCT", &metadata.product_name)
        .mph_text("PROC_STAGE", &metadata.proc_stage)
        .mph_integer("CYCLE", metadata.cycle)
        .mph_integer("ABS_ORBIT", metadata.abs_orbit)
        .sph_text("START_RECORD_TAI_TIME", &format_pds_datetime("TAI", metadata.start_tai))
        .sph_text("STOP_RECORD_TAI_TIME", &format_pds_datetime("TAI", metadata.stop_tai))
        .sph_integer("ABS_ORBIT_START", metadata.abs_orbit, None)
        .sph_integer(
            "OPEN_OCEAN_PERCENT",
            (metadata.open_ocean_percent * 100.0).round() as i64,
            Some("10-2%"),
        )
        .sph_integer("L1B_PROC_THRESH", 0, Some("%"))
        .dataset(&layout.key.dataset, layout, records)
        .finish()
}

/// High-rate series of one decoded data set, with pad records removed.
struct Unpacked<'a> {
    segment: MeasurementSegment<'a>,
    unpacker: GroupUnpacker,
    plan: TrimPlan,
}

impl<'a> Unpacked<'a> {
    fn new(segment: MeasurementSegment<'a>) -> L1bResult<Self> {
        let unpacker = GroupUnpacker::new(BLOCKS_PER_RECORD);
        let counter = segment.field("time_orbit", "source_sequence_counter")?;
        let plan = TrackTrimmer::plan(&unpacker.unpack(&segment, counter)?);
        Ok(Self {
            segment,
            unpacker,
            plan,
        })
    }

    fn n_pulses(&self) -> usize {
        self.plan.keep
    }

    fn series(&self, group: &str, field: &str) -> L1bResult<Vec<f64>> {
        let field = self.segment.field(group, field)?;
        Ok(self.plan.apply(self.unpacker.unpack(&self.segment, field)?))
    }

    fn rows(&self, group: &str, field: &str) -> L1bResult<Vec<Vec<f64>>> {
        let field = self.segment.field(group, field)?;
        Ok(self.plan.apply(self.segment.array_rows(field)))
    }
}

/// `counts * linear_scale * 1e-9 * 2^power_scale` [W].
fn echo_power(counts: &Array2<f64>, linear_scale: &[f64], power_scale: &[f64]) -> Array2<f64> {
    let mut power = counts.clone();
    for (mut row, (ls, ps)) in power.rows_mut().into_iter().zip(linear_scale.iter().zip(power_scale)) {
        let factor = ls * 1e-9 * 2f64.powf(*ps);
        row.mapv_inplace(|count| count * factor);
    }
    power
}

/// Range of each bin from the two-way window delay to the window centre.
fn echo_range(window_delay: &[f64], bins: usize, bandwidth: f64) -> Array2<f64> {
    let bin_width = SPEED_OF_LIGHT / (4.0 * bandwidth);
    let first_bin_offset = bins as f64 * bin_width / 2.0;
    Array2::from_shape_fn((window_delay.len(), bins), |(i, k)| {
        window_delay[i] * SPEED_OF_LIGHT / 2.0 - first_bin_offset + k as f64 * bin_width
    })
}

fn is_valid(confidence: f64) -> bool {
    let word = confidence as u32;
    HARD_FAULT_BITS.iter().all(|bit| word & (1 << bit) == 0)
}

pub struct Cryosat2Adapter {
    config: MissionConfig,
    converter: TaiUtcConverter,
    engine: WaveformClassifierEngine,
}

impl Cryosat2Adapter {
    pub fn new(config: MissionConfig, converter: TaiUtcConverter) -> Self {
        let engine = WaveformClassifierEngine::from_config(&config);
        Self {
            config,
            converter,
            engine,
        }
    }

    fn ionospheric_field(&self) -> &'static str {
        match self.config.ionospheric_source {
            IonosphericSource::Gim => "ionospheric_gim",
            IonosphericSource::Model => "ionospheric_mod",
        }
    }

    fn header_time(&self, header: &ProductHeader, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        let tai = parse_pds_datetime(header.text(key).ok()?).ok()?;
        self.converter.tai_to_utc(&[tai]).ok()?.first().copied()
    }

    fn track_info(&self, product: &ProductFile, header: &PdsHeader, baseline: &str, mode: RadarMode) -> TrackInfo {
        let mut info = TrackInfo::new(MissionId::Cryosat2, product.file_name());
        info.mission_data_version = baseline.to_string();
        info.radar_mode = Some(mode);
        info.orbit = header
            .sph
            .integer("abs_orbit_start")
            .or_else(|_| header.mph.integer("abs_orbit"))
            .ok();
        info.cycle = header.mph.integer("cycle").ok();
        info.timeliness = header
            .mph
            .text("proc_stage")
            .map(Timeliness::from_proc_stage)
            .unwrap_or(Timeliness::Ntc);
        info.start_time = self.header_time(&header.sph, "start_record_tai_time");
        info.stop_time = self.header_time(&header.sph, "stop_record_tai_time");
        info.open_ocean_percent = header.sph.float("open_ocean_percent").ok().map(|v| v * 0.01);
        info.sar_mode_percent = Some(if mode.is_synthetic_aperture() { 100.0 } else { 0.0 });
        info
    }

    fn transfer_time_orbit(&self, builder: &mut PulseTrackBuilder, data: &Unpacked<'_>, baseline: &str) -> L1bResult<()> {
        let days = data.series("time_orbit", "days")?;
        let seconds = data.series("time_orbit", "seconds")?;
        let micros = data.series("time_orbit", "microseconds")?;
        let tai: Vec<NaiveDateTime> = days
            .iter()
            .zip(&seconds)
            .zip(&micros)
            .map(|((&d, &s), &us)| from_mjd2000(d, s, us))
            .collect::<L1bResult<_>>()?;
        builder.set_timestamps(self.converter.tai_to_utc(&tai)?)?;
        builder.set_position(
            data.series("time_orbit", "longitude")?,
            data.series("time_orbit", "latitude")?,
            data.series("time_orbit", "altitude")?,
        )?;
        if baseline != "B" {
            builder.set_attitude(
                data.series("time_orbit", "antenna_pitch")?,
                data.series("time_orbit", "antenna_roll")?,
                data.series("time_orbit", "antenna_yaw")?,
            )?;
        }
        Ok(())
    }

    fn transfer_waveform(&self, builder: &mut PulseTrackBuilder, data: &Unpacked<'_>, mode: RadarMode) -> L1bResult<Array2<f64>> {
        let counts = rows_to_array(data.rows("waveform", "wfm")?)?;
        let power = echo_power(
            &counts,
            &data.series("waveform", "linear_scale")?,
            &data.series("waveform", "power_scale")?,
        );
        let range = echo_range(
            &data.series("measurement", "window_delay")?,
            counts.ncols(),
            self.config.bandwidth,
        );
        builder.set_waveform(power, range, mode)?;
        let confidence = data.series("time_orbit", "measurement_confidence")?;
        builder.set_valid_flag(confidence.iter().map(|&word| is_valid(word)).collect())?;
        Ok(counts)
    }

    fn transfer_classifiers(
        &self,
        builder: &mut PulseTrackBuilder,
        data: &Unpacked<'_>,
        counts: &Array2<f64>,
        mode: RadarMode,
    ) -> L1bResult<()> {
        if mode.is_synthetic_aperture() {
            for name in STACK_PARAMETERS {
                let values = data.series("waveform", name)?;
                builder.classifier().add(values, name)?;
            }
        }
        self.engine.add_shape_parameters(builder, counts)?;
        self.engine
            .add_peak_power_db(builder, crate::classifier::names::PEAK_POWER_DB)?;
        self.engine.add_leading_edge_width(builder)?;

        let speed: Vec<f64> = data
            .rows("time_orbit", "satellite_velocity")?
            .iter()
            .map(|v| v.iter().map(|c| c * c).sum::<f64>().sqrt())
            .collect();
        let tx_power = data.series("measurement", "tx_power")?;
        self.engine.add_sigma0(builder, &tx_power, &speed)
    }
}

impl MissionAdapter for Cryosat2Adapter {
    fn mission(&self) -> MissionId {
        MissionId::Cryosat2
    }

    fn construct(&self, product: ProductFile) -> L1bResult<PulseTrack> {
        let logger = LogManager::scoped(product.file_name());
        let header = PdsHeader::read(&product, &PDS_SCHEMA)?;

        let name = header
            .mph
            .text("product")
            .map(str::to_string)
            .unwrap_or_else(|_| product.file_name());
        let (baseline, mode) = product_format(&name)
            .or_else(|| product_format(&product.file_name()))
            .ok_or_else(|| L1bError::UnsupportedFormatVersion {
                mission: MissionId::Cryosat2.to_string(),
                baseline: "unknown".into(),
                mode: "unknown".into(),
            })?;
        let layout = LayoutRegistry::global().lookup(MissionId::Cryosat2, &baseline, mode, dataset_name(mode))?;
        let descriptor = header.dsd.get(dataset_name(mode))?;
        let segment = BinaryRecordDecoder::decode(product.bytes(), descriptor, layout)?;
        logger.debug(&format!("{} records of {} bytes", segment.len(), layout.record_size()));

        let data = Unpacked::new(segment)?;
        let mut info = self.track_info(&product, &header, &baseline, mode);
        info.pulses_trimmed = data.plan.removed;
        info.sequence_counter_all_zero = data.plan.all_zero;
        if data.plan.removed > 0 {
            logger.debug(&format!("{} trailing pad pulses removed", data.plan.removed));
        }

        let mut builder = PulseTrackBuilder::new(info, data.n_pulses());
        self.transfer_time_orbit(&mut builder, &data, &baseline)?;
        let counts = self.transfer_waveform(&mut builder, &data, mode)?;

        let iono = self.ionospheric_field();
        transfer_corrections(&mut builder, &self.config, |name, field| {
            let field = if name == "ionospheric" { iono } else { field };
            data.series("corrections", field)
        })?;
        transfer_surface_codes(&mut builder, &data.series("corrections", "surface_type")?, &self.config)?;
        self.transfer_classifiers(&mut builder, &data, &counts, mode)?;

        let track = builder.finish()?;
        logger.record(&format!(
            "baseline {} {} track with {} pulses",
            baseline,
            mode,
            track.n_pulses()
        ));
        Ok(track)
    }
}
