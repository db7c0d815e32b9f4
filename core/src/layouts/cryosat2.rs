//! CryoSat-2 SIRAL L1b measurement data set records, baselines B and C.
//!
//! All data sets are big-endian. One record holds 20 time-orbit and
//! measurement blocks, one 1 Hz corrections block, one averaged waveform
//! and 20 waveform blocks.

use crate::binary::{Endian, FieldSpec, FieldType, GroupSpec, LayoutKey, RecordLayout};
use crate::prelude::{MissionId, RadarMode};

pub const BLOCKS_PER_RECORD: usize = 20;
pub const BASELINES: [&str; 2] = ["B", "C"];
pub const MODES: [RadarMode; 3] = [RadarMode::Lrm, RadarMode::Sar, RadarMode::Sarin];

/// Measurement data set name for a radar mode.
pub fn dataset_name(mode: RadarMode) -> &'static str {
    match mode {
        RadarMode::Lrm => "SIR_L1B_LRM",
        RadarMode::Sar => "SIR_L1B_SAR",
        RadarMode::Sarin => "SIR_L1B_SARIN",
    }
}

pub fn waveform_bins(baseline: &str, mode: RadarMode) -> usize {
    match (mode, baseline) {
        (RadarMode::Lrm, _) => 128,
        (RadarMode::Sar, _) => 256,
        (RadarMode::Sarin, "B") => 512,
        (RadarMode::Sarin, _) => 1024,
    }
}

fn average_waveform_bins(mode: RadarMode) -> usize {
    match mode {
        RadarMode::Lrm | RadarMode::Sar => 128,
        RadarMode::Sarin => 512,
    }
}

fn time_orbit(baseline: &str) -> GroupSpec {
    let mut fields = vec![
        FieldSpec::new("days", FieldType::I32).scaled(1.0, "day"),
        FieldSpec::new("seconds", FieldType::U32).scaled(1.0, "s"),
        FieldSpec::new("microseconds", FieldType::U32).scaled(1.0, "us"),
        FieldSpec::new("uso_correction", FieldType::I32).scaled(1e-15, ""),
        FieldSpec::new("mode_id", FieldType::U16),
        FieldSpec::new("source_sequence_counter", FieldType::U16),
        FieldSpec::new("instrument_configuration", FieldType::U32),
        FieldSpec::new("burst_counter", FieldType::U32),
        FieldSpec::new("latitude", FieldType::I32).scaled(1e-7, "deg"),
        FieldSpec::new("longitude", FieldType::I32).scaled(1e-7, "deg"),
        FieldSpec::new("altitude", FieldType::I32).scaled(1e-3, "m"),
        FieldSpec::new("altitude_rate", FieldType::I32).scaled(1e-6, "m/s"),
        FieldSpec::new("satellite_velocity", FieldType::I32)
            .count(3)
            .scaled(1e-3, "m/s"),
        FieldSpec::new("real_beam", FieldType::I32).count(3).scaled(1e-6, ""),
        FieldSpec::new("interferometer_baseline", FieldType::I32)
            .count(3)
            .scaled(1e-6, ""),
    ];
    if baseline != "B" {
        fields.extend([
            FieldSpec::new("star_tracker_usage", FieldType::U16),
            FieldSpec::spare(2),
            FieldSpec::new("antenna_roll", FieldType::I32).scaled(1e-7, "deg"),
            FieldSpec::new("antenna_pitch", FieldType::I32).scaled(1e-7, "deg"),
            FieldSpec::new("antenna_yaw", FieldType::I32).scaled(1e-7, "deg"),
        ]);
    }
    fields.push(FieldSpec::new("measurement_confidence", FieldType::U32));
    fields.push(FieldSpec::spare(4));
    GroupSpec::new("time_orbit", BLOCKS_PER_RECORD, fields)
}

fn measurement() -> GroupSpec {
    GroupSpec::new(
        "measurement",
        BLOCKS_PER_RECORD,
        vec![
            FieldSpec::new("window_delay", FieldType::I64).scaled(1e-12, "s"),
            FieldSpec::new("h0", FieldType::I32),
            FieldSpec::new("cor2", FieldType::I32),
            FieldSpec::new("lai", FieldType::I32),
            FieldSpec::new("fai", FieldType::I32),
            FieldSpec::new("agc_ch1", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("agc_ch2", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("tr_gain_ch1", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("tr_gain_ch2", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("tx_power", FieldType::I32).scaled(1e-6, "W"),
            FieldSpec::new("doppler_range_correction", FieldType::I32).scaled(1e-3, "m"),
            FieldSpec::new("instrument_range_correction_tx_rx", FieldType::I32).scaled(1e-3, "m"),
            FieldSpec::new("instrument_range_correction_rx", FieldType::I32).scaled(1e-3, "m"),
            FieldSpec::new("instrument_gain_correction_tx_rx", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("instrument_gain_correction_rx", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("internal_phase_correction", FieldType::I32).scaled(1e-6, "rad"),
            FieldSpec::new("external_phase_correction", FieldType::I32).scaled(1e-6, "rad"),
            FieldSpec::new("noise_power", FieldType::I32).scaled(1e-2, "dB"),
            FieldSpec::new("phase_slope_correction", FieldType::I32).scaled(1e-6, "rad"),
            FieldSpec::spare(4),
        ],
    )
}

fn corrections() -> GroupSpec {
    let metres = |name| FieldSpec::new(name, FieldType::I32).scaled(1e-3, "m");
    GroupSpec::new(
        "corrections",
        1,
        vec![
            metres("dry_troposphere"),
            metres("wet_troposphere"),
            metres("inverse_barometric"),
            metres("dynamic_atmosphere"),
            metres("ionospheric_gim"),
            metres("ionospheric_mod"),
            metres("ocean_tide_elastic"),
            metres("ocean_tide_long_period"),
            metres("ocean_loading_tide"),
            metres("solid_earth_tide"),
            metres("geocentric_polar_tide"),
            FieldSpec::new("surface_type", FieldType::U32),
            FieldSpec::spare(4),
            FieldSpec::new("correction_status", FieldType::U32),
            FieldSpec::new("correction_error", FieldType::U32),
            FieldSpec::spare(4),
        ],
    )
}

fn average_waveform(mode: RadarMode) -> GroupSpec {
    GroupSpec::new(
        "average_waveform",
        1,
        vec![
            FieldSpec::new("days", FieldType::I32),
            FieldSpec::new("seconds", FieldType::U32),
            FieldSpec::new("microseconds", FieldType::U32),
            FieldSpec::new("latitude", FieldType::I32).scaled(1e-7, "deg"),
            FieldSpec::new("longitude", FieldType::I32).scaled(1e-7, "deg"),
            FieldSpec::new("altitude", FieldType::I32).scaled(1e-3, "m"),
            FieldSpec::new("window_delay", FieldType::I64).scaled(1e-12, "s"),
            FieldSpec::new("wfm", FieldType::U16).count(average_waveform_bins(mode)),
            FieldSpec::new("linear_scale", FieldType::I32),
            FieldSpec::new("power_scale", FieldType::I32),
            FieldSpec::new("num_avg_echoes", FieldType::U16),
            FieldSpec::new("flags", FieldType::U16),
        ],
    )
}

fn stack_parameters(baseline: &str) -> Vec<FieldSpec> {
    let hundredths = |name| FieldSpec::new(name, FieldType::I16).scaled(1e-2, "");
    let mut fields = vec![
        hundredths("stack_standard_deviation"),
        hundredths("stack_centre"),
        hundredths("stack_scaled_amplitude"),
        hundredths("stack_skewness"),
        hundredths("stack_kurtosis"),
    ];
    if baseline == "B" {
        fields.push(FieldSpec::spare(46));
    } else {
        fields.extend([
            FieldSpec::new("stack_standard_deviation_angle", FieldType::I16).scaled(1e-6, "rad"),
            FieldSpec::new("stack_centre_angle", FieldType::I16).scaled(1e-6, "rad"),
            FieldSpec::new("stack_centre_angle_error", FieldType::I32).scaled(1e-6, "rad"),
            FieldSpec::new("stack_number_before_weighting", FieldType::U16),
            FieldSpec::new("stack_number_after_weighting", FieldType::U16),
            FieldSpec::spare(34),
        ]);
    }
    fields
}

fn waveform(baseline: &str, mode: RadarMode) -> GroupSpec {
    let bins = waveform_bins(baseline, mode);
    let mut fields = vec![
        FieldSpec::new("wfm", FieldType::U16).count(bins),
        FieldSpec::new("linear_scale", FieldType::I32),
        FieldSpec::new("power_scale", FieldType::I32),
        FieldSpec::new("num_avg_echoes", FieldType::U16),
        FieldSpec::new("flags", FieldType::U16),
    ];
    if mode.is_synthetic_aperture() {
        fields.extend(stack_parameters(baseline));
    }
    if mode == RadarMode::Sarin {
        fields.push(FieldSpec::new("coherence", FieldType::U16).count(bins).scaled(1e-3, ""));
        fields.push(
            FieldSpec::new("phase_difference", FieldType::I32)
                .count(bins)
                .scaled(1e-6, "rad"),
        );
    }
    GroupSpec::new("waveform", BLOCKS_PER_RECORD, fields)
}

pub fn layout(baseline: &str, mode: RadarMode) -> RecordLayout {
    RecordLayout::new(
        LayoutKey::new(MissionId::Cryosat2, baseline, mode, dataset_name(mode)),
        Endian::Big,
        vec![
            time_orbit(baseline),
            measurement(),
            corrections(),
            average_waveform(mode),
            waveform(baseline, mode),
        ],
    )
}

pub fn all() -> Vec<RecordLayout> {
    BASELINES
        .iter()
        .flat_map(|baseline| MODES.iter().map(move |&mode| layout(baseline, mode)))
        .collect()
}
